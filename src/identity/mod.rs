mod role;

pub use role::{IdentityError, KeyHalf, KeyId, Role};

/*
 * Identity module for SecureBox
 *
 * Identities are plain role tags ("customer", "bank"). Each role owns one
 * key pair; a KeyId names one half of it and doubles as the identifier
 * consulted by the revocation oracle.
 */
