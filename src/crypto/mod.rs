mod keys;
mod cipher;
mod signing;

pub use keys::{KeyError, KeyPair, PublicKey, SecretKey, ASYMMETRIC_KEY_LEN, ENCODED_KEY_LEN};
pub use cipher::{CipherError, HybridCipher, Sealed, SymmetricKey, SymmetricKeySize, NONCE_LEN, TAG_LEN};
pub use signing::{hash_message, sign, verify, SignatureError, SIGNATURE_LEN};

/*
 * Cryptography module for SecureBox
 *
 * This module handles all cryptographic primitives:
 * - Identity key pairs (Ed25519 for signatures, X25519 for key transport)
 * - Hybrid encryption: key wrapping plus AES-GCM payload encryption
 * - Signatures over SHA-256 digests
 *
 * Everything here works on raw key bytes; parsing failures surface as
 * key-format errors, never as panics.
 */
