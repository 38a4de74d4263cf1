mod error;
mod envelope;
mod ledger;
mod protocol;
mod channel;

pub use error::MessageError;
pub use envelope::Envelope;
pub use ledger::{LedgerDecision, NonceLedger};
pub use protocol::EnvelopeProtocol;
pub use channel::SecureChannel;

/*
 * Message handling module for SecureBox
 *
 * This module handles the life of one message:
 * - Envelope wire format (base64 fields in a flat JSON record)
 * - Construction: wrap a fresh key, encrypt, sign, timestamp
 * - Opening: expiry, replay, signature, unwrap, decrypt (in that order)
 * - The revocation gate and mailbox delivery around both directions
 */
