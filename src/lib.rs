//! SecureBox - signed, encrypted and replay-protected messages between
//! two parties over an untrusted shared store.
//!
//! The protocol core lives in [`message`]: an [`message::EnvelopeProtocol`]
//! builds and opens [`message::Envelope`]s with the primitives from
//! [`crypto`], and consults a [`message::NonceLedger`] for replay
//! protection. [`message::SecureChannel`] adds the revocation gate and the
//! file-backed adapters from [`storage`].

pub mod cli;
pub mod crypto;
pub mod identity;
pub mod message;
pub mod storage;
pub mod utils;
