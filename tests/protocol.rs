//! Protocol-level tests for SecureBox envelopes.
//!
//! These tests drive `EnvelopeProtocol` directly with raw key bytes and a
//! manual clock, covering the properties every envelope must satisfy:
//! round-trip, expiry, replay, tamper and wrong-key rejection.

use std::sync::Arc;

use secure_box::{
    crypto::{KeyPair, SymmetricKeySize},
    message::{Envelope, EnvelopeProtocol, MessageError},
    storage::{FileNonceStore, MemoryNonceStore},
    utils::{ManualTimeSource, ProtocolConfig},
};

const NOW: u64 = 1_700_000_000;

struct Parties {
    customer: KeyPair,
    bank: KeyPair,
}

impl Parties {
    fn new() -> Self {
        Self {
            customer: KeyPair::generate().expect("Failed to generate customer keypair"),
            bank: KeyPair::generate().expect("Failed to generate bank keypair"),
        }
    }
}

fn protocol_at(now: u64) -> (EnvelopeProtocol, Arc<ManualTimeSource>) {
    let clock = Arc::new(ManualTimeSource::new(now));
    let protocol = EnvelopeProtocol::with_clock(
        ProtocolConfig::default(),
        Arc::new(MemoryNonceStore::new()),
        clock.clone(),
    );
    (protocol, clock)
}

/// Tests that an envelope survives the JSON wire format and opens to the
/// original plaintext.
#[test]
fn test_round_trip_through_wire_format() {
    let parties = Parties::new();
    let (protocol, _clock) = protocol_at(NOW);

    for plaintext in ["transfer 100", "ünïcødé ✓", "x"] {
        let envelope = protocol
            .construct(&parties.customer.secret.to_bytes(), &parties.bank.public.to_bytes(), plaintext.as_bytes())
            .expect("Construct failed");

        let json = envelope.to_json().expect("Serialization failed");
        let decoded = Envelope::from_json(&json).expect("Deserialization failed");

        let opened = protocol
            .open(&parties.bank.secret.to_bytes(), &parties.customer.public.to_bytes(), &decoded)
            .expect("Open failed");
        assert_eq!(opened, plaintext.as_bytes());
    }
}

/// Tests that the customer can only open messages meant for the customer.
///
/// The bank's reply is wrapped for the customer's key; the bank itself
/// cannot unwrap it.
#[test]
fn test_reply_direction() {
    let parties = Parties::new();
    let (protocol, _clock) = protocol_at(NOW);

    let reply = protocol
        .construct(&parties.bank.secret.to_bytes(), &parties.customer.public.to_bytes(), b"received")
        .expect("Construct failed");

    let result = protocol.open(&parties.bank.secret.to_bytes(), &parties.bank.public.to_bytes(), &reply);
    assert!(matches!(result, Err(MessageError::CryptoOp)));

    // 上面的失败已经记录了 nonce，换一个账本再打开
    let (protocol, _clock) = protocol_at(NOW);
    let opened = protocol
        .open(&parties.customer.secret.to_bytes(), &parties.bank.public.to_bytes(), &reply)
        .expect("Open failed");
    assert_eq!(opened, b"received");
}

/// Tests that expiry applies symmetrically and before any other check.
#[test]
fn test_expiry_window() {
    let parties = Parties::new();
    let (sender, _) = protocol_at(NOW);
    let envelope = sender
        .construct(&parties.customer.secret.to_bytes(), &parties.bank.public.to_bytes(), b"hello")
        .expect("Construct failed");

    for now in [NOW + 61, NOW - 61, NOW + 3600] {
        let (receiver, _) = protocol_at(now);
        let result = receiver.open(&parties.bank.secret.to_bytes(), &parties.customer.public.to_bytes(), &envelope);
        assert!(matches!(result, Err(MessageError::ExpiredMessage { .. })), "accepted at {}", now);
    }

    for now in [NOW - 60, NOW + 60] {
        let (receiver, _) = protocol_at(now);
        assert!(receiver
            .open(&parties.bank.secret.to_bytes(), &parties.customer.public.to_bytes(), &envelope)
            .is_ok());
    }
}

/// Tests a larger expiry window and AES-256 taken from configuration.
#[test]
fn test_configured_window_and_key_size() {
    let parties = Parties::new();
    let clock = Arc::new(ManualTimeSource::new(NOW));
    let config = ProtocolConfig {
        symmetric_key_size: SymmetricKeySize::Aes256,
        expiry_window_secs: 300,
    };
    let protocol = EnvelopeProtocol::with_clock(config, Arc::new(MemoryNonceStore::new()), clock.clone());

    let envelope = protocol
        .construct(&parties.customer.secret.to_bytes(), &parties.bank.public.to_bytes(), b"slow link")
        .expect("Construct failed");

    clock.advance(299);
    let opened = protocol
        .open(&parties.bank.secret.to_bytes(), &parties.customer.public.to_bytes(), &envelope)
        .expect("Open failed");
    assert_eq!(opened, b"slow link");
}

/// Tests that the replay ledger is shared through its backing file.
///
/// Two protocol instances with separate stores over the same file behave
/// like two processes: the second one rejects the envelope the first one
/// already opened.
#[test]
fn test_replay_across_instances() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("used_nonces.json");
    let parties = Parties::new();
    let clock = Arc::new(ManualTimeSource::new(NOW));

    let first = EnvelopeProtocol::with_clock(ProtocolConfig::default(), Arc::new(FileNonceStore::new(&path)), clock.clone());
    let second = EnvelopeProtocol::with_clock(ProtocolConfig::default(), Arc::new(FileNonceStore::new(&path)), clock.clone());

    let envelope = first
        .construct(&parties.customer.secret.to_bytes(), &parties.bank.public.to_bytes(), b"transfer 100")
        .expect("Construct failed");

    first
        .open(&parties.bank.secret.to_bytes(), &parties.customer.public.to_bytes(), &envelope)
        .expect("First open failed");

    let result = second.open(&parties.bank.secret.to_bytes(), &parties.customer.public.to_bytes(), &envelope);
    assert!(matches!(result, Err(MessageError::Replay)));
}

/// Tests that every single-bit flip in ciphertext or tag is rejected.
///
/// Each attempt uses a fresh protocol instance so the nonce ledger never
/// masks the tamper check.
#[test]
fn test_single_bit_flips() {
    let parties = Parties::new();
    let (sender, _) = protocol_at(NOW);
    let envelope = sender
        .construct(&parties.customer.secret.to_bytes(), &parties.bank.public.to_bytes(), b"pay")
        .expect("Construct failed");

    let ciphertext_bits = envelope.ciphertext().len() * 8;
    let tag_bits = envelope.tag().len() * 8;

    for bit in 0..(ciphertext_bits + tag_bits) {
        let mut ciphertext = envelope.ciphertext().to_vec();
        let mut tag = envelope.tag().to_vec();

        if bit < ciphertext_bits {
            ciphertext[bit / 8] ^= 1 << (bit % 8);
        } else {
            let bit = bit - ciphertext_bits;
            tag[bit / 8] ^= 1 << (bit % 8);
        }

        let tampered = Envelope::new(
            envelope.wrapped_key().to_vec(),
            envelope.nonce().to_vec(),
            ciphertext,
            tag,
            envelope.signature().to_vec(),
            envelope.timestamp(),
        )
        .expect("Rebuild failed");

        let (receiver, _) = protocol_at(NOW);
        match receiver.open(&parties.bank.secret.to_bytes(), &parties.customer.public.to_bytes(), &tampered) {
            Err(MessageError::Integrity) | Err(MessageError::Signature) => {}
            other => panic!("bit {} flip was not rejected: {:?}", bit, other),
        }
    }
}

/// Tests that the wrong keys are reported with the right error kinds.
#[test]
fn test_wrong_keys() {
    let parties = Parties::new();
    let stranger = KeyPair::generate().expect("Failed to generate keypair");
    let (protocol, _) = protocol_at(NOW);

    let envelope = protocol
        .construct(&parties.customer.secret.to_bytes(), &parties.bank.public.to_bytes(), b"secret")
        .expect("Construct failed");

    let result = protocol.open(&parties.bank.secret.to_bytes(), &stranger.public.to_bytes(), &envelope);
    assert_eq!(result.map_err(|e| e.kind()), Err("Signature"));

    let (protocol, _) = protocol_at(NOW);
    let result = protocol.open(&stranger.secret.to_bytes(), &parties.customer.public.to_bytes(), &envelope);
    assert_eq!(result.map_err(|e| e.kind()), Err("CryptoOp"));
}
