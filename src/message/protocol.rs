use crate::crypto::{self, HybridCipher};
use crate::message::{Envelope, LedgerDecision, MessageError, NonceLedger};
use crate::storage::NonceStore;
use crate::utils::{ProtocolConfig, SystemTimeSource, TimeSource};
use log::{debug, warn};
use std::sync::Arc;

/// Builds and opens envelopes.
///
/// Each `construct`/`open` call is an independent run; the nonce ledger is
/// the only state shared between calls.
#[derive(Clone)]
pub struct EnvelopeProtocol {
    cipher: HybridCipher,
    ledger: NonceLedger,
    config: ProtocolConfig,
    clock: Arc<dyn TimeSource>,
}

impl EnvelopeProtocol {
    pub fn new(config: ProtocolConfig, nonces: Arc<dyn NonceStore>) -> Self {
        Self::with_clock(config, nonces, Arc::new(SystemTimeSource))
    }

    /// 使用指定时钟（测试中可注入手动时钟）
    pub fn with_clock(config: ProtocolConfig, nonces: Arc<dyn NonceStore>, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            cipher: HybridCipher::new(config.symmetric_key_size),
            ledger: NonceLedger::new(nonces, config.expiry_window_secs, clock.clone()),
            config,
            clock,
        }
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn ledger(&self) -> &NonceLedger {
        &self.ledger
    }

    /// 加密、签名并打上时间戳
    ///
    /// Never touches the nonce ledger.
    pub fn construct(&self, sender_priv: &[u8], recipient_pub: &[u8], plaintext: &[u8]) -> Result<Envelope, MessageError> {
        if plaintext.is_empty() {
            return Err(MessageError::EmptyMessage);
        }

        let key = self.cipher.generate_key();
        let wrapped_key = self.cipher.wrap_key(recipient_pub, &key)?;
        let sealed = self.cipher.seal(&key, plaintext)?;
        let signature = crypto::sign(sender_priv, &sealed.ciphertext)?;
        let timestamp = self.clock.now();

        debug!(
            "Constructed envelope: {} byte ciphertext, {:?}, timestamp {}",
            sealed.ciphertext.len(),
            key.size(),
            timestamp
        );

        Envelope::new(
            wrapped_key,
            sealed.nonce,
            sealed.ciphertext,
            sealed.tag,
            signature,
            timestamp,
        )
    }

    /// 按固定顺序校验并解密：时效 → 重放 → 签名 → 解包密钥 → 解密
    pub fn open(&self, receiver_priv: &[u8], sender_pub: &[u8], envelope: &Envelope) -> Result<Vec<u8>, MessageError> {
        let result = self.open_checked(receiver_priv, sender_pub, envelope);

        if let Err(e) = &result {
            warn!("Rejected envelope: {}", e.kind());
        }

        result
    }

    fn open_checked(&self, receiver_priv: &[u8], sender_pub: &[u8], envelope: &Envelope) -> Result<Vec<u8>, MessageError> {
        let now = self.clock.now();
        let timestamp = envelope.timestamp();

        if now.abs_diff(timestamp) > self.config.expiry_window_secs {
            return Err(MessageError::ExpiredMessage { timestamp, now });
        }

        if self.ledger.check_and_record(envelope.nonce())? == LedgerDecision::Rejected {
            return Err(MessageError::Replay);
        }

        crypto::verify(sender_pub, envelope.ciphertext(), envelope.signature())?;

        let key = self.cipher.unwrap_key(receiver_priv, envelope.wrapped_key())?;
        let plaintext = self
            .cipher
            .open(&key, envelope.nonce(), envelope.ciphertext(), envelope.tag())?;

        debug!("Opened envelope with timestamp {}", timestamp);
        Ok(plaintext)
    }
}

impl std::fmt::Debug for EnvelopeProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeProtocol")
            .field("cipher", &self.cipher)
            .field("ledger", &self.ledger)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
