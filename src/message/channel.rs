use crate::identity::{KeyHalf, KeyId, Role};
use crate::message::{Envelope, EnvelopeProtocol, MessageError};
use crate::storage::{FileKeyStore, FileNonceStore, FileRevocationList, KeyStore, Mailbox, RevocationOracle};
use crate::utils::Config;
use log::{info, warn};
use std::sync::Arc;

/// Caller-side boundary around [`EnvelopeProtocol`].
///
/// Adds the revocation gate, key lookup and mailbox delivery. The gate runs
/// before any key is loaded or any cryptographic operation executes, so a
/// blocked call produces no envelope and consumes no nonce.
#[derive(Clone)]
pub struct SecureChannel {
    protocol: EnvelopeProtocol,
    keys: Arc<dyn KeyStore>,
    revocations: Arc<dyn RevocationOracle>,
    mailbox: Mailbox,
}

impl SecureChannel {
    pub fn new(
        protocol: EnvelopeProtocol,
        keys: Arc<dyn KeyStore>,
        revocations: Arc<dyn RevocationOracle>,
        mailbox: Mailbox,
    ) -> Self {
        Self {
            protocol,
            keys,
            revocations,
            mailbox,
        }
    }

    /// 按配置组装文件存储版本的通道
    pub fn from_config(config: &Config) -> Self {
        let nonces = Arc::new(FileNonceStore::new(&config.used_nonces_file));

        Self::new(
            EnvelopeProtocol::new(config.protocol(), nonces),
            Arc::new(FileKeyStore::new(&config.keys_dir)),
            Arc::new(FileRevocationList::new(&config.revoked_keys_file)),
            Mailbox::new(&config.messages_dir),
        )
    }

    pub fn protocol(&self) -> &EnvelopeProtocol {
        &self.protocol
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    fn ensure_not_revoked(&self, role: &Role) -> Result<(), MessageError> {
        let key_id = KeyId::public(role).to_string();

        if self.revocations.is_revoked(&key_id) {
            warn!("Blocked: {} is revoked", key_id);
            return Err(MessageError::RevokedKey(key_id));
        }

        Ok(())
    }

    /// 为 `to` 加密并签名一条消息，不投递
    pub fn encrypt_for(&self, from: &Role, to: &Role, plaintext: &str) -> Result<Envelope, MessageError> {
        self.ensure_not_revoked(to)?;

        let sender_priv = self.keys.load_key(from, KeyHalf::Private)?;
        let recipient_pub = self.keys.load_key(to, KeyHalf::Public)?;

        self.protocol.construct(&sender_priv, &recipient_pub, plaintext.as_bytes())
    }

    /// 校验并解密来自 `sender` 的信封
    pub fn decrypt_from(&self, receiver: &Role, sender: &Role, envelope: &Envelope) -> Result<String, MessageError> {
        self.ensure_not_revoked(sender)?;

        let receiver_priv = self.keys.load_key(receiver, KeyHalf::Private)?;
        let sender_pub = self.keys.load_key(sender, KeyHalf::Public)?;

        let plaintext = self.protocol.open(&receiver_priv, &sender_pub, envelope)?;
        String::from_utf8(plaintext).map_err(|_| MessageError::Encoding("plaintext is not valid UTF-8".to_string()))
    }

    /// 加密并投递到 `to` 的信箱
    pub fn send(&self, from: &Role, to: &Role, plaintext: &str) -> Result<Envelope, MessageError> {
        let envelope = self.encrypt_for(from, to, plaintext)?;
        self.mailbox.deliver(to, &envelope)?;

        info!("{} sent an envelope to {}", from, to);
        Ok(envelope)
    }

    /// 从 `receiver` 的信箱取出 `sender` 发来的信封并解密，信箱为空时返回 `None`
    pub fn receive(&self, receiver: &Role, sender: &Role) -> Result<Option<String>, MessageError> {
        self.ensure_not_revoked(sender)?;

        let envelope = match self.mailbox.fetch(receiver)? {
            Some(envelope) => envelope,
            None => return Ok(None),
        };

        let plaintext = self.decrypt_from(receiver, sender, &envelope)?;
        info!("{} read an envelope from {}", receiver, sender);
        Ok(Some(plaintext))
    }
}

impl std::fmt::Debug for SecureChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureChannel")
            .field("protocol", &self.protocol)
            .field("mailbox", &self.mailbox)
            .finish_non_exhaustive()
    }
}
