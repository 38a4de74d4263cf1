use crate::crypto::{CipherError, SignatureError};
use crate::storage::StorageError;
use thiserror::Error;

/// Every way constructing, opening, sending or receiving an envelope can fail.
///
/// Messages name the failure kind only; they never carry key bytes or
/// plaintext.
#[derive(Error, Debug)]
pub enum MessageError {
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Malformed key: {0}")]
    KeyFormat(String),

    #[error("Symmetric key wrap/unwrap failed")]
    CryptoOp,

    #[error("Authenticated decryption failed")]
    Integrity,

    #[error("Signature verification failed")]
    Signature,

    #[error("Message expired (timestamp {timestamp}, now {now})")]
    ExpiredMessage { timestamp: u64, now: u64 },

    #[error("Replay detected: nonce already used")]
    Replay,

    #[error("Key revoked: {0}")]
    RevokedKey(String),

    #[error("Refusing to encrypt an empty message")]
    EmptyMessage,

    #[error("Storage error: {0}")]
    Storage(StorageError),

    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl MessageError {
    /// 错误类别名，用于日志与 CLI 输出
    pub fn kind(&self) -> &'static str {
        match self {
            MessageError::KeyNotFound(_) => "KeyNotFound",
            MessageError::KeyFormat(_) => "KeyFormat",
            MessageError::CryptoOp => "CryptoOp",
            MessageError::Integrity => "Integrity",
            MessageError::Signature => "Signature",
            MessageError::ExpiredMessage { .. } => "ExpiredMessage",
            MessageError::Replay => "Replay",
            MessageError::RevokedKey(_) => "RevokedKey",
            MessageError::EmptyMessage => "EmptyMessage",
            MessageError::Storage(_) => "Storage",
            MessageError::Encoding(_) => "Encoding",
        }
    }
}

impl From<CipherError> for MessageError {
    fn from(err: CipherError) -> Self {
        match err {
            CipherError::KeyFormat(reason) => MessageError::KeyFormat(reason),
            CipherError::CryptoOp => MessageError::CryptoOp,
            CipherError::Integrity => MessageError::Integrity,
        }
    }
}

impl From<SignatureError> for MessageError {
    fn from(err: SignatureError) -> Self {
        match err {
            SignatureError::InvalidKey(reason) => MessageError::KeyFormat(reason.to_string()),
            SignatureError::VerificationFailed(_) => MessageError::Signature,
        }
    }
}

impl From<StorageError> for MessageError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::KeyNotFound(key_id) => MessageError::KeyNotFound(key_id),
            other => MessageError::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyError;

    #[test]
    fn test_conversions() {
        assert!(matches!(MessageError::from(CipherError::CryptoOp), MessageError::CryptoOp));
        assert!(matches!(MessageError::from(CipherError::Integrity), MessageError::Integrity));

        let err = MessageError::from(SignatureError::InvalidKey(KeyError::InvalidLength {
            expected: 64,
            actual: 3,
        }));
        assert_eq!(err.kind(), "KeyFormat");

        let err = MessageError::from(SignatureError::VerificationFailed("mismatch".to_string()));
        assert_eq!(err.kind(), "Signature");

        let err = MessageError::from(StorageError::KeyNotFound("bank_private".to_string()));
        assert!(matches!(err, MessageError::KeyNotFound(ref id) if id == "bank_private"));

        let err = MessageError::from(StorageError::LockError("poisoned".to_string()));
        assert_eq!(err.kind(), "Storage");
    }

    #[test]
    fn test_display_has_no_payload() {
        let err = MessageError::ExpiredMessage {
            timestamp: 100,
            now: 200,
        };
        assert_eq!(err.to_string(), "Message expired (timestamp 100, now 200)");
        assert_eq!(MessageError::Replay.kind(), "Replay");
    }
}
