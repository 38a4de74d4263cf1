use ed25519_dalek::{PublicKey as EdPublicKey, SecretKey as EdSecretKey};
use rand::RngCore;
use std::fmt;
use thiserror::Error;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

/// 曲线密钥长度（Ed25519 / X25519 均为 32 字节）
pub const ASYMMETRIC_KEY_LEN: usize = 32;

/// 序列化后的公钥 / 私钥长度：签名密钥 + 加密密钥
pub const ENCODED_KEY_LEN: usize = 2 * ASYMMETRIC_KEY_LEN;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Key generation failed: {0}")]
    GenerationFailed(String),

    #[error("Invalid key length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid key material: {0}")]
    InvalidKey(String),
}

/// Represents a public key in the SecureBox system.
#[derive(Clone)]
pub struct PublicKey {
    /// Ed25519 public key for signature verification
    signing_key: EdPublicKey,

    /// X25519 public key for key transport
    encryption_key: X25519PublicKey,
}

impl PublicKey {
    /// Creates a new PublicKey from raw components
    pub fn new(signing_key: EdPublicKey, encryption_key: X25519PublicKey) -> Self {
        Self {
            signing_key,
            encryption_key,
        }
    }

    /// Returns the signing key
    pub fn signing_key(&self) -> &EdPublicKey {
        &self.signing_key
    }

    /// Returns the encryption key
    pub fn encryption_key(&self) -> &X25519PublicKey {
        &self.encryption_key
    }

    /// Converts the public key to bytes for storage or transmission
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(ENCODED_KEY_LEN);
        buffer.extend_from_slice(self.signing_key.as_bytes());
        buffer.extend_from_slice(self.encryption_key.as_bytes());
        buffer
    }

    /// Creates a public key from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let (signing_bytes, encryption_bytes) = split_encoded(bytes)?;

        // Ed25519 公钥必须是合法的曲线点
        let signing_key = EdPublicKey::from_bytes(signing_bytes)
            .map_err(|e| KeyError::InvalidKey(e.to_string()))?;
        let encryption_key = X25519PublicKey::from(encryption_bytes);

        Ok(Self {
            signing_key,
            encryption_key,
        })
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}...)", hex::encode(&self.signing_key.as_bytes()[0..4]))
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.signing_key.as_bytes() == other.signing_key.as_bytes()
            && self.encryption_key.as_bytes() == other.encryption_key.as_bytes()
    }
}

impl Eq for PublicKey {}

/// Represents a secret key in the SecureBox system.
pub struct SecretKey {
    /// Ed25519 secret key for signing
    signing_key: EdSecretKey,

    /// X25519 secret key for key transport
    encryption_key: StaticSecret,
}

impl SecretKey {
    /// Creates a new SecretKey from raw components
    pub fn new(signing_key: EdSecretKey, encryption_key: StaticSecret) -> Self {
        Self {
            signing_key,
            encryption_key,
        }
    }

    /// Returns the signing key
    pub fn signing_key(&self) -> &EdSecretKey {
        &self.signing_key
    }

    /// Returns the encryption key
    pub fn encryption_key(&self) -> &StaticSecret {
        &self.encryption_key
    }

    /// Derives the matching public key
    pub fn public_key(&self) -> PublicKey {
        PublicKey::new(
            EdPublicKey::from(&self.signing_key),
            X25519PublicKey::from(&self.encryption_key),
        )
    }

    /// Converts the secret key to bytes for storage
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(ENCODED_KEY_LEN);
        buffer.extend_from_slice(self.signing_key.as_bytes());
        buffer.extend_from_slice(&self.encryption_key.to_bytes());
        buffer
    }

    /// Creates a secret key from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let (signing_bytes, encryption_bytes) = split_encoded(bytes)?;

        let signing_key = EdSecretKey::from_bytes(signing_bytes)
            .map_err(|e| KeyError::InvalidKey(e.to_string()))?;
        let encryption_key = StaticSecret::from(encryption_bytes);

        Ok(Self {
            signing_key,
            encryption_key,
        })
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey {{ <redacted> }}")
    }
}

/// Represents a key pair (public and secret keys) in the SecureBox system.
#[derive(Debug)]
pub struct KeyPair {
    pub public: PublicKey,
    pub secret: SecretKey,
}

impl KeyPair {
    /// Generates a new random key pair
    pub fn generate() -> Result<Self, KeyError> {
        let mut rng = rand::thread_rng();

        // 签名密钥和加密密钥使用相互独立的随机种子
        let mut signing_seed = [0u8; ASYMMETRIC_KEY_LEN];
        rng.try_fill_bytes(&mut signing_seed)
            .map_err(|e| KeyError::GenerationFailed(e.to_string()))?;
        let mut encryption_seed = [0u8; ASYMMETRIC_KEY_LEN];
        rng.try_fill_bytes(&mut encryption_seed)
            .map_err(|e| KeyError::GenerationFailed(e.to_string()))?;

        let signing_key = EdSecretKey::from_bytes(&signing_seed)
            .map_err(|e| KeyError::GenerationFailed(e.to_string()))?;
        let encryption_key = StaticSecret::from(encryption_seed);

        Ok(Self::from_secret(SecretKey::new(signing_key, encryption_key)))
    }

    /// Creates a key pair from existing secret key
    pub fn from_secret(secret: SecretKey) -> Self {
        Self {
            public: secret.public_key(),
            secret,
        }
    }
}

/// 把 64 字节拆成签名部分和加密部分
fn split_encoded(bytes: &[u8]) -> Result<(&[u8], [u8; ASYMMETRIC_KEY_LEN]), KeyError> {
    if bytes.len() != ENCODED_KEY_LEN {
        return Err(KeyError::InvalidLength {
            expected: ENCODED_KEY_LEN,
            actual: bytes.len(),
        });
    }

    let (signing, encryption) = bytes.split_at(ASYMMETRIC_KEY_LEN);
    let mut encryption_bytes = [0u8; ASYMMETRIC_KEY_LEN];
    encryption_bytes.copy_from_slice(encryption);

    Ok((signing, encryption_bytes))
}
