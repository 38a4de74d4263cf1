/*
 * Hybrid cipher engine
 *
 * A fresh symmetric key per message encrypts the payload with AES-GCM; the
 * key itself travels wrapped for the recipient: an ephemeral X25519
 * agreement with the recipient's encryption key, HKDF-SHA256 down to a
 * key-encryption key, then ChaCha20-Poly1305 over the symmetric key.
 *
 *   wrapped_key = ephemeral_public (32) || ChaCha20-Poly1305(kek, symmetric_key)
 */

use crate::crypto::{PublicKey, SecretKey, ASYMMETRIC_KEY_LEN};
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use chacha20poly1305::aead::{Aead, NewAead};
use chacha20poly1305::{ChaCha20Poly1305, Key as WrapKey, Nonce as WrapNonce};
use ring::hkdf;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

/// AES-GCM nonce 长度
pub const NONCE_LEN: usize = 12;

/// AES-GCM 认证标签长度
pub const TAG_LEN: usize = 16;

/// ChaCha20-Poly1305 认证标签长度
const WRAP_TAG_LEN: usize = 16;

const WRAP_SALT: &[u8] = b"SecureBox-KeyWrap-Salt";
const WRAP_INFO: &[u8] = b"SecureBox-KeyWrap-v1";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CipherError {
    #[error("Malformed key: {0}")]
    KeyFormat(String),

    #[error("Key wrap operation failed")]
    CryptoOp,

    #[error("Authenticated decryption failed")]
    Integrity,
}

/// Symmetric cipher strength, chosen by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymmetricKeySize {
    /// AES-128-GCM, 16 byte key
    #[default]
    Aes128,
    /// AES-256-GCM, 32 byte key
    Aes256,
}

impl SymmetricKeySize {
    pub fn key_len(&self) -> usize {
        match self {
            SymmetricKeySize::Aes128 => 16,
            SymmetricKeySize::Aes256 => 32,
        }
    }

    fn from_key_len(len: usize) -> Option<Self> {
        match len {
            16 => Some(SymmetricKeySize::Aes128),
            32 => Some(SymmetricKeySize::Aes256),
            _ => None,
        }
    }
}

/// 单条消息使用的对称密钥
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKey(Vec<u8>);

impl SymmetricKey {
    /// 生成新的随机对称密钥
    pub fn generate(size: SymmetricKeySize) -> Self {
        Self(crate::utils::random_bytes(size.key_len()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CipherError> {
        SymmetricKeySize::from_key_len(bytes.len())
            .map(|_| Self(bytes.to_vec()))
            .ok_or(CipherError::CryptoOp)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn size(&self) -> SymmetricKeySize {
        // 构造时已校验长度
        SymmetricKeySize::from_key_len(self.0.len()).unwrap_or_default()
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymmetricKey({} bytes, <redacted>)", self.0.len())
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

/// Output of [`HybridCipher::seal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub tag: Vec<u8>,
}

/// 混合加密引擎
#[derive(Debug, Clone, Copy, Default)]
pub struct HybridCipher {
    key_size: SymmetricKeySize,
}

impl HybridCipher {
    pub fn new(key_size: SymmetricKeySize) -> Self {
        Self { key_size }
    }

    pub fn key_size(&self) -> SymmetricKeySize {
        self.key_size
    }

    /// 生成本条消息的对称密钥
    pub fn generate_key(&self) -> SymmetricKey {
        SymmetricKey::generate(self.key_size)
    }

    /// 用接收者公钥包裹对称密钥
    pub fn wrap_key(&self, recipient_pub: &[u8], key: &SymmetricKey) -> Result<Vec<u8>, CipherError> {
        let recipient = PublicKey::from_bytes(recipient_pub)
            .map_err(|e| CipherError::KeyFormat(e.to_string()))?;

        let mut seed = [0u8; ASYMMETRIC_KEY_LEN];
        seed.copy_from_slice(&crate::utils::random_bytes(ASYMMETRIC_KEY_LEN));
        let ephemeral_secret = StaticSecret::from(seed);
        let ephemeral_public = X25519PublicKey::from(&ephemeral_secret);

        let shared = ephemeral_secret.diffie_hellman(recipient.encryption_key());
        let kek = derive_wrap_key(shared.as_bytes(), &ephemeral_public, recipient.encryption_key())?;

        // 每个临时密钥只用一次，nonce 固定为全零
        let cipher = ChaCha20Poly1305::new(WrapKey::from_slice(&kek));
        let wrapped = cipher
            .encrypt(WrapNonce::from_slice(&[0u8; 12]), key.as_bytes())
            .map_err(|_| CipherError::CryptoOp)?;

        let mut result = Vec::with_capacity(ASYMMETRIC_KEY_LEN + wrapped.len());
        result.extend_from_slice(ephemeral_public.as_bytes());
        result.extend_from_slice(&wrapped);

        Ok(result)
    }

    /// 用接收者私钥解开对称密钥
    ///
    /// 任何失败（密钥不匹配、数据损坏、长度不对）都只返回 `CryptoOp`。
    pub fn unwrap_key(&self, recipient_priv: &[u8], wrapped_key: &[u8]) -> Result<SymmetricKey, CipherError> {
        let recipient = SecretKey::from_bytes(recipient_priv)
            .map_err(|e| CipherError::KeyFormat(e.to_string()))?;

        if wrapped_key.len() <= ASYMMETRIC_KEY_LEN + WRAP_TAG_LEN {
            return Err(CipherError::CryptoOp);
        }

        let (ephemeral_bytes, wrapped) = wrapped_key.split_at(ASYMMETRIC_KEY_LEN);
        let mut ephemeral = [0u8; ASYMMETRIC_KEY_LEN];
        ephemeral.copy_from_slice(ephemeral_bytes);
        let ephemeral_public = X25519PublicKey::from(ephemeral);

        let recipient_public = X25519PublicKey::from(recipient.encryption_key());
        let shared = recipient.encryption_key().diffie_hellman(&ephemeral_public);
        let kek = derive_wrap_key(shared.as_bytes(), &ephemeral_public, &recipient_public)?;

        let cipher = ChaCha20Poly1305::new(WrapKey::from_slice(&kek));
        let mut key_bytes = cipher
            .decrypt(WrapNonce::from_slice(&[0u8; 12]), wrapped)
            .map_err(|_| CipherError::CryptoOp)?;

        let key = SymmetricKey::from_bytes(&key_bytes);
        key_bytes.iter_mut().for_each(|b| *b = 0);
        key
    }

    /// 认证加密：返回随机 nonce、密文和认证标签
    pub fn seal(&self, key: &SymmetricKey, plaintext: &[u8]) -> Result<Sealed, CipherError> {
        let nonce = crate::utils::random_bytes(NONCE_LEN);
        let mut buffer = plaintext.to_vec();

        let tag = match key.size() {
            SymmetricKeySize::Aes128 => seal_in_place::<Aes128Gcm>(key.as_bytes(), &nonce, &mut buffer)?,
            SymmetricKeySize::Aes256 => seal_in_place::<Aes256Gcm>(key.as_bytes(), &nonce, &mut buffer)?,
        };

        Ok(Sealed {
            nonce,
            ciphertext: buffer,
            tag,
        })
    }

    /// 认证解密，标签不匹配时不返回任何明文
    pub fn open(
        &self,
        key: &SymmetricKey,
        nonce: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>, CipherError> {
        if nonce.len() != NONCE_LEN || tag.len() != TAG_LEN {
            return Err(CipherError::Integrity);
        }

        let mut buffer = ciphertext.to_vec();
        let result = match key.size() {
            SymmetricKeySize::Aes128 => open_in_place::<Aes128Gcm>(key.as_bytes(), nonce, &mut buffer, tag),
            SymmetricKeySize::Aes256 => open_in_place::<Aes256Gcm>(key.as_bytes(), nonce, &mut buffer, tag),
        };

        match result {
            Ok(()) => Ok(buffer),
            Err(e) => {
                buffer.iter_mut().for_each(|b| *b = 0);
                Err(e)
            }
        }
    }
}

/// 从 ECDH 共享密钥派生密钥加密密钥
fn derive_wrap_key(
    shared_secret: &[u8],
    ephemeral_public: &X25519PublicKey,
    recipient_public: &X25519PublicKey,
) -> Result<[u8; 32], CipherError> {
    let prk = hkdf::Salt::new(hkdf::HKDF_SHA256, WRAP_SALT).extract(shared_secret);
    let info: [&[u8]; 3] = [ephemeral_public.as_bytes(), recipient_public.as_bytes(), WRAP_INFO];

    let mut kek = [0u8; 32];
    prk.expand(&info, hkdf::HKDF_SHA256)
        .and_then(|okm| okm.fill(&mut kek))
        .map_err(|_| CipherError::CryptoOp)?;

    Ok(kek)
}

fn seal_in_place<C: KeyInit + AeadInPlace>(
    key: &[u8],
    nonce: &[u8],
    buffer: &mut [u8],
) -> Result<Vec<u8>, CipherError> {
    let cipher = C::new_from_slice(key).map_err(|_| CipherError::CryptoOp)?;
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(nonce), b"", buffer)
        .map_err(|_| CipherError::CryptoOp)?;

    Ok(tag.to_vec())
}

fn open_in_place<C: KeyInit + AeadInPlace>(
    key: &[u8],
    nonce: &[u8],
    buffer: &mut [u8],
    tag: &[u8],
) -> Result<(), CipherError> {
    let cipher = C::new_from_slice(key).map_err(|_| CipherError::Integrity)?;
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(nonce),
            b"",
            buffer,
            GenericArray::from_slice(tag),
        )
        .map_err(|_| CipherError::Integrity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    #[test]
    fn test_wrap_unwrap_key() {
        let recipient = KeyPair::generate().unwrap();

        for size in [SymmetricKeySize::Aes128, SymmetricKeySize::Aes256] {
            let engine = HybridCipher::new(size);
            let key = engine.generate_key();
            assert_eq!(key.as_bytes().len(), size.key_len());

            let wrapped = engine.wrap_key(&recipient.public.to_bytes(), &key).unwrap();
            assert_eq!(wrapped.len(), ASYMMETRIC_KEY_LEN + size.key_len() + WRAP_TAG_LEN);

            let unwrapped = engine.unwrap_key(&recipient.secret.to_bytes(), &wrapped).unwrap();
            assert_eq!(unwrapped, key);
        }
    }

    #[test]
    fn test_wrap_is_randomised() {
        let recipient = KeyPair::generate().unwrap();
        let engine = HybridCipher::default();
        let key = engine.generate_key();

        let a = engine.wrap_key(&recipient.public.to_bytes(), &key).unwrap();
        let b = engine.wrap_key(&recipient.public.to_bytes(), &key).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_unwrap_with_wrong_key_fails() {
        let recipient = KeyPair::generate().unwrap();
        let intruder = KeyPair::generate().unwrap();
        let engine = HybridCipher::default();
        let key = engine.generate_key();

        let wrapped = engine.wrap_key(&recipient.public.to_bytes(), &key).unwrap();
        assert_eq!(
            engine.unwrap_key(&intruder.secret.to_bytes(), &wrapped),
            Err(CipherError::CryptoOp)
        );

        // 截断或篡改也只报告 CryptoOp
        assert_eq!(
            engine.unwrap_key(&recipient.secret.to_bytes(), &wrapped[..20]),
            Err(CipherError::CryptoOp)
        );
        let mut corrupted = wrapped.clone();
        corrupted[40] ^= 0x01;
        assert_eq!(
            engine.unwrap_key(&recipient.secret.to_bytes(), &corrupted),
            Err(CipherError::CryptoOp)
        );
    }

    #[test]
    fn test_malformed_public_key() {
        let engine = HybridCipher::default();
        let key = engine.generate_key();

        let result = engine.wrap_key(b"not a key", &key);
        assert!(matches!(result, Err(CipherError::KeyFormat(_))));
    }

    #[test]
    fn test_seal_open() {
        for size in [SymmetricKeySize::Aes128, SymmetricKeySize::Aes256] {
            let engine = HybridCipher::new(size);
            let key = engine.generate_key();

            let sealed = engine.seal(&key, b"transfer 100").unwrap();
            assert_eq!(sealed.nonce.len(), NONCE_LEN);
            assert_eq!(sealed.tag.len(), TAG_LEN);
            assert_ne!(sealed.ciphertext, b"transfer 100".to_vec());

            let plaintext = engine
                .open(&key, &sealed.nonce, &sealed.ciphertext, &sealed.tag)
                .unwrap();
            assert_eq!(plaintext, b"transfer 100".to_vec());
        }
    }

    #[test]
    fn test_seal_uses_fresh_nonce() {
        let engine = HybridCipher::default();
        let key = engine.generate_key();

        let a = engine.seal(&key, b"same").unwrap();
        let b = engine.seal(&key, b"same").unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_open_rejects_tampering() {
        let engine = HybridCipher::default();
        let key = engine.generate_key();
        let sealed = engine.seal(&key, b"transfer 100").unwrap();

        let mut ciphertext = sealed.ciphertext.clone();
        ciphertext[0] ^= 0x80;
        assert_eq!(
            engine.open(&key, &sealed.nonce, &ciphertext, &sealed.tag),
            Err(CipherError::Integrity)
        );

        let mut tag = sealed.tag.clone();
        tag[TAG_LEN - 1] ^= 0x01;
        assert_eq!(
            engine.open(&key, &sealed.nonce, &sealed.ciphertext, &tag),
            Err(CipherError::Integrity)
        );

        // 长度不对的 nonce / tag 不能 panic
        assert_eq!(
            engine.open(&key, &sealed.nonce[..4], &sealed.ciphertext, &sealed.tag),
            Err(CipherError::Integrity)
        );
        assert_eq!(
            engine.open(&key, &sealed.nonce, &sealed.ciphertext, &[]),
            Err(CipherError::Integrity)
        );

        let other = engine.generate_key();
        assert_eq!(
            engine.open(&other, &sealed.nonce, &sealed.ciphertext, &sealed.tag),
            Err(CipherError::Integrity)
        );
    }
}
