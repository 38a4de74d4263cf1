use crate::crypto::{KeyError, PublicKey, SecretKey};
use ed25519_dalek::{ExpandedSecretKey, Signature, Verifier};
use thiserror::Error;

/// Ed25519 签名长度
pub const SIGNATURE_LEN: usize = 64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Invalid key: {0}")]
    InvalidKey(#[from] KeyError),

    #[error("Verification failed: {0}")]
    VerificationFailed(String),
}

/// 计算消息摘要（SHA-256）
pub fn hash_message(message: &[u8]) -> Vec<u8> {
    let digest = ring::digest::digest(&ring::digest::SHA256, message);
    digest.as_ref().to_vec()
}

/// 对消息摘要签名
pub fn sign(sender_priv: &[u8], message: &[u8]) -> Result<Vec<u8>, SignatureError> {
    let secret_key = SecretKey::from_bytes(sender_priv)?;
    let signing_key = secret_key.signing_key();

    let expanded_key = ExpandedSecretKey::from(signing_key);
    let public_key = ed25519_dalek::PublicKey::from(signing_key);

    let digest = hash_message(message);
    Ok(expanded_key.sign(&digest, &public_key).to_bytes().to_vec())
}

/// 用公钥验证签名
pub fn verify(sender_pub: &[u8], message: &[u8], signature: &[u8]) -> Result<(), SignatureError> {
    let public_key = PublicKey::from_bytes(sender_pub)?;

    if signature.len() != SIGNATURE_LEN {
        return Err(SignatureError::VerificationFailed("Invalid signature length".to_string()));
    }

    let signature = Signature::try_from(signature)
        .map_err(|e| SignatureError::VerificationFailed(e.to_string()))?;

    let digest = hash_message(message);
    public_key
        .signing_key()
        .verify(&digest, &signature)
        .map_err(|_| SignatureError::VerificationFailed("Signature mismatch".to_string()))
}
