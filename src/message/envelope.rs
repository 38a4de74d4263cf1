use crate::message::MessageError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

/// One self-contained encrypted, signed and timestamped message.
///
/// Binary fields are always non-empty; an `Envelope` that exists has passed
/// that check, whether it was built locally or decoded from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EnvelopeRecord", into = "EnvelopeRecord")]
pub struct Envelope {
    wrapped_key: Vec<u8>,
    nonce: Vec<u8>,
    ciphertext: Vec<u8>,
    tag: Vec<u8>,
    signature: Vec<u8>,
    timestamp: u64,
}

impl Envelope {
    pub fn new(
        wrapped_key: Vec<u8>,
        nonce: Vec<u8>,
        ciphertext: Vec<u8>,
        tag: Vec<u8>,
        signature: Vec<u8>,
        timestamp: u64,
    ) -> Result<Self, MessageError> {
        let fields: [(&str, &[u8]); 5] = [
            ("enc_aes_key", wrapped_key.as_slice()),
            ("nonce", nonce.as_slice()),
            ("ciphertext", ciphertext.as_slice()),
            ("tag", tag.as_slice()),
            ("signature", signature.as_slice()),
        ];

        if let Some((name, _)) = fields.iter().find(|(_, value)| value.is_empty()) {
            return Err(MessageError::Encoding(format!("field {} is empty", name)));
        }

        Ok(Self {
            wrapped_key,
            nonce,
            ciphertext,
            tag,
            signature,
            timestamp,
        })
    }

    /// 被接收者公钥包裹的对称密钥
    pub fn wrapped_key(&self) -> &[u8] {
        &self.wrapped_key
    }

    pub fn nonce(&self) -> &[u8] {
        &self.nonce
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn tag(&self) -> &[u8] {
        &self.tag
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// 发送方生成消息时的 Unix 时间（秒）
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// 序列化为 JSON 线格式
    pub fn to_json(&self) -> Result<String, MessageError> {
        serde_json::to_string_pretty(self).map_err(|e| MessageError::Encoding(e.to_string()))
    }

    /// 从 JSON 线格式解析
    pub fn from_json(json: &str) -> Result<Self, MessageError> {
        serde_json::from_str(json).map_err(|e| MessageError::Encoding(e.to_string()))
    }
}

/// Wire representation: binary fields as standard base64 strings.
#[derive(Debug, Serialize, Deserialize)]
struct EnvelopeRecord {
    enc_aes_key: String,
    nonce: String,
    ciphertext: String,
    tag: String,
    signature: String,
    timestamp: u64,
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>, MessageError> {
    STANDARD
        .decode(value)
        .map_err(|e| MessageError::Encoding(format!("field {}: {}", name, e)))
}

impl TryFrom<EnvelopeRecord> for Envelope {
    type Error = MessageError;

    fn try_from(record: EnvelopeRecord) -> Result<Self, Self::Error> {
        Envelope::new(
            decode_field("enc_aes_key", &record.enc_aes_key)?,
            decode_field("nonce", &record.nonce)?,
            decode_field("ciphertext", &record.ciphertext)?,
            decode_field("tag", &record.tag)?,
            decode_field("signature", &record.signature)?,
            record.timestamp,
        )
    }
}

impl From<Envelope> for EnvelopeRecord {
    fn from(envelope: Envelope) -> Self {
        Self {
            enc_aes_key: STANDARD.encode(&envelope.wrapped_key),
            nonce: STANDARD.encode(&envelope.nonce),
            ciphertext: STANDARD.encode(&envelope.ciphertext),
            tag: STANDARD.encode(&envelope.tag),
            signature: STANDARD.encode(&envelope.signature),
            timestamp: envelope.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Envelope {
        Envelope::new(
            vec![1; 64],
            vec![2; 12],
            b"hello".to_vec(),
            vec![3; 16],
            vec![4; 64],
            1_700_000_000,
        )
        .unwrap()
    }

    #[test]
    fn test_wire_field_names() {
        let json = sample().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        for field in ["enc_aes_key", "nonce", "ciphertext", "tag", "signature"] {
            assert!(value[field].is_string(), "missing {}", field);
        }
        assert_eq!(value["ciphertext"], "aGVsbG8=");
        assert_eq!(value["timestamp"], 1_700_000_000u64);
    }

    #[test]
    fn test_json_round_trip() {
        let envelope = sample();
        let decoded = Envelope::from_json(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_empty_field_rejected() {
        let result = Envelope::new(vec![1], vec![], vec![1], vec![1], vec![1], 0);
        assert!(matches!(result, Err(MessageError::Encoding(ref reason)) if reason.contains("nonce")));

        let json = r#"{"enc_aes_key":"AQ==","nonce":"AQ==","ciphertext":"","tag":"AQ==","signature":"AQ==","timestamp":1}"#;
        assert!(matches!(Envelope::from_json(json), Err(MessageError::Encoding(_))));
    }

    #[test]
    fn test_bad_base64_and_missing_fields() {
        let json = r#"{"enc_aes_key":"@@@","nonce":"AQ==","ciphertext":"AQ==","tag":"AQ==","signature":"AQ==","timestamp":1}"#;
        assert!(matches!(Envelope::from_json(json), Err(MessageError::Encoding(_))));

        let json = r#"{"nonce":"AQ==","ciphertext":"AQ==","tag":"AQ==","signature":"AQ==","timestamp":1}"#;
        assert!(matches!(Envelope::from_json(json), Err(MessageError::Encoding(_))));

        let json = r#"{"enc_aes_key":"AQ==","nonce":"AQ==","ciphertext":"AQ==","tag":"AQ==","signature":"AQ==","timestamp":-5}"#;
        assert!(Envelope::from_json(json).is_err());
    }
}
