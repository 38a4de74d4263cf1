use crate::crypto::SymmetricKeySize;
use serde::{Deserialize, Serialize};
use std::fs::{File, create_dir_all};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 默认消息有效期（秒）
pub const DEFAULT_EXPIRY_WINDOW_SECS: u64 = 60;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// 应用程序配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 密钥目录
    pub keys_dir: PathBuf,

    /// 消息目录
    pub messages_dir: PathBuf,

    /// 吊销列表文件
    pub revoked_keys_file: PathBuf,

    /// 已使用 nonce 记录文件
    pub used_nonces_file: PathBuf,

    /// 对称密钥长度
    pub symmetric_key_size: SymmetricKeySize,

    /// 消息有效期（秒），同时也是 nonce 记录的保留时间
    pub expiry_window_secs: u64,

    /// 日志级别
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keys_dir: PathBuf::from("keys"),
            messages_dir: PathBuf::from("messages"),
            revoked_keys_file: PathBuf::from("keys").join("revoked_keys.json"),
            used_nonces_file: PathBuf::from("messages").join("used_nonces.json"),
            symmetric_key_size: SymmetricKeySize::default(),
            expiry_window_secs: DEFAULT_EXPIRY_WINDOW_SECS,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// 从文件加载配置，文件不存在时返回默认配置
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let mut file = File::open(path)?;
        let mut content = String::new();
        file.read_to_string(&mut content)?;

        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// 保存配置到文件
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;

        Ok(())
    }

    /// 检查配置取值
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.expiry_window_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "expiry_window_secs",
                reason: "must be greater than zero".to_string(),
            });
        }

        crate::utils::logger::parse_log_level(&self.log_level).map_err(|reason| {
            ConfigError::InvalidValue {
                field: "log_level",
                reason,
            }
        })?;

        Ok(())
    }

    /// 确保密钥目录和消息目录存在
    pub fn ensure_dirs(&self) -> Result<(), ConfigError> {
        create_dir_all(&self.keys_dir)?;
        create_dir_all(&self.messages_dir)?;
        Ok(())
    }

    /// 把所有路径挂到 `base` 目录下
    pub fn rooted_at(mut self, base: &Path) -> Self {
        self.keys_dir = base.join(&self.keys_dir);
        self.messages_dir = base.join(&self.messages_dir);
        self.revoked_keys_file = base.join(&self.revoked_keys_file);
        self.used_nonces_file = base.join(&self.used_nonces_file);
        self
    }

    /// 协议核心使用的参数
    pub fn protocol(&self) -> ProtocolConfig {
        ProtocolConfig {
            symmetric_key_size: self.symmetric_key_size,
            expiry_window_secs: self.expiry_window_secs,
        }
    }
}

/// Parameters handed to the protocol components at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolConfig {
    pub symmetric_key_size: SymmetricKeySize,
    pub expiry_window_secs: u64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            symmetric_key_size: SymmetricKeySize::default(),
            expiry_window_secs: DEFAULT_EXPIRY_WINDOW_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(&dir.path().join("missing.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.expiry_window_secs, 60);
        assert_eq!(config.symmetric_key_size, SymmetricKeySize::Aes128);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.symmetric_key_size = SymmetricKeySize::Aes256;
        config.expiry_window_secs = 120;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.protocol().expiry_window_secs, 120);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "expiry_window_secs": 30 }"#).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.expiry_window_secs, 30);
        assert_eq!(loaded.keys_dir, PathBuf::from("keys"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        std::fs::write(&path, r#"{ "expiry_window_secs": 0 }"#).unwrap();
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::InvalidValue { field: "expiry_window_secs", .. })
        ));

        std::fs::write(&path, r#"{ "log_level": "loud" }"#).unwrap();
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::InvalidValue { field: "log_level", .. })
        ));
    }
}
