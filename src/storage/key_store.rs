use crate::crypto::KeyPair;
use crate::identity::{KeyHalf, KeyId, Role};
use crate::storage::{write_atomic, write_private, StorageError};
use log::info;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Key material accessor: raw key bytes for one half of a role's key pair.
pub trait KeyStore: Send + Sync {
    /// Fails with [`StorageError::KeyNotFound`] when the key is absent.
    fn load_key(&self, role: &Role, half: KeyHalf) -> Result<Vec<u8>, StorageError>;
}

/// 文件密钥存储：`<keys_dir>/<role>_<half>.key`
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    dir: PathBuf,
}

impl FileKeyStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 密钥文件路径
    pub fn key_path(&self, key_id: &KeyId) -> PathBuf {
        self.dir.join(format!("{}.key", key_id))
    }

    /// 检查角色的密钥对是否齐全
    pub fn has_keypair(&self, role: &Role) -> bool {
        self.key_path(&KeyId::public(role)).exists() && self.key_path(&KeyId::private(role)).exists()
    }

    /// 为角色生成新的密钥对并覆盖旧文件，返回公钥字节
    pub fn generate(&self, role: &Role) -> Result<Vec<u8>, StorageError> {
        let keypair = KeyPair::generate().map_err(|e| StorageError::KeyGenerationFailed(e.to_string()))?;

        let private_path = self.key_path(&KeyId::private(role));
        write_private(&private_path, &keypair.secret.to_bytes())?;

        let public_bytes = keypair.public.to_bytes();
        write_atomic(&self.key_path(&KeyId::public(role)), &public_bytes)?;

        info!("Generated key pair for {}", role);
        Ok(public_bytes)
    }

    /// 密钥对缺失时才生成，返回是否新生成
    pub fn ensure_keypair(&self, role: &Role) -> Result<bool, StorageError> {
        if self.has_keypair(role) {
            return Ok(false);
        }

        self.generate(role)?;
        Ok(true)
    }
}

impl KeyStore for FileKeyStore {
    fn load_key(&self, role: &Role, half: KeyHalf) -> Result<Vec<u8>, StorageError> {
        let key_id = KeyId::new(role.clone(), half);
        let path = self.key_path(&key_id);

        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::KeyNotFound(key_id.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}

/// 内存密钥存储
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    keys: RwLock<HashMap<KeyId, Vec<u8>>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 放入一个角色的完整密钥对
    pub fn insert_keypair(&self, role: &Role, keypair: &KeyPair) {
        self.insert(KeyId::public(role), keypair.public.to_bytes());
        self.insert(KeyId::private(role), keypair.secret.to_bytes());
    }

    pub fn insert(&self, key_id: KeyId, bytes: Vec<u8>) {
        if let Ok(mut keys) = self.keys.write() {
            keys.insert(key_id, bytes);
        }
    }

    /// 生成并放入一个新的密钥对
    pub fn generate(&self, role: &Role) -> Result<KeyPair, StorageError> {
        let keypair = KeyPair::generate().map_err(|e| StorageError::KeyGenerationFailed(e.to_string()))?;
        self.insert_keypair(role, &keypair);
        Ok(keypair)
    }
}

impl KeyStore for MemoryKeyStore {
    fn load_key(&self, role: &Role, half: KeyHalf) -> Result<Vec<u8>, StorageError> {
        let key_id = KeyId::new(role.clone(), half);
        let keys = self
            .keys
            .read()
            .map_err(|_| StorageError::LockError("key store lock poisoned".to_string()))?;

        keys.get(&key_id)
            .cloned()
            .ok_or_else(|| StorageError::KeyNotFound(key_id.to_string()))
    }
}
