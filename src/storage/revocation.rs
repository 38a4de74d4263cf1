use crate::identity::KeyId;
use crate::storage::{sibling_path, write_atomic, FileLock, StorageError};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Answers whether a key identifier has been revoked.
pub trait RevocationOracle: Send + Sync {
    fn is_revoked(&self, key_id: &str) -> bool;
}

/// `customer_public.pem` 与 `customer_public` 视为同一个标识
fn normalize(key_id: &str) -> String {
    match key_id.parse::<KeyId>() {
        Ok(id) => id.to_string(),
        Err(_) => key_id.trim().to_string(),
    }
}

/// 内存中的吊销集合，默认为空
#[derive(Debug, Default)]
pub struct RevocationList {
    revoked: RwLock<HashSet<String>>,
}

impl RevocationList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revoke(&self, key_id: &str) {
        if let Ok(mut revoked) = self.revoked.write() {
            revoked.insert(normalize(key_id));
        }
    }

    pub fn reinstate(&self, key_id: &str) {
        if let Ok(mut revoked) = self.revoked.write() {
            revoked.remove(&normalize(key_id));
        }
    }
}

impl<S: AsRef<str>> FromIterator<S> for RevocationList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            revoked: RwLock::new(iter.into_iter().map(|id| normalize(id.as_ref())).collect()),
        }
    }
}

impl RevocationOracle for RevocationList {
    fn is_revoked(&self, key_id: &str) -> bool {
        match self.revoked.read() {
            Ok(revoked) => revoked.contains(&normalize(key_id)),
            // 锁中毒时按已吊销处理
            Err(_) => true,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RevocationFile {
    #[serde(default)]
    revoked: Vec<String>,
}

/// 基于 JSON 文件的吊销列表：`{"revoked": ["bank_public", ...]}`
///
/// 每次查询都重新读取文件，其他进程的修改立即生效。修改时持有
/// `<file>.lock` 上的排他锁。
#[derive(Debug, Clone)]
pub struct FileRevocationList {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileRevocationList {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let lock_path = sibling_path(&path, "lock");

        Self { path, lock_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 当前被吊销的标识（已规范化、去重）
    pub fn revoked(&self) -> Result<BTreeSet<String>, StorageError> {
        if !self.path.exists() {
            return Ok(BTreeSet::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeSet::new());
        }

        let file: RevocationFile = serde_json::from_str(&content)?;
        Ok(file.revoked.iter().map(|id| normalize(id)).collect())
    }

    /// 吊销一个标识，返回是否为新增
    pub fn revoke(&self, key_id: &str) -> Result<bool, StorageError> {
        let _lock = FileLock::acquire(&self.lock_path)?;
        let mut revoked = self.revoked()?;
        let added = revoked.insert(normalize(key_id));

        if added {
            self.write(&revoked)?;
            info!("Revoked {}", normalize(key_id));
        }

        Ok(added)
    }

    /// 恢复一个标识，返回它之前是否处于吊销状态
    pub fn reinstate(&self, key_id: &str) -> Result<bool, StorageError> {
        let _lock = FileLock::acquire(&self.lock_path)?;
        let mut revoked = self.revoked()?;
        let removed = revoked.remove(&normalize(key_id));

        if removed {
            self.write(&revoked)?;
            info!("Reinstated {}", normalize(key_id));
        }

        Ok(removed)
    }

    fn write(&self, revoked: &BTreeSet<String>) -> Result<(), StorageError> {
        let file = RevocationFile {
            revoked: revoked.iter().cloned().collect(),
        };
        let content = serde_json::to_string_pretty(&file)?;
        write_atomic(&self.path, content.as_bytes())
    }
}

impl RevocationOracle for FileRevocationList {
    fn is_revoked(&self, key_id: &str) -> bool {
        match self.revoked() {
            Ok(revoked) => revoked.contains(&normalize(key_id)),
            Err(e) => {
                // 无法读取吊销列表时拒绝操作
                error!("Failed to read revocation list {}: {}", self.path.display(), e);
                true
            }
        }
    }
}
