use crate::storage::{sibling_path, write_atomic, FileLock, StorageError};
use log::debug;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// base64 nonce -> first-seen timestamp
pub type NonceMap = BTreeMap<String, u64>;

/// Backing store for the nonce ledger.
///
/// `transact` runs one read-modify-write of the whole map. Implementations
/// must make it atomic with respect to every other caller sharing the same
/// backing data, including callers in other processes.
pub trait NonceStore: Send + Sync {
    fn transact(&self, op: &mut dyn FnMut(&mut NonceMap) -> bool) -> Result<bool, StorageError>;
}

/// 内存中的 nonce 存储
#[derive(Debug, Default)]
pub struct MemoryNonceStore {
    entries: Mutex<NonceMap>,
}

impl MemoryNonceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前记录数
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NonceStore for MemoryNonceStore {
    fn transact(&self, op: &mut dyn FnMut(&mut NonceMap) -> bool) -> Result<bool, StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::LockError("nonce store mutex poisoned".to_string()))?;

        Ok(op(&mut entries))
    }
}

/// 基于 JSON 文件的 nonce 存储
///
/// 每次事务都持有 `<file>.lock` 上的排他文件锁，进程内再加一把互斥锁。
#[derive(Debug)]
pub struct FileNonceStore {
    path: PathBuf,
    lock_path: PathBuf,
    guard: Mutex<()>,
}

impl FileNonceStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let lock_path = sibling_path(&path, "lock");

        Self {
            path,
            lock_path,
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<NonceMap, StorageError> {
        if !self.path.exists() {
            return Ok(NonceMap::new());
        }

        let mut content = String::new();
        File::open(&self.path)?.read_to_string(&mut content)?;

        if content.trim().is_empty() {
            return Ok(NonceMap::new());
        }

        Ok(serde_json::from_str(&content)?)
    }

    /// 在已持有文件锁的前提下执行一次读-改-写
    fn apply_locked(&self, op: &mut dyn FnMut(&mut NonceMap) -> bool) -> Result<bool, StorageError> {
        let mut entries = self.read_entries()?;
        let before = entries.clone();

        let outcome = op(&mut entries);

        if entries != before {
            let content = serde_json::to_string_pretty(&entries)?;
            write_atomic(&self.path, content.as_bytes())?;
            debug!("Nonce store {} now holds {} entries", self.path.display(), entries.len());
        }

        Ok(outcome)
    }
}

impl NonceStore for FileNonceStore {
    fn transact(&self, op: &mut dyn FnMut(&mut NonceMap) -> bool) -> Result<bool, StorageError> {
        let _guard = self
            .guard
            .lock()
            .map_err(|_| StorageError::LockError("nonce store mutex poisoned".to_string()))?;

        let _lock = FileLock::acquire(&self.lock_path)?;
        self.apply_locked(op)
    }
}
