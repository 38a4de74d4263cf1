mod nonce_store;
mod key_store;
mod revocation;
mod mailbox;

pub use nonce_store::{FileNonceStore, MemoryNonceStore, NonceMap, NonceStore};
pub use key_store::{FileKeyStore, KeyStore, MemoryKeyStore};
pub use revocation::{FileRevocationList, RevocationList, RevocationOracle};
pub use mailbox::Mailbox;

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),
}

/// 新文件的访问权限
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FileMode {
    /// 0644
    Shared,
    /// 0600，用于私钥
    Private,
}

/// 原子写入：先写同目录下唯一命名的临时文件再改名，读者不会看到写了一半的内容
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    write_atomic_with_mode(path, contents, FileMode::Shared)
}

/// 与 [`write_atomic`] 相同，但文件从创建起就只有所有者可读写
pub(crate) fn write_private(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    write_atomic_with_mode(path, contents, FileMode::Private)
}

fn write_atomic_with_mode(path: &Path, contents: &[u8], mode: FileMode) -> Result<(), StorageError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    // 权限必须在写入内容之前设置
    set_mode(tmp.as_file(), mode)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StorageError::IoError(e.error))?;

    Ok(())
}

#[cfg(unix)]
fn set_mode(file: &File, mode: FileMode) -> Result<(), StorageError> {
    use std::os::unix::fs::PermissionsExt;

    let bits = match mode {
        FileMode::Shared => 0o644,
        FileMode::Private => 0o600,
    };
    file.set_permissions(std::fs::Permissions::from_mode(bits))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_mode(_file: &File, _mode: FileMode) -> Result<(), StorageError> {
    Ok(())
}

/// `<file>.lock` 上的排他文件锁，析构时释放
pub(crate) struct FileLock {
    file: File,
}

impl FileLock {
    /// 阻塞直到拿到锁；锁文件及其目录不存在时创建
    pub(crate) fn acquire(lock_path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = lock_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(lock_path)?;
        file.lock_exclusive()
            .map_err(|e| StorageError::LockError(format!("{}: {}", lock_path.display(), e)))?;

        Ok(Self { file })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // 文件句柄关闭时锁也会释放，这里显式解锁
        let _ = self.file.unlock();
    }
}

/// `messages/used_nonces.json` -> `messages/used_nonces.json.<suffix>`
pub(crate) fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}
