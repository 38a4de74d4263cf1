use crate::identity::Role;
use crate::message::Envelope;
use crate::storage::{write_atomic, StorageError};
use log::debug;
use std::path::{Path, PathBuf};

/// 每个接收者一个信箱：`<messages_dir>/to_<role>.json`，只保存最新一封
#[derive(Debug, Clone)]
pub struct Mailbox {
    dir: PathBuf,
}

impl Mailbox {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, recipient: &Role) -> PathBuf {
        self.dir.join(format!("to_{}.json", recipient))
    }

    /// 投递信封，覆盖接收者信箱中的旧信封
    pub fn deliver(&self, recipient: &Role, envelope: &Envelope) -> Result<(), StorageError> {
        let path = self.path_for(recipient);
        let content = serde_json::to_string_pretty(envelope)?;
        write_atomic(&path, content.as_bytes())?;

        debug!("Delivered envelope to {}", path.display());
        Ok(())
    }

    /// 取出接收者信箱中的信封，没有信件时返回 `None`
    ///
    /// 取信不会清空信箱；重复打开同一封信由 nonce 记录拦截。
    pub fn fetch(&self, recipient: &Role) -> Result<Option<Envelope>, StorageError> {
        let path = self.path_for(recipient);

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(serde_json::from_str(&content)?))
    }
}
