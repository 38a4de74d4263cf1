use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Invalid role name: {0:?}")]
    InvalidRole(String),

    #[error("Invalid key identifier: {0:?}")]
    InvalidKeyId(String),
}

/// 参与方角色
///
/// 角色名只允许小写字母、数字和 `-`，它会直接出现在密钥文件名和邮箱文件名里。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Role(String);

impl Role {
    /// 创建角色
    pub fn new(name: impl Into<String>) -> Result<Self, IdentityError> {
        let name = name.into();
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');

        if valid {
            Ok(Self(name))
        } else {
            Err(IdentityError::InvalidRole(name))
        }
    }

    /// 客户
    pub fn customer() -> Self {
        Self("customer".to_string())
    }

    /// 银行
    pub fn bank() -> Self {
        Self("bank".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Role {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.trim().to_lowercase())
    }
}

impl TryFrom<String> for Role {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.0
    }
}

/// Which half of a role's key pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyHalf {
    Public,
    Private,
}

impl KeyHalf {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyHalf::Public => "public",
            KeyHalf::Private => "private",
        }
    }
}

impl fmt::Display for KeyHalf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of one key, rendered as `<role>_<half>` (e.g. `bank_public`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId {
    pub role: Role,
    pub half: KeyHalf,
}

impl KeyId {
    pub fn new(role: Role, half: KeyHalf) -> Self {
        Self { role, half }
    }

    pub fn public(role: &Role) -> Self {
        Self::new(role.clone(), KeyHalf::Public)
    }

    pub fn private(role: &Role) -> Self {
        Self::new(role.clone(), KeyHalf::Private)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.role, self.half)
    }
}

impl FromStr for KeyId {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // 兼容旧的 "bank_public.pem" 写法
        let s = s.strip_suffix(".pem").unwrap_or(s);

        let (role, half) = s
            .rsplit_once('_')
            .ok_or_else(|| IdentityError::InvalidKeyId(s.to_string()))?;

        let half = match half {
            "public" => KeyHalf::Public,
            "private" => KeyHalf::Private,
            _ => return Err(IdentityError::InvalidKeyId(s.to_string())),
        };

        let role = Role::new(role).map_err(|_| IdentityError::InvalidKeyId(s.to_string()))?;

        Ok(Self { role, half })
    }
}
