pub mod config;
pub mod logger;
pub mod time;

pub use config::{Config, ConfigError, ProtocolConfig, DEFAULT_EXPIRY_WINDOW_SECS};
pub use logger::{parse_log_level, setup_logger};
pub use time::{ManualTimeSource, SystemTimeSource, TimeSource};

use rand::RngCore;

/// 获取应用程序版本
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// 从系统 CSPRNG 取随机字节
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// 格式化时间戳为人类可读时间
pub fn format_timestamp(timestamp: u64) -> String {
    match chrono::DateTime::from_timestamp(timestamp as i64, 0) {
        Some(datetime) => datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => format!("@{}", timestamp),
    }
}
