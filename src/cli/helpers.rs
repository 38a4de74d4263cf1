use crate::identity::Role;
use crate::message::Envelope;
use crate::utils::format_timestamp;
use colored::*;
use indoc::indoc;

/// 交互菜单（五个选项）
pub fn format_menu() -> String {
    let menu = indoc! {"
        Secure Messaging CLI
        1. Customer sends message to Bank
        2. Bank reads message
        3. Bank replies to Customer
        4. Customer reads Bank reply
        5. Exit"};

    menu.bold().to_string()
}

/// 公钥指纹：SHA-256 前 8 字节的十六进制
pub fn format_fingerprint(public_key: &[u8]) -> String {
    let digest = crate::crypto::hash_message(public_key);
    hex::encode(&digest[..8])
}

/// 信封摘要，只显示长度和时间，不显示内容
pub fn format_envelope_summary(envelope: &Envelope) -> String {
    format!(
        "  {} {} | {} {} | {} {}",
        "ciphertext:".dimmed(),
        format_bytes(envelope.ciphertext().len() as u64),
        "nonce:".dimmed(),
        hex::encode(envelope.nonce()).yellow(),
        "sent:".dimmed(),
        format_timestamp(envelope.timestamp()),
    )
}

/// 格式化收到的消息
pub fn format_received(receiver: &Role, sender: &Role, plaintext: &str) -> String {
    format!(
        "{} Received message from {}: {}",
        format!("[{}]", receiver).bold(),
        sender.to_string().yellow(),
        plaintext.green()
    )
}

/// 格式化表格
pub fn format_table(headers: &[&str], rows: &[Vec<String>], widths: &[usize]) -> String {
    let mut result = String::new();

    let header_row = headers.iter()
        .zip(widths.iter())
        .map(|(h, w)| format!("{:width$}", h, width = *w))
        .collect::<Vec<_>>()
        .join(" | ");

    result.push_str(&header_row.bold().to_string());
    result.push('\n');

    let separator = widths.iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>()
        .join("-+-");

    result.push_str(&separator);
    result.push('\n');

    for row in rows {
        let data_row = row.iter()
            .zip(widths.iter())
            .map(|(cell, w)| format!("{:width$}", cell, width = *w))
            .collect::<Vec<_>>()
            .join(" | ");

        result.push_str(&data_row);
        result.push('\n');
    }

    result
}

/// 格式化字节大小
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// 格式化持续时间
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let seconds = seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(12), "12 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(60), "1m 0s");
        assert_eq!(format_duration(3725), "1h 2m 5s");
    }

    #[test]
    fn test_format_table() {
        colored::control::set_override(false);

        let rows = vec![vec!["bank".to_string(), "present".to_string()]];
        let table = format_table(&["Role", "Keys"], &rows, &[6, 7]);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[0], "Role   | Keys   ");
        assert_eq!(lines[1], "-------+--------");
        assert_eq!(lines[2], "bank   | present");
    }

    #[test]
    fn test_menu_lists_five_options() {
        colored::control::set_override(false);

        let menu = format_menu();
        assert!(menu.starts_with("Secure Messaging CLI"));
        assert!(menu.contains("5. Exit"));
    }

    #[test]
    fn test_fingerprint_is_stable() {
        assert_eq!(format_fingerprint(b"abc"), "ba7816bf8f01cfea");
    }
}
