use crate::identity::{KeyId, Role};
use crate::message::{MessageError, SecureChannel};
use crate::storage::{FileKeyStore, FileRevocationList};
use crate::utils::Config;
use super::helpers;

use log::{info, error};
use colored::*;
use indoc::indoc;

/// 命令结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Success(String),
    Info(String),
    Warning(String),
    Error(String),
    Exit,
}

/// 命令类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Menu,
    Exit,
    Keygen,
    Send,
    Read,
    Revoke,
    Reinstate,
    Status,
}

/// 命令上下文
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: Config,
    pub channel: SecureChannel,
    pub keys: FileKeyStore,
    pub revocations: FileRevocationList,
    pub args: Vec<String>,
}

impl CommandContext {
    /// 按配置创建上下文，所有存储都基于文件
    pub fn from_config(config: Config) -> Self {
        Self {
            channel: SecureChannel::from_config(&config),
            keys: FileKeyStore::new(&config.keys_dir),
            revocations: FileRevocationList::new(&config.revoked_keys_file),
            config,
            args: Vec::new(),
        }
    }

    /// 复制上下文并替换参数
    pub fn with_args(&self, args: Vec<String>) -> Self {
        Self {
            args,
            ..self.clone()
        }
    }

    fn role_arg(&self, index: usize, usage: &str) -> Result<Role, CommandResult> {
        let raw = self
            .args
            .get(index)
            .ok_or_else(|| CommandResult::Error(usage.to_string()))?;

        raw.parse()
            .map_err(|e| CommandResult::Error(format!("{}", e)))
    }

    fn key_id_arg(&self, usage: &str) -> Result<KeyId, CommandResult> {
        let raw = self
            .args
            .first()
            .ok_or_else(|| CommandResult::Error(usage.to_string()))?;

        raw.parse()
            .map_err(|e| CommandResult::Error(format!("{}", e)))
    }
}

impl Command {
    /// 执行命令
    pub fn execute(&self, context: &CommandContext) -> CommandResult {
        let result = match self {
            Command::Help => Ok(Self::help()),
            Command::Menu => Ok(CommandResult::Info(helpers::format_menu())),
            Command::Exit => Ok(CommandResult::Exit),
            Command::Keygen => Self::keygen(context),
            Command::Send => Self::send(context),
            Command::Read => Self::read(context),
            Command::Revoke => Self::revoke(context),
            Command::Reinstate => Self::reinstate(context),
            Command::Status => Ok(Self::status(context)),
        };

        result.unwrap_or_else(|failure| failure)
    }

    /// 帮助命令
    fn help() -> CommandResult {
        let help_text = indoc! {"
            Available commands:

            1-5                          - Run an option from the menu
            /menu                        - Show the menu again
            /help                        - Show this help message
            /exit, /quit                 - Exit the application
            /keygen <role>               - Generate (or replace) a role's key pair
            /send <from> <to> <message>  - Encrypt, sign and deliver a message
            /read <as> <from>            - Verify and decrypt the waiting message
            /revoke <key-id>             - Revoke a key, e.g. bank_public
            /reinstate <key-id>          - Lift a revocation
            /status                      - Show keys, mailboxes and revocations
        "};

        CommandResult::Info(help_text.to_string())
    }

    /// 生成密钥对
    fn keygen(context: &CommandContext) -> Result<CommandResult, CommandResult> {
        let role = context.role_arg(0, "Usage: /keygen <role>")?;

        match context.keys.generate(&role) {
            Ok(public_key) => Ok(CommandResult::Success(format!(
                "Generated key pair for {} (fingerprint {})",
                role.to_string().green(),
                helpers::format_fingerprint(&public_key).cyan()
            ))),
            Err(e) => {
                error!("Key generation for {} failed: {}", role, e);
                Err(CommandResult::Error(format!("Key generation failed: {}", e)))
            }
        }
    }

    /// 发送消息命令
    fn send(context: &CommandContext) -> Result<CommandResult, CommandResult> {
        const USAGE: &str = "Usage: /send <from> <to> <message>";

        if context.args.len() < 3 {
            return Err(CommandResult::Error(USAGE.to_string()));
        }

        let from = context.role_arg(0, USAGE)?;
        let to = context.role_arg(1, USAGE)?;
        let message_text = context.args[2..].join(" ");

        match context.channel.send(&from, &to, &message_text) {
            Ok(envelope) => {
                info!("Message from {} delivered to {}", from, to);
                Ok(CommandResult::Success(format!(
                    "[{}] Message sent to {}.\n{}",
                    from,
                    to,
                    helpers::format_envelope_summary(&envelope)
                )))
            }
            Err(e) => Err(Self::rejected(&from, "Cannot send message", &e)),
        }
    }

    /// 读取消息命令
    fn read(context: &CommandContext) -> Result<CommandResult, CommandResult> {
        const USAGE: &str = "Usage: /read <as> <from>";

        let receiver = context.role_arg(0, USAGE)?;
        let sender = context.role_arg(1, USAGE)?;

        match context.channel.receive(&receiver, &sender) {
            Ok(Some(plaintext)) => Ok(CommandResult::Success(helpers::format_received(
                &receiver, &sender, &plaintext,
            ))),
            Ok(None) => Ok(CommandResult::Warning(format!(
                "[{}] No message found for {} to read.",
                receiver, receiver
            ))),
            Err(e) => Err(Self::rejected(&receiver, "Message rejected", &e)),
        }
    }

    /// 吊销密钥
    fn revoke(context: &CommandContext) -> Result<CommandResult, CommandResult> {
        let key_id = context.key_id_arg("Usage: /revoke <key-id>")?;

        match context.revocations.revoke(&key_id.to_string()) {
            Ok(true) => Ok(CommandResult::Success(format!("Revoked {}", key_id.to_string().red()))),
            Ok(false) => Ok(CommandResult::Warning(format!("{} is already revoked", key_id))),
            Err(e) => Err(CommandResult::Error(format!("Failed to update revocation list: {}", e))),
        }
    }

    /// 恢复密钥
    fn reinstate(context: &CommandContext) -> Result<CommandResult, CommandResult> {
        let key_id = context.key_id_arg("Usage: /reinstate <key-id>")?;

        match context.revocations.reinstate(&key_id.to_string()) {
            Ok(true) => Ok(CommandResult::Success(format!("Reinstated {}", key_id.to_string().green()))),
            Ok(false) => Ok(CommandResult::Warning(format!("{} was not revoked", key_id))),
            Err(e) => Err(CommandResult::Error(format!("Failed to update revocation list: {}", e))),
        }
    }

    /// 显示状态
    fn status(context: &CommandContext) -> CommandResult {
        let roles = [Role::customer(), Role::bank()];

        let rows: Vec<Vec<String>> = roles
            .iter()
            .map(|role| {
                let keys = if context.keys.has_keypair(role) { "present" } else { "missing" };
                let mailbox = match context.channel.mailbox().fetch(role) {
                    Ok(Some(envelope)) => crate::utils::format_timestamp(envelope.timestamp()),
                    Ok(None) => "empty".to_string(),
                    Err(_) => "unreadable".to_string(),
                };
                vec![role.to_string(), keys.to_string(), mailbox]
            })
            .collect();

        let revoked = match context.revocations.revoked() {
            Ok(revoked) if revoked.is_empty() => "none".to_string(),
            Ok(revoked) => revoked.into_iter().collect::<Vec<_>>().join(", "),
            Err(e) => format!("unreadable ({})", e),
        };

        let result = format!(
            indoc! {"
                {}
                Keys directory:     {}
                Messages directory: {}
                Cipher:             {:?}
                Expiry window:      {}
                Revoked keys:       {}
            "},
            helpers::format_table(&["Role", "Keys", "Mailbox"], &rows, &[10, 8, 24]),
            context.config.keys_dir.display(),
            context.config.messages_dir.display(),
            context.config.symmetric_key_size,
            helpers::format_duration(context.config.expiry_window_secs),
            revoked.yellow(),
        );

        CommandResult::Info(result)
    }

    /// 拒绝信息只包含错误类别和原因，不包含任何明文或密钥
    fn rejected(role: &Role, action: &str, err: &MessageError) -> CommandResult {
        error!("{} for {}: {}", action, role, err.kind());
        CommandResult::Error(format!("[{}] {}: {}", role, action, err))
    }
}
