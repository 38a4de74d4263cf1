use secure_box::cli::{print_result, Command, CommandContext, CommandProcessor, CommandResult};
use secure_box::identity::Role;
use secure_box::utils::{parse_log_level, setup_logger, Config};

use anyhow::{anyhow, Context};
use clap::{ArgAction, Parser, Subcommand};
use colored::*;
use log::{info, LevelFilter};
use std::path::PathBuf;

/// 命令行参数
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// 配置文件路径（默认位于系统配置目录）
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// 日志级别，覆盖配置文件
    #[clap(long)]
    log_level: Option<String>,

    /// 启用详细日志
    #[clap(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[clap(subcommand)]
    command: Option<Mode>,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// 为角色生成（或替换）密钥对
    Keygen {
        role: String,
    },

    /// 加密、签名消息并投递到接收方信箱
    Send {
        #[clap(long)]
        from: String,

        #[clap(long)]
        to: String,

        #[clap(required = true, num_args = 1..)]
        message: Vec<String>,
    },

    /// 校验并解密信箱中的消息
    Read {
        #[clap(long = "as", value_name = "ROLE")]
        receiver: String,

        #[clap(long)]
        from: String,
    },

    /// 吊销密钥，例如 bank_public
    Revoke {
        key_id: String,
    },

    /// 恢复被吊销的密钥
    Reinstate {
        key_id: String,
    },

    /// 显示密钥、信箱和吊销状态
    Status,

    /// 交互式菜单（默认）
    Interactive,
}

impl Mode {
    /// 转换为 CLI 命令和参数
    fn into_command(self) -> (Command, Vec<String>) {
        match self {
            Mode::Keygen { role } => (Command::Keygen, vec![role]),
            Mode::Send { from, to, message } => (Command::Send, vec![from, to, message.join(" ")]),
            Mode::Read { receiver, from } => (Command::Read, vec![receiver, from]),
            Mode::Revoke { key_id } => (Command::Revoke, vec![key_id]),
            Mode::Reinstate { key_id } => (Command::Reinstate, vec![key_id]),
            Mode::Status => (Command::Status, Vec::new()),
            Mode::Interactive => (Command::Menu, Vec::new()),
        }
    }
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("secure-box")
        .join("config.json")
}

fn main() -> anyhow::Result<()> {
    // 解析命令行参数
    let args = Args::parse();

    // 加载配置文件
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // 首次运行时保存默认配置
    if !config_path.exists() {
        config.save(&config_path)?;
    }

    // 初始化日志
    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        let level = args.log_level.as_deref().unwrap_or(&config.log_level);
        parse_log_level(level).map_err(|e| anyhow!(e))?
    };
    setup_logger(Some(level)).map_err(|e| anyhow!(e))?;

    config.ensure_dirs()?;
    info!("Using keys in {} and messages in {}", config.keys_dir.display(), config.messages_dir.display());

    let context = CommandContext::from_config(config);

    // 确保两个角色的密钥对存在
    for role in [Role::customer(), Role::bank()] {
        if context.keys.ensure_keypair(&role)? {
            info!("{}", format!("Generated missing key pair for {}", role).green());
        }
    }

    let (command, command_args) = args.command.unwrap_or(Mode::Interactive).into_command();

    if command == Command::Menu {
        return CommandProcessor::new(context).run();
    }

    let result = command.execute(&context.with_args(command_args));
    print_result(&result);

    if matches!(result, CommandResult::Error(_)) {
        std::process::exit(1);
    }

    Ok(())
}
