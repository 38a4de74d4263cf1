use crate::identity::Role;

use colored::*;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::hint::HistoryHinter;
use rustyline::highlight::MatchingBracketHighlighter;
use rustyline::completion::{Completer, Pair};
use rustyline::validate::Validator;
use rustyline::hint::Hinter;
use rustyline::highlight::Highlighter;
use rustyline::{Context, Editor, Helper};
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::PathBuf;
use std::fs::create_dir_all;
use log::{error, debug};
use super::commands::{Command, CommandResult, CommandContext};
use clap::{Command as ClapCommand, Arg, ArgMatches};
use anyhow::{Result, anyhow};

/// 命令补全器
#[derive(Default)]
struct CommandCompleter {
    commands: Vec<String>,
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        // 只有在命令开头时才提供补全
        let word = match line.strip_prefix('/').and_then(|_| line.get(1..pos)) {
            Some(word) => word,
            None => return Ok((pos, Vec::new())),
        };

        let mut candidates: Vec<Pair> = self
            .commands
            .iter()
            .filter(|cmd| cmd.starts_with(word))
            .map(|cmd| Pair {
                display: format!("/{}", cmd),
                replacement: cmd.clone(),
            })
            .collect();
        candidates.sort_by(|a, b| a.display.cmp(&b.display));

        Ok((1, candidates))
    }
}

/// 命令行编辑器辅助
struct EditorHelper {
    completer: CommandCompleter,
    highlighter: MatchingBracketHighlighter,
    hinter: HistoryHinter,
}

impl Helper for EditorHelper {}

impl Validator for EditorHelper {}

impl Hinter for EditorHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, ctx: &Context<'_>) -> Option<String> {
        self.hinter.hint(line, pos, ctx)
    }
}

impl Highlighter for EditorHelper {
    fn highlight<'l>(&self, line: &'l str, pos: usize) -> Cow<'l, str> {
        self.highlighter.highlight(line, pos)
    }

    fn highlight_char(&self, line: &str, pos: usize) -> bool {
        self.highlighter.highlight_char(line, pos)
    }
}

impl Completer for EditorHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        self.completer.complete(line, pos, ctx)
    }
}

type LineEditor = Editor<EditorHelper, DefaultHistory>;

/// 一行输入解析后的动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// 直接执行命令
    Run(Command, Vec<String>),
    /// 先向用户询问消息内容，再从 `from` 发给 `to`
    Compose { from: Role, to: Role },
    /// 无法识别的菜单选项
    Invalid(String),
}

/// 菜单选项 1-5 对应的动作
pub fn menu_action(choice: &str) -> Action {
    let customer = Role::customer();
    let bank = Role::bank();

    match choice {
        "1" => Action::Compose { from: customer, to: bank },
        "2" => Action::Run(Command::Read, vec![bank.to_string(), customer.to_string()]),
        "3" => Action::Compose { from: bank, to: customer },
        "4" => Action::Run(Command::Read, vec![customer.to_string(), bank.to_string()]),
        "5" => Action::Run(Command::Exit, Vec::new()),
        other => Action::Invalid(other.to_string()),
    }
}

/// 创建clap应用程序，定义交互模式中可用的斜杠命令
fn create_cli_app() -> ClapCommand {
    ClapCommand::new("SecureBox CLI")
        .version(env!("CARGO_PKG_VERSION"))
        .about("SecureBox interactive commands")
        .no_binary_name(true)
        .disable_help_subcommand(true)
        .subcommand(ClapCommand::new("help")
            .about("显示帮助信息"))
        .subcommand(ClapCommand::new("menu")
            .about("显示菜单"))
        .subcommand(ClapCommand::new("exit")
            .about("退出应用程序"))
        .subcommand(ClapCommand::new("quit")
            .about("退出应用程序"))
        .subcommand(ClapCommand::new("keygen")
            .about("为角色生成新的密钥对")
            .arg(Arg::new("role")
                .help("角色名")
                .required(true)
                .index(1)))
        .subcommand(ClapCommand::new("send")
            .about("加密、签名并投递消息")
            .arg(Arg::new("from")
                .help("发送方角色")
                .required(true)
                .index(1))
            .arg(Arg::new("to")
                .help("接收方角色")
                .required(true)
                .index(2))
            .arg(Arg::new("message")
                .help("要发送的消息内容")
                .required(true)
                .num_args(1..)
                .index(3)))
        .subcommand(ClapCommand::new("read")
            .about("校验并解密信箱中的消息")
            .arg(Arg::new("as")
                .help("接收方角色")
                .required(true)
                .index(1))
            .arg(Arg::new("from")
                .help("发送方角色")
                .required(true)
                .index(2)))
        .subcommand(ClapCommand::new("revoke")
            .about("吊销密钥")
            .arg(Arg::new("key_id")
                .help("密钥标识，例如 bank_public")
                .required(true)
                .index(1)))
        .subcommand(ClapCommand::new("reinstate")
            .about("恢复被吊销的密钥")
            .arg(Arg::new("key_id")
                .help("密钥标识，例如 bank_public")
                .required(true)
                .index(1)))
        .subcommand(ClapCommand::new("status")
            .about("显示密钥、信箱和吊销状态"))
}

/// 打印命令结果
pub fn print_result(result: &CommandResult) {
    match result {
        CommandResult::Success(message) => {
            if !message.is_empty() {
                println!("{}", message);
            }
        },
        CommandResult::Info(info) => {
            println!("{}", info);
        },
        CommandResult::Warning(warning) => {
            println!("{} {}", "Warning:".yellow().bold(), warning);
        },
        CommandResult::Error(error) => {
            eprintln!("{} {}", "Error:".red().bold(), error);
        },
        CommandResult::Exit => {
            println!("Exiting Secure Messaging CLI.");
        }
    }
}

/// 命令处理器
pub struct CommandProcessor {
    context: CommandContext,
    commands: HashMap<String, Command>,
    app: ClapCommand,
    running: bool,
    history_path: PathBuf,
}

impl CommandProcessor {
    /// 创建新的命令处理器
    pub fn new(context: CommandContext) -> Self {
        let mut commands = HashMap::new();

        // 注册命令
        commands.insert("help".to_string(), Command::Help);
        commands.insert("menu".to_string(), Command::Menu);
        commands.insert("exit".to_string(), Command::Exit);
        commands.insert("quit".to_string(), Command::Exit);
        commands.insert("keygen".to_string(), Command::Keygen);
        commands.insert("send".to_string(), Command::Send);
        commands.insert("read".to_string(), Command::Read);
        commands.insert("revoke".to_string(), Command::Revoke);
        commands.insert("reinstate".to_string(), Command::Reinstate);
        commands.insert("status".to_string(), Command::Status);

        // 设置历史记录文件路径
        let mut history_path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        history_path.push("secure-box");
        history_path.push("history.txt");

        Self {
            context,
            commands,
            app: create_cli_app(),
            running: true,
            history_path,
        }
    }

    /// 启动交互循环
    pub fn run(&mut self) -> Result<()> {
        println!("{}", self.get_welcome_message());

        let mut editor = self.create_editor()?;

        while self.running {
            println!("\n{}", super::helpers::format_menu());

            let line = match editor.readline(&format!("{} ", "Enter option (1/2/3/4/5):".green())) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    println!("\nInterrupted. Exiting.");
                    break;
                },
                Err(err) => {
                    error!("Error reading line: {}", err);
                    break;
                }
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            editor.add_history_entry(line)?;

            match self.parse_input(line) {
                Ok(action) => self.perform(action, &mut editor)?,
                Err(e) => eprintln!("{} {}", "Error:".red().bold(), e),
            }
        }

        if let Err(e) = editor.save_history(&self.history_path) {
            debug!("Failed to save command history: {}", e);
        }

        Ok(())
    }

    /// 把一行输入解析为动作：数字为菜单项，`/` 开头为命令
    pub fn parse_input(&self, input: &str) -> Result<Action> {
        let input = input.trim();

        let cmd_str = match input.strip_prefix('/') {
            Some(cmd_str) => cmd_str,
            None => return Ok(menu_action(input)),
        };

        // 使用shlex拆分，支持带引号的消息
        let args = shlex::split(cmd_str).ok_or_else(|| anyhow!("Unbalanced quotes in: {}", input))?;

        let matches = self
            .app
            .clone()
            .try_get_matches_from(args)
            .map_err(|e| anyhow!("Command parsing error: {}", e))?;

        match matches.subcommand() {
            Some((cmd_name, sub_matches)) => self.handle_subcommand(cmd_name, sub_matches),
            None => Ok(Action::Run(Command::Help, Vec::new())),
        }
    }

    /// 处理子命令
    fn handle_subcommand(&self, cmd_name: &str, matches: &ArgMatches) -> Result<Action> {
        let command = *self
            .commands
            .get(cmd_name)
            .ok_or_else(|| anyhow!("Unknown command: {}", cmd_name))?;

        let arg = |name: &str| matches.get_one::<String>(name).cloned().unwrap_or_default();

        let args = match command {
            Command::Keygen => vec![arg("role")],
            Command::Send => {
                let message = matches.get_many::<String>("message")
                    .map(|vals| vals.cloned().collect::<Vec<_>>().join(" "))
                    .unwrap_or_default();
                vec![arg("from"), arg("to"), message]
            },
            Command::Read => vec![arg("as"), arg("from")],
            Command::Revoke | Command::Reinstate => vec![arg("key_id")],
            _ => Vec::new(),
        };

        Ok(Action::Run(command, args))
    }

    /// 执行动作
    fn perform(&mut self, action: Action, editor: &mut LineEditor) -> Result<()> {
        let (command, args) = match action {
            Action::Run(command, args) => (command, args),
            Action::Compose { from, to } => {
                let prompt = format!("Enter message to send to {}: ", capitalize(to.as_str()));
                let message = match editor.readline(&prompt) {
                    Ok(message) => message,
                    Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(()),
                    Err(err) => return Err(err.into()),
                };
                (Command::Send, vec![from.to_string(), to.to_string(), message])
            },
            Action::Invalid(choice) => {
                print_result(&CommandResult::Warning(format!("Invalid choice '{}'. Please select 1-5.", choice)));
                return Ok(());
            },
        };

        let result = command.execute(&self.context.with_args(args));
        print_result(&result);

        if result == CommandResult::Exit {
            self.running = false;
        }

        Ok(())
    }

    /// 创建命令行编辑器
    fn create_editor(&self) -> Result<LineEditor> {
        let mut editor = LineEditor::new()?;

        let mut commands: Vec<String> = self.commands.keys().cloned().collect();
        commands.sort();
        editor.set_helper(Some(EditorHelper {
            completer: CommandCompleter { commands },
            highlighter: MatchingBracketHighlighter::new(),
            hinter: HistoryHinter {},
        }));

        // 加载历史记录
        if let Some(parent) = self.history_path.parent() {
            let _ = create_dir_all(parent);
        }
        let _ = editor.load_history(&self.history_path);

        Ok(editor)
    }

    /// 获取欢迎信息
    fn get_welcome_message(&self) -> String {
        format!(
            "\n{}\n{}\n\nType {} for slash commands.",
            format!("SecureBox v{}", crate::utils::version()).green().bold(),
            "Signed, encrypted, replay-protected messages".cyan(),
            "/help".yellow(),
        )
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Config;
    use tempfile::tempdir;

    fn processor() -> (CommandProcessor, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let config = Config::default().rooted_at(dir.path());
        (CommandProcessor::new(CommandContext::from_config(config)), dir)
    }

    #[test]
    fn test_menu_choices() {
        assert_eq!(
            menu_action("1"),
            Action::Compose { from: Role::customer(), to: Role::bank() }
        );
        assert_eq!(
            menu_action("2"),
            Action::Run(Command::Read, vec!["bank".to_string(), "customer".to_string()])
        );
        assert_eq!(
            menu_action("3"),
            Action::Compose { from: Role::bank(), to: Role::customer() }
        );
        assert_eq!(
            menu_action("4"),
            Action::Run(Command::Read, vec!["customer".to_string(), "bank".to_string()])
        );
        assert_eq!(menu_action("5"), Action::Run(Command::Exit, Vec::new()));
        assert_eq!(menu_action("9"), Action::Invalid("9".to_string()));
    }

    #[test]
    fn test_parse_slash_commands() {
        let (processor, _dir) = processor();

        assert_eq!(
            processor.parse_input("/send customer bank 'transfer 100' now").unwrap(),
            Action::Run(
                Command::Send,
                vec!["customer".to_string(), "bank".to_string(), "transfer 100 now".to_string()]
            )
        );
        assert_eq!(
            processor.parse_input("/revoke bank_public").unwrap(),
            Action::Run(Command::Revoke, vec!["bank_public".to_string()])
        );
        assert_eq!(processor.parse_input("/quit").unwrap(), Action::Run(Command::Exit, Vec::new()));
        assert_eq!(processor.parse_input("3").unwrap(), menu_action("3"));
    }

    #[test]
    fn test_parse_errors() {
        let (processor, _dir) = processor();

        assert!(processor.parse_input("/bogus").is_err());
        assert!(processor.parse_input("/read bank").is_err());
        assert!(processor.parse_input("/send a b 'unterminated").is_err());
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("bank"), "Bank");
        assert_eq!(capitalize(""), "");
    }
}
