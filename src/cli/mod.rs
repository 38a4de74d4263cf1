pub mod commands;
pub mod helpers;
mod processor;

pub use commands::{Command, CommandContext, CommandResult};
pub use processor::{menu_action, print_result, Action, CommandProcessor};

/*
 * Command line interface for SecureBox
 *
 * Commands run against a CommandContext (configuration plus the file-backed
 * channel, key store and revocation list) and return a CommandResult; the
 * processor owns all terminal I/O:
 * - A five-option numbered menu
 * - Slash commands parsed with clap
 * - Line editing and history through rustyline
 */
