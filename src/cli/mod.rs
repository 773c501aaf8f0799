pub mod commands;
mod core;
pub mod forms;
mod help;
mod io;
pub mod output;
mod shell;

pub use self::core::{CliError, CliMode, CommandError, ShellContext};
pub use shell::{run_cli, SCRIPT_ENV_VAR};
