//! Core CLI loop, dispatch, and shell context helpers.

use std::{io, path::PathBuf, sync::Arc};

use chrono::{Local, NaiveDate};
use dialoguer::theme::ColorfulTheme;
use rustyline::error::ReadlineError;
use strsim::levenshtein;

use crate::{
    config::{Config, ConfigManager},
    currency::{format_amount, CurrencyCode, LocaleConfig},
    errors::LedgerError,
    ledger::{Ledger, LoadOrigin, PersistTicket, TransactionId},
    storage::JsonFileStore,
};

use super::commands::{self, CommandDefinition, CommandRegistry};
use super::forms::FormError;
use super::io as cli_io;
use super::shell::parse_command_line;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

pub type CommandResult = Result<(), CommandError>;

/// Composition root of the shell: owns the configuration, the store handle and the ledger.
pub struct ShellContext {
    pub mode: CliMode,
    pub registry: CommandRegistry,
    pub theme: ColorfulTheme,
    pub config_manager: ConfigManager,
    pub config: Config,
    pub store: JsonFileStore,
    pub ledger: Arc<Ledger>,
}

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        Self::from_config_manager(mode, ConfigManager::new()?)
    }

    pub fn with_base_dir(mode: CliMode, base: PathBuf) -> Result<Self, CliError> {
        Self::from_config_manager(mode, ConfigManager::with_base_dir(base)?)
    }

    fn from_config_manager(mode: CliMode, config_manager: ConfigManager) -> Result<Self, CliError> {
        let config = config_manager.load()?;
        let ledger_path = config.ledger_path(config_manager.base_dir());
        let store = JsonFileStore::new(ledger_path, Some(config.backup_retention))?;
        let ledger = Arc::new(Ledger::new(
            Box::new(store.clone()),
            config.ledger_options(),
        )?);

        let report = ledger.initialize();
        if let LoadOrigin::Degraded { .. } = report.origin {
            cli_io::print_warning("Ledger store is unavailable; changes are kept in memory.");
        }
        for warning in &report.warnings {
            cli_io::print_warning(warning);
        }

        Ok(Self {
            mode,
            registry: CommandRegistry::new(commands::all_definitions()),
            theme: ColorfulTheme::default(),
            config_manager,
            config,
            store,
            ledger,
        })
    }

    pub fn command_names(&self) -> Vec<&'static str> {
        self.registry.names().collect()
    }

    pub(crate) fn command(&self, name: &str) -> Option<&CommandDefinition> {
        self.registry.get(name)
    }

    pub(crate) fn prompt(&self) -> String {
        let balance = self.format_amount(self.ledger.snapshot().balance, false);
        if self.ledger.is_dirty() {
            format!("nucleo [{balance}*]> ")
        } else {
            format!("nucleo [{balance}]> ")
        }
    }

    pub(crate) fn locale(&self) -> LocaleConfig {
        self.config.locale_config()
    }

    pub(crate) fn currency(&self) -> CurrencyCode {
        self.config.currency_code()
    }

    pub(crate) fn format_amount(&self, amount: f64, show_sign: bool) -> String {
        format_amount(amount, &self.currency(), &self.locale(), show_sign)
    }

    pub(crate) fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    /// Reports the outcome of a write that follows a committed change.
    pub(crate) fn report_persistence(&self, ticket: PersistTicket) {
        if let Err(err) = ticket.wait() {
            cli_io::print_warning(format!(
                "Change kept in memory but not saved: {err}. Use `flush` to retry."
            ));
        }
    }

    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        if let Some(handler) = self.registry.get(command).map(|entry| entry.handler) {
            match handler(self, args) {
                Ok(()) => Ok(LoopControl::Continue),
                Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
                Err(err) => Err(err),
            }
        } else {
            self.suggest_command(raw);
            Ok(LoopControl::Continue)
        }
    }

    /// Tokenizes and runs one input line. Blank lines and `#` comments are skipped.
    pub(crate) fn process_line(&mut self, line: &str) -> Result<LoopControl, CommandError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(LoopControl::Continue);
        }

        let tokens = match parse_command_line(line) {
            Ok(tokens) => tokens,
            Err(err) => {
                cli_io::print_warning(err.to_string());
                return Ok(LoopControl::Continue);
            }
        };

        if tokens.is_empty() {
            return Ok(LoopControl::Continue);
        }

        let command = tokens[0].to_lowercase();
        let args: Vec<&str> = tokens.iter().skip(1).map(String::as_str).collect();
        self.dispatch(&command, &tokens[0], &args)
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        cli_io::print_warning(format!(
            "Unknown command `{}`. Type `help` to see available commands.",
            input
        ));

        let lowered = input.to_lowercase();
        let mut suggestions: Vec<_> = self
            .registry
            .names()
            .map(|key| (levenshtein(key, &lowered), key))
            .collect();
        suggestions.sort_by_key(|(distance, _)| *distance);

        if let Some((distance, best)) = suggestions.first() {
            if *distance <= 3 {
                cli_io::print_info(format!("Suggestion: `{}`?", best));
            }
        }
    }

    /// Asks before destructive commands; scripts are never prompted.
    pub(crate) fn confirm(&self, prompt: &str) -> Result<bool, CommandError> {
        if self.mode == CliMode::Script {
            return Ok(true);
        }
        cli_io::confirm_action(&self.theme, prompt, false)
    }

    pub(crate) fn confirm_exit(&self) -> Result<bool, CliError> {
        if self.mode == CliMode::Script {
            return Ok(true);
        }
        Ok(cli_io::confirm_action(&self.theme, "Exit shell?", true)?)
    }

    pub(crate) fn report_error(&self, err: CommandError) -> Result<(), CliError> {
        match err {
            CommandError::ExitRequested => Ok(()),
            CommandError::InvalidArguments(message) => {
                cli_io::print_error(&message);
                cli_io::print_hint("Use `help <command>` for usage details.");
                Ok(())
            }
            CommandError::Form(FormError::Usage(usage)) => {
                cli_io::print_error(format!("Usage: {usage}"));
                Ok(())
            }
            other => {
                cli_io::print_error(other.to_string());
                Ok(())
            }
        }
    }
}

pub(crate) fn parse_id(input: Option<&&str>, usage: &str) -> Result<TransactionId, CommandError> {
    let raw = input.ok_or_else(|| CommandError::InvalidArguments(format!("usage: {usage}")))?;
    raw.trim_start_matches('#')
        .parse::<u64>()
        .map(TransactionId)
        .map_err(|_| CommandError::InvalidArguments(format!("invalid transaction id `{raw}`")))
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Dialoguer(#[from] dialoguer::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("exit requested")]
    ExitRequested,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] LedgerError),
    #[error(transparent)]
    Readline(#[from] ReadlineError),
    #[error("Command failed: {0}")]
    Command(String),
}

impl From<CommandError> for CliError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Ledger(inner) => CliError::Core(inner),
            other => CliError::Command(other.to_string()),
        }
    }
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        CliError::Command(err.to_string())
    }
}

#[cfg(test)]
pub(crate) fn process_script(
    base: PathBuf,
    lines: &[&str],
) -> Result<ShellContext, CliError> {
    let mut app = ShellContext::with_base_dir(CliMode::Script, base)?;
    for line in lines {
        match app.process_line(line)? {
            LoopControl::Continue => {}
            LoopControl::Exit => break,
        }
    }
    Ok(app)
}
