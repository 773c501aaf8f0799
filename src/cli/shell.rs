use std::{
    borrow::Cow,
    fmt,
    io::{self, BufRead},
    sync::Arc,
};

use colored::Colorize;
use rustyline::{
    completion::{Completer, Pair},
    error::ReadlineError,
    highlight::Highlighter,
    hint::Hinter,
    history::DefaultHistory,
    validate::Validator,
    Context as ReadlineContext, Editor, Helper,
};
use shell_words::split;

use crate::cli::core::{CliError, CliMode, LoopControl, ShellContext};
use crate::cli::io as cli_io;
use crate::ledger::{Ledger, DEFAULT_CATEGORIES};
use crate::storage::JsonFileStore;

pub const SCRIPT_ENV_VAR: &str = "NUCLEO_CLI_SCRIPT";

const KIND_LABELS: [&str; 2] = ["income", "expense"];
const LIST_FLAGS: [&str; 2] = ["--type", "--category"];

pub fn run_cli() -> Result<(), CliError> {
    let mode = if std::env::var_os(SCRIPT_ENV_VAR).is_some() {
        CliMode::Script
    } else {
        CliMode::Interactive
    };

    let mut context = ShellContext::new(mode)?;

    let result = match mode {
        CliMode::Interactive => run_interactive(&mut context),
        CliMode::Script => run_script(&mut context),
    };
    if context.ledger.is_dirty() {
        if let Err(err) = context.ledger.flush() {
            cli_io::print_warning(format!("Unsaved changes could not be written: {err}"));
        }
    }
    result
}

fn run_interactive(context: &mut ShellContext) -> Result<(), CliError> {
    let mut editor = Editor::<CommandHelper, DefaultHistory>::new()?;
    editor.set_helper(Some(CommandHelper::new(context)));
    cli_io::print_info(format!(
        "{} transactions loaded. Type `help` for commands.",
        context.ledger.snapshot().len()
    ));

    loop {
        match editor.readline(&context.prompt()) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                editor.add_history_entry(trimmed).ok();

                match context.process_line(trimmed) {
                    Ok(LoopControl::Continue) => {}
                    Ok(LoopControl::Exit) => break,
                    Err(err) => context.report_error(err)?,
                }
            }
            Err(ReadlineError::Interrupted) => {
                if context.confirm_exit()? {
                    break;
                }
            }
            Err(ReadlineError::Eof) => {
                cli_io::print_info("Exiting shell.");
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}

fn run_script(context: &mut ShellContext) -> Result<(), CliError> {
    for line in io::stdin().lock().lines() {
        match context.process_line(&line?) {
            Ok(LoopControl::Continue) => {}
            Ok(LoopControl::Exit) => break,
            Err(err) => context.report_error(err)?,
        }
    }
    Ok(())
}

/// Completes command names, then the arguments each command expects: transaction
/// kinds, ids and categories from the live ledger, list flags and backup names.
struct CommandHelper {
    commands: Vec<(String, &'static str)>,
    ledger: Arc<Ledger>,
    store: JsonFileStore,
}

impl CommandHelper {
    fn new(context: &ShellContext) -> Self {
        let mut commands: Vec<(String, &'static str)> = context
            .registry
            .iter()
            .map(|command| (command.name.to_ascii_lowercase(), command.usage))
            .collect();
        commands.sort();
        commands.dedup_by(|a, b| a.0 == b.0);
        Self {
            commands,
            ledger: Arc::clone(&context.ledger),
            store: context.store.clone(),
        }
    }

    fn argument_candidates(&self, words: &[&str]) -> Vec<String> {
        let Some(command) = words.first().map(|word| word.to_ascii_lowercase()) else {
            return self.commands.iter().map(|(name, _)| name.clone()).collect();
        };
        let position = words.len();
        match (command.as_str(), position) {
            ("add", 1) | ("edit", 2) => labels(&KIND_LABELS),
            ("add", 4) | ("edit", 5) => self.categories(),
            ("show" | "delete" | "edit", 1) => self.transaction_ids(),
            ("help", 1) => self.commands.iter().map(|(name, _)| name.clone()).collect(),
            ("restore", 1) => self
                .store
                .list_backups()
                .map(|backups| backups.into_iter().map(|backup| backup.name).collect())
                .unwrap_or_default(),
            ("list", _) => match words.last().copied() {
                Some("--type") => labels(&KIND_LABELS),
                Some("--category") => self.categories(),
                _ => labels(&LIST_FLAGS),
            },
            _ => Vec::new(),
        }
    }

    fn categories(&self) -> Vec<String> {
        let snapshot = self.ledger.snapshot();
        let mut categories: Vec<String> = DEFAULT_CATEGORIES
            .iter()
            .map(|category| category.to_string())
            .chain(snapshot.transactions.iter().map(|txn| txn.category.clone()))
            .collect();
        categories.sort();
        categories.dedup();
        categories
    }

    fn transaction_ids(&self) -> Vec<String> {
        self.ledger
            .snapshot()
            .transactions
            .iter()
            .map(|txn| txn.id.0.to_string())
            .collect()
    }

    fn usage_hint(&self, line: &str) -> Option<String> {
        let command = line.strip_suffix(' ')?.trim_start().to_ascii_lowercase();
        let (name, usage) = self.commands.iter().find(|(name, _)| *name == command)?;
        let rest = usage.strip_prefix(name.as_str())?.trim_start();
        (!rest.is_empty()).then(|| rest.to_string())
    }
}

fn labels(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

impl Helper for CommandHelper {}

impl Completer for CommandHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &ReadlineContext<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let prefix = &line[..pos];
        let mut words: Vec<&str> = prefix.split_whitespace().collect();
        let current = if prefix.ends_with(char::is_whitespace) {
            ""
        } else {
            words.pop().unwrap_or("")
        };
        let needle = current.to_lowercase();
        let candidates = self
            .argument_candidates(&words)
            .into_iter()
            .filter(|candidate| candidate.to_lowercase().starts_with(&needle))
            .map(|candidate| Pair {
                display: candidate.clone(),
                replacement: candidate,
            })
            .collect();
        Ok((pos - current.len(), candidates))
    }
}

impl Hinter for CommandHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &ReadlineContext<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }
        self.usage_hint(line)
    }
}

impl Highlighter for CommandHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(hint.dimmed().to_string())
    }
}

impl Validator for CommandHelper {}

pub(crate) fn parse_command_line(input: &str) -> Result<Vec<String>, ParseError> {
    split(input).map_err(|err| ParseError {
        message: err.to_string(),
    })
}

#[derive(Debug)]
pub(crate) struct ParseError {
    message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
