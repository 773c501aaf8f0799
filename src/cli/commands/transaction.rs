use crate::{
    aggregation::{filter, recent, TransactionQuery},
    cli::{
        core::{parse_id, CommandError, CommandResult, ShellContext},
        forms::TransactionForm,
        io,
        output::{render_table, section as output_section},
    },
    errors::LedgerError,
    ledger::{Transaction, TransactionKind},
};

use super::CommandDefinition;

const LIST_USAGE: &str = "list [text] [--type income|expense] [--category NAME]";
const ADD_USAGE: &str = "add <income|expense> <amount> <description> <category> [date]";
const EDIT_USAGE: &str = "edit <id> <income|expense> <amount> <description> <category> [date]";

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![
        CommandDefinition::new("list", "List and filter transactions", LIST_USAGE, cmd_list),
        CommandDefinition::new(
            "recent",
            "Show the most recent transactions",
            "recent [count]",
            cmd_recent,
        ),
        CommandDefinition::new("show", "Show one transaction", "show <id>", cmd_show),
        CommandDefinition::new("add", "Record a transaction", ADD_USAGE, cmd_add),
        CommandDefinition::new("edit", "Replace a transaction", EDIT_USAGE, cmd_edit),
        CommandDefinition::new("delete", "Delete a transaction", "delete <id>", cmd_delete),
    ]
}

fn cmd_list(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let query = parse_query(args)?;
    let snapshot = context.ledger.snapshot();
    let matches = filter(&snapshot, &query);
    if matches.is_empty() {
        io::print_info("No transactions match.");
        return Ok(());
    }
    output_section(format!("Transactions ({})", matches.len()));
    print_transactions(context, &matches);
    Ok(())
}

fn cmd_recent(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let limit = match args.first() {
        Some(raw) => raw.parse::<usize>().map_err(|_| {
            CommandError::InvalidArguments(format!("invalid count `{raw}`"))
        })?,
        None => context.config.recent_limit,
    };
    let snapshot = context.ledger.snapshot();
    let latest = recent(&snapshot, limit);
    if latest.is_empty() {
        io::print_info("No transactions recorded.");
        return Ok(());
    }
    output_section("Recent transactions");
    print_transactions(context, &latest);
    Ok(())
}

fn cmd_show(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let id = parse_id(args.first(), "show <id>")?;
    let txn = context
        .ledger
        .get_by_id(id)
        .ok_or(LedgerError::NotFound(id))?;

    output_section(format!("Transaction {}", txn.id));
    io::print_info(format!("  Description: {}", txn.description));
    io::print_info(format!("  Type       : {}", txn.kind));
    io::print_info(format!("  Category   : {}", txn.category));
    io::print_info(format!("  Date       : {}", txn.date));
    io::print_info(format!(
        "  Amount     : {}",
        context.format_amount(txn.amount, true)
    ));
    Ok(())
}

fn cmd_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let input = TransactionForm::from_args(args, ADD_USAGE)?
        .into_input(&context.locale(), context.today())?;
    let (id, ticket) = context.ledger.add(input)?.into_parts();
    context.report_persistence(ticket);
    io::print_success(format!(
        "Transaction {} added. Balance: {}",
        id,
        context.format_amount(context.ledger.snapshot().balance, false)
    ));
    Ok(())
}

fn cmd_edit(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let id = parse_id(args.first(), EDIT_USAGE)?;
    let input = TransactionForm::from_args(&args[1..], EDIT_USAGE)?
        .into_input(&context.locale(), context.today())?;
    let ((), ticket) = context.ledger.update(id, input)?.into_parts();
    context.report_persistence(ticket);
    io::print_success(format!(
        "Transaction {} updated. Balance: {}",
        id,
        context.format_amount(context.ledger.snapshot().balance, false)
    ));
    Ok(())
}

fn cmd_delete(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let id = parse_id(args.first(), "delete <id>")?;
    let Some(txn) = context.ledger.get_by_id(id) else {
        io::print_warning(format!("Transaction {} not found.", id));
        return Ok(());
    };
    if !context.confirm(&format!("Delete {} \"{}\"?", txn.id, txn.description))? {
        io::print_info("Delete cancelled.");
        return Ok(());
    }

    let (removed, ticket) = context.ledger.delete(id).into_parts();
    context.report_persistence(ticket);
    match removed {
        Some(removed) => io::print_success(format!(
            "Transaction {} deleted. Balance: {}",
            removed.id,
            context.format_amount(context.ledger.snapshot().balance, false)
        )),
        None => io::print_warning(format!("Transaction {} not found.", id)),
    }
    Ok(())
}

fn parse_query(args: &[&str]) -> Result<TransactionQuery, CommandError> {
    let mut query = TransactionQuery::default();
    let mut words = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match *arg {
            "--type" => {
                let value = iter.next().ok_or_else(|| missing_value("--type"))?;
                let kind = TransactionKind::from_label(value).ok_or_else(|| {
                    CommandError::InvalidArguments(format!(
                        "unknown transaction type `{value}` (use income or expense)"
                    ))
                })?;
                query.kind = Some(kind);
            }
            "--category" => {
                let value = iter.next().ok_or_else(|| missing_value("--category"))?;
                query.category = Some(value.to_string());
            }
            word => words.push(word),
        }
    }
    query.text = words.join(" ");
    Ok(query)
}

fn missing_value(flag: &str) -> CommandError {
    CommandError::InvalidArguments(format!("{flag} needs a value. Usage: {LIST_USAGE}"))
}

fn print_transactions(context: &ShellContext, transactions: &[Transaction]) {
    let rows: Vec<Vec<String>> = transactions
        .iter()
        .map(|txn| {
            vec![
                txn.id.to_string(),
                txn.date.clone(),
                txn.description.clone(),
                txn.category.clone(),
                context.format_amount(txn.amount, true),
            ]
        })
        .collect();
    for line in render_table(&["ID", "Date", "Description", "Category", "Amount"], &rows) {
        io::print_info(line);
    }
}
