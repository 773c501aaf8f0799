use crate::{
    aggregation::{dashboard, totals_by_category},
    cli::{
        core::{CommandError, CommandResult, ShellContext},
        io,
        output::{render_table, section as output_section},
    },
};

use super::CommandDefinition;

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![
        CommandDefinition::new("balance", "Show the current balance", "balance", cmd_balance),
        CommandDefinition::new(
            "stats",
            "Show totals and top expense categories",
            "stats",
            cmd_stats,
        ),
        CommandDefinition::new(
            "flush",
            "Write the ledger to disk now",
            "flush",
            cmd_flush,
        ),
        CommandDefinition::new(
            "backups",
            "List automatic ledger backups",
            "backups",
            cmd_backups,
        ),
        CommandDefinition::new(
            "restore",
            "Replace the ledger with a backup",
            "restore <backup-name>",
            cmd_restore,
        ),
        CommandDefinition::new(
            "reset",
            "Erase stored data and restore the example transactions",
            "reset",
            cmd_reset,
        ),
    ]
}

fn cmd_balance(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let snapshot = context.ledger.snapshot();
    io::print_info(format!(
        "Balance: {}",
        context.format_amount(snapshot.balance, false)
    ));
    if context.ledger.is_dirty() {
        let reason = context
            .ledger
            .last_persistence_error()
            .unwrap_or_else(|| "not yet written".into());
        io::print_warning(format!("Unsaved changes ({reason}). Use `flush` to retry."));
    }
    Ok(())
}

fn cmd_stats(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let snapshot = context.ledger.snapshot();
    let stats = dashboard(&snapshot);

    output_section("Summary");
    io::print_info(format!(
        "  Balance      : {}",
        context.format_amount(stats.balance, false)
    ));
    io::print_info(format!(
        "  Income       : {} ({} entries)",
        context.format_amount(stats.income_total, false),
        stats.income_count
    ));
    io::print_info(format!(
        "  Expenses     : {} ({} entries)",
        context.format_amount(stats.expense_total, false),
        stats.expense_count
    ));
    io::print_info(format!("  Transactions : {}", stats.transaction_count));
    if let Some(last) = &stats.last_transaction {
        io::print_info(format!(
            "  Latest       : {} {} ({})",
            last.id,
            last.description,
            context.format_amount(last.amount, true)
        ));
    }

    let categories = totals_by_category(&snapshot, Some(context.config.top_categories));
    if categories.is_empty() {
        return Ok(());
    }
    output_section("Top expense categories");
    let rows: Vec<Vec<String>> = categories
        .iter()
        .map(|entry| {
            vec![
                entry.category.clone(),
                context.format_amount(entry.total, false),
            ]
        })
        .collect();
    for line in render_table(&["Category", "Total"], &rows) {
        io::print_info(line);
    }
    Ok(())
}

fn cmd_flush(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    context.ledger.flush()?;
    io::print_success(format!("Ledger saved to {}.", context.store.path().display()));
    Ok(())
}

fn cmd_backups(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let backups = context.store.list_backups()?;
    if backups.is_empty() {
        io::print_info("No backups yet.");
        return Ok(());
    }
    output_section("Backups");
    let rows: Vec<Vec<String>> = backups
        .iter()
        .map(|backup| {
            vec![
                backup.name.clone(),
                backup
                    .created_at
                    .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".into()),
                format!("{} B", backup.size_bytes),
            ]
        })
        .collect();
    for line in render_table(&["Name", "Created (UTC)", "Size"], &rows) {
        io::print_info(line);
    }
    Ok(())
}

fn cmd_restore(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some(name) = args.first() else {
        return Err(CommandError::InvalidArguments(
            "usage: restore <backup-name> (see `backups`)".into(),
        ));
    };
    let document = context.store.read_backup(name)?;
    if !context.confirm(&format!(
        "Replace the current ledger with {} ({} transactions)?",
        name,
        document.transactions.len()
    ))? {
        io::print_info("Restore cancelled.");
        return Ok(());
    }

    let (warnings, ticket) = context.ledger.restore(document)?.into_parts();
    for warning in warnings {
        io::print_warning(warning);
    }
    context.report_persistence(ticket);
    io::print_success(format!(
        "Ledger restored from {}. Balance: {}",
        name,
        context.format_amount(context.ledger.snapshot().balance, false)
    ));
    Ok(())
}

fn cmd_reset(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    if !context.confirm("Erase all transactions and restore the example data?")? {
        io::print_info("Reset cancelled.");
        return Ok(());
    }
    let ((), ticket) = context.ledger.reset()?.into_parts();
    context.report_persistence(ticket);
    io::print_success(format!(
        "Ledger reset. Balance: {}",
        context.format_amount(context.ledger.snapshot().balance, false)
    ));
    Ok(())
}
