use colored::Colorize;
use std::fmt;

/// Message categories used by the CLI output helpers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Warning,
    Error,
    Hint,
    Section,
}

fn build_label(kind: MessageKind) -> (&'static str, &'static str) {
    match kind {
        MessageKind::Info => ("INFO", "[i]"),
        MessageKind::Success => ("SUCCESS", "[✓]"),
        MessageKind::Warning => ("WARNING", "[!]"),
        MessageKind::Error => ("ERROR", "[x]"),
        MessageKind::Hint => ("HINT", ">"),
        MessageKind::Section => ("", ""),
    }
}

fn apply_style(kind: MessageKind, message: impl fmt::Display) -> String {
    let text = message.to_string();
    let formatted = match kind {
        MessageKind::Section => format!("=== {} ===", text.trim()),
        // Table rows and plain listings stay unlabelled.
        MessageKind::Info => text,
        _ => {
            let (label, icon) = build_label(kind);
            format!("{label}: {icon} {text}")
        }
    };

    match kind {
        MessageKind::Success => formatted.bright_green().to_string(),
        MessageKind::Warning => formatted.bright_yellow().to_string(),
        MessageKind::Error => formatted.bright_red().to_string(),
        MessageKind::Hint => formatted.bright_cyan().to_string(),
        MessageKind::Section => formatted.bold().to_string(),
        MessageKind::Info => formatted,
    }
}

pub fn print(kind: MessageKind, message: impl fmt::Display) {
    let formatted = apply_style(kind, message);
    match kind {
        MessageKind::Section => println!("\n{}", formatted),
        _ => println!("{}", formatted),
    }
}

pub fn info(message: impl fmt::Display) {
    print(MessageKind::Info, message);
}

pub fn success(message: impl fmt::Display) {
    print(MessageKind::Success, message);
}

pub fn warning(message: impl fmt::Display) {
    print(MessageKind::Warning, message);
}

pub fn error(message: impl fmt::Display) {
    print(MessageKind::Error, message);
}

pub fn hint(message: impl fmt::Display) {
    print(MessageKind::Hint, message);
}

pub fn section(title: impl fmt::Display) {
    print(MessageKind::Section, title);
}

/// Renders rows as left-aligned columns sized to their widest cell.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(idx) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let render_row = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(idx, cell)| {
                let width = widths.get(idx).copied().unwrap_or(0);
                format!("{:<width$}", cell, width = width)
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(render_row(headers.to_vec()));
    let separators: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    lines.push(render_row(separators.iter().map(String::as_str).collect()));
    for row in rows {
        lines.push(render_row(row.iter().map(String::as_str).collect()));
    }
    lines
}
