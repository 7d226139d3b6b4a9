//! Terminal table and JSON rendering.
//!
//! Commands print a table when stdout is a terminal and JSON when piped, so
//! the same command works interactively and in scripts.

use envsentinel_core::SyncOutcome;
use serde::Serialize;
use std::io::{self, IsTerminal, Write};

pub fn stdout_is_terminal() -> bool {
    io::stdout().is_terminal()
}

/// Two-column table, first column padded to the widest cell.
pub fn print_table(headers: [&str; 2], rows: &[[String; 2]]) {
    let width = rows
        .iter()
        .map(|row| row[0].len())
        .chain([headers[0].len()])
        .max()
        .unwrap_or(0);

    println!("{:<width$}  {}", headers[0], headers[1]);
    for row in rows {
        println!("{:<width$}  {}", row[0], row[1]);
    }
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer(&mut handle, value)?;
    writeln!(handle)?;
    Ok(())
}

/// Human-readable status for a reconciliation outcome.
pub fn status_label(outcome: &SyncOutcome) -> String {
    if outcome.is_noop() {
        return "OK".to_string();
    }

    let mut parts = Vec::new();
    if outcome.dir_updated {
        parts.push("Dir Updated");
    }
    if outcome.restored {
        parts.push("Restored");
    }
    if outcome.backed_up {
        parts.push("Backed Up");
    }
    parts.join(", ")
}
