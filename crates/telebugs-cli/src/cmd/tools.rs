//! `telebugs-mcp tools`: the tool catalogue.

use crate::output::{OutputMode, render};
use anyhow::Result;
use serde::Serialize;
use std::io::{self, Write};
use telebugs_core::tools::Tool;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub mutation: bool,
}

pub fn catalogue() -> Vec<ToolEntry> {
    Tool::ALL
        .into_iter()
        .map(|tool| ToolEntry {
            name: tool.as_str(),
            description: tool.description(),
            mutation: tool.is_mutation(),
        })
        .collect()
}

fn write_table(w: &mut dyn Write, entries: &[ToolEntry]) -> io::Result<()> {
    let width = entries.iter().map(|e| e.name.len()).max().unwrap_or(0);
    for entry in entries {
        let marker = if entry.mutation { " [writes]" } else { "" };
        writeln!(w, "{:<width$}  {}{marker}", entry.name, entry.description)?;
    }
    Ok(())
}

/// Print the catalogue: an aligned table, or a JSON array with `--compact`.
pub fn run_tools(output: OutputMode) -> Result<()> {
    let entries = catalogue();
    if output.is_compact() {
        return render(output, &entries);
    }
    let stdout = io::stdout();
    write_table(&mut stdout.lock(), &entries)?;
    Ok(())
}
