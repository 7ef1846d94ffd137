use anyhow::{Context, Result};
use clap::Subcommand;

use crate::cli::{parse_column, GlobalArgs};
use crate::columns::ColumnKey;
use crate::preferences::VisibleColumns;

#[derive(Debug, Subcommand, Clone)]
pub enum ColumnsCommand {
    /// Print every column with its visibility
    List,
    /// Show a hidden column or hide a visible one
    Toggle {
        #[arg(value_parser = parse_column)]
        column: ColumnKey,
    },
    /// Show every column again
    Reset,
}

pub fn run(global: &GlobalArgs, command: ColumnsCommand) -> Result<()> {
    let store = global.visibility_store();
    let mut visible = store.load();

    match command {
        ColumnsCommand::List => {}
        ColumnsCommand::Toggle { column } => {
            if !visible.toggle(column) {
                println!("{column} is the last visible column; leaving it shown");
                return Ok(());
            }
            store.save(&visible).with_context(|| {
                format!(
                    "failed to save column preference in {}",
                    global.prefs_dir.display()
                )
            })?;
        }
        ColumnsCommand::Reset => {
            visible = VisibleColumns::all();
            store.save(&visible).with_context(|| {
                format!(
                    "failed to save column preference in {}",
                    global.prefs_dir.display()
                )
            })?;
        }
    }

    for key in ColumnKey::ALL {
        let mark = if visible.contains(key) { 'x' } else { ' ' };
        println!("[{mark}] {}", key.as_str());
    }
    Ok(())
}
