use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::columns::ColumnKey;
use crate::constants::{DEFAULT_PREFS_DIR, DEFAULT_SOURCE_URL};
use crate::preferences::{FileStorage, VisibilityStore, VisibleColumns};
use crate::presenter::{SortSpec, TableQuery};
use crate::visibility::ColumnsCommand;

const SOURCE_URL_ENV: &str = "SCREENER_SOURCE_URL";

#[derive(Debug, Parser)]
#[command(author, version, about = "Polling stock screener table viewer")]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn into_parts(self) -> (GlobalArgs, Command) {
        (self.global, self.command.unwrap_or_default())
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the snapshot once and print the table
    Show(ShowArgs),
    /// Refresh the snapshot every 30 seconds and reprint the table
    Watch(WatchArgs),
    /// List or change which columns are shown
    #[command(subcommand)]
    Columns(ColumnsCommand),
}

impl Default for Command {
    fn default() -> Self {
        Command::Watch(WatchArgs::default())
    }
}

#[derive(Debug, Args, Clone)]
pub struct GlobalArgs {
    /// Log level for JSON log lines on stderr/stdout
    #[arg(long, global = true, env = "SCREENER_LOG", default_value = "warn")]
    pub log_level: String,

    /// Directory holding the saved column preference
    #[arg(long, global = true, env = "SCREENER_PREFS_DIR", default_value = DEFAULT_PREFS_DIR)]
    pub prefs_dir: PathBuf,
}

impl GlobalArgs {
    pub fn visibility_store(&self) -> VisibilityStore<FileStorage> {
        VisibilityStore::new(FileStorage::new(&self.prefs_dir))
    }
}

#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// Report URL: a JSON array of rows or a base64 content envelope
    #[arg(long, env = "SCREENER_SOURCE_URL", default_value = DEFAULT_SOURCE_URL)]
    pub url: String,
}

impl Default for SourceArgs {
    fn default() -> Self {
        Self {
            url: std::env::var(SOURCE_URL_ENV)
                .ok()
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string()),
        }
    }
}

#[derive(Debug, Args, Clone, Default)]
pub struct ViewArgs {
    /// Sort by this column (e.g. `current-price`); defaults to VS Average Volume, descending
    #[arg(long, value_parser = parse_column)]
    pub sort: Option<ColumnKey>,

    /// Sort the chosen column in descending order
    #[arg(long, requires = "sort")]
    pub desc: bool,

    /// Keep rows whose COLUMN matches VALUE; repeat to combine
    #[arg(long = "filter", value_name = "COLUMN=VALUE", value_parser = parse_filter)]
    pub filters: Vec<(ColumnKey, String)>,

    /// Ignore the saved column preference and show every column
    #[arg(long)]
    pub all_columns: bool,
}

impl ViewArgs {
    pub fn query(&self) -> TableQuery {
        let mut query = TableQuery {
            sort: self.sort.map(|key| {
                if self.desc {
                    SortSpec::descending(key)
                } else {
                    SortSpec::ascending(key)
                }
            }),
            ..TableQuery::default()
        };
        for (key, value) in &self.filters {
            query
                .filters
                .entry(*key)
                .or_default()
                .insert(value.clone());
        }
        query
    }

    pub fn visible_columns(&self, store: &VisibilityStore<FileStorage>) -> VisibleColumns {
        if self.all_columns {
            VisibleColumns::all()
        } else {
            store.load()
        }
    }
}

#[derive(Debug, Args, Clone, Default)]
pub struct ShowArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub view: ViewArgs,
}

#[derive(Debug, Args, Clone, Default)]
pub struct WatchArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub view: ViewArgs,

    /// Stop after this many successful refreshes
    #[arg(short, long)]
    pub limit: Option<u64>,
}

pub fn parse_column(raw: &str) -> Result<ColumnKey, String> {
    raw.parse::<ColumnKey>().map_err(|err| {
        let known: Vec<&str> = ColumnKey::ALL.iter().map(|key| key.as_str()).collect();
        format!("{err}; expected one of: {}", known.join(", "))
    })
}

fn parse_filter(raw: &str) -> Result<(ColumnKey, String), String> {
    let (column, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=VALUE, got `{raw}`"))?;
    Ok((parse_column(column.trim())?, value.to_string()))
}
