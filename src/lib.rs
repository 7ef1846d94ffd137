//! Polling stock-screener engine: snapshot decoding, the typed row model,
//! column registry, visibility preferences, refresh state machine and table
//! composition. The terminal viewer lives behind the non-wasm modules.

pub mod columns;
pub mod constants;
pub mod error;
pub mod format;
pub mod model;
pub mod poller;
pub mod preferences;
pub mod presenter;
pub mod snapshot;

#[cfg(not(target_arch = "wasm32"))]
pub mod cli;
#[cfg(not(target_arch = "wasm32"))]
pub mod fetch;
#[cfg(not(target_arch = "wasm32"))]
pub mod logging;
#[cfg(not(target_arch = "wasm32"))]
pub mod render;
#[cfg(not(target_arch = "wasm32"))]
pub mod show;
#[cfg(not(target_arch = "wasm32"))]
pub mod visibility;
#[cfg(not(target_arch = "wasm32"))]
pub mod watch;

pub use columns::{build_columns, ColumnDescriptor, ColumnKey};
pub use error::{FetchError, PersistenceError};
pub use model::{normalize, Metric, Row, RowTone};
pub use poller::{Completion, FetchTicket, PollConfig, PollPhase, PollingController};
pub use preferences::{PreferenceStorage, VisibilityStore, VisibleColumns};
pub use presenter::{present, SortDirection, SortSpec, TableQuery, TableView};
pub use snapshot::{decode_snapshot, Snapshot, SnapshotSource};
