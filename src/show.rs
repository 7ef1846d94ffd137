use anyhow::{Context, Result};
use log::Level;
use serde_json::json;

use crate::cli::{GlobalArgs, ShowArgs};
use crate::columns::build_columns;
use crate::fetch::HttpSource;
use crate::logging;
use crate::presenter::present;
use crate::render::render_table;
use crate::snapshot::SnapshotSource;

pub async fn run(global: &GlobalArgs, args: ShowArgs) -> Result<()> {
    let source = HttpSource::new(&args.source.url)?;
    let snapshot = source
        .fetch()
        .await
        .with_context(|| format!("failed to fetch snapshot from {}", source.url()))?;
    logging::event(
        Level::Info,
        "snapshot_loaded",
        "fetched report",
        json!({ "url": source.url(), "rows": snapshot.len() }),
    );

    let visible = args.view.visible_columns(&global.visibility_store());
    let columns = build_columns(snapshot.rows());
    let view = present(&snapshot, &columns, &visible, &args.view.query());
    print!("{}", render_table(&view));
    Ok(())
}
