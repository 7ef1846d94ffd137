use std::future::{self, Future};
use std::pin::Pin;

use anyhow::Result;
use log::Level;
use serde_json::json;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::cli::{GlobalArgs, WatchArgs};
use crate::columns::build_columns;
use crate::error::FetchError;
use crate::fetch::HttpSource;
use crate::logging;
use crate::poller::{Completion, FetchTicket, PollConfig, PollingController};
use crate::presenter::present;
use crate::render::{render_table, status_line};
use crate::snapshot::{Snapshot, SnapshotSource};

type PendingFetch<'a> = Pin<Box<dyn Future<Output = Result<Snapshot, FetchError>> + 'a>>;

enum Step {
    Shutdown,
    Completed(Result<Snapshot, FetchError>),
    Tick,
}

/// Run the refresh loop against `source` until `shutdown` resolves or
/// `limit` successful refreshes have been applied. `on_update` sees every
/// completion that was not discarded.
pub async fn drive<'a, S, Sd, F>(
    source: &'a S,
    config: PollConfig,
    limit: Option<u64>,
    shutdown: Sd,
    mut on_update: F,
) -> PollingController
where
    S: SnapshotSource + 'a,
    Sd: Future<Output = ()>,
    F: FnMut(&PollingController, &Completion),
{
    let (mut controller, ticket) = PollingController::start(config);
    let mut in_flight: Option<(FetchTicket, PendingFetch<'a>)> =
        Some((ticket, Box::pin(source.fetch())));

    let mut ticker = time::interval_at(Instant::now() + config.interval, config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    loop {
        let step = tokio::select! {
            biased;
            _ = &mut shutdown => Step::Shutdown,
            result = await_in_flight(&mut in_flight), if in_flight.is_some() => Step::Completed(result),
            _ = ticker.tick() => Step::Tick,
        };

        match step {
            Step::Shutdown => {
                log::info!("shutdown requested; stopping refresh loop");
                controller.teardown();
                break;
            }
            Step::Completed(result) => {
                let Some((ticket, _)) = in_flight.take() else {
                    continue;
                };
                let completion = controller.complete(ticket, result);
                if completion != Completion::Discarded {
                    on_update(&controller, &completion);
                }
                if limit.is_some_and(|limit| controller.refresh_count() >= limit) {
                    controller.teardown();
                    break;
                }
            }
            Step::Tick => match controller.begin_fetch() {
                Some(ticket) => in_flight = Some((ticket, Box::pin(source.fetch()))),
                None => log::debug!("tick skipped"),
            },
        }
    }

    controller
}

async fn await_in_flight(
    in_flight: &mut Option<(FetchTicket, PendingFetch<'_>)>,
) -> Result<Snapshot, FetchError> {
    match in_flight {
        Some((_, fetch)) => fetch.as_mut().await,
        None => future::pending().await,
    }
}

pub async fn run(global: &GlobalArgs, args: WatchArgs) -> Result<()> {
    let source = HttpSource::new(&args.source.url)?;
    let store = global.visibility_store();
    let query = args.view.query();
    let config = PollConfig::default();

    logging::event(
        Level::Info,
        "watch_started",
        "polling report",
        json!({
            "url": source.url(),
            "interval_ms": config.interval.as_millis() as u64,
            "limit": args.limit,
        }),
    );

    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            log::error!("failed to listen for ctrl-c: {err}");
            future::pending::<()>().await;
        }
    };

    let controller = drive(&source, config, args.limit, shutdown, |controller, _| {
        // re-read each refresh so `columns toggle` in another shell applies
        let visible = args.view.visible_columns(&store);
        let snapshot = controller.snapshot();
        let columns = build_columns(snapshot.rows());
        let view = present(snapshot, &columns, &visible, &query);
        println!("{}", status_line(controller));
        print!("{}", render_table(&view));
    })
    .await;

    logging::event(
        Level::Info,
        "watch_stopped",
        "polling stopped",
        json!({ "refreshes": controller.refresh_count() }),
    );
    Ok(())
}
