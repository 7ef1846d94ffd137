use std::rc::Rc;

use leptos::*;
use stock_screener::{
    FetchTicket, PollConfig, PollingController, TableQuery, VisibilityStore, VisibleColumns,
};

use super::{column_picker::ColumnPicker, screener_table::ScreenerTable, status::StatusPanel};

#[cfg(target_arch = "wasm32")]
pub type Storage = crate::browser::LocalStorage;
#[cfg(not(target_arch = "wasm32"))]
pub type Storage = stock_screener::preferences::MemoryStorage;

#[derive(Clone, Copy)]
pub struct ControllerSignal(pub RwSignal<PollingController>);

#[derive(Clone, Copy)]
pub struct VisibilitySignal(pub RwSignal<VisibleColumns>);

#[derive(Clone, Copy)]
pub struct QuerySignal(pub RwSignal<TableQuery>);

#[derive(Clone)]
pub struct PreferenceStore(pub Rc<VisibilityStore<Storage>>);

/// Starts a fetch now unless one is already in flight.
#[derive(Clone)]
pub struct RefreshCallback(pub Rc<dyn Fn()>);

/// Top-level screener wrapper providing shared application state via context.
#[component]
pub fn Dashboard() -> impl IntoView {
    let (controller, first_ticket) = PollingController::start(PollConfig::default());
    let controller = create_rw_signal(controller);

    let store = Rc::new(VisibilityStore::new(Storage::default()));
    let visible = create_rw_signal(store.load());
    let query = create_rw_signal(TableQuery::default());

    let refresh = start_polling(controller, first_ticket);

    provide_context(ControllerSignal(controller));
    provide_context(VisibilitySignal(visible));
    provide_context(QuerySignal(query));
    provide_context(PreferenceStore(store));
    provide_context(RefreshCallback(refresh));

    view! {
        <div class="dashboard">
            <header class="dashboard__header">
                <h1>"Stock Screener"</h1>
                <p>"Screening report, refreshed every 30 seconds."</p>
            </header>
            <section class="dashboard__body">
                <div class="dashboard__main">
                    <StatusPanel />
                    <ScreenerTable />
                </div>
                <aside class="dashboard__sidebar">
                    <ColumnPicker />
                </aside>
            </section>
        </div>
    }
}

#[cfg(target_arch = "wasm32")]
fn start_polling(controller: RwSignal<PollingController>, first: FetchTicket) -> Rc<dyn Fn()> {
    use gloo_timers::callback::Interval;

    use crate::browser::{BrowserSource, resolve_source_url};

    let url = resolve_source_url();
    log::info!("polling {url}");
    let source = Rc::new(BrowserSource::new(url));
    spawn_fetch(controller, source.clone(), first);

    let tick: Rc<dyn Fn()> = Rc::new(move || {
        if let Some(ticket) = controller.try_update(|poller| poller.begin_fetch()).flatten() {
            spawn_fetch(controller, source.clone(), ticket);
        }
    });

    let period = controller.with_untracked(|poller| poller.config().interval.as_millis());
    let on_tick = tick.clone();
    let interval = Interval::new(u32::try_from(period).unwrap_or(u32::MAX), move || on_tick());

    on_cleanup(move || {
        drop(interval);
        controller.try_update(PollingController::teardown);
    });

    tick
}

#[cfg(target_arch = "wasm32")]
fn spawn_fetch(
    controller: RwSignal<PollingController>,
    source: Rc<crate::browser::BrowserSource>,
    ticket: FetchTicket,
) {
    use stock_screener::{Completion, SnapshotSource};
    use wasm_bindgen_futures::spawn_local;

    spawn_local(async move {
        let result = source.fetch().await;
        match controller.try_update(|poller| poller.complete(ticket, result)) {
            Some(Completion::Applied { rows }) => {
                log::debug!("fetch #{} applied {rows} rows", ticket.seq());
            }
            Some(_) => {}
            None => log::debug!("screener unmounted; dropping fetch #{}", ticket.seq()),
        }
    });
}

#[cfg(not(target_arch = "wasm32"))]
fn start_polling(_controller: RwSignal<PollingController>, first: FetchTicket) -> Rc<dyn Fn()> {
    log::debug!("no browser runtime; fetch #{} never starts", first.seq());
    Rc::new(|| {})
}
