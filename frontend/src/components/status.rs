use leptos::*;
use stock_screener::{PollPhase, PollingController};

use super::dashboard::{ControllerSignal, RefreshCallback};

/// CSS modifier and label for the refresh badge.
pub fn status_badge(phase: PollPhase) -> (&'static str, &'static str) {
    match phase {
        PollPhase::Idle => ("status--idle", "Idle"),
        PollPhase::Loading => ("status--loading", "Loading"),
        PollPhase::Success => ("status--live", "Up to date"),
        PollPhase::Failed => ("status--failed", "Refresh failed"),
    }
}

/// Message shown under the badge after a failed refresh.
pub fn error_notice(controller: &PollingController) -> Option<String> {
    let err = controller.last_error()?;
    Some(if controller.is_stale() {
        format!("Showing last good data. {err}")
    } else {
        format!("Could not load the report. {err}")
    })
}

#[component]
pub fn StatusPanel() -> impl IntoView {
    let controller = use_context::<ControllerSignal>().expect("controller context missing");
    let refresh = use_context::<RefreshCallback>().expect("refresh callback context missing");

    let last_updated = create_memo(move |_| {
        controller
            .0
            .with(|poller| poller.snapshot().last_updated().map(str::to_string))
    });
    let error = create_memo(move |_| controller.0.with(error_notice));

    view! {
        <section class="status-panel">
            <div class="status-panel__status">
                {move || {
                    let (class, label) = status_badge(controller.0.with(|poller| poller.phase()));
                    view! { <span class=format!("status-badge {class}")>{label}</span> }
                }}
                <span class="status-panel__total">
                    {move || format!("{} Symbols", controller.0.with(|poller| poller.snapshot().len()))}
                </span>
                <button
                    class="status-panel__refresh"
                    prop:disabled=move || controller.0.with(|poller| poller.is_loading())
                    on:click=move |_| (refresh.0)()
                >
                    "Refresh"
                </button>
            </div>
            <Show when=move || last_updated.with(Option::is_some)>
                <p class="status-panel__updated">
                    {move || format!("Last Updated: {}", last_updated.get().unwrap_or_default())}
                </p>
            </Show>
            <Show when=move || error.with(Option::is_some)>
                <p class="status-panel__error">
                    {move || error.get().unwrap_or_default()}
                </p>
            </Show>
        </section>
    }
}
