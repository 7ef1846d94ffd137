use leptos::*;
use stock_screener::{ColumnKey, TableQuery};

use super::dashboard::{PreferenceStore, QuerySignal, VisibilitySignal};

#[component]
pub fn ColumnPicker() -> impl IntoView {
    let visible = use_context::<VisibilitySignal>().expect("visibility context missing");
    let query = use_context::<QuerySignal>().expect("query context missing");
    let store = use_context::<PreferenceStore>().expect("preference store context missing");
    let store_for_reset = store.clone();

    view! {
        <section class="column-picker">
            <h2>"Columns"</h2>
            <div class="column-picker__options">
                <For
                    each=move || ColumnKey::ALL
                    key=|key| *key
                    children=move |key: ColumnKey| {
                        let store = store.clone();
                        view! {
                            <label class="column-picker__option">
                                <input
                                    type="checkbox"
                                    prop:checked=move || visible.0.with(|set| set.contains(key))
                                    prop:disabled=move || visible.0.with(|set| set.len() == 1 && set.contains(key))
                                    on:change=move |_| {
                                        let next = visible.0.with_untracked(|current| store.0.toggle(current, key));
                                        visible.0.set(next);
                                    }
                                />
                                <span>{key.label()}</span>
                            </label>
                        }
                    }
                />
            </div>
            <button class="column-picker__reset" on:click=move |_| visible.0.set(store_for_reset.0.reset())>
                "Show all columns"
            </button>
            <button class="column-picker__clear" on:click=move |_| query.0.update(TableQuery::clear_filters)>
                "Clear filters"
            </button>
        </section>
    }
}
