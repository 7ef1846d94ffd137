use leptos::*;
use stock_screener::columns::{Cell, ColumnKey, FilterOption};
use stock_screener::presenter::{HeaderView, cycle_sort};
use stock_screener::{SortDirection, TableQuery, build_columns, present};

use super::dashboard::{ControllerSignal, QuerySignal, VisibilitySignal};

pub fn sort_marker(direction: Option<SortDirection>) -> &'static str {
    match direction {
        Some(SortDirection::Ascending) => " ▲",
        Some(SortDirection::Descending) => " ▼",
        None => "",
    }
}

#[component]
pub fn ScreenerTable() -> impl IntoView {
    let controller = use_context::<ControllerSignal>().expect("controller context missing");
    let visible = use_context::<VisibilitySignal>().expect("visibility context missing");
    let query = use_context::<QuerySignal>().expect("query context missing");

    let columns = create_memo(move |_| {
        controller
            .0
            .with(|poller| build_columns(poller.snapshot().rows()))
    });

    let table = create_memo(move |_| {
        controller.0.with(|poller| {
            columns.with(|columns| {
                visible.0.with(|visible| {
                    query
                        .0
                        .with(|query| present(poller.snapshot(), columns, visible, query))
                })
            })
        })
    });

    view! {
        <section class="screener-table">
            <table>
                <thead>
                    <tr>
                        {move || {
                            table.with(|table| {
                                table
                                    .headers
                                    .iter()
                                    .cloned()
                                    .map(|header| header_cell(header, query.0))
                                    .collect_view()
                            })
                        }}
                    </tr>
                </thead>
                <tbody>
                    {move || {
                        table.with(|table| {
                            table
                                .rows
                                .iter()
                                .map(|row| {
                                    view! {
                                        <tr class=row.class.unwrap_or_default() data-symbol=row.symbol.clone()>
                                            {row.cells.iter().map(body_cell).collect_view()}
                                        </tr>
                                    }
                                })
                                .collect_view()
                        })
                    }}
                </tbody>
            </table>
            <Show when=move || table.with(|table| table.rows.is_empty())>
                <p class="screener-table__empty">"No matching symbols"</p>
            </Show>
        </section>
    }
}

fn header_cell(header: HeaderView, query: RwSignal<TableQuery>) -> impl IntoView {
    let key = header.key;
    let sorted = header.sort.is_some();
    let filter = (!header.filter_options.is_empty())
        .then(|| filter_menu(key, header.filter_options, query));

    view! {
        <th class="screener-table__header" class:sorted=sorted>
            <button
                class="screener-table__sort"
                on:click=move |_| query.update(|query| query.sort = cycle_sort(query.sort, key))
            >
                {header.label}
                {sort_marker(header.sort)}
            </button>
            {filter}
        </th>
    }
}

fn filter_menu(
    key: ColumnKey,
    options: Vec<FilterOption>,
    query: RwSignal<TableQuery>,
) -> impl IntoView {
    view! {
        <details class="column-filter">
            <summary>"Filter"</summary>
            {options
                .into_iter()
                .map(move |option| {
                    let value = option.value;
                    let checked_value = value.clone();
                    view! {
                        <label class="column-filter__option">
                            <input
                                type="checkbox"
                                prop:checked=move || query.with(|query| query.is_selected(key, &checked_value))
                                on:change=move |_| query.update(|query| query.toggle_filter_value(key, &value))
                            />
                            <span>{option.text}</span>
                        </label>
                    }
                })
                .collect_view()}
        </details>
    }
}

fn body_cell(cell: &Cell) -> View {
    match &cell.href {
        Some(href) => view! {
            <td title=cell.title.clone()>
                <a href=href.clone() target="_blank" rel="noopener noreferrer">{cell.text.clone()}</a>
            </td>
        }
        .into_view(),
        None => view! { <td title=cell.title.clone()>{cell.text.clone()}</td> }.into_view(),
    }
}
