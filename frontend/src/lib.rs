use leptos::*;
use leptos_meta::{Title, provide_meta_context};
use wasm_bindgen::prelude::wasm_bindgen;

#[cfg(target_arch = "wasm32")]
mod browser;
mod components;
mod logging;

pub use components::dashboard::Dashboard;
pub use logging::init_logging;

/// Root component bootstrapping the screener.
#[component]
pub fn App() -> impl IntoView {
    provide_meta_context();

    view! {
        <Title text="Stock Screener" />
        <main class="app-root">
            <Dashboard />
        </main>
    }
}

/// WASM entry point called automatically by `trunk`.
#[wasm_bindgen(start)]
pub fn main() -> Result<(), wasm_bindgen::JsValue> {
    init_logging();
    console_error_panic_hook::set_once();

    leptos::mount_to_body(|| view! { <App /> });
    Ok(())
}
