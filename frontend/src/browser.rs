use gloo_net::http::Request;
use stock_screener::error::{FetchError, PersistenceError};
use stock_screener::snapshot::{Snapshot, SnapshotSource, decode_snapshot};
use wasm_bindgen::JsValue;

/// Report path used when the page carries no `screener-source` meta tag.
const FALLBACK_SOURCE: &str = "stock_analysis_report.json";

/// Fetches the report with the browser's `fetch`.
pub struct BrowserSource {
    url: String,
}

impl BrowserSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl SnapshotSource for BrowserSource {
    async fn fetch(&self) -> Result<Snapshot, FetchError> {
        let response = Request::get(&self.url)
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        if !response.ok() {
            return Err(FetchError::Transport(format!(
                "{} returned {} {}",
                self.url,
                response.status(),
                response.status_text()
            )));
        }

        let body = response
            .binary()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        decode_snapshot(&body)
    }
}

/// `window.localStorage`, resolved on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

impl LocalStorage {
    fn handle() -> Result<web_sys::Storage, PersistenceError> {
        web_sys::window()
            .ok_or_else(|| PersistenceError::Backend("no window".to_string()))?
            .local_storage()
            .map_err(js_error)?
            .ok_or_else(|| PersistenceError::Backend("localStorage unavailable".to_string()))
    }
}

impl stock_screener::PreferenceStorage for LocalStorage {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Self::handle()?.get_item(key).map_err(js_error)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        Self::handle()?.set_item(key, value).map_err(js_error)
    }
}

fn js_error(err: JsValue) -> PersistenceError {
    PersistenceError::Backend(format!("{err:?}"))
}

/// Report URL from `<meta name="screener-source" content="...">`.
pub fn resolve_source_url() -> String {
    web_sys::window()
        .and_then(|window| window.document())
        .and_then(|document| {
            document
                .query_selector(r#"meta[name="screener-source"]"#)
                .ok()
                .flatten()
        })
        .and_then(|meta| meta.get_attribute("content"))
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| FALLBACK_SOURCE.to_string())
}
