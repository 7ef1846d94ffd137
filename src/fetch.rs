use reqwest::Client;

use crate::error::FetchError;
use crate::snapshot::{decode_snapshot, Snapshot, SnapshotSource};

/// Fetches the report over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    url: String,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Result<Self, FetchError> {
        // content APIs reject requests without a user agent
        let client = Client::builder()
            .user_agent(concat!("stock-screener/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl SnapshotSource for HttpSource {
    async fn fetch(&self) -> Result<Snapshot, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Transport(format!(
                "{} returned {status}",
                self.url
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        decode_snapshot(&body)
    }
}
