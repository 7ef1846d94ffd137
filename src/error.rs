use thiserror::Error;

/// Failure while retrieving or decoding a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Network failure or a non-success HTTP status.
    #[error("transport error: {0}")]
    Transport(String),
    /// Malformed JSON, malformed base64 or an unexpected payload shape.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Failure while reading or writing the persisted column preference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    #[error("preference storage unavailable: {0}")]
    Backend(String),
    #[error("stored preference is corrupt: {0}")]
    Corrupt(String),
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}

impl From<base64::DecodeError> for FetchError {
    fn from(err: base64::DecodeError) -> Self {
        FetchError::Decode(format!("invalid base64 content: {err}"))
    }
}
