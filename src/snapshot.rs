use std::future::Future;

use base64::prelude::{Engine, BASE64_STANDARD};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::FetchError;
use crate::model::{normalize, RawRecord, Row};

/// One complete fetched report, keyed by `Symbol` in delivery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    rows: Vec<Row>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Normalize raw records, dropping rows without a symbol and keeping the
    /// first occurrence of a duplicated symbol.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = RawRecord>,
    {
        let mut by_symbol: IndexMap<String, Row> = IndexMap::new();
        for record in records {
            let row = normalize(&record);
            if row.symbol.is_empty() {
                log::warn!("dropping record without a symbol");
                continue;
            }
            if by_symbol.contains_key(&row.symbol) {
                log::warn!("dropping duplicate record for {}", row.symbol);
                continue;
            }
            by_symbol.insert(row.symbol.clone(), row);
        }

        Self {
            rows: by_symbol.into_values().collect(),
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, symbol: &str) -> Option<&Row> {
        self.rows.iter().find(|row| row.symbol == symbol)
    }

    /// As-of timestamp. The report repeats it on every row, so the first row
    /// is authoritative.
    pub fn last_updated(&self) -> Option<&str> {
        self.rows
            .first()
            .map(|row| row.last_updated.as_str())
            .filter(|stamp| !stamp.is_empty())
    }
}

/// Anything able to produce the current snapshot on demand.
pub trait SnapshotSource {
    fn fetch(&self) -> impl Future<Output = Result<Snapshot, FetchError>>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    Records(Vec<RawRecord>),
    Envelope(ContentEnvelope),
}

/// Wrapper returned by source-control content APIs.
#[derive(Deserialize)]
struct ContentEnvelope {
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

impl ContentEnvelope {
    fn into_records(self) -> Result<Vec<RawRecord>, FetchError> {
        if let Some(encoding) = self.encoding.as_deref() {
            if !encoding.eq_ignore_ascii_case("base64") {
                return Err(FetchError::Decode(format!(
                    "unsupported content encoding `{encoding}`"
                )));
            }
        }

        // content APIs wrap base64 at fixed widths
        let compact: String = self
            .content
            .chars()
            .filter(|ch| !ch.is_ascii_whitespace())
            .collect();
        let bytes = BASE64_STANDARD.decode(compact.as_bytes())?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Decode a response body that is either a JSON array of records or a
/// base64 content envelope.
pub fn decode_snapshot(bytes: &[u8]) -> Result<Snapshot, FetchError> {
    let payload: Payload = serde_json::from_slice(bytes).map_err(|err| {
        FetchError::Decode(format!(
            "expected a record array or a content envelope: {err}"
        ))
    })?;

    let records = match payload {
        Payload::Records(records) => records,
        Payload::Envelope(envelope) => envelope.into_records()?,
    };

    Ok(Snapshot::from_records(records))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {"Symbol": "AAA", "Company Name": "Alpha", "Current Price": 100, "Last Updated": "2024-07-01 16:00"},
        {"Symbol": "BBB", "Company Name": "Beta", "Current Price": 50, "Last Updated": "2024-07-01 16:00"}
    ]"#;

    #[test]
    fn decodes_raw_array() {
        let snapshot = decode_snapshot(SAMPLE.as_bytes()).expect("raw array");
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.rows()[0].symbol, "AAA");
        assert_eq!(snapshot.last_updated(), Some("2024-07-01 16:00"));
    }

    #[test]
    fn decodes_wrapped_base64_envelope() {
        let encoded = BASE64_STANDARD.encode(SAMPLE);
        let wrapped = encoded
            .as_bytes()
            .chunks(60)
            .map(|chunk| std::str::from_utf8(chunk).expect("ascii"))
            .collect::<Vec<_>>()
            .join("\n");
        let body = serde_json::json!({
            "name": "stock_analysis_report.json",
            "encoding": "base64",
            "content": wrapped,
        })
        .to_string();

        let snapshot = decode_snapshot(body.as_bytes()).expect("envelope");
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.get("BBB").is_some());
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert!(matches!(
            decode_snapshot(b"not json"),
            Err(FetchError::Decode(_))
        ));
        assert!(matches!(
            decode_snapshot(br#"{"content": "%%%not-base64%%%"}"#),
            Err(FetchError::Decode(_))
        ));
        assert!(matches!(
            decode_snapshot(br#"{"content": "W10=", "encoding": "utf-16"}"#),
            Err(FetchError::Decode(_))
        ));
        assert!(matches!(
            decode_snapshot(br#"[1, 2, 3]"#),
            Err(FetchError::Decode(_))
        ));
    }

    #[test]
    fn empty_snapshot_has_no_timestamp() {
        let snapshot = decode_snapshot(b"[]").expect("empty array");
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.last_updated(), None);
    }

    #[test]
    fn duplicate_and_blank_symbols_are_dropped() {
        let snapshot = decode_snapshot(
            br#"[
                {"Symbol": "AAA", "Current Price": 1},
                {"Symbol": "AAA", "Current Price": 2},
                {"Company Name": "No ticker"}
            ]"#,
        )
        .expect("records");

        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            snapshot.get("AAA").map(|row| row.current_price),
            Some(crate::model::Metric::Present(1.0))
        );
    }
}
