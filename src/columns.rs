use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use indexmap::IndexSet;
use thiserror::Error;

use crate::constants::{BLANK_OPTION, QUOTE_URL_PREFIX};
use crate::format;
use crate::model::{field, Metric, Row};

/// Every displayable column, in declaration (display) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColumnKey {
    CompanyName,
    Symbol,
    Sector,
    Industry,
    CurrentPrice,
    LatestMa,
    PriceTarget,
    DayLow,
    DayHigh,
    DifferenceFromDayLow,
    DifferenceFromDayHigh,
    DifferenceFromMa,
    DifferenceFromOpen,
    ChangeFromYesterday,
    ChangeFromLastReport,
    LatestVolume,
    VsAverageVolume,
    MarketCap,
    PeRatio,
    TrailingPe,
    TrailingPeg,
    TrailingPs,
    Roe,
    Dte,
    Beta,
    QuickRatio,
    EarningDate,
    EarningTime,
    EarningDayOfWeek,
    StockSentiment,
    RowColor,
    CompanySummary,
}

impl ColumnKey {
    pub const ALL: [ColumnKey; 32] = [
        ColumnKey::CompanyName,
        ColumnKey::Symbol,
        ColumnKey::Sector,
        ColumnKey::Industry,
        ColumnKey::CurrentPrice,
        ColumnKey::LatestMa,
        ColumnKey::PriceTarget,
        ColumnKey::DayLow,
        ColumnKey::DayHigh,
        ColumnKey::DifferenceFromDayLow,
        ColumnKey::DifferenceFromDayHigh,
        ColumnKey::DifferenceFromMa,
        ColumnKey::DifferenceFromOpen,
        ColumnKey::ChangeFromYesterday,
        ColumnKey::ChangeFromLastReport,
        ColumnKey::LatestVolume,
        ColumnKey::VsAverageVolume,
        ColumnKey::MarketCap,
        ColumnKey::PeRatio,
        ColumnKey::TrailingPe,
        ColumnKey::TrailingPeg,
        ColumnKey::TrailingPs,
        ColumnKey::Roe,
        ColumnKey::Dte,
        ColumnKey::Beta,
        ColumnKey::QuickRatio,
        ColumnKey::EarningDate,
        ColumnKey::EarningTime,
        ColumnKey::EarningDayOfWeek,
        ColumnKey::StockSentiment,
        ColumnKey::RowColor,
        ColumnKey::CompanySummary,
    ];

    /// Field name in the report, also used as the persisted key.
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnKey::CompanyName => field::COMPANY_NAME,
            ColumnKey::Symbol => field::SYMBOL,
            ColumnKey::Sector => field::SECTOR,
            ColumnKey::Industry => field::INDUSTRY,
            ColumnKey::CurrentPrice => field::CURRENT_PRICE,
            ColumnKey::LatestMa => field::LATEST_MA,
            ColumnKey::PriceTarget => field::PRICE_TARGET,
            ColumnKey::DayLow => field::DAY_LOW,
            ColumnKey::DayHigh => field::DAY_HIGH,
            ColumnKey::DifferenceFromDayLow => field::DIFFERENCE_FROM_DAY_LOW,
            ColumnKey::DifferenceFromDayHigh => field::DIFFERENCE_FROM_DAY_HIGH,
            ColumnKey::DifferenceFromMa => field::DIFFERENCE_FROM_MA,
            ColumnKey::DifferenceFromOpen => field::DIFFERENCE_FROM_OPEN,
            ColumnKey::ChangeFromYesterday => field::CHANGE_FROM_YESTERDAY,
            ColumnKey::ChangeFromLastReport => field::CHANGE_FROM_LAST_REPORT,
            ColumnKey::LatestVolume => field::LATEST_VOLUME,
            ColumnKey::VsAverageVolume => field::VS_AVERAGE_VOLUME,
            ColumnKey::MarketCap => field::MARKET_CAP,
            ColumnKey::PeRatio => field::PE_RATIO,
            ColumnKey::TrailingPe => field::TRAILING_PE,
            ColumnKey::TrailingPeg => field::TRAILING_PEG,
            ColumnKey::TrailingPs => field::TRAILING_PS,
            ColumnKey::Roe => field::ROE,
            ColumnKey::Dte => field::DTE,
            ColumnKey::Beta => field::BETA,
            ColumnKey::QuickRatio => field::QUICK_RATIO,
            ColumnKey::EarningDate => field::EARNING_DATE,
            ColumnKey::EarningTime => field::EARNING_TIME,
            ColumnKey::EarningDayOfWeek => field::EARNING_DAY_OF_WEEK,
            ColumnKey::StockSentiment => field::STOCK_SENTIMENT,
            ColumnKey::RowColor => field::ROW_COLOR,
            ColumnKey::CompanySummary => field::COMPANY_SUMMARY,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ColumnKey::DifferenceFromDayLow => "Difference from Day Low (%)",
            ColumnKey::DifferenceFromDayHigh => "Difference from Day High (%)",
            other => other.as_str(),
        }
    }

    pub fn kind(self) -> ColumnKind {
        use ColumnKey::*;
        match self {
            CompanyName | Symbol | Sector | Industry | EarningTime | EarningDayOfWeek
            | StockSentiment | RowColor | CompanySummary => ColumnKind::Text,
            EarningDate => ColumnKind::Date,
            CurrentPrice | LatestMa | PriceTarget | DayLow | DayHigh => ColumnKind::Price,
            DifferenceFromDayLow | DifferenceFromDayHigh | DifferenceFromMa
            | DifferenceFromOpen | ChangeFromYesterday | ChangeFromLastReport => {
                ColumnKind::Percent
            }
            LatestVolume | MarketCap => ColumnKind::Count,
            VsAverageVolume | PeRatio | TrailingPe | TrailingPeg | TrailingPs | Roe | Dte
            | Beta | QuickRatio => ColumnKind::Ratio,
        }
    }

    /// How categorical filters match, or `None` for columns without filters.
    pub fn filter_match(self) -> Option<FilterMatch> {
        use ColumnKey::*;
        match self {
            CompanyName | Sector | Industry | StockSentiment | RowColor => {
                Some(FilterMatch::Substring)
            }
            // partial dates and times would match unrelated values
            Symbol | EarningDate | EarningTime | EarningDayOfWeek => Some(FilterMatch::Exact),
            _ => None,
        }
    }

    pub fn cell(self, row: &Row) -> CellValue<'_> {
        use ColumnKey::*;
        match self {
            CompanyName => CellValue::Text(&row.company_name),
            Symbol => CellValue::Text(&row.symbol),
            Sector => CellValue::Text(&row.sector),
            Industry => CellValue::Text(&row.industry),
            CurrentPrice => CellValue::Number(row.current_price),
            LatestMa => CellValue::Number(row.latest_ma),
            PriceTarget => CellValue::Number(row.price_target),
            DayLow => CellValue::Number(row.day_low),
            DayHigh => CellValue::Number(row.day_high),
            DifferenceFromDayLow => CellValue::Number(row.difference_from_day_low),
            DifferenceFromDayHigh => CellValue::Number(row.difference_from_day_high),
            DifferenceFromMa => CellValue::Number(row.difference_from_ma),
            DifferenceFromOpen => CellValue::Number(row.difference_from_open),
            ChangeFromYesterday => CellValue::Number(row.change_from_yesterday),
            ChangeFromLastReport => CellValue::Number(row.change_from_last_report),
            LatestVolume => CellValue::Number(row.latest_volume),
            VsAverageVolume => CellValue::Number(row.vs_average_volume),
            MarketCap => CellValue::Number(row.market_cap),
            PeRatio => CellValue::Number(row.pe_ratio),
            TrailingPe => CellValue::Number(row.trailing_pe),
            TrailingPeg => CellValue::Number(row.trailing_peg),
            TrailingPs => CellValue::Number(row.trailing_ps),
            Roe => CellValue::Number(row.roe),
            Dte => CellValue::Number(row.dte),
            Beta => CellValue::Number(row.beta),
            QuickRatio => CellValue::Number(row.quick_ratio),
            EarningDate => CellValue::Date(&row.earning_date, row.earning_date_parsed),
            EarningTime => CellValue::Text(&row.earning_time),
            EarningDayOfWeek => CellValue::Text(&row.earning_day_of_week),
            StockSentiment => CellValue::Text(&row.stock_sentiment),
            RowColor => CellValue::Text(&row.row_color),
            CompanySummary => CellValue::Text(&row.company_summary),
        }
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown column `{0}`")]
pub struct UnknownColumn(pub String);

impl FromStr for ColumnKey {
    type Err = UnknownColumn;

    /// Accepts the report field name in any case, with spaces, dashes or
    /// underscores (`"Current Price"`, `current-price`, `CURRENT_PRICE`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = fold_key(s);
        ColumnKey::ALL
            .into_iter()
            .find(|key| fold_key(key.as_str()) == wanted)
            .ok_or_else(|| UnknownColumn(s.to_string()))
    }
}

fn fold_key(raw: &str) -> String {
    raw.chars()
        .filter(|ch| ch.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Date,
    Price,
    Percent,
    Ratio,
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMatch {
    Substring,
    Exact,
}

impl FilterMatch {
    /// An empty `wanted` selects rows whose value is blank.
    pub fn matches(self, candidate: &str, wanted: &str) -> bool {
        if wanted.is_empty() {
            return candidate.is_empty();
        }
        match self {
            FilterMatch::Substring => candidate.contains(wanted),
            FilterMatch::Exact => candidate == wanted,
        }
    }
}

/// Typed view of a single cell used by comparators and renderers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellValue<'a> {
    Text(&'a str),
    Date(&'a str, Option<NaiveDate>),
    Number(Metric),
}

impl<'a> CellValue<'a> {
    pub fn as_text(&self) -> Option<&'a str> {
        match *self {
            CellValue::Text(text) | CellValue::Date(text, _) => Some(text),
            CellValue::Number(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOption {
    pub text: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnFilter {
    pub mode: FilterMatch,
    pub options: Vec<FilterOption>,
}

/// Rendered cell: display text plus optional link and hover text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cell {
    pub text: String,
    pub href: Option<String>,
    pub title: Option<String>,
}

impl Cell {
    fn plain(text: String) -> Self {
        Self {
            text,
            ..Self::default()
        }
    }
}

/// Sort, filter and render behaviour for one column, bound to the filter
/// options of the rows it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub key: ColumnKey,
    pub label: &'static str,
    pub kind: ColumnKind,
    pub filter: Option<ColumnFilter>,
}

impl ColumnDescriptor {
    pub fn compare(&self, a: &Row, b: &Row) -> Ordering {
        match (self.key.cell(a), self.key.cell(b)) {
            (CellValue::Number(left), CellValue::Number(right)) => left.total_cmp(right),
            (CellValue::Date(left_text, left), CellValue::Date(right_text, right)) => {
                left.cmp(&right).then_with(|| compare_text(left_text, right_text))
            }
            (left, right) => compare_text(
                left.as_text().unwrap_or_default(),
                right.as_text().unwrap_or_default(),
            ),
        }
    }

    /// A row passes when no values are selected or when it matches any of them.
    pub fn matches_any(&self, row: &Row, selected: &BTreeSet<String>) -> bool {
        if selected.is_empty() {
            return true;
        }
        let Some(filter) = &self.filter else {
            return true;
        };
        let cell = self.key.cell(row);
        let candidate = cell.as_text().unwrap_or_default();
        selected
            .iter()
            .any(|wanted| filter.mode.matches(candidate, wanted))
    }

    pub fn render(&self, row: &Row) -> Cell {
        match self.key.cell(row) {
            CellValue::Text(text) if self.key == ColumnKey::CompanyName => Cell {
                text: text.to_string(),
                href: (!row.symbol.is_empty())
                    .then(|| format!("{QUOTE_URL_PREFIX}{}/", row.symbol)),
                title: (!row.company_summary.is_empty()).then(|| row.company_summary.clone()),
            },
            CellValue::Text(text) | CellValue::Date(text, _) => Cell::plain(text.to_string()),
            CellValue::Number(metric) => Cell::plain(match self.kind {
                ColumnKind::Percent => format::percent(metric),
                ColumnKind::Count => format::thousands(metric),
                _ => format::decimal(metric),
            }),
        }
    }
}

/// Locale-style ordering: case-insensitive first, raw bytes as tie-break so the
/// order stays total.
pub fn compare_text(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
        .then_with(|| a.cmp(b))
}

/// Build the registry for the given rows. Filter options are the distinct
/// values in first-seen order; a blank value is offered as `(blank)`.
pub fn build_columns(rows: &[Row]) -> Vec<ColumnDescriptor> {
    ColumnKey::ALL
        .into_iter()
        .map(|key| ColumnDescriptor {
            key,
            label: key.label(),
            kind: key.kind(),
            filter: key.filter_match().map(|mode| ColumnFilter {
                mode,
                options: distinct_options(rows, key),
            }),
        })
        .collect()
}

fn distinct_options(rows: &[Row], key: ColumnKey) -> Vec<FilterOption> {
    let distinct: IndexSet<&str> = rows
        .iter()
        .filter_map(|row| key.cell(row).as_text())
        .collect();

    distinct
        .into_iter()
        .map(|value| FilterOption {
            text: if value.is_empty() {
                BLANK_OPTION.to_string()
            } else {
                value.to_string()
            },
            value: value.to_string(),
        })
        .collect()
}

pub fn descriptor(columns: &[ColumnDescriptor], key: ColumnKey) -> Option<&ColumnDescriptor> {
    columns.iter().find(|column| column.key == key)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::normalize;

    fn row(value: serde_json::Value) -> Row {
        normalize(value.as_object().expect("object literal"))
    }

    fn sample_rows() -> Vec<Row> {
        vec![
            row(json!({"Symbol": "AAA", "Company Name": "alpha", "PE Ratio": 12.5, "Sector": "Tech",
                       "Earning Date": "2024-08-01", "Latest Volume": "1,000"})),
            row(json!({"Symbol": "BBB", "Company Name": "Beta", "PE Ratio": "N/A", "Sector": "Tech",
                       "Earning Date": "2024-07-15", "Latest Volume": "250"})),
            row(json!({"Symbol": "BBBY", "Company Name": "Bravo", "PE Ratio": -3.0, "Sector": "Energy",
                       "Earning Date": "TBD", "Latest Volume": "N/A"})),
        ]
    }

    #[test]
    fn keys_round_trip_through_names() {
        for key in ColumnKey::ALL {
            assert_eq!(key.as_str().parse::<ColumnKey>(), Ok(key));
        }
        assert_eq!("current-price".parse::<ColumnKey>(), Ok(ColumnKey::CurrentPrice));
        assert_eq!("VS_AVERAGE_VOLUME".parse::<ColumnKey>(), Ok(ColumnKey::VsAverageVolume));
        assert!("volume please".parse::<ColumnKey>().is_err());
    }

    #[test]
    fn all_is_in_declaration_order() {
        let mut sorted = ColumnKey::ALL;
        sorted.sort();
        assert_eq!(sorted, ColumnKey::ALL);
    }

    #[test]
    fn optional_numeric_sorts_absent_first() {
        let rows = sample_rows();
        let columns = build_columns(&rows);
        let pe = descriptor(&columns, ColumnKey::PeRatio).expect("pe column");

        let mut ordered: Vec<&Row> = rows.iter().collect();
        ordered.sort_by(|a, b| pe.compare(a, b));
        let symbols: Vec<&str> = ordered.iter().map(|row| row.symbol.as_str()).collect();
        assert_eq!(symbols, ["BBB", "BBBY", "AAA"]);
    }

    #[test]
    fn text_sort_ignores_case() {
        let rows = sample_rows();
        let columns = build_columns(&rows);
        let name = descriptor(&columns, ColumnKey::CompanyName).expect("name column");

        assert_eq!(name.compare(&rows[0], &rows[1]), Ordering::Less);
        assert_eq!(name.compare(&rows[1], &rows[2]), Ordering::Less);
    }

    #[test]
    fn earning_dates_sort_chronologically() {
        let rows = sample_rows();
        let columns = build_columns(&rows);
        let date = descriptor(&columns, ColumnKey::EarningDate).expect("date column");

        // "TBD" does not parse and sorts first
        assert_eq!(date.compare(&rows[2], &rows[1]), Ordering::Less);
        assert_eq!(date.compare(&rows[1], &rows[0]), Ordering::Less);
    }

    #[test]
    fn filter_options_are_distinct() {
        let rows = sample_rows();
        let columns = build_columns(&rows);
        let sector = descriptor(&columns, ColumnKey::Sector).expect("sector column");
        let options: Vec<&str> = sector
            .filter
            .as_ref()
            .expect("sector filter")
            .options
            .iter()
            .map(|option| option.value.as_str())
            .collect();
        assert_eq!(options, ["Tech", "Energy"]);

        assert!(descriptor(&columns, ColumnKey::Beta)
            .expect("beta column")
            .filter
            .is_none());
    }

    #[test]
    fn blank_values_are_offered_and_filterable() {
        let rows = vec![
            row(json!({"Symbol": "AAA", "Stock Sentiment": "Bullish"})),
            row(json!({"Symbol": "BBB"})),
            row(json!({"Symbol": "CCC", "Stock Sentiment": ""})),
        ];
        let columns = build_columns(&rows);
        let sentiment = descriptor(&columns, ColumnKey::StockSentiment).expect("sentiment column");
        let options = &sentiment.filter.as_ref().expect("sentiment filter").options;

        assert_eq!(
            options,
            &vec![
                FilterOption {
                    text: "Bullish".to_string(),
                    value: "Bullish".to_string(),
                },
                FilterOption {
                    text: "(blank)".to_string(),
                    value: String::new(),
                },
            ]
        );

        let blank: BTreeSet<String> = [String::new()].into();
        let matched: Vec<&str> = rows
            .iter()
            .filter(|row| sentiment.matches_any(row, &blank))
            .map(|row| row.symbol.as_str())
            .collect();
        assert_eq!(matched, ["BBB", "CCC"]);
    }

    #[test]
    fn symbol_filter_is_exact_and_name_filter_is_substring() {
        let rows = sample_rows();
        let columns = build_columns(&rows);
        let symbol = descriptor(&columns, ColumnKey::Symbol).expect("symbol column");
        let name = descriptor(&columns, ColumnKey::CompanyName).expect("name column");

        let wanted: BTreeSet<String> = ["BBB".to_string()].into();
        let matched: Vec<&str> = rows
            .iter()
            .filter(|row| symbol.matches_any(row, &wanted))
            .map(|row| row.symbol.as_str())
            .collect();
        assert_eq!(matched, ["BBB"]);

        let partial: BTreeSet<String> = ["ra".to_string()].into();
        assert!(name.matches_any(&rows[2], &partial));
        assert!(!name.matches_any(&rows[1], &partial));
    }

    #[test]
    fn renders_by_kind() {
        let rows = sample_rows();
        let columns = build_columns(&rows);
        let render = |key: ColumnKey, row: &Row| {
            descriptor(&columns, key)
                .expect("column")
                .render(row)
                .text
        };

        assert_eq!(render(ColumnKey::PeRatio, &rows[0]), "12.50");
        assert_eq!(render(ColumnKey::PeRatio, &rows[1]), "N/A");
        assert_eq!(render(ColumnKey::LatestVolume, &rows[0]), "1,000");
        assert_eq!(render(ColumnKey::LatestVolume, &rows[2]), "N/A");
        assert_eq!(render(ColumnKey::DifferenceFromDayLow, &rows[0]), "N/A");
    }

    #[test]
    fn company_name_links_to_quote_page() {
        let row = row(json!({"Symbol": "AAA", "Company Name": "Alpha", "Company Summary": "Makes things."}));
        let columns = build_columns(std::slice::from_ref(&row));
        let cell = descriptor(&columns, ColumnKey::CompanyName)
            .expect("name column")
            .render(&row);

        assert_eq!(cell.text, "Alpha");
        assert_eq!(
            cell.href.as_deref(),
            Some("https://finance.yahoo.com/quote/AAA/")
        );
        assert_eq!(cell.title.as_deref(), Some("Makes things."));
    }
}
