use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};

/// One record as delivered by the report, before normalization.
pub type RawRecord = Map<String, Value>;

/// JSON field names used by the upstream report.
pub mod field {
    pub const COMPANY_NAME: &str = "Company Name";
    pub const SYMBOL: &str = "Symbol";
    pub const SECTOR: &str = "Sector";
    pub const INDUSTRY: &str = "Industry";
    pub const CURRENT_PRICE: &str = "Current Price";
    pub const LATEST_MA: &str = "Latest MA";
    pub const PRICE_TARGET: &str = "Price Target";
    pub const DAY_LOW: &str = "Day Low";
    pub const DAY_HIGH: &str = "Day High";
    pub const DIFFERENCE_FROM_DAY_LOW: &str = "Difference from Day Low";
    pub const DIFFERENCE_FROM_DAY_HIGH: &str = "Difference from Day High";
    pub const DIFFERENCE_FROM_MA: &str = "Difference from MA";
    pub const DIFFERENCE_FROM_OPEN: &str = "Difference from Open";
    pub const CHANGE_FROM_YESTERDAY: &str = "Change from Yesterday";
    pub const CHANGE_FROM_LAST_REPORT: &str = "Change from Last Report";
    pub const LATEST_VOLUME: &str = "Latest Volume";
    pub const VS_AVERAGE_VOLUME: &str = "VS Average Volume";
    pub const MARKET_CAP: &str = "Market Cap";
    pub const PE_RATIO: &str = "PE Ratio";
    pub const TRAILING_PE: &str = "Trailing PE";
    pub const TRAILING_PEG: &str = "Trailing PEG";
    pub const TRAILING_PS: &str = "Trailing PS";
    pub const ROE: &str = "ROE";
    pub const DTE: &str = "DTE";
    pub const BETA: &str = "Beta";
    pub const QUICK_RATIO: &str = "Quick Ratio";
    pub const EARNING_DATE: &str = "Earning Date";
    pub const EARNING_TIME: &str = "Earning Time";
    pub const EARNING_DAY_OF_WEEK: &str = "Earning Day of Week";
    pub const STOCK_SENTIMENT: &str = "Stock Sentiment";
    pub const ROW_COLOR: &str = "Row Color";
    pub const COMPANY_SUMMARY: &str = "Company Summary";
    pub const LAST_UPDATED: &str = "Last Updated";
}

const EARNING_DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%b %d, %Y", "%B %d, %Y"];
const EARNING_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A numeric cell. Anything that does not parse to a finite number is `Absent`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Metric {
    Present(f64),
    #[default]
    Absent,
}

impl Metric {
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() {
            Metric::Present(value)
        } else {
            Metric::Absent
        }
    }

    /// Read a loosely typed JSON value: numbers are taken as-is, strings are
    /// parsed after stripping `$`, `%` and thousands separators.
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Number(number)) => number.as_f64().map_or(Metric::Absent, Metric::from_f64),
            Some(Value::String(text)) => Metric::parse(text),
            _ => Metric::Absent,
        }
    }

    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        let trimmed = trimmed.strip_prefix('$').unwrap_or(trimmed);
        let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed);
        let cleaned: String = trimmed.chars().filter(|ch| *ch != ',').collect();
        cleaned
            .trim()
            .parse::<f64>()
            .map_or(Metric::Absent, Metric::from_f64)
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Metric::Present(value) => Some(value),
            Metric::Absent => None,
        }
    }

    pub fn is_present(self) -> bool {
        matches!(self, Metric::Present(_))
    }

    /// Total order where `Absent` sits below every present value.
    pub fn total_cmp(self, other: Metric) -> Ordering {
        match (self, other) {
            (Metric::Absent, Metric::Absent) => Ordering::Equal,
            (Metric::Absent, Metric::Present(_)) => Ordering::Less,
            (Metric::Present(_), Metric::Absent) => Ordering::Greater,
            (Metric::Present(left), Metric::Present(right)) => left.total_cmp(&right),
        }
    }

    /// Percentage distance of `current` from `reference`.
    pub fn percent_from(current: Metric, reference: Metric) -> Metric {
        match (current, reference) {
            (Metric::Present(current), Metric::Present(reference)) if reference != 0.0 => {
                Metric::from_f64((current - reference) / reference * 100.0)
            }
            _ => Metric::Absent,
        }
    }
}

/// Row highlighting derived from the `Row Color` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowTone {
    Positive,
    Negative,
    Neutral,
}

impl RowTone {
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim() {
            "positive-row" => RowTone::Positive,
            "negative-row" => RowTone::Negative,
            _ => RowTone::Neutral,
        }
    }

    pub fn css_class(self) -> Option<&'static str> {
        match self {
            RowTone::Positive => Some("positive-row"),
            RowTone::Negative => Some("negative-row"),
            RowTone::Neutral => None,
        }
    }
}

/// One company's screening data with every field resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub company_name: String,
    pub symbol: String,
    pub sector: String,
    pub industry: String,
    pub current_price: Metric,
    pub latest_ma: Metric,
    pub price_target: Metric,
    pub day_low: Metric,
    pub day_high: Metric,
    pub difference_from_day_low: Metric,
    pub difference_from_day_high: Metric,
    pub difference_from_ma: Metric,
    pub difference_from_open: Metric,
    pub change_from_yesterday: Metric,
    pub change_from_last_report: Metric,
    pub latest_volume: Metric,
    pub vs_average_volume: Metric,
    pub market_cap: Metric,
    pub pe_ratio: Metric,
    pub trailing_pe: Metric,
    pub trailing_peg: Metric,
    pub trailing_ps: Metric,
    pub roe: Metric,
    pub dte: Metric,
    pub beta: Metric,
    pub quick_ratio: Metric,
    pub earning_date: String,
    pub earning_date_parsed: Option<NaiveDate>,
    pub earning_time: String,
    pub earning_day_of_week: String,
    pub stock_sentiment: String,
    pub row_color: String,
    pub tone: RowTone,
    pub company_summary: String,
    pub last_updated: String,
}

/// Resolve a raw record into a [`Row`]. Never fails: unusable values become
/// empty text or [`Metric::Absent`].
pub fn normalize(raw: &RawRecord) -> Row {
    let metric = |key: &str| Metric::from_value(raw.get(key));

    let current_price = metric(field::CURRENT_PRICE);
    let day_low = metric(field::DAY_LOW);
    let day_high = metric(field::DAY_HIGH);
    let earning_date = text(raw, field::EARNING_DATE);
    let row_color = text(raw, field::ROW_COLOR);

    Row {
        company_name: text(raw, field::COMPANY_NAME),
        symbol: text(raw, field::SYMBOL),
        sector: text(raw, field::SECTOR),
        industry: text(raw, field::INDUSTRY),
        current_price,
        latest_ma: metric(field::LATEST_MA),
        price_target: metric(field::PRICE_TARGET),
        day_low,
        day_high,
        difference_from_day_low: Metric::percent_from(current_price, day_low),
        difference_from_day_high: Metric::percent_from(current_price, day_high),
        difference_from_ma: metric(field::DIFFERENCE_FROM_MA),
        difference_from_open: metric(field::DIFFERENCE_FROM_OPEN),
        change_from_yesterday: metric(field::CHANGE_FROM_YESTERDAY),
        change_from_last_report: metric(field::CHANGE_FROM_LAST_REPORT),
        latest_volume: metric(field::LATEST_VOLUME),
        vs_average_volume: metric(field::VS_AVERAGE_VOLUME),
        market_cap: metric(field::MARKET_CAP),
        pe_ratio: metric(field::PE_RATIO),
        trailing_pe: metric(field::TRAILING_PE),
        trailing_peg: metric(field::TRAILING_PEG),
        trailing_ps: metric(field::TRAILING_PS),
        roe: metric(field::ROE),
        dte: metric(field::DTE),
        beta: metric(field::BETA),
        quick_ratio: metric(field::QUICK_RATIO),
        earning_date_parsed: parse_earning_date(&earning_date),
        earning_date,
        earning_time: text(raw, field::EARNING_TIME),
        earning_day_of_week: text(raw, field::EARNING_DAY_OF_WEEK),
        stock_sentiment: text(raw, field::STOCK_SENTIMENT),
        tone: RowTone::from_tag(&row_color),
        row_color,
        company_summary: text(raw, field::COMPANY_SUMMARY),
        last_updated: text(raw, field::LAST_UPDATED),
    }
}

fn text(raw: &RawRecord, key: &str) -> String {
    match raw.get(key) {
        Some(Value::String(value)) => value.trim().to_string(),
        Some(Value::Number(value)) => value.to_string(),
        Some(Value::Bool(value)) => value.to_string(),
        _ => String::new(),
    }
}

pub fn parse_earning_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    EARNING_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, EARNING_DATETIME_FORMAT)
                .ok()
                .map(|stamp| stamp.date())
        })
}
