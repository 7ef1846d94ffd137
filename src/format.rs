use crate::constants::UNAVAILABLE;
use crate::model::Metric;

pub fn percent(metric: Metric) -> String {
    match metric {
        Metric::Present(value) => format!("{value:.2}%"),
        Metric::Absent => UNAVAILABLE.to_string(),
    }
}

/// Two decimals, no suffix. Used for both ratios and prices.
pub fn decimal(metric: Metric) -> String {
    match metric {
        Metric::Present(value) => format!("{value:.2}"),
        Metric::Absent => UNAVAILABLE.to_string(),
    }
}

pub fn thousands(metric: Metric) -> String {
    match metric {
        Metric::Present(value) => group_thousands(value.round() as i64),
        Metric::Absent => UNAVAILABLE.to_string(),
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
