pub const POLL_INTERVAL_MS: u64 = 30_000;
pub const DEFAULT_SOURCE_URL: &str = "http://127.0.0.1:8080/stock_analysis_report.json";
pub const VISIBILITY_STORAGE_KEY: &str = "stock-screener.visible-columns";
pub const DEFAULT_PREFS_DIR: &str = ".stock-screener";
pub const UNAVAILABLE: &str = "N/A";
pub const QUOTE_URL_PREFIX: &str = "https://finance.yahoo.com/quote/";
pub const BLANK_OPTION: &str = "(blank)";
