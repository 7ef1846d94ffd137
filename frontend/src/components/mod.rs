pub mod column_picker;
pub mod dashboard;
pub mod screener_table;
pub mod status;
