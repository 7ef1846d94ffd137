use log::Level;

/// Initialize the browser console logging just once.
pub fn init_logging() {
    let level = if cfg!(debug_assertions) {
        Level::Debug
    } else {
        Level::Info
    };
    let _ = console_log::init_with_level(level);
}
