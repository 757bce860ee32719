use tracing::Level;

use crate::config::LoggingSettings;

/// Parse a configured level name, case-insensitively. Numeric levels
/// (`1` = error .. `5` = trace) and `warning` are accepted too.
pub fn level(name: &str) -> Option<Level> {
    let name = name.trim();
    if name.eq_ignore_ascii_case("warning") {
        return Some(Level::WARN);
    }
    name.parse().ok()
}

/// Install the fmt subscriber at the configured level, `info` when the level
/// is not recognised. Thread names are shown so deliveries running on the
/// `broadcast-dispatch` thread can be told apart.
pub fn init(settings: &LoggingSettings) {
    let max = level(&settings.level);

    // try_init: tests and embedding applications may already have a subscriber
    let installed = tracing_subscriber::fmt()
        .with_max_level(max.unwrap_or(Level::INFO))
        .with_target(false)
        .with_thread_names(true)
        .try_init()
        .is_ok();

    if installed && max.is_none() {
        tracing::warn!(level = %settings.level, "unknown log level, using info");
    }
}
