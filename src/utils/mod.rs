//! The `utils` module collects the pieces shared across `broadcast`:
//! the crate error type and logging initialisation.

pub mod error;
pub mod logging;

#[cfg(test)]
mod tests {
    use super::error::HubError;
    use super::logging;
    use crate::config::LoggingSettings;
    use tracing::Level;

    #[test]
    fn logging_level_names() {
        assert_eq!(logging::level("info"), Some(Level::INFO));
        assert_eq!(logging::level(" DEBUG "), Some(Level::DEBUG));
        assert_eq!(logging::level("warning"), Some(Level::WARN));
        assert_eq!(logging::level("Warn"), Some(Level::WARN));
        assert_eq!(logging::level("5"), Some(Level::TRACE));
        assert_eq!(logging::level("loud"), None);
        assert_eq!(logging::level(""), None);
    }

    #[test]
    fn logging_init_tolerates_repeats_and_unknown_levels() {
        // Should not panic
        for level in ["trace", "info", "nonsense"] {
            logging::init(&LoggingSettings {
                level: level.to_string(),
            });
        }
    }

    #[test]
    fn io_errors_convert_into_dispatcher_errors() {
        let err: HubError = std::io::Error::other("no threads left").into();
        assert!(matches!(err, HubError::Dispatcher(_)));
        assert_eq!(
            err.to_string(),
            "failed to start dispatch thread: no threads left"
        );
    }

    #[test]
    fn dropped_error_message() {
        assert_eq!(
            HubError::Dropped.to_string(),
            "topic was dropped before it resolved"
        );
    }
}
