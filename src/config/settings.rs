use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Includes settings for the hub dispatcher and for logging.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub hub: HubSettings,
    pub logging: LoggingSettings,
}

/// How a hub schedules deferred listener invocations.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Run the dispatcher as a task on the current tokio runtime, falling back
    /// to a dedicated thread when no runtime is current.
    #[default]
    Runtime,
    /// Always run the dispatcher on a dedicated thread.
    Thread,
}

/// Configuration settings for a hub.
///
/// `failure_capacity` bounds the ring buffer of listener failures kept for
/// `Hub::failures` receivers.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HubSettings {
    pub dispatch: DispatchMode,
    pub failure_capacity: usize,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Every field is optional; missing values are filled from defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub hub: Option<PartialHubSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialHubSettings {
    pub dispatch: Option<DispatchMode>,
    pub failure_capacity: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            dispatch: DispatchMode::Runtime,
            failure_capacity: 64,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Provides default values for `Settings`.
impl Default for Settings {
    fn default() -> Self {
        Self {
            hub: HubSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}
