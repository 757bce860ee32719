mod settings;

#[cfg(test)]
mod tests;

use std::path::Path;

use crate::config::settings::PartialSettings;
use crate::utils::error::Result;
use config::{Config, Environment, File};

pub use settings::{DispatchMode, HubSettings, LoggingSettings, Settings};

/// Prefix for environment overrides, e.g. `BROADCAST__HUB__DISPATCH=thread`.
pub const ENV_PREFIX: &str = "BROADCAST";

/// Loads the configuration from `config/default` and environment variables.
pub fn load_config() -> Result<Settings> {
    load_config_from("config/default")
}

/// Loads the configuration from the given file (extension optional, file
/// optional) and environment variables, then merges it over the defaults.
pub fn load_config_from(path: impl AsRef<Path>) -> Result<Settings> {
    // .env only fills variables that are not already set
    let _ = dotenvy::dotenv();

    let name = path.as_ref().to_string_lossy();
    let builder = Config::builder()
        .add_source(File::with_name(&name).required(false))
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    let default = Settings::default();

    Ok(Settings {
        hub: HubSettings {
            dispatch: partial
                .hub
                .as_ref()
                .and_then(|h| h.dispatch)
                .unwrap_or(default.hub.dispatch),
            failure_capacity: partial
                .hub
                .as_ref()
                .and_then(|h| h.failure_capacity)
                .unwrap_or(default.hub.failure_capacity),
        },
        logging: LoggingSettings {
            level: partial
                .logging
                .as_ref()
                .and_then(|l| l.level.clone())
                .unwrap_or(default.logging.level),
        },
    })
}
