mod settings;

use std::path::Path;

use config::{Config, ConfigError, Environment, File, FileFormat, FileSourceFile};

use settings::PartialSettings;

pub use settings::{
    BrokerSettings, ConsumerSettings, ProducerSettings, Settings, TopologySettings,
};

/// Prefix of environment overrides, e.g. `MEMQ_BROKER__QUEUE_CAPACITY=64`.
pub const ENV_PREFIX: &str = "MEMQ";

/// Loads the configuration from `config/default.*` (if present) and
/// environment variables, merged over the default values.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_with(File::with_name("config/default").required(false))
}

/// Loads the configuration from an explicit file plus environment variables.
pub fn load_config_from(path: &Path) -> Result<Settings, ConfigError> {
    load_with(File::from(path).required(true))
}

fn load_with(file: File<FileSourceFile, FileFormat>) -> Result<Settings, ConfigError> {
    let builder = Config::builder().add_source(file).add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    // Merge with defaults
    let default = Settings::default();

    Ok(Settings {
        broker: BrokerSettings {
            queue_capacity: partial
                .broker
                .as_ref()
                .and_then(|b| b.queue_capacity)
                .or(default.broker.queue_capacity),
            overflow_policy: partial
                .broker
                .as_ref()
                .and_then(|b| b.overflow_policy)
                .unwrap_or(default.broker.overflow_policy),
        },
        topology: partial.topology.unwrap_or(default.topology),
    })
}
