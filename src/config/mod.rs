mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{LogSettings, ServerSettings, Settings, StoreSettings};


/// Prefix for environment overrides, e.g. `FOLDERPOST__SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "FOLDERPOST";

/// Loads the configuration from `config/default` and environment variables.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from("config/default")
}

/// Loads the configuration from `path` (any format `config` understands; the
/// file is optional) and environment variables, merged over the defaults.
pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;
    let default = Settings::default();

    let server = partial.server;
    let store = partial.store;
    let log = partial.log;

    Ok(Settings {
        server: ServerSettings {
            host: server
                .as_ref()
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: server
                .as_ref()
                .and_then(|s| s.port)
                .unwrap_or(default.server.port),
        },
        store: StoreSettings {
            data_dir: store
                .as_ref()
                .and_then(|s| s.data_dir.clone())
                .unwrap_or(default.store.data_dir),
            retention_secs: store
                .as_ref()
                .and_then(|s| s.retention_secs)
                .unwrap_or(default.store.retention_secs),
            compaction: store
                .as_ref()
                .and_then(|s| s.compaction)
                .unwrap_or(default.store.compaction),
            max_payload_bytes: store
                .as_ref()
                .and_then(|s| s.max_payload_bytes)
                .unwrap_or(default.store.max_payload_bytes),
            max_records_per_folder: store
                .as_ref()
                .and_then(|s| s.max_records_per_folder)
                .or(default.store.max_records_per_folder),
        },
        log: LogSettings {
            level: log
                .as_ref()
                .and_then(|l| l.level.clone())
                .unwrap_or(default.log.level),
        },
    })
}
