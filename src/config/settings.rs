use serde::Deserialize;

use crate::broker::CompactionTrigger;

/// Top-level configuration settings for the application.
///
/// Includes settings for the HTTP server, the folder store and logging.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub store: StoreSettings,
    pub log: LogSettings,
}

/// Configuration settings for the server.
///
/// Defines the host and port the server will bind to.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Configuration settings for the folder store.
#[derive(Debug, Deserialize, Clone)]
pub struct StoreSettings {
    /// Directory holding one `<folder>.txt` log per folder.
    pub data_dir: String,
    /// Records older than this many seconds expire on the next read.
    pub retention_secs: u64,
    pub compaction: CompactionTrigger,
    pub max_payload_bytes: usize,
    /// Unset means folders grow without bound between reads.
    pub max_records_per_folder: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub store: Option<PartialStoreSettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct PartialStoreSettings {
    pub data_dir: Option<String>,
    pub retention_secs: Option<u64>,
    pub compaction: Option<CompactionTrigger>,
    pub max_payload_bytes: Option<usize>,
    pub max_records_per_folder: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

/// Provides default values for `Settings`.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            store: StoreSettings {
                data_dir: "data".to_string(),
                retention_secs: 300,
                compaction: CompactionTrigger::AnyStale,
                max_payload_bytes: 1024,
                max_records_per_folder: None,
            },
            log: LogSettings {
                level: "info".to_string(),
            },
        }
    }
}
