use serde::{Deserialize, Serialize};

/// Top-level settings container, persisted as JSON by the settings engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SyncSettings {
    pub storage: StorageSettings,
    pub auth: AuthSettings,
    pub feed: FeedSettings,
    pub rpc: RpcSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Which system of record to talk to and where it lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// SQLite file; `None` means `<data dir>/syncmarks.db`.
    pub database_path: Option<String>,
    pub rest_url: Option<String>,
    pub api_key: Option<String>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            database_path: None,
            rest_url: None,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    Rest,
}

/// OAuth sign-in settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthSettings {
    pub provider: String,
    pub authorize_url: String,
    pub redirect_url: String,
    pub session_ttl_secs: u64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            provider: "google".to_string(),
            authorize_url: "http://localhost:54321/auth/v1/authorize".to_string(),
            redirect_url: "http://localhost:3000/dashboard".to_string(),
            session_ttl_secs: 3600,
        }
    }
}

/// Change feed settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedSettings {
    pub collection: String,
    pub channel_capacity: usize,
    /// How often to check the database file for other processes' commits.
    /// `0` turns the check off.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    500
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            collection: "bookmarks".to_string(),
            channel_capacity: 64,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// RPC surface settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcSettings {
    pub max_requests_per_second: u32,
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            max_requests_per_second: 200,
        }
    }
}

/// Log filter directive, used when `RUST_LOG` is unset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "syncmarks=info".to_string(),
        }
    }
}
