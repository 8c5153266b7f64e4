//! Property-based tests for settings persistence.
//!
//! Settings written by one `SettingsEngine` must load back unchanged in a
//! fresh engine pointed at the same file.

use proptest::prelude::*;
use syncmarks::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use syncmarks::types::settings::{
    AuthSettings, FeedSettings, LoggingSettings, RpcSettings, StorageBackend, StorageSettings,
    SyncSettings,
};
use tempfile::TempDir;

fn arb_storage_settings() -> impl Strategy<Value = StorageSettings> {
    (
        prop_oneof![Just(StorageBackend::Sqlite), Just(StorageBackend::Rest)],
        proptest::option::of("/[a-z]{1,10}/[a-z]{1,10}\\.db"),
        proptest::option::of("https://[a-z]{3,10}\\.example\\.com"),
        proptest::option::of("[A-Za-z0-9]{16,32}"),
    )
        .prop_map(|(backend, database_path, rest_url, api_key)| StorageSettings {
            backend,
            database_path,
            rest_url,
            api_key,
        })
}

fn arb_auth_settings() -> impl Strategy<Value = AuthSettings> {
    ("[a-z]{3,10}", "https?://[a-z]{3,10}/auth", 0u64..1_000_000).prop_map(
        |(provider, authorize_url, session_ttl_secs)| AuthSettings {
            provider,
            authorize_url,
            redirect_url: "http://localhost:3000/dashboard".to_string(),
            session_ttl_secs,
        },
    )
}

fn arb_sync_settings() -> impl Strategy<Value = SyncSettings> {
    (
        arb_storage_settings(),
        arb_auth_settings(),
        ("[a-z_]{1,16}", 1usize..4096, 0u64..5_000),
        1u32..10_000,
        "[a-z]{1,10}=(trace|debug|info|warn|error)",
    )
        .prop_map(|(storage, auth, (collection, channel_capacity, poll_interval_ms), rps, filter)| SyncSettings {
            storage,
            auth,
            feed: FeedSettings {
                collection,
                channel_capacity,
                poll_interval_ms,
            },
            rpc: RpcSettings {
                max_requests_per_second: rps,
            },
            logging: LoggingSettings { filter },
        })
}

// **Settings persistence round-trip**
//
// *For any* settings tree, applying each section through `set_value` and
// reloading from disk yields the same tree.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn settings_survive_save_and_reload(settings in arb_sync_settings()) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json").to_string_lossy().to_string();

        let mut engine = SettingsEngine::new(Some(path.clone()));
        let tree = serde_json::to_value(&settings).unwrap();
        for section in ["storage", "auth", "feed", "rpc", "logging"] {
            engine.set_value(section, tree[section].clone()).unwrap();
        }
        prop_assert_eq!(engine.get_settings(), &settings);

        let mut reopened = SettingsEngine::new(Some(path));
        prop_assert_eq!(reopened.load().unwrap(), settings);
    }
}
