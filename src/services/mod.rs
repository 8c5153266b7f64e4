// syncmarks services
// External collaborators the core talks to (auth, storage, change feed) and the settings engine.

pub mod auth;
pub mod change_feed;
pub mod data_version;
pub mod rest_storage;
pub mod settings_engine;
pub mod storage;
