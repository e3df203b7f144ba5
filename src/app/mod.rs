//! Typed stores used by the log dashboard.
//!
//! `navigation` is session-scoped; `settings`, `user` and `models` are
//! durable. Field names are persisted in the shape the web client reads.

mod state;
mod stores;

pub use state::{
    now_millis, Model, ModelsState, NavigationState, SettingsState, User, UserState, MODELS_KEY,
    MODELS_TTL, NAVIGATION_KEY, SETTINGS_KEY, USER_KEY,
};
pub use stores::AppStores;
