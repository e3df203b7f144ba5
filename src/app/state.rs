use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const NAVIGATION_KEY: &str = "navigation";
pub const SETTINGS_KEY: &str = "settings";
pub const USER_KEY: &str = "user";
pub const MODELS_KEY: &str = "models";

/// How long a fetched model list is served from the store.
pub const MODELS_TTL: Duration = Duration::from_secs(15);

/// Sidebar and log panel layout, per session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationState {
    /// `None` until the user pins or unpins the sidebar.
    pub is_sidebar_locked: Option<bool>,
    pub is_logs_expanded: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsState {
    /// `None` means follow the browser language.
    pub selected_language: Option<String>,
    pub current_theme: String,
}

impl Default for SettingsState {
    fn default() -> Self {
        Self {
            selected_language: None,
            current_theme: "light".to_owned(),
        }
    }
}

/// An account as the API returns it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "ID")]
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_activity: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserState {
    pub user: Option<User>,
    pub token: Option<String>,
}

impl UserState {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> Option<String> {
        self.token.as_ref().map(|token| format!("Bearer {token}"))
    }

    /// Forget the account after the server reports the session expired.
    pub fn clear_session(&mut self) {
        self.user = None;
        self.token = None;
    }
}

/// A log source the dashboard can display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub display_name: String,
    pub identifier: String,
    pub icon: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsState {
    pub models: Vec<Model>,
    /// Unix time of the last fetch, in milliseconds.
    pub last_fetch: Option<u64>,
}

impl ModelsState {
    /// Whether the cached list can be used instead of fetching again.
    pub fn is_fresh_at(&self, now_ms: u64) -> bool {
        !self.models.is_empty()
            && self
                .last_fetch
                .is_some_and(|fetched| now_ms.saturating_sub(fetched) < MODELS_TTL.as_millis() as u64)
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(now_millis())
    }

    /// Replace the list with a freshly fetched one.
    pub fn record_fetch(&mut self, models: Vec<Model>, now_ms: u64) {
        self.models = models;
        self.last_fetch = Some(now_ms);
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(id: &str) -> Model {
        Model {
            display_name: id.to_uppercase(),
            identifier: id.to_owned(),
            icon: "server".to_owned(),
        }
    }

    #[test]
    fn persisted_field_names() {
        let json = serde_json::to_string(&NavigationState::default()).unwrap();
        assert_eq!(json, r#"{"isSidebarLocked":null,"isLogsExpanded":false}"#);

        let json = serde_json::to_string(&SettingsState::default()).unwrap();
        assert_eq!(json, r#"{"selectedLanguage":null,"currentTheme":"light"}"#);
    }

    #[test]
    fn models_go_stale() {
        let mut state = ModelsState::default();
        assert!(!state.is_fresh_at(1_000));

        state.record_fetch(vec![model("api")], 1_000);
        assert!(state.is_fresh_at(1_000 + 14_999));
        assert!(!state.is_fresh_at(1_000 + 15_000));
    }

    #[test]
    fn empty_list_is_never_fresh() {
        let mut state = ModelsState::default();
        state.record_fetch(Vec::new(), 1_000);
        assert!(!state.is_fresh_at(1_000));
    }

    #[test]
    fn clearing_session_drops_token_and_user() {
        let mut state: UserState = serde_json::from_str(
            r#"{"user":{"ID":7,"username":"ada","display_name":"Ada","is_admin":true},"token":"t0k"}"#,
        )
        .unwrap();
        assert!(state.is_authenticated());
        assert_eq!(state.bearer().as_deref(), Some("Bearer t0k"));

        state.clear_session();
        assert_eq!(state, UserState::default());
        assert_eq!(state.bearer(), None);
    }
}
