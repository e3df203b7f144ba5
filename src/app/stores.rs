use super::state::{
    ModelsState, NavigationState, SettingsState, UserState, MODELS_KEY, NAVIGATION_KEY,
    SETTINGS_KEY, USER_KEY,
};
use crate::error::Result;
use crate::host::Host;
use crate::store::WebStorage;

/// The stores the log dashboard keeps between page loads.
#[derive(Clone)]
pub struct AppStores {
    /// Session-scoped.
    pub navigation: WebStorage<NavigationState>,
    pub settings: WebStorage<SettingsState>,
    pub user: WebStorage<UserState>,
    pub models: WebStorage<ModelsState>,
}

impl AppStores {
    /// Bind every store to the backends of `host`.
    pub fn open(host: &Host) -> Result<Self> {
        Ok(Self {
            navigation: WebStorage::builder(NAVIGATION_KEY)
                .default_value(NavigationState::default())
                .storage(host.session())
                .bus(host.bus())
                .build()?,
            settings: durable(host, SETTINGS_KEY)?,
            user: durable(host, USER_KEY)?,
            models: durable(host, MODELS_KEY)?,
        })
    }

    /// Bind every store to the installed host, or to memory if there is none.
    pub fn from_host() -> Result<Self> {
        Ok(Self {
            navigation: WebStorage::session(NAVIGATION_KEY, NavigationState::default())?,
            settings: WebStorage::local(SETTINGS_KEY, SettingsState::default())?,
            user: WebStorage::local(USER_KEY, UserState::default())?,
            models: WebStorage::local(MODELS_KEY, ModelsState::default())?,
        })
    }

    /// Drop the stored credentials, as on a session-expired response.
    pub fn expire_session(&self) -> Result<()> {
        self.user.update(UserState::clear_session)
    }
}

fn durable<T>(host: &Host, key: &str) -> Result<WebStorage<T>>
where
    T: Default + serde::Serialize + serde::de::DeserializeOwned + Clone + Send + Sync + 'static,
{
    WebStorage::builder(key)
        .default_value(T::default())
        .storage(host.local())
        .bus(host.bus())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Origin, Storage, StorageKind};

    #[test]
    fn seeds_all_keys() {
        let origin = Origin::new();
        let context = origin.open_context();
        let host = Host::from_context(&context);
        let stores = AppStores::open(&host).unwrap();

        for key in [SETTINGS_KEY, USER_KEY, MODELS_KEY] {
            assert!(context.local().get_item(key).is_some(), "{key} not seeded");
        }
        assert!(context.local().get_item(NAVIGATION_KEY).is_none());
        assert!(context.session().get_item(NAVIGATION_KEY).is_some());
        assert_eq!(context.session().kind(), StorageKind::Session);

        assert_eq!(stores.settings.get().unwrap().current_theme, "light");
    }

    #[test]
    fn expiring_session_clears_token() {
        let host = Host::in_memory();
        let stores = AppStores::open(&host).unwrap();
        stores
            .user
            .set(UserState {
                user: None,
                token: Some("abc".to_owned()),
            })
            .unwrap();

        stores.expire_session().unwrap();
        assert!(!stores.user.get().unwrap().is_authenticated());
    }

    #[test]
    fn second_tab_sees_first_tabs_settings() {
        let origin = Origin::new();
        let first = AppStores::open(&Host::from_context(&origin.open_context())).unwrap();
        first
            .settings
            .update(|settings| settings.current_theme = "dark".to_owned())
            .unwrap();

        let second = AppStores::open(&Host::from_context(&origin.open_context())).unwrap();
        assert_eq!(second.settings.get().unwrap().current_theme, "dark");
        // Navigation is per tab
        assert_eq!(second.navigation.get().unwrap(), NavigationState::default());
    }
}
