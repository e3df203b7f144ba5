//! The dashboard stores, written to a JSON file and read back after a restart

use stashed::app::{now_millis, AppStores, Model, User, UserState};
use stashed::{Host, HostConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== App Stores Example ===\n");

    let dir = tempfile::tempdir()?;
    let config = HostConfig {
        storage_dir: Some(dir.path().to_path_buf()),
        ..HostConfig::default()
    };

    println!("1. Opening the stores on {}", config.durable_path().display());
    let stores = AppStores::open(&Host::from_config(&config)?)?;
    println!("   theme = {:?}\n", stores.settings.get()?.current_theme);

    println!("2. Logging in and picking a theme");
    stores.user.set(UserState {
        user: Some(User {
            id: 7,
            username: "ada".to_string(),
            display_name: "Ada".to_string(),
            is_admin: true,
            created_at: None,
            last_activity: None,
        }),
        token: Some("secret".to_string()),
    })?;
    stores.settings.update(|settings| settings.current_theme = "dark".to_string())?;
    println!("   authenticated? {}\n", stores.user.get()?.is_authenticated());

    println!("3. Caching the model list");
    stores.models.update(|state| {
        let models = vec![Model {
            display_name: "Gateway".to_string(),
            identifier: "gateway".to_string(),
            icon: "server".to_string(),
        }];
        state.record_fetch(models, now_millis());
    })?;
    println!("   fresh? {}\n", stores.models.get()?.is_fresh());

    println!("4. Reopening from the same file, as after a restart");
    let reopened = AppStores::open(&Host::from_config(&config)?)?;
    println!("   theme = {:?}", reopened.settings.get()?.current_theme);
    println!("   cached models = {}\n", reopened.models.get()?.models.len());

    println!("5. Expiring the session");
    reopened.expire_session()?;
    println!("   authenticated? {}", reopened.user.get()?.is_authenticated());

    println!("\n✓ Example complete!");
    Ok(())
}
