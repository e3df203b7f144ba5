//! Two contexts of one origin keeping a theme in sync

use stashed::storage::Origin;
use stashed::{StoreError, WebStorage};

fn main() -> Result<(), StoreError> {
    println!("=== Theme Sync Example ===\n");

    println!("1. Opening two contexts that share one durable area");
    let origin = Origin::new();
    let left = origin.open_context();
    let right = origin.open_context();
    println!("   {} and {}\n", left.id(), right.id());

    println!("2. Binding `theme` in both, with \"light\" as the default");
    let left_theme = WebStorage::builder("theme")
        .default_value("light".to_string())
        .storage(left.local())
        .bus(left.bus())
        .build()?;
    let right_theme = WebStorage::builder("theme")
        .default_value("light".to_string())
        .storage(right.local())
        .bus(right.bus())
        .build()?;
    println!("   left sees {:?}, right sees {:?}\n", left_theme.get()?, right_theme.get()?);

    println!("3. Watching the theme from the right context");
    let watcher = right_theme.watch(|theme| match theme {
        Ok(theme) => println!("   -> right context renders {:?}", theme),
        Err(err) => println!("   -> right context could not read the theme: {}", err),
    });
    println!("   bus listeners: {}\n", origin.bus().listener_count());

    println!("4. Switching to \"dark\" from the left context");
    left_theme.set("dark".to_string())?;
    println!("   right revision is now {}\n", right_theme.revision());

    println!("5. Dropping the watcher and letting the runtime tick");
    drop(watcher);
    stashed::runtime::ReactiveRuntime::current().tick();
    println!("   bus listeners: {}", origin.bus().listener_count());

    println!("\n✓ Example complete!");
    Ok(())
}
