//! Profile storage dump example
//!
//! This example demonstrates how to find the browser profiles on the current
//! system and read the extension's persisted settings out of one of them.

use reddsimp::{list_profiles, open_profile_store, sync_storage_path};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Reddit Simplify Profile Dump");
    println!("{:-<80}", "");

    let profiles = list_profiles(None)?;
    if profiles.is_empty() {
        println!("No browser profiles found on this system.");
        return Ok(());
    }

    println!("\nFound {} profile(s):\n", profiles.len());
    for profile in &profiles {
        println!("  {:<30} {}", profile.name, profile.path.display());
        println!(
            "    default: {:<5}  extension data: {}",
            profile.is_default,
            if profile.has_extension_data {
                "✓ found"
            } else {
                "✗ none"
            }
        );
    }

    // Dump the settings of the first profile that has extension data.
    let Some(profile) = profiles.iter().find(|p| p.has_extension_data) else {
        println!("\nNo profile holds Reddit Simplify data yet.");
        return Ok(());
    };

    println!("{:-<80}", "");
    println!("Settings in '{}':", profile.name);
    println!("  document: {}", sync_storage_path(&profile.path).display());
    println!();

    let mut store = open_profile_store(&profile.path);
    let settings = store.get_all()?;
    if settings.is_empty() {
        println!("  (empty)");
    }
    for (key, value) in &settings {
        println!("  {:<28} = {}", key, value);
    }

    Ok(())
}
