use serde::Serialize;
use std::path::{Path, PathBuf};

use reddsimp::{
    default_settings, describe_key, has_drift, query_settings, reconcile, validate_write,
    SchemaOutcome, SettingsMap, SettingsStore,
};

use crate::cli;

/// One key/value entry for array output
#[derive(Debug, Serialize)]
struct SettingEntry {
    key: String,
    value: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'static str>,
}

/// List all browser profiles
pub fn list_profiles(profiles_dir: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let profiles = reddsimp::list_profiles(profiles_dir).map_err(|e| {
        anyhow::anyhow!(
            "Failed to list profiles: {}. Make sure the browser is installed.",
            e
        )
    })?;

    let json = serde_json::to_string_pretty(&profiles)?;
    println!("{}", json);
    Ok(())
}

/// Print stored settings for a profile, optionally filtered
pub fn dump(
    profile_name: &str,
    query_patterns: &[&str],
    describe: bool,
    output_type: cli::OutputType,
    profiles_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = open_store(profile_name, profiles_dir)?;
    let settings = store
        .get_all()
        .map_err(|e| anyhow::anyhow!("Failed to read stored settings: {}", e))?;

    let output_settings = if !query_patterns.is_empty() {
        query_settings(&settings, query_patterns)
            .map_err(|e| anyhow::anyhow!("Failed to apply query: {}", e))?
    } else {
        settings
    };

    let json = if describe || matches!(output_type, cli::OutputType::JsonArray) {
        let array_output: Vec<SettingEntry> = output_settings
            .iter()
            .map(|(key, value)| SettingEntry {
                key: key.clone(),
                value: value.clone(),
                description: if describe { describe_key(key) } else { None },
            })
            .collect();
        serde_json::to_string_pretty(&array_output)?
    } else {
        serde_json::to_string_pretty(&output_settings)?
    };

    println!("{}", json);
    Ok(())
}

/// Print a single stored value in raw format
pub fn get(
    profile_name: &str,
    key: &str,
    profiles_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = open_store(profile_name, profiles_dir)?;
    let settings = store
        .get(&[key])
        .map_err(|e| anyhow::anyhow!("Failed to read stored settings: {}", e))?;

    if let Some(value) = settings.get(key) {
        output_raw_value(value);
        return Ok(());
    }
    Err(anyhow::anyhow!(
        "Setting '{}' not found in stored settings. \
         The extension may never have run in this profile; \
         use 'reddsimp keys' to see the canonical schema.",
        key
    )
    .into())
}

/// Write a single boolean setting
pub fn set(
    profile_name: &str,
    key: &str,
    value_text: &str,
    profiles_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let value: serde_json::Value = serde_json::from_str(value_text)
        .map_err(|_| anyhow::anyhow!("Invalid value '{}': expected true or false", value_text))?;
    validate_write(key, &value)?;

    let mut store = open_store(profile_name, profiles_dir)?;
    let mut values = SettingsMap::new();
    values.insert(key.to_string(), value);
    store
        .set(&values)
        .map_err(|e| anyhow::anyhow!("Failed to write setting: {}", e))?;

    println!("{}", serde_json::to_string_pretty(&values)?);
    Ok(())
}

/// Schema report for one profile's stored settings
#[derive(Debug, Serialize)]
struct CheckReport {
    profile: PathBuf,
    keys: usize,
    empty: bool,
    drift: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<&'static str>,
}

/// Report schema drift, optionally migrating the stored settings
pub fn check(
    profile_name: &str,
    fix: bool,
    profiles_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let profile_path = find_profile(profile_name, profiles_dir)?;
    let mut store = reddsimp::open_profile_store(&profile_path);
    let settings = store
        .get_all()
        .map_err(|e| anyhow::anyhow!("Failed to read stored settings: {}", e))?;

    let mut report = CheckReport {
        profile: profile_path,
        keys: settings.len(),
        empty: settings.is_empty(),
        drift: !settings.is_empty() && has_drift(&settings),
        outcome: None,
    };

    if fix {
        let outcome = reconcile(&mut store)
            .map_err(|e| anyhow::anyhow!("Failed to migrate stored settings: {}", e))?;
        report.outcome = Some(match outcome {
            SchemaOutcome::FirstInstall => "first_install",
            SchemaOutcome::Migrated => "migrated",
            SchemaOutcome::Unchanged => "unchanged",
        });
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Clear stored settings and write the shipped defaults
pub fn reset(
    profile_name: &str,
    profiles_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = open_store(profile_name, profiles_dir)?;
    let defaults = default_settings();
    store
        .replace_all(&defaults)
        .map_err(|e| anyhow::anyhow!("Failed to reset stored settings: {}", e))?;

    println!("{}", serde_json::to_string_pretty(&defaults)?);
    Ok(())
}

/// Print the canonical schema with defaults and descriptions
pub fn keys() -> Result<(), Box<dyn std::error::Error>> {
    let entries: Vec<SettingEntry> = default_settings()
        .iter()
        .map(|(key, value)| SettingEntry {
            key: key.clone(),
            value: value.clone(),
            description: describe_key(key),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

fn find_profile(
    profile_name: &str,
    profiles_dir: Option<&Path>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let path = reddsimp::find_profile_path(profile_name, profiles_dir).map_err(|e| {
        anyhow::anyhow!(
            "Failed to find profile '{}': {}. Make sure the browser is installed and the profile exists.\n\
             Use 'reddsimp profiles' to see available profiles.",
            profile_name,
            e
        )
    })?;
    Ok(path)
}

fn open_store(
    profile_name: &str,
    profiles_dir: Option<&Path>,
) -> Result<SettingsStore, Box<dyn std::error::Error>> {
    let profile_path = find_profile(profile_name, profiles_dir)?;
    Ok(reddsimp::open_profile_store(&profile_path))
}

/// Output a single setting value in raw format (no JSON wrapping)
fn output_raw_value(value: &serde_json::Value) {
    match value {
        serde_json::Value::String(s) => println!("{}", s),
        serde_json::Value::Bool(b) => println!("{}", b),
        serde_json::Value::Number(n) => println!("{}", n),
        serde_json::Value::Null => println!("null"),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            // Nested values still print as JSON
            println!("{}", value);
        }
    }
}
