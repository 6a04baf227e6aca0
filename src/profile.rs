//! Browser profile discovery and on-disk extension data
//!
//! The diagnostics CLI works on the settings documents a browser profile
//! keeps on disk. This module locates profiles via `profiles.ini` (with a
//! directory-scan fallback), resolves the extension's data directory inside
//! a profile, and opens a [`SettingsStore`] over the persisted `sync` and
//! `local` documents.

use anyhow::Context;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::storage::{BackendKind, JsonFileBackend};
use crate::store::SettingsStore;

/// Add-on id under which the extension stores its data
pub const EXTENSION_ID: &str = "reddit-simplify@beetle.rodeo";

/// Directory inside a profile that holds per-extension data
const EXTENSION_DATA_DIR: &str = "browser-extension-data";

/// File name of the persisted `sync` area document
pub const SYNC_STORAGE_FILE: &str = "storage-sync.json";

/// File name of the persisted `local` area document
pub const LOCAL_STORAGE_FILE: &str = "storage-local.json";

/// Profile information parsed from profiles.ini
#[derive(Debug, Clone)]
struct BrowserProfile {
    name: String,
    path: PathBuf,
    is_relative: bool,
    is_default: bool,
}

/// Public profile information for listing
#[derive(Debug, Serialize)]
pub struct ProfileInfo {
    pub name: String,
    pub path: PathBuf,
    pub is_default: bool,
    pub is_relative: bool,
    pub has_extension_data: bool,
}

/// Find a profile directory by profile name
///
/// Tries profiles.ini first: an exact name match wins, and the name
/// `default` additionally matches the profile marked `Default=1`. When the
/// ini gives no usable answer the profiles directory is scanned for an entry
/// matching the standard `xxxxxxxx.name` naming pattern.
pub fn find_profile_path(
    profile_name: &str,
    profiles_dir_opt: Option<&Path>,
) -> Result<PathBuf, anyhow::Error> {
    let profiles_dir = get_profiles_directory(profiles_dir_opt)?;
    let profiles_ini = profiles_dir.join("profiles.ini");

    if profiles_ini.exists() {
        if let Ok(profiles) = parse_profiles_ini(&profiles_ini) {
            // Exact name match first
            if let Some(profile) = profiles.iter().find(|p| p.name == profile_name) {
                let full_path = resolve_profile_path(&profiles_dir, profile);
                if full_path.exists() {
                    debug!(path = %full_path.display(), "profile resolved by name");
                    return Ok(full_path);
                }
            }

            // "default" also matches the profile marked as default
            if profile_name == "default" {
                if let Some(profile) = profiles.iter().find(|p| p.is_default) {
                    let full_path = resolve_profile_path(&profiles_dir, profile);
                    if full_path.exists() {
                        debug!(path = %full_path.display(), "profile resolved by default marker");
                        return Ok(full_path);
                    }
                }
            }
        }
    }

    // Fallback: directory scanning
    scan_profiles_directory(&profiles_dir, profile_name)
}

fn resolve_profile_path(profiles_dir: &Path, profile: &BrowserProfile) -> PathBuf {
    if profile.is_relative {
        profiles_dir.join(&profile.path)
    } else {
        profile.path.clone()
    }
}

/// Parse profiles.ini to extract profile information
fn parse_profiles_ini(ini_path: &Path) -> Result<Vec<BrowserProfile>, anyhow::Error> {
    use configparser::ini::Ini;

    let mut ini = Ini::new();
    let content = std::fs::read_to_string(ini_path)
        .with_context(|| format!("Failed to read profiles.ini from {}", ini_path.display()))?;

    // configparser handles UTF-8 BOM automatically
    if let Err(e) = ini.read(content) {
        return Err(anyhow::anyhow!("Failed to parse profiles.ini: {}", e));
    }

    let mut profiles = Vec::new();

    for sec_name in ini.sections() {
        // Only process profile sections (profile0, profile1, ...).
        // Note: configparser converts section names to lowercase.
        if sec_name.to_lowercase().starts_with("profile") {
            let name = ini.get(&sec_name, "Name").unwrap_or_default();
            let path_str = ini.get(&sec_name, "Path").unwrap_or_default();
            let is_relative = ini
                .getuint(&sec_name, "IsRelative")
                .ok()
                .flatten()
                .unwrap_or(1)
                == 1;
            let is_default = ini
                .getuint(&sec_name, "Default")
                .ok()
                .flatten()
                .unwrap_or(0)
                == 1;

            if !name.is_empty() && !path_str.is_empty() {
                profiles.push(BrowserProfile {
                    name,
                    path: PathBuf::from(path_str),
                    is_relative,
                    is_default,
                });
            }
        }
    }

    Ok(profiles)
}

/// Fallback: scan the profiles directory for a matching entry
fn scan_profiles_directory(
    profiles_dir: &Path,
    profile_name: &str,
) -> Result<PathBuf, anyhow::Error> {
    let entries = std::fs::read_dir(profiles_dir).with_context(|| {
        format!(
            "Failed to read profiles directory: {}",
            profiles_dir.display()
        )
    })?;

    let mut matches: Vec<PathBuf> = Vec::new();

    for entry in entries {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            let dir_name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");

            // Exact match (uncommon but possible)
            if dir_name == profile_name {
                return Ok(path);
            }

            // Standard naming pattern (xxxxxxxx.name)
            if dir_name.ends_with(&format!(".{}", profile_name)) {
                matches.push(path);
            }
        }
    }

    if matches.len() == 1 {
        return Ok(matches.remove(0));
    }

    if matches.len() > 1 {
        let match_names: Vec<&str> = matches
            .iter()
            .filter_map(|p| p.file_name().and_then(|s| s.to_str()))
            .collect();

        return Err(anyhow::anyhow!(
            "Multiple profiles match '{}': {}. \
             Please specify the exact profile name from 'reddsimp profiles' \
             or use the full directory name.",
            profile_name,
            match_names.join(", ")
        ));
    }

    Err(anyhow::anyhow!(
        "Profile '{}' not found in {}. \
         Use 'reddsimp profiles' to see available profiles.",
        profile_name,
        profiles_dir.display()
    ))
}

/// List all profiles, noting which ones carry extension data
pub fn list_profiles(profiles_dir_opt: Option<&Path>) -> Result<Vec<ProfileInfo>, anyhow::Error> {
    let profiles_dir = get_profiles_directory(profiles_dir_opt)?;
    let profiles_ini = profiles_dir.join("profiles.ini");

    if !profiles_ini.exists() {
        return Err(anyhow::anyhow!(
            "profiles.ini not found at {}. \
             The browser may not be installed or this is not a standard setup.",
            profiles_ini.display()
        ));
    }

    let profiles = parse_profiles_ini(&profiles_ini)?;

    let profile_infos: Vec<ProfileInfo> = profiles
        .into_iter()
        .map(|p| {
            let full_path = resolve_profile_path(&profiles_dir, &p);
            ProfileInfo {
                name: p.name,
                path: p.path,
                is_default: p.is_default,
                is_relative: p.is_relative,
                has_extension_data: has_extension_data(&full_path),
            }
        })
        .collect();

    Ok(profile_infos)
}

/// Get the profiles directory path from CLI, env var, or auto-detection
///
/// Priority:
/// 1. Manual path provided via CLI or parameter
/// 2. MOZ_PROFILES_DIR environment variable
/// 3. Auto-detection based on OS
pub fn get_profiles_directory(manual_path: Option<&Path>) -> Result<PathBuf, anyhow::Error> {
    if let Some(path) = manual_path {
        return validate_and_use_profiles_dir(path);
    }

    if let Ok(env_path) = std::env::var("MOZ_PROFILES_DIR") {
        let path = PathBuf::from(env_path);
        return validate_and_use_profiles_dir(&path);
    }

    auto_detect_profiles_directory()
}

/// Validate and return the profiles directory path
fn validate_and_use_profiles_dir(path: &Path) -> Result<PathBuf, anyhow::Error> {
    if !path.exists() {
        return Err(anyhow::anyhow!(
            "Profiles directory does not exist: {}\n\
             Please verify the path and try again.",
            path.display()
        ));
    }

    if !path.is_dir() {
        return Err(anyhow::anyhow!(
            "Profiles directory path is not a directory: {}\n\
             Please provide a directory path, not a file.",
            path.display()
        ));
    }

    Ok(path.to_path_buf())
}

/// Auto-detect profiles directory based on operating system
fn auto_detect_profiles_directory() -> Result<PathBuf, anyhow::Error> {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME")
            .map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        Ok(PathBuf::from(home).join(".mozilla/firefox"))
    }

    #[cfg(target_os = "macos")]
    {
        let home = std::env::var("HOME")
            .map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        Ok(PathBuf::from(home).join("Library/Application Support/Firefox"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata = std::env::var("APPDATA")
            .map_err(|_| anyhow::anyhow!("APPDATA environment variable not set"))?;
        Ok(PathBuf::from(appdata).join("Mozilla/Firefox"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        Err(anyhow::anyhow!("Unsupported operating system"))
    }
}

/// The extension's data directory inside a profile
pub fn extension_data_dir(profile_path: &Path) -> PathBuf {
    profile_path.join(EXTENSION_DATA_DIR).join(EXTENSION_ID)
}

/// Path of the persisted `sync` area document inside a profile
pub fn sync_storage_path(profile_path: &Path) -> PathBuf {
    extension_data_dir(profile_path).join(SYNC_STORAGE_FILE)
}

/// Path of the persisted `local` area document inside a profile
pub fn local_storage_path(profile_path: &Path) -> PathBuf {
    extension_data_dir(profile_path).join(LOCAL_STORAGE_FILE)
}

/// Whether a profile carries any persisted data for the extension
pub fn has_extension_data(profile_path: &Path) -> bool {
    sync_storage_path(profile_path).exists() || local_storage_path(profile_path).exists()
}

/// Open a settings store over a profile's persisted documents
///
/// The `sync` document is preferred and the `local` document is the
/// fallback, matching the failover order the extension itself uses.
pub fn open_profile_store(profile_path: &Path) -> SettingsStore {
    debug!(profile = %profile_path.display(), "opening profile settings store");
    SettingsStore::new(
        Box::new(JsonFileBackend::new(
            BackendKind::Sync,
            sync_storage_path(profile_path),
        )),
        Box::new(JsonFileBackend::new(
            BackendKind::Local,
            local_storage_path(profile_path),
        )),
    )
}
