//! Canonical settings schema, drift detection, and migration
//!
//! This module owns the canonical shape of the extension's settings object:
//! the full key list, the shipped default values, and the rules that decide
//! when a persisted settings document is outdated and how it is merged
//! forward. Everything else in the library treats the settings object as an
//! opaque JSON map; only this module knows which keys exist.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::store::SettingsStore;

/// A settings object as persisted in extension storage
///
/// This is a type alias for a JSON object map. Top-level values are booleans
/// except for [`POPUP_SETTINGS_KEY`], which holds a nested object.
pub type SettingsMap = Map<String, Value>;

/// Key of the master switch that enables or disables the whole extension
pub const MASTER_KEY: &str = "redd_on";

/// Key of the nested object holding popup-only state
pub const POPUP_SETTINGS_KEY: &str = "popup_settings";

/// Key of the dark-mode flag inside [`POPUP_SETTINGS_KEY`]
pub const DARK_MODE_KEY: &str = "dark_mode";

/// Key of the tree-switch object inside [`POPUP_SETTINGS_KEY`]
pub const TREE_STATES_KEY: &str = "tree_states";

/// Substring that marks a key as a page-element visibility flag
///
/// Keys containing this marker are projected onto the document root as
/// attributes by the content context.
pub const HIDE_MARKER: &str = "hide";

/// Visibility flags and their shipped defaults, in declaration order
pub(crate) const DEFAULT_HIDE_FLAGS: [(&str, bool); 22] = [
    ("hide_header", false),
    ("hide_nav_bar", false),
    ("hide_nav_new_user", true),
    ("hide_sidebar_contents", false),
    ("hide_post_avatar", false),
    ("hide_share_button", true),
    ("hide_comment_search_sort", false),
    ("hide_comment_avatar", false),
    ("hide_comment_react", false),
    ("hide_comment_age", false),
    ("hide_award", true),
    ("hide_promoted", true),
    ("hide_auto_search", true),
    ("hide_trending_topics", true),
    ("hide_app_nags", true),
    ("hide_promo_modules", false),
    ("hide_recirc_modules", false),
    ("hide_create_post_box", true),
    ("hide_community_spotlights", true),
    ("hide_happening_now", false),
    ("hide_geolocation", false),
    ("hide_recent_posts", false),
];

/// Build the canonical default settings object
///
/// Returns a fresh map holding every visibility flag, the master switch
/// (enabled), and the nested popup state with dark mode off and all option
/// trees expanded.
///
/// # Example
///
/// ```rust
/// use reddsimp::default_settings;
///
/// let defaults = default_settings();
/// assert_eq!(defaults.len(), 24);
/// assert_eq!(defaults.get("redd_on").and_then(|v| v.as_bool()), Some(true));
/// assert_eq!(defaults.get("hide_award").and_then(|v| v.as_bool()), Some(true));
/// ```
pub fn default_settings() -> SettingsMap {
    let mut settings = SettingsMap::new();
    for (key, on) in DEFAULT_HIDE_FLAGS {
        settings.insert(key.to_string(), Value::Bool(on));
    }
    settings.insert(MASTER_KEY.to_string(), Value::Bool(true));
    settings.insert(
        POPUP_SETTINGS_KEY.to_string(),
        Value::Object(default_popup_settings()),
    );
    settings
}

/// Build the default nested popup state object
pub(crate) fn default_popup_settings() -> SettingsMap {
    let mut popup = SettingsMap::new();
    popup.insert(DARK_MODE_KEY.to_string(), Value::Bool(false));
    let mut trees = SettingsMap::new();
    trees.insert("tree_everywhere".to_string(), Value::Bool(false));
    trees.insert("tree_front_search".to_string(), Value::Bool(false));
    trees.insert("tree_thread".to_string(), Value::Bool(false));
    popup.insert(TREE_STATES_KEY.to_string(), Value::Object(trees));
    popup
}

/// Read a top-level boolean flag from a settings object
///
/// Returns `None` when the key is absent or holds a non-boolean value.
pub fn flag(settings: &SettingsMap, key: &str) -> Option<bool> {
    settings.get(key).and_then(Value::as_bool)
}

/// Read the nested popup state object, if present and an object
pub fn popup_object(settings: &SettingsMap) -> Option<&SettingsMap> {
    settings.get(POPUP_SETTINGS_KEY).and_then(Value::as_object)
}

/// Check whether a persisted settings object has drifted from the schema
///
/// A document drifts when its top-level key count differs from the canonical
/// schema, when any canonical key is missing, or when the nested popup object
/// does not have the canonical number of entries. A missing or non-object
/// popup entry counts as zero entries. Extra unknown keys are caught by the
/// key-count predicate.
///
/// # Example
///
/// ```rust
/// use reddsimp::{default_settings, has_drift};
///
/// let mut settings = default_settings();
/// assert!(!has_drift(&settings));
///
/// settings.remove("hide_award");
/// assert!(has_drift(&settings));
/// ```
pub fn has_drift(persisted: &SettingsMap) -> bool {
    let defaults = default_settings();
    if persisted.len() != defaults.len() {
        return true;
    }
    if defaults.keys().any(|key| !persisted.contains_key(key)) {
        return true;
    }
    let nested_len = popup_object(persisted).map_or(0, SettingsMap::len);
    nested_len != default_popup_settings().len()
}

/// Merge a persisted settings object into a fresh copy of the defaults
///
/// Every canonical key starts at its default value. Top-level scalar values
/// present in `persisted` are carried over as-is; for the nested popup object,
/// known sub-keys are carried over individually. Keys that are not part of
/// the canonical schema are dropped.
pub fn merge_into_defaults(persisted: &SettingsMap) -> SettingsMap {
    let mut merged = default_settings();
    for (key, slot) in merged.iter_mut() {
        let Some(persisted_value) = persisted.get(key) else {
            continue;
        };
        match slot {
            Value::Object(nested) => {
                if let Some(persisted_nested) = persisted_value.as_object() {
                    for (sub_key, sub_slot) in nested.iter_mut() {
                        if let Some(sub_value) = persisted_nested.get(sub_key) {
                            *sub_slot = sub_value.clone();
                        }
                    }
                }
            }
            _ => *slot = persisted_value.clone(),
        }
    }
    merged
}

/// Outcome of a schema reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaOutcome {
    /// Storage was empty; the canonical defaults were installed
    FirstInstall,
    /// Storage had drifted; values were merged forward and rewritten
    Migrated,
    /// Storage already matches the canonical schema
    Unchanged,
}

/// Bring persisted settings up to the canonical schema
///
/// Runs at background startup. Empty storage receives the shipped defaults.
/// A drifted document is merged into a fresh copy of the defaults and written
/// back as a full replacement, so obsolete keys disappear. A document that
/// already matches the schema is left untouched, which makes repeated calls
/// no-ops.
///
/// # Example
///
/// ```rust
/// use reddsimp::{reconcile, SchemaOutcome, SettingsStore};
///
/// let mut store = SettingsStore::in_memory();
/// assert_eq!(reconcile(&mut store).unwrap(), SchemaOutcome::FirstInstall);
/// assert_eq!(reconcile(&mut store).unwrap(), SchemaOutcome::Unchanged);
/// ```
pub fn reconcile(store: &mut SettingsStore) -> Result<SchemaOutcome> {
    let persisted = store.get_all()?;
    if persisted.is_empty() {
        store.set(&default_settings())?;
        info!("installed default settings");
        return Ok(SchemaOutcome::FirstInstall);
    }
    if !has_drift(&persisted) {
        debug!("persisted settings match the canonical schema");
        return Ok(SchemaOutcome::Unchanged);
    }
    let merged = merge_into_defaults(&persisted);
    store.replace_all(&merged)?;
    info!(
        keys = merged.len(),
        "migrated persisted settings to the canonical schema"
    );
    Ok(SchemaOutcome::Migrated)
}

/// Validate a single-key write against the canonical schema
///
/// Used by external tooling before writing into extension storage. Only
/// top-level boolean flags are writable this way; the nested popup object is
/// managed by the popup UI.
pub fn validate_write(key: &str, value: &Value) -> Result<()> {
    let defaults = default_settings();
    let Some(default_value) = defaults.get(key) else {
        return Err(Error::UnknownKey(key.to_string()));
    };
    match default_value {
        Value::Bool(_) => {
            if value.is_boolean() {
                Ok(())
            } else {
                Err(Error::InvalidValue {
                    key: key.to_string(),
                    reason: format!("expected a boolean, got {value}"),
                })
            }
        }
        _ => Err(Error::InvalidValue {
            key: key.to_string(),
            reason: "nested popup state is managed by the popup UI".to_string(),
        }),
    }
}

/// Static lookup table for setting key descriptions
static KEY_DESCRIPTIONS: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();

/// Get the human-readable description for a setting key
///
/// Returns `None` for keys that are not part of the canonical schema.
///
/// # Example
///
/// ```rust
/// use reddsimp::describe_key;
///
/// assert!(describe_key("redd_on").is_some());
/// assert!(describe_key("no_such_key").is_none());
/// ```
pub fn describe_key(key: &str) -> Option<&'static str> {
    KEY_DESCRIPTIONS
        .get_or_init(|| {
            HashMap::from([
                (
                    "hide_header",
                    "Hides the sticky page header at the top of every Reddit page.",
                ),
                (
                    "hide_nav_bar",
                    "Hides the left-hand navigation sidebar with feeds and communities.",
                ),
                (
                    "hide_nav_new_user",
                    "Hides the new-user onboarding entries inside the navigation sidebar.",
                ),
                (
                    "hide_sidebar_contents",
                    "Hides the right-hand sidebar contents such as community info boxes.",
                ),
                (
                    "hide_post_avatar",
                    "Hides poster avatars next to posts in feeds.",
                ),
                (
                    "hide_share_button",
                    "Hides the share button under posts and comments.",
                ),
                (
                    "hide_comment_search_sort",
                    "Hides the comment search and sort controls on thread pages.",
                ),
                (
                    "hide_comment_avatar",
                    "Hides commenter avatars on thread pages.",
                ),
                (
                    "hide_comment_react",
                    "Hides comment reaction buttons on thread pages.",
                ),
                (
                    "hide_comment_age",
                    "Hides the posted-ago timestamps next to comments.",
                ),
                (
                    "hide_award",
                    "Hides award icons and the give-award controls.",
                ),
                (
                    "hide_promoted",
                    "Hides promoted (advertised) posts in feeds.",
                ),
                (
                    "hide_auto_search",
                    "Hides search suggestions that appear automatically while typing.",
                ),
                (
                    "hide_trending_topics",
                    "Hides the trending-today carousel on the front page.",
                ),
                (
                    "hide_app_nags",
                    "Hides banners and prompts that push the mobile app.",
                ),
                (
                    "hide_promo_modules",
                    "Hides promotional modules in feeds and sidebars.",
                ),
                (
                    "hide_recirc_modules",
                    "Hides recirculation modules such as popular-near-you rows.",
                ),
                (
                    "hide_create_post_box",
                    "Hides the inline create-post box at the top of feeds.",
                ),
                (
                    "hide_community_spotlights",
                    "Hides community spotlight recommendations in feeds.",
                ),
                (
                    "hide_happening_now",
                    "Hides the happening-now live bar on the front page.",
                ),
                (
                    "hide_geolocation",
                    "Hides location-based content such as local community suggestions.",
                ),
                (
                    "hide_recent_posts",
                    "Hides the recent-posts rail shown next to feeds and search results.",
                ),
                (
                    "redd_on",
                    "Master switch for the whole extension. When false, pages are left \
                     untouched and the toolbar indicator turns off.",
                ),
                (
                    "popup_settings",
                    "Nested object holding popup-only state: the dark-mode flag and the \
                     collapsed state of each option tree.",
                ),
            ])
        })
        .get(key)
        .copied()
}
