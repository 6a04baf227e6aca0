//! Background context: schema upkeep, watched-key cache, indicator state
//!
//! The background context is the long-lived owner of the settings lifecycle.
//! At startup it reconciles persisted settings against the canonical schema,
//! then keeps a small cache of hot-path keys and the enabled indicator in
//! step with storage change events. It also answers control messages from
//! the popup.

use serde_json::Value;
use tracing::{debug, info};

use crate::error::Result;
use crate::runtime::{Message, Reply};
use crate::schema::{self, SchemaOutcome, SettingsMap, MASTER_KEY};
use crate::store::{ChangeSet, SettingsStore};

/// Keys mirrored into the background cache for cheap hot-path reads
pub const WATCHED_KEYS: [&str; 6] = [
    "hide_header",
    "hide_nav_bar",
    "hide_sidebar_contents",
    "hide_comment_search_sort",
    "hide_promoted",
    MASTER_KEY,
];

/// Page opened by the embedding host on first install and after uninstall
pub const WELCOME_URL: &str = "https://beetle.rodeo";

/// Long-lived background state: watched-key cache plus enabled indicator
pub struct StateWatcher {
    cache: SettingsMap,
    indicator_on: bool,
}

impl StateWatcher {
    /// Create a watcher with an empty cache and the indicator at its default
    pub fn new() -> Self {
        StateWatcher {
            cache: SettingsMap::new(),
            indicator_on: true,
        }
    }

    /// Run the background startup sequence
    ///
    /// Reconciles the persisted settings against the canonical schema, fills
    /// the watched-key cache, and derives the indicator from the stored
    /// master switch.
    pub fn startup(&mut self, store: &mut SettingsStore) -> Result<SchemaOutcome> {
        let outcome = schema::reconcile(store)?;
        if outcome == SchemaOutcome::FirstInstall {
            info!(url = WELCOME_URL, "first install, welcome page requested");
        }
        self.refresh_cache(store)?;
        let enabled = schema::flag(&self.cache, MASTER_KEY).unwrap_or(true);
        self.set_indicator(enabled);
        Ok(outcome)
    }

    /// Re-read every watched key from storage into the cache
    pub fn refresh_cache(&mut self, store: &mut SettingsStore) -> Result<()> {
        self.cache = store.get(&WATCHED_KEYS)?;
        debug!(keys = self.cache.len(), "refreshed watched-key cache");
        Ok(())
    }

    /// React to a storage change event
    ///
    /// Events that touch no watched key are ignored. When the master switch
    /// is among the changed keys the indicator follows its new value first;
    /// either way the whole cache is then refreshed once from storage.
    pub fn on_storage_changed(
        &mut self,
        store: &mut SettingsStore,
        changes: &ChangeSet,
    ) -> Result<()> {
        if !WATCHED_KEYS.iter().any(|key| changes.contains_key(*key)) {
            return Ok(());
        }
        if let Some(change) = changes.get(MASTER_KEY) {
            let enabled = change.new_value.as_ref().and_then(Value::as_bool).unwrap_or(false);
            self.set_indicator(enabled);
        }
        self.refresh_cache(store)
    }

    /// Answer a control message from another context
    pub fn handle_message(&mut self, store: &mut SettingsStore, message: Message) -> Result<Reply> {
        match message {
            Message::ResetToDefaults => {
                let defaults = schema::default_settings();
                store.replace_all(&defaults)?;
                self.set_indicator(schema::flag(&defaults, MASTER_KEY).unwrap_or(true));
                info!("settings reset to defaults");
                Ok(Reply { ok: true })
            }
        }
    }

    /// Cached value of a watched key
    ///
    /// Returns `None` for keys outside the watch list and for keys absent
    /// from storage at the last refresh.
    pub fn cached_flag(&self, key: &str) -> Option<bool> {
        schema::flag(&self.cache, key)
    }

    /// Whether the enabled indicator is currently lit
    pub fn indicator_on(&self) -> bool {
        self.indicator_on
    }

    fn set_indicator(&mut self, on: bool) {
        if self.indicator_on != on {
            debug!(on, "indicator updated");
        }
        self.indicator_on = on;
    }
}

impl Default for StateWatcher {
    fn default() -> Self {
        StateWatcher::new()
    }
}
