//! Content context: project settings onto the page
//!
//! One [`PageApplier`] runs per document. On startup it stamps every
//! visibility flag onto the document root as an attribute (page styling keys
//! off those attributes) and injects the page-level script once. Afterwards
//! it keeps the attributes in step with storage change events. Framed
//! documents only participate when they contain the embedded media player.

use serde_json::Value;
use tracing::debug;

use crate::dom::{Document, FrameKind};
use crate::error::Result;
use crate::schema::{self, SettingsMap, HIDE_MARKER, MASTER_KEY};
use crate::store::{ChangeSet, SettingsStore};

/// Element id under which the page-level script is injected
pub const SCRIPT_ELEMENT_ID: &str = "reddit-simplify";

/// Element id that marks a frame as the embedded media player
pub const PLAYER_ELEMENT_ID: &str = "player";

/// Per-document applier for the content context
pub struct PageApplier {
    document: Document,
    started: bool,
}

impl PageApplier {
    /// Create an applier over a document; nothing runs until it attaches
    pub fn new(document: Document) -> Self {
        PageApplier {
            document,
            started: false,
        }
    }

    /// The document this applier manages
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Whether the one-shot startup has already run for this document
    pub fn is_running(&self) -> bool {
        self.started
    }

    /// Attach to the document
    ///
    /// Top-level documents start immediately. Framed documents wait for
    /// [`PageApplier::dom_content_loaded`], which also applies the player
    /// gate.
    pub fn attach(&mut self, store: &mut SettingsStore) -> Result<()> {
        if self.started {
            return Ok(());
        }
        match self.document.frame() {
            FrameKind::TopLevel => self.start(store),
            FrameKind::Framed => Ok(()),
        }
    }

    /// Deliver the document's content-loaded event
    ///
    /// Framed documents start only if they contain the embedded player
    /// element; other frames stay inert for the rest of their lifetime.
    pub fn dom_content_loaded(&mut self, store: &mut SettingsStore) -> Result<()> {
        self.document.mark_ready();
        if self.started {
            return Ok(());
        }
        if self.document.frame() == FrameKind::Framed
            && !self.document.has_element(PLAYER_ELEMENT_ID)
        {
            debug!("frame without player element, staying inert");
            return Ok(());
        }
        self.start(store)
    }

    /// React to a storage change event
    ///
    /// A change to the master switch re-reads the full settings object and
    /// either re-applies everything or strips the attributes. Otherwise each
    /// changed visibility key is patched individually from the event payload,
    /// with a removed key clearing its attribute.
    pub fn on_storage_changed(
        &mut self,
        store: &mut SettingsStore,
        changes: &ChangeSet,
    ) -> Result<()> {
        if !self.started {
            return Ok(());
        }
        if let Some(change) = changes.get(MASTER_KEY) {
            let enabled = change.new_value.as_ref().and_then(Value::as_bool).unwrap_or(false);
            let settings = store.get_all()?;
            if enabled {
                self.apply_hide_attributes(&settings);
                self.ensure_injected();
            } else {
                self.remove_hide_attributes(&settings);
            }
            return Ok(());
        }
        for (key, change) in changes {
            if !key.contains(HIDE_MARKER) {
                continue;
            }
            match &change.new_value {
                Some(value) => self.document.set_attribute(key, &attribute_text(value)),
                None => self.document.remove_attribute(key),
            }
        }
        Ok(())
    }

    fn start(&mut self, store: &mut SettingsStore) -> Result<()> {
        self.started = true;
        let settings = store.get_all()?;
        if schema::flag(&settings, MASTER_KEY) == Some(true) {
            self.apply_hide_attributes(&settings);
            self.ensure_injected();
        }
        Ok(())
    }

    fn apply_hide_attributes(&mut self, settings: &SettingsMap) {
        let mut applied = 0usize;
        for (key, value) in settings {
            if key.contains(HIDE_MARKER) {
                self.document.set_attribute(key, &attribute_text(value));
                applied += 1;
            }
        }
        debug!(applied, "applied visibility attributes");
    }

    fn remove_hide_attributes(&mut self, settings: &SettingsMap) {
        for key in settings.keys() {
            if key.contains(HIDE_MARKER) {
                self.document.remove_attribute(key);
            }
        }
    }

    fn ensure_injected(&mut self) {
        if !self.document.has_element(SCRIPT_ELEMENT_ID) {
            self.document.insert_element(SCRIPT_ELEMENT_ID);
            debug!(id = SCRIPT_ELEMENT_ID, "injected page script");
        }
    }
}

// Attribute values are stringified the way page scripting would: booleans
// become "true"/"false", strings are used as-is.
fn attribute_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::KeyChange;

    fn seeded_store() -> SettingsStore {
        let mut store = SettingsStore::in_memory();
        store.set(&schema::default_settings()).unwrap();
        while store.take_change().is_some() {}
        store
    }

    fn write_flag(store: &mut SettingsStore, key: &str, on: bool) -> ChangeSet {
        let mut values = SettingsMap::new();
        values.insert(key.to_string(), Value::Bool(on));
        store.set(&values).unwrap();
        store.take_change().unwrap()
    }

    #[test]
    fn test_top_level_attach_applies_and_injects() {
        let mut store = seeded_store();
        let mut page = PageApplier::new(Document::top_level());
        page.attach(&mut store).unwrap();

        assert!(page.is_running());
        assert_eq!(page.document().attribute("hide_header"), Some("false"));
        assert_eq!(page.document().attribute("hide_award"), Some("true"));
        assert_eq!(page.document().attribute_names().count(), 22);
        assert!(!page.document().has_attribute(MASTER_KEY));
        assert!(page.document().has_element(SCRIPT_ELEMENT_ID));
    }

    #[test]
    fn test_disabled_attach_consumes_token_but_touches_nothing() {
        let mut store = seeded_store();
        write_flag(&mut store, MASTER_KEY, false);

        let mut page = PageApplier::new(Document::top_level());
        page.attach(&mut store).unwrap();

        assert!(page.is_running());
        assert_eq!(page.document().attribute_names().count(), 0);
        assert!(!page.document().has_element(SCRIPT_ELEMENT_ID));

        // The applier still listens: enabling later applies everything.
        let changes = write_flag(&mut store, MASTER_KEY, true);
        page.on_storage_changed(&mut store, &changes).unwrap();
        assert_eq!(page.document().attribute_names().count(), 22);
        assert!(page.document().has_element(SCRIPT_ELEMENT_ID));
    }

    #[test]
    fn test_attach_is_idempotent() {
        let mut store = seeded_store();
        let mut page = PageApplier::new(Document::top_level());
        page.attach(&mut store).unwrap();
        page.attach(&mut store).unwrap();
        assert_eq!(page.document().attribute_names().count(), 22);
    }

    #[test]
    fn test_frame_without_player_stays_inert() {
        let mut store = seeded_store();
        let mut page = PageApplier::new(Document::framed());
        page.attach(&mut store).unwrap();
        assert!(!page.is_running());

        page.dom_content_loaded(&mut store).unwrap();
        assert!(!page.is_running());
        assert_eq!(page.document().attribute_names().count(), 0);

        // Inert frames ignore storage changes entirely.
        let changes = write_flag(&mut store, "hide_header", true);
        page.on_storage_changed(&mut store, &changes).unwrap();
        assert!(!page.document().has_attribute("hide_header"));
    }

    #[test]
    fn test_frame_with_player_starts_on_content_loaded() {
        let mut store = seeded_store();
        let mut document = Document::framed();
        document.insert_element(PLAYER_ELEMENT_ID);
        let mut page = PageApplier::new(document);

        page.attach(&mut store).unwrap();
        assert!(!page.is_running());

        page.dom_content_loaded(&mut store).unwrap();
        assert!(page.is_running());
        assert_eq!(page.document().attribute("hide_promoted"), Some("true"));
        assert!(page.document().has_element(SCRIPT_ELEMENT_ID));
    }

    #[test]
    fn test_single_key_change_patches_one_attribute() {
        let mut store = seeded_store();
        let mut page = PageApplier::new(Document::top_level());
        page.attach(&mut store).unwrap();

        let changes = write_flag(&mut store, "hide_header", true);
        page.on_storage_changed(&mut store, &changes).unwrap();
        assert_eq!(page.document().attribute("hide_header"), Some("true"));
        assert_eq!(page.document().attribute("hide_award"), Some("true"));
    }

    #[test]
    fn test_removed_key_clears_its_attribute() {
        let mut store = seeded_store();
        let mut page = PageApplier::new(Document::top_level());
        page.attach(&mut store).unwrap();

        let mut changes = ChangeSet::new();
        changes.insert(
            "hide_award".to_string(),
            KeyChange {
                old_value: Some(Value::Bool(true)),
                new_value: None,
            },
        );
        page.on_storage_changed(&mut store, &changes).unwrap();
        assert!(!page.document().has_attribute("hide_award"));
    }

    #[test]
    fn test_non_hide_key_change_is_ignored() {
        let mut store = seeded_store();
        let mut page = PageApplier::new(Document::top_level());
        page.attach(&mut store).unwrap();

        let mut values = SettingsMap::new();
        values.insert(
            schema::POPUP_SETTINGS_KEY.to_string(),
            Value::String("junk".to_string()),
        );
        store.set(&values).unwrap();
        let changes = store.take_change().unwrap();
        page.on_storage_changed(&mut store, &changes).unwrap();
        assert!(!page.document().has_attribute(schema::POPUP_SETTINGS_KEY));
    }

    #[test]
    fn test_master_off_strips_attributes_but_keeps_script() {
        let mut store = seeded_store();
        let mut page = PageApplier::new(Document::top_level());
        page.attach(&mut store).unwrap();

        let changes = write_flag(&mut store, MASTER_KEY, false);
        page.on_storage_changed(&mut store, &changes).unwrap();
        assert_eq!(page.document().attribute_names().count(), 0);
        // Injected scripts cannot be unloaded; the marker stays.
        assert!(page.document().has_element(SCRIPT_ELEMENT_ID));

        let changes = write_flag(&mut store, MASTER_KEY, true);
        page.on_storage_changed(&mut store, &changes).unwrap();
        assert_eq!(page.document().attribute_names().count(), 22);
    }

    #[test]
    fn test_master_removal_counts_as_disable() {
        let mut store = seeded_store();
        let mut page = PageApplier::new(Document::top_level());
        page.attach(&mut store).unwrap();

        let mut changes = ChangeSet::new();
        changes.insert(
            MASTER_KEY.to_string(),
            KeyChange {
                old_value: Some(Value::Bool(true)),
                new_value: None,
            },
        );
        page.on_storage_changed(&mut store, &changes).unwrap();
        assert_eq!(page.document().attribute_names().count(), 0);
    }

    #[test]
    fn test_single_key_patch_applies_even_while_disabled() {
        let mut store = seeded_store();
        let mut page = PageApplier::new(Document::top_level());
        page.attach(&mut store).unwrap();

        let changes = write_flag(&mut store, MASTER_KEY, false);
        page.on_storage_changed(&mut store, &changes).unwrap();
        assert_eq!(page.document().attribute_names().count(), 0);

        // Individual patches do not consult the master switch.
        let changes = write_flag(&mut store, "hide_header", true);
        page.on_storage_changed(&mut store, &changes).unwrap();
        assert_eq!(page.document().attribute("hide_header"), Some("true"));
    }
}
