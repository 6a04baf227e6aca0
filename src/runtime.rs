//! Cooperative host tying the contexts together
//!
//! A [`Runtime`] owns the settings store, the background watcher, any number
//! of page appliers, and at most one popup, and plays the role the browser
//! plays for a real extension: it fans storage change events out to every
//! context and routes control messages to the background. Everything runs on
//! one thread; after each externally triggered operation the runtime pumps
//! the change queue until it drains, so observers always settle before the
//! call returns.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::background::StateWatcher;
use crate::content::PageApplier;
use crate::dom::Document;
use crate::error::{Error, Result};
use crate::popup::{PopupController, SectionId};
use crate::schema::SchemaOutcome;
use crate::store::SettingsStore;

/// Control message sent from the popup to the background context
///
/// Serializes to the wire form `{"type":"reset_to_defaults"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Replace all persisted settings with the shipped defaults
    ResetToDefaults,
}

/// Acknowledgment returned by the background context
///
/// Serializes to the wire form `{"ok":true}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub ok: bool,
}

/// Single-threaded host for one extension session
pub struct Runtime {
    store: SettingsStore,
    background: StateWatcher,
    pages: Vec<PageApplier>,
    popup: Option<PopupController>,
}

impl Runtime {
    /// Create a host over the given store; the background starts cold
    pub fn new(store: SettingsStore) -> Self {
        Runtime {
            store,
            background: StateWatcher::new(),
            pages: Vec::new(),
            popup: None,
        }
    }

    /// Create a host over fresh in-memory storage
    pub fn in_memory() -> Self {
        Runtime::new(SettingsStore::in_memory())
    }

    /// Run the background startup sequence and settle all observers
    pub fn startup(&mut self) -> Result<SchemaOutcome> {
        let outcome = self.background.startup(&mut self.store)?;
        self.pump()?;
        Ok(outcome)
    }

    /// Direct access to the shared store
    ///
    /// Writes made here queue change events like any other write; call
    /// [`Runtime::pump`] to deliver them.
    pub fn store(&mut self) -> &mut SettingsStore {
        &mut self.store
    }

    /// The background context's watcher
    pub fn background(&self) -> &StateWatcher {
        &self.background
    }

    /// Open a page document and attach a content applier to it
    ///
    /// Returns the page's index for later lookups.
    pub fn open_page(&mut self, document: Document) -> Result<usize> {
        let mut page = PageApplier::new(document);
        page.attach(&mut self.store)?;
        self.pages.push(page);
        self.pump()?;
        Ok(self.pages.len() - 1)
    }

    /// Look up an open page by index
    pub fn page(&self, index: usize) -> Option<&PageApplier> {
        self.pages.get(index)
    }

    /// Deliver the content-loaded event to a page
    pub fn page_dom_ready(&mut self, index: usize) -> Result<()> {
        let Some(page) = self.pages.get_mut(index) else {
            return Err(Error::NoReceiver("page"));
        };
        page.dom_content_loaded(&mut self.store)?;
        self.pump()
    }

    /// Open the popup and paint it from storage
    ///
    /// A popup that is already open is repainted instead.
    pub fn open_popup(&mut self) -> Result<()> {
        let mut popup = self.popup.take().unwrap_or_default();
        popup.load(&mut self.store)?;
        self.popup = Some(popup);
        Ok(())
    }

    /// Close the popup, if open
    pub fn close_popup(&mut self) {
        self.popup = None;
    }

    /// The popup, while open
    pub fn popup(&self) -> Option<&PopupController> {
        self.popup.as_ref()
    }

    /// Toggle a leaf checkbox in the popup
    pub fn popup_set_leaf(&mut self, key: &str, checked: bool) -> Result<()> {
        let Some(popup) = self.popup.as_mut() else {
            return Err(Error::NoReceiver("popup"));
        };
        popup.set_leaf(&mut self.store, key, checked)?;
        self.pump()
    }

    /// Toggle a section master checkbox in the popup
    pub fn popup_set_section_master(&mut self, id: SectionId, checked: bool) -> Result<()> {
        let Some(popup) = self.popup.as_mut() else {
            return Err(Error::NoReceiver("popup"));
        };
        popup.set_section_master(&mut self.store, id, checked)?;
        self.pump()
    }

    /// Toggle the popup's master over all sections
    pub fn popup_set_toggle_all(&mut self, on: bool) -> Result<()> {
        let Some(popup) = self.popup.as_mut() else {
            return Err(Error::NoReceiver("popup"));
        };
        popup.set_toggle_all(&mut self.store, on)?;
        self.pump()
    }

    /// Toggle the extension master switch from the popup
    pub fn popup_set_master_switch(&mut self, on: bool) -> Result<()> {
        let Some(popup) = self.popup.as_mut() else {
            return Err(Error::NoReceiver("popup"));
        };
        popup.set_master_switch(&mut self.store, on)?;
        self.pump()
    }

    /// Toggle the popup's dark mode
    pub fn popup_set_dark_mode(&mut self, on: bool) -> Result<()> {
        let Some(popup) = self.popup.as_mut() else {
            return Err(Error::NoReceiver("popup"));
        };
        popup.set_dark_mode(&mut self.store, on)?;
        self.pump()
    }

    /// Collapse or expand a section tree in the popup
    pub fn popup_set_collapsed(&mut self, id: SectionId, collapsed: bool) -> Result<()> {
        let Some(popup) = self.popup.as_mut() else {
            return Err(Error::NoReceiver("popup"));
        };
        popup.set_collapsed(&mut self.store, id, collapsed)?;
        self.pump()
    }

    /// Press the popup's reset button
    ///
    /// Sends [`Message::ResetToDefaults`] to the background and, on a
    /// positive acknowledgment, repaints the popup from the restored
    /// defaults.
    pub fn popup_reset(&mut self) -> Result<Reply> {
        if self.popup.is_none() {
            return Err(Error::NoReceiver("popup"));
        }
        let reply = self.deliver(Message::ResetToDefaults)?;
        if reply.ok {
            if let Some(popup) = self.popup.as_mut() {
                popup.load(&mut self.store)?;
            }
        }
        Ok(reply)
    }

    /// Route a control message to the background context
    pub fn deliver(&mut self, message: Message) -> Result<Reply> {
        debug!(?message, "delivering message to background");
        let reply = self.background.handle_message(&mut self.store, message)?;
        self.pump()?;
        Ok(reply)
    }

    /// Drain the store's change queue, fanning each event out to every
    /// context in creation order
    ///
    /// Delivery may enqueue further events (the background refreshes its
    /// cache from storage, for example); pumping continues until the queue
    /// is empty.
    pub fn pump(&mut self) -> Result<()> {
        while let Some(changes) = self.store.take_change() {
            self.background.on_storage_changed(&mut self.store, &changes)?;
            for page in &mut self.pages {
                page.on_storage_changed(&mut self.store, &changes)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    #[test]
    fn test_message_wire_format() {
        let encoded = serde_json::to_string(&Message::ResetToDefaults).unwrap();
        assert_eq!(encoded, r#"{"type":"reset_to_defaults"}"#);
        let decoded: Message = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, Message::ResetToDefaults);
    }

    #[test]
    fn test_reply_wire_format() {
        let encoded = serde_json::to_string(&Reply { ok: true }).unwrap();
        assert_eq!(encoded, r#"{"ok":true}"#);
    }

    #[test]
    fn test_startup_settles_with_no_pending_changes() {
        let mut runtime = Runtime::in_memory();
        let outcome = runtime.startup().unwrap();
        assert_eq!(outcome, SchemaOutcome::FirstInstall);
        assert!(!runtime.store().has_pending_changes());
        assert!(runtime.background().indicator_on());
    }

    #[test]
    fn test_direct_store_write_reaches_pages_after_pump() {
        let mut runtime = Runtime::in_memory();
        runtime.startup().unwrap();
        let index = runtime.open_page(Document::top_level()).unwrap();

        let mut values = schema::SettingsMap::new();
        values.insert("hide_header".to_string(), serde_json::Value::Bool(true));
        runtime.store().set(&values).unwrap();
        runtime.pump().unwrap();

        let page = runtime.page(index).unwrap();
        assert_eq!(page.document().attribute("hide_header"), Some("true"));
    }

    #[test]
    fn test_popup_operations_require_an_open_popup() {
        let mut runtime = Runtime::in_memory();
        runtime.startup().unwrap();
        assert!(matches!(
            runtime.popup_set_leaf("hide_header", true),
            Err(Error::NoReceiver("popup"))
        ));
        assert!(matches!(runtime.popup_reset(), Err(Error::NoReceiver("popup"))));
    }

    #[test]
    fn test_page_dom_ready_requires_a_page() {
        let mut runtime = Runtime::in_memory();
        runtime.startup().unwrap();
        assert!(matches!(
            runtime.page_dom_ready(3),
            Err(Error::NoReceiver("page"))
        ));
    }
}
