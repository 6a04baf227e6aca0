//! Popup context: the checkbox tree over visibility settings
//!
//! The popup presents every visibility flag as a leaf checkbox grouped into
//! three sections, each with a master checkbox that summarizes its leaves as
//! a tri-state, plus a toggle-all master over everything. Edits persist
//! immediately: leaf writes are diffed against storage so only keys whose
//! stored value differs are written, and popup-only state (dark mode, the
//! collapsed trees) lives in the nested popup object.

use serde_json::Value;
use tracing::debug;

use crate::dom::Document;
use crate::error::{Error, Result};
use crate::schema::{
    self, SettingsMap, DARK_MODE_KEY, MASTER_KEY, POPUP_SETTINGS_KEY, TREE_STATES_KEY,
};
use crate::store::SettingsStore;

/// Aggregate state of a master checkbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    /// No summarized leaf is on
    Unchecked,
    /// Every summarized leaf is on
    Checked,
    /// Some leaves are on and some are off
    Indeterminate,
}

/// The three option sections of the popup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionId {
    /// Elements present on every page
    Everywhere,
    /// Front page and search results
    FrontSearch,
    /// Thread pages
    Thread,
}

const EVERYWHERE_KEYS: &[&str] = &[
    "hide_header",
    "hide_nav_bar",
    "hide_nav_new_user",
    "hide_sidebar_contents",
    "hide_app_nags",
    "hide_geolocation",
    "hide_promoted",
];

const FRONT_SEARCH_KEYS: &[&str] = &[
    "hide_auto_search",
    "hide_trending_topics",
    "hide_create_post_box",
    "hide_community_spotlights",
    "hide_happening_now",
    "hide_promo_modules",
    "hide_recirc_modules",
    "hide_post_avatar",
    "hide_recent_posts",
];

const THREAD_KEYS: &[&str] = &[
    "hide_comment_search_sort",
    "hide_comment_avatar",
    "hide_comment_react",
    "hide_comment_age",
    "hide_award",
    "hide_share_button",
];

impl SectionId {
    /// All sections in display order
    pub const ALL: [SectionId; 3] = [
        SectionId::Everywhere,
        SectionId::FrontSearch,
        SectionId::Thread,
    ];

    /// The setting keys of this section's leaves, in display order
    pub fn keys(self) -> &'static [&'static str] {
        match self {
            SectionId::Everywhere => EVERYWHERE_KEYS,
            SectionId::FrontSearch => FRONT_SEARCH_KEYS,
            SectionId::Thread => THREAD_KEYS,
        }
    }

    /// Id under which this section's collapsed state is persisted
    pub fn tree_id(self) -> &'static str {
        match self {
            SectionId::Everywhere => "tree_everywhere",
            SectionId::FrontSearch => "tree_front_search",
            SectionId::Thread => "tree_thread",
        }
    }

    fn index(self) -> usize {
        match self {
            SectionId::Everywhere => 0,
            SectionId::FrontSearch => 1,
            SectionId::Thread => 2,
        }
    }
}

struct Leaf {
    key: &'static str,
    checked: bool,
}

struct Section {
    master: CheckState,
    collapsed: bool,
    leaves: Vec<Leaf>,
}

impl Section {
    fn new(id: SectionId) -> Self {
        Section {
            master: CheckState::Unchecked,
            collapsed: false,
            leaves: id
                .keys()
                .iter()
                .copied()
                .map(|key| Leaf {
                    key,
                    checked: false,
                })
                .collect(),
        }
    }
}

/// In-memory model of the popup UI
///
/// Mirrors what the popup page shows: the master switch, the dark-mode
/// toggle, three leaf sections with tri-state masters, the toggle-all
/// master, and one collapse switch per section. All mutating operations
/// persist through the given store before returning.
pub struct PopupController {
    document: Document,
    sections: [Section; 3],
    toggle_all: CheckState,
    master_switch: bool,
    dark_mode: bool,
}

impl PopupController {
    /// Create a blank popup model; call [`PopupController::load`] to paint it
    pub fn new() -> Self {
        PopupController {
            document: Document::top_level(),
            sections: SectionId::ALL.map(Section::new),
            toggle_all: CheckState::Unchecked,
            master_switch: true,
            dark_mode: false,
        }
    }

    /// Paint the popup from persisted settings
    ///
    /// Leaf checkboxes take the stored value of their key when present and
    /// keep their current state otherwise. Masters are recomputed from the
    /// leaves, and the collapse switches are restored from the nested popup
    /// state.
    pub fn load(&mut self, store: &mut SettingsStore) -> Result<()> {
        let data = store.get_all()?;

        if let Some(on) = schema::flag(&data, MASTER_KEY) {
            self.master_switch = on;
        }
        self.document
            .set_attribute(MASTER_KEY, bool_text(self.master_switch));

        if let Some(on) = schema::popup_object(&data)
            .and_then(|popup| popup.get(DARK_MODE_KEY))
            .and_then(Value::as_bool)
        {
            self.dark_mode = on;
        }
        self.document
            .set_attribute(DARK_MODE_KEY, bool_text(self.dark_mode));

        for section in &mut self.sections {
            for leaf in &mut section.leaves {
                if let Some(on) = schema::flag(&data, leaf.key) {
                    leaf.checked = on;
                }
            }
        }
        self.recompute_aggregates();
        self.restore_tree_states(&data);
        debug!("popup painted from storage");
        Ok(())
    }

    /// Toggle a single leaf checkbox
    ///
    /// Recomputes the affected masters and persists every leaf whose state
    /// differs from storage.
    pub fn set_leaf(&mut self, store: &mut SettingsStore, key: &str, checked: bool) -> Result<()> {
        let Some(id) = Self::section_of(key) else {
            return Err(Error::UnknownKey(key.to_string()));
        };
        for leaf in &mut self.sections[id.index()].leaves {
            if leaf.key == key {
                leaf.checked = checked;
            }
        }
        self.recompute_aggregates();
        self.persist_changed_leaves(store)
    }

    /// Toggle a section's master checkbox
    ///
    /// Drives every leaf in the section to the master's new state, then
    /// persists the difference.
    pub fn set_section_master(
        &mut self,
        store: &mut SettingsStore,
        id: SectionId,
        checked: bool,
    ) -> Result<()> {
        for leaf in &mut self.sections[id.index()].leaves {
            leaf.checked = checked;
        }
        self.recompute_aggregates();
        self.persist_changed_leaves(store)
    }

    /// Toggle the master over all sections
    ///
    /// Drives every leaf everywhere, persists the value of every leaf key in
    /// a single write, forces all masters to the definite new state, and
    /// expands every section tree on screen without persisting the collapse
    /// switches.
    pub fn set_toggle_all(&mut self, store: &mut SettingsStore, on: bool) -> Result<()> {
        for section in &mut self.sections {
            for leaf in &mut section.leaves {
                leaf.checked = on;
            }
        }
        let values: SettingsMap = self
            .leaves()
            .map(|leaf| (leaf.key.to_string(), Value::Bool(on)))
            .collect();
        store.set(&values)?;

        let state = if on {
            CheckState::Checked
        } else {
            CheckState::Unchecked
        };
        for section in &mut self.sections {
            section.master = state;
            section.collapsed = false;
        }
        self.toggle_all = state;
        Ok(())
    }

    /// Toggle the extension master switch
    pub fn set_master_switch(&mut self, store: &mut SettingsStore, on: bool) -> Result<()> {
        self.master_switch = on;
        self.document.set_attribute(MASTER_KEY, bool_text(on));
        let mut values = SettingsMap::new();
        values.insert(MASTER_KEY.to_string(), Value::Bool(on));
        store.set(&values)
    }

    /// Toggle the popup's dark mode
    ///
    /// Dark mode lives inside the nested popup object, so the write re-reads
    /// that object and replaces only the dark-mode entry.
    pub fn set_dark_mode(&mut self, store: &mut SettingsStore, on: bool) -> Result<()> {
        self.dark_mode = on;
        self.document.set_attribute(DARK_MODE_KEY, bool_text(on));

        let data = store.get(&[POPUP_SETTINGS_KEY])?;
        let mut popup = schema::popup_object(&data).cloned().unwrap_or_default();
        popup.insert(DARK_MODE_KEY.to_string(), Value::Bool(on));

        let mut values = SettingsMap::new();
        values.insert(POPUP_SETTINGS_KEY.to_string(), Value::Object(popup));
        store.set(&values)
    }

    /// Collapse or expand a section tree
    ///
    /// Persists the collapse switches of all sections into the nested popup
    /// state.
    pub fn set_collapsed(
        &mut self,
        store: &mut SettingsStore,
        id: SectionId,
        collapsed: bool,
    ) -> Result<()> {
        self.sections[id.index()].collapsed = collapsed;
        self.persist_tree_states(store)
    }

    /// The popup's own document (styling attributes live here)
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Current state of the extension master switch checkbox
    pub fn master_switch(&self) -> bool {
        self.master_switch
    }

    /// Current state of the dark-mode toggle
    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    /// Current state of the toggle-all master
    pub fn toggle_all_state(&self) -> CheckState {
        self.toggle_all
    }

    /// Current state of a section's master checkbox
    pub fn section_state(&self, id: SectionId) -> CheckState {
        self.sections[id.index()].master
    }

    /// Whether a section tree is collapsed
    pub fn is_collapsed(&self, id: SectionId) -> bool {
        self.sections[id.index()].collapsed
    }

    /// Current state of a leaf checkbox, `None` for unknown keys
    pub fn leaf(&self, key: &str) -> Option<bool> {
        self.leaves()
            .find(|leaf| leaf.key == key)
            .map(|leaf| leaf.checked)
    }

    fn section_of(key: &str) -> Option<SectionId> {
        SectionId::ALL
            .into_iter()
            .find(|id| id.keys().iter().any(|k| *k == key))
    }

    fn leaves(&self) -> impl Iterator<Item = &Leaf> {
        self.sections.iter().flat_map(|section| section.leaves.iter())
    }

    fn recompute_aggregates(&mut self) {
        for section in &mut self.sections {
            section.master = aggregate(section.leaves.iter().map(|leaf| leaf.checked));
        }
        self.toggle_all = aggregate(self.leaves().map(|leaf| leaf.checked));
    }

    // The persisted diff is computed against what storage holds right now,
    // not against the popup's previous state.
    fn persist_changed_leaves(&self, store: &mut SettingsStore) -> Result<()> {
        let stored = store.get_all()?;
        let mut values = SettingsMap::new();
        for leaf in self.leaves() {
            if schema::flag(&stored, leaf.key) != Some(leaf.checked) {
                values.insert(leaf.key.to_string(), Value::Bool(leaf.checked));
            }
        }
        store.set(&values)
    }

    fn persist_tree_states(&self, store: &mut SettingsStore) -> Result<()> {
        let data = store.get(&[POPUP_SETTINGS_KEY])?;
        let mut popup = schema::popup_object(&data).cloned().unwrap_or_default();

        let mut trees = SettingsMap::new();
        for id in SectionId::ALL {
            trees.insert(
                id.tree_id().to_string(),
                Value::Bool(self.sections[id.index()].collapsed),
            );
        }
        popup.insert(TREE_STATES_KEY.to_string(), Value::Object(trees));

        let mut values = SettingsMap::new();
        values.insert(POPUP_SETTINGS_KEY.to_string(), Value::Object(popup));
        store.set(&values)
    }

    fn restore_tree_states(&mut self, data: &SettingsMap) {
        let Some(trees) = schema::popup_object(data)
            .and_then(|popup| popup.get(TREE_STATES_KEY))
            .and_then(Value::as_object)
        else {
            return;
        };
        for (tree_id, value) in trees {
            let Some(id) = SectionId::ALL
                .into_iter()
                .find(|id| id.tree_id() == tree_id)
            else {
                continue;
            };
            self.sections[id.index()].collapsed = value.as_bool().unwrap_or(false);
        }
    }
}

impl Default for PopupController {
    fn default() -> Self {
        PopupController::new()
    }
}

fn aggregate(states: impl Iterator<Item = bool>) -> CheckState {
    let mut seen = false;
    let mut any_on = false;
    let mut all_on = true;
    for on in states {
        seen = true;
        any_on |= on;
        all_on &= on;
    }
    if seen && all_on {
        CheckState::Checked
    } else if any_on {
        CheckState::Indeterminate
    } else {
        CheckState::Unchecked
    }
}

fn bool_text(on: bool) -> &'static str {
    if on {
        "true"
    } else {
        "false"
    }
}
