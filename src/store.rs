//! Settings store with backend failover and change events
//!
//! [`SettingsStore`] is the single entry point every context uses to touch
//! persisted settings. It wraps a preferred backend (the `sync` area) and a
//! fallback backend (the `local` area): the first availability error demotes
//! the store to the fallback and retries the failed operation there once.
//! Demotion is one-way; the store never probes the preferred area again
//! within a session.
//!
//! Every effective write queues a [`ChangeSet`] describing the keys whose
//! values actually changed. The embedding host drains the queue and fans the
//! events out to the contexts, mirroring how storage change notifications
//! reach every extension context after a write.

use std::collections::{BTreeMap, VecDeque};

use serde_json::Value;
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::schema::SettingsMap;
use crate::storage::{BackendKind, MemoryBackend, StorageBackend};

/// A single key's transition within one change event
#[derive(Debug, Clone, PartialEq)]
pub struct KeyChange {
    /// Value before the write; `None` when the key was absent
    pub old_value: Option<Value>,
    /// Value after the write; `None` when the key was removed
    pub new_value: Option<Value>,
}

/// One storage change event: every key that changed in a single write
///
/// Keyed by setting name, ordered, so consumers observe a deterministic
/// iteration order.
pub type ChangeSet = BTreeMap<String, KeyChange>;

/// Failover-aware settings store shared by all contexts
///
/// # Example
///
/// ```rust
/// use reddsimp::SettingsStore;
/// use serde_json::Value;
///
/// let mut store = SettingsStore::in_memory();
/// let mut values = reddsimp::SettingsMap::new();
/// values.insert("redd_on".to_string(), Value::Bool(false));
/// store.set(&values).unwrap();
///
/// let changes = store.take_change().unwrap();
/// assert_eq!(changes["redd_on"].new_value, Some(Value::Bool(false)));
/// ```
pub struct SettingsStore {
    preferred: Box<dyn StorageBackend>,
    fallback: Box<dyn StorageBackend>,
    on_fallback: bool,
    pending: VecDeque<ChangeSet>,
}

impl SettingsStore {
    /// Create a store over a preferred and a fallback backend
    pub fn new(preferred: Box<dyn StorageBackend>, fallback: Box<dyn StorageBackend>) -> Self {
        SettingsStore {
            preferred,
            fallback,
            on_fallback: false,
            pending: VecDeque::new(),
        }
    }

    /// Create a store over two fresh in-memory areas
    ///
    /// This is the configuration the in-process contexts and most tests run
    /// against.
    pub fn in_memory() -> Self {
        SettingsStore::new(
            Box::new(MemoryBackend::new(BackendKind::Sync)),
            Box::new(MemoryBackend::new(BackendKind::Local)),
        )
    }

    /// Which storage area operations currently go to
    pub fn active_kind(&self) -> BackendKind {
        if self.on_fallback {
            self.fallback.kind()
        } else {
            self.preferred.kind()
        }
    }

    /// Read the named keys from the active area
    ///
    /// Absent keys are omitted from the result.
    pub fn get(&mut self, keys: &[&str]) -> Result<SettingsMap> {
        self.run_get(Some(keys))
    }

    /// Read the entire settings object from the active area
    pub fn get_all(&mut self) -> Result<SettingsMap> {
        self.run_get(None)
    }

    /// Merge the given key/value pairs into the active area
    ///
    /// Queues a change event holding the keys whose stored value actually
    /// changed; a write that changes nothing queues nothing. An empty
    /// `values` map is a no-op.
    pub fn set(&mut self, values: &SettingsMap) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        let before = self.run_get(None)?;
        self.run_set(values)?;

        let mut changes = ChangeSet::new();
        for (key, new_value) in values {
            let old_value = before.get(key).cloned();
            if old_value.as_ref() != Some(new_value) {
                changes.insert(
                    key.clone(),
                    KeyChange {
                        old_value,
                        new_value: Some(new_value.clone()),
                    },
                );
            }
        }
        if !changes.is_empty() {
            trace!(changed = changes.len(), "queued storage change event");
            self.pending.push_back(changes);
        }
        Ok(())
    }

    /// Remove every key from the active area
    ///
    /// Queues a single change event in which every previously stored key
    /// transitions to absent. Clearing an already empty area queues nothing.
    pub fn clear(&mut self) -> Result<()> {
        let before = self.run_get(None)?;
        self.run_clear()?;
        if before.is_empty() {
            return Ok(());
        }
        let changes: ChangeSet = before
            .into_iter()
            .map(|(key, old_value)| {
                (
                    key,
                    KeyChange {
                        old_value: Some(old_value),
                        new_value: None,
                    },
                )
            })
            .collect();
        self.pending.push_back(changes);
        Ok(())
    }

    /// Replace the entire settings object
    ///
    /// Clears the area first and then writes `values`, so keys absent from
    /// `values` disappear. Observers see the clear event followed by the
    /// write event, in that order.
    pub fn replace_all(&mut self, values: &SettingsMap) -> Result<()> {
        self.clear()?;
        self.set(values)
    }

    /// Dequeue the oldest pending change event, if any
    pub fn take_change(&mut self) -> Option<ChangeSet> {
        self.pending.pop_front()
    }

    /// Whether any change events are waiting to be delivered
    pub fn has_pending_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    fn run_get(&mut self, keys: Option<&[&str]>) -> Result<SettingsMap> {
        let result = self.active().get(keys);
        match result {
            Err(err) if self.can_demote(&err) => {
                self.demote(&err);
                self.fallback.get(keys)
            }
            other => other,
        }
    }

    fn run_set(&mut self, values: &SettingsMap) -> Result<()> {
        let result = self.active_mut().set(values);
        match result {
            Err(err) if self.can_demote(&err) => {
                self.demote(&err);
                self.fallback.set(values)
            }
            other => other,
        }
    }

    fn run_clear(&mut self) -> Result<()> {
        let result = self.active_mut().clear();
        match result {
            Err(err) if self.can_demote(&err) => {
                self.demote(&err);
                self.fallback.clear()
            }
            other => other,
        }
    }

    fn active(&self) -> &dyn StorageBackend {
        if self.on_fallback {
            self.fallback.as_ref()
        } else {
            self.preferred.as_ref()
        }
    }

    fn active_mut(&mut self) -> &mut dyn StorageBackend {
        if self.on_fallback {
            self.fallback.as_mut()
        } else {
            self.preferred.as_mut()
        }
    }

    // Only availability errors trigger failover; data-level errors such as a
    // malformed document must surface to the caller.
    fn can_demote(&self, err: &Error) -> bool {
        !self.on_fallback && matches!(err, Error::BackendUnavailable { .. })
    }

    fn demote(&mut self, err: &Error) {
        warn!(
            from = %self.preferred.kind(),
            to = %self.fallback.kind(),
            error = %err,
            "storage backend unavailable, demoting to fallback"
        );
        self.on_fallback = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::AvailabilitySwitch;

    fn store_with_switches() -> (SettingsStore, AvailabilitySwitch, AvailabilitySwitch) {
        let preferred = MemoryBackend::new(BackendKind::Sync);
        let fallback = MemoryBackend::new(BackendKind::Local);
        let preferred_switch = preferred.switch();
        let fallback_switch = fallback.switch();
        let store = SettingsStore::new(Box::new(preferred), Box::new(fallback));
        (store, preferred_switch, fallback_switch)
    }

    fn bool_map(pairs: &[(&str, bool)]) -> SettingsMap {
        pairs
            .iter()
            .map(|(key, on)| ((*key).to_string(), Value::Bool(*on)))
            .collect()
    }

    #[test]
    fn test_set_queues_only_actual_changes() {
        let mut store = SettingsStore::in_memory();
        store.set(&bool_map(&[("hide_header", true), ("redd_on", true)])).unwrap();

        let changes = store.take_change().unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes["hide_header"].old_value, None);
        assert_eq!(changes["hide_header"].new_value, Some(Value::Bool(true)));

        // Rewriting one identical and one different value reports only the
        // different one.
        store.set(&bool_map(&[("hide_header", true), ("redd_on", false)])).unwrap();
        let changes = store.take_change().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes["redd_on"].old_value, Some(Value::Bool(true)));
        assert_eq!(changes["redd_on"].new_value, Some(Value::Bool(false)));
        assert!(store.take_change().is_none());
    }

    #[test]
    fn test_identical_write_queues_nothing() {
        let mut store = SettingsStore::in_memory();
        store.set(&bool_map(&[("hide_header", true)])).unwrap();
        store.take_change();

        store.set(&bool_map(&[("hide_header", true)])).unwrap();
        assert!(!store.has_pending_changes());
    }

    #[test]
    fn test_empty_write_is_a_no_op() {
        let mut store = SettingsStore::in_memory();
        store.set(&SettingsMap::new()).unwrap();
        assert!(!store.has_pending_changes());
    }

    #[test]
    fn test_clear_reports_removals() {
        let mut store = SettingsStore::in_memory();
        store.set(&bool_map(&[("hide_header", true), ("redd_on", true)])).unwrap();
        store.take_change();

        store.clear().unwrap();
        let changes = store.take_change().unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes["redd_on"].old_value, Some(Value::Bool(true)));
        assert_eq!(changes["redd_on"].new_value, None);
        assert!(store.get_all().unwrap().is_empty());

        // Clearing an empty area queues nothing.
        store.clear().unwrap();
        assert!(!store.has_pending_changes());
    }

    #[test]
    fn test_replace_all_queues_clear_then_write() {
        let mut store = SettingsStore::in_memory();
        store.set(&bool_map(&[("hide_header", true), ("obsolete", true)])).unwrap();
        store.take_change();

        store.replace_all(&bool_map(&[("hide_header", false)])).unwrap();

        let removals = store.take_change().unwrap();
        assert!(removals.values().all(|c| c.new_value.is_none()));
        assert!(removals.contains_key("obsolete"));

        let writes = store.take_change().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes["hide_header"].new_value, Some(Value::Bool(false)));

        assert!(!store.get_all().unwrap().contains_key("obsolete"));
    }

    #[test]
    fn test_first_failure_demotes_and_retries_once() {
        let (mut store, preferred_switch, _) = store_with_switches();
        assert_eq!(store.active_kind(), BackendKind::Sync);

        preferred_switch.set_available(false);
        // The read fails on sync, demotes, and succeeds on local.
        assert!(store.get_all().unwrap().is_empty());
        assert_eq!(store.active_kind(), BackendKind::Local);

        store.set(&bool_map(&[("redd_on", true)])).unwrap();
        assert_eq!(store.get(&["redd_on"]).unwrap().len(), 1);
    }

    #[test]
    fn test_demotion_is_one_way() {
        let (mut store, preferred_switch, _) = store_with_switches();
        store.set(&bool_map(&[("hide_header", true)])).unwrap();

        preferred_switch.set_available(false);
        store.set(&bool_map(&[("redd_on", true)])).unwrap();
        assert_eq!(store.active_kind(), BackendKind::Local);

        // Recovery of the preferred area is not observed within the session.
        preferred_switch.set_available(true);
        store.set(&bool_map(&[("hide_award", true)])).unwrap();
        assert_eq!(store.active_kind(), BackendKind::Local);

        // The fallback never saw the pre-demotion write, and the preferred
        // area never saw the post-demotion ones.
        let all = store.get_all().unwrap();
        assert!(!all.contains_key("hide_header"));
        assert!(all.contains_key("redd_on"));
        assert!(all.contains_key("hide_award"));
    }

    #[test]
    fn test_error_surfaces_when_both_areas_fail() {
        let (mut store, preferred_switch, fallback_switch) = store_with_switches();
        preferred_switch.set_available(false);
        fallback_switch.set_available(false);

        assert!(matches!(
            store.get_all(),
            Err(Error::BackendUnavailable {
                backend: BackendKind::Local,
                ..
            })
        ));
        // The demotion still happened; a later fallback recovery is used.
        fallback_switch.set_available(true);
        assert!(store.get_all().unwrap().is_empty());
        assert_eq!(store.active_kind(), BackendKind::Local);
    }

    #[test]
    fn test_set_failover_lands_write_on_fallback() {
        let (mut store, preferred_switch, _) = store_with_switches();
        preferred_switch.set_available(false);

        store.set(&bool_map(&[("redd_on", false)])).unwrap();
        let changes = store.take_change().unwrap();
        assert_eq!(changes["redd_on"].new_value, Some(Value::Bool(false)));
        assert_eq!(store.active_kind(), BackendKind::Local);
        assert_eq!(store.get(&["redd_on"]).unwrap().len(), 1);
    }
}
