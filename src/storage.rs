//! Storage backends for extension settings
//!
//! Settings live in one of two backend areas, mirroring the storage model of
//! WebExtension platforms: a `sync` area replicated across a browser account,
//! and a `local` area confined to one installation. Both expose the same
//! small surface through [`StorageBackend`]; failover between them is handled
//! one level up by [`crate::SettingsStore`].
//!
//! Two implementations are provided: [`MemoryBackend`] for the in-process
//! contexts and tests, and [`JsonFileBackend`] for inspecting the JSON
//! documents a browser profile keeps on disk.

use std::cell::Cell;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::Value;
use tracing::trace;

use crate::error::{Error, Result};
use crate::schema::SettingsMap;

/// Which storage area a backend represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Account-replicated storage, the preferred area
    Sync,
    /// Installation-confined storage, the fallback area
    Local,
}

impl BackendKind {
    /// The storage area name as used in file names and log lines
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Sync => "sync",
            BackendKind::Local => "local",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A keyed settings area with read, shallow-merge write, and clear
///
/// Every operation can fail: backends model storage areas that may be
/// unavailable (quota exhaustion, a disabled account, an unreadable file).
/// Callers are expected to route operations through [`crate::SettingsStore`],
/// which demotes to the fallback area on the first availability error.
pub trait StorageBackend {
    /// Which area this backend represents
    fn kind(&self) -> BackendKind;

    /// Read the named keys, or the entire area when `keys` is `None`
    ///
    /// Absent keys are omitted from the result rather than reported as
    /// errors.
    fn get(&self, keys: Option<&[&str]>) -> Result<SettingsMap>;

    /// Merge the given key/value pairs into the area
    ///
    /// Existing keys not named in `values` are left untouched.
    fn set(&mut self, values: &SettingsMap) -> Result<()>;

    /// Remove every key from the area
    fn clear(&mut self) -> Result<()>;
}

/// Shared handle that flips a [`MemoryBackend`] between available and failing
///
/// Cloneable so a test or embedding host can keep the handle after the
/// backend itself has been boxed into a store.
#[derive(Debug, Clone)]
pub struct AvailabilitySwitch(Rc<Cell<bool>>);

impl AvailabilitySwitch {
    /// Make the backend succeed (`true`) or fail (`false`) on every operation
    pub fn set_available(&self, available: bool) {
        self.0.set(available);
    }

    /// Whether the backend currently reports itself available
    pub fn is_available(&self) -> bool {
        self.0.get()
    }
}

/// In-process storage area backed by a plain map
///
/// This is the backend the background, content, and popup contexts run
/// against. It starts available; [`MemoryBackend::switch`] returns a handle
/// that can simulate the area going away mid-session.
#[derive(Debug)]
pub struct MemoryBackend {
    kind: BackendKind,
    values: SettingsMap,
    available: Rc<Cell<bool>>,
}

impl MemoryBackend {
    /// Create an empty, available area
    pub fn new(kind: BackendKind) -> Self {
        MemoryBackend {
            kind,
            values: SettingsMap::new(),
            available: Rc::new(Cell::new(true)),
        }
    }

    /// Handle for toggling this area's availability after it has been boxed
    pub fn switch(&self) -> AvailabilitySwitch {
        AvailabilitySwitch(Rc::clone(&self.available))
    }

    fn ensure_available(&self) -> Result<()> {
        if self.available.get() {
            Ok(())
        } else {
            Err(Error::BackendUnavailable {
                backend: self.kind,
                reason: "area reported an availability error".to_string(),
            })
        }
    }
}

impl StorageBackend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn get(&self, keys: Option<&[&str]>) -> Result<SettingsMap> {
        self.ensure_available()?;
        Ok(subset(&self.values, keys))
    }

    fn set(&mut self, values: &SettingsMap) -> Result<()> {
        self.ensure_available()?;
        for (key, value) in values {
            self.values.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.ensure_available()?;
        self.values.clear();
        Ok(())
    }
}

/// Storage area persisted as a pretty-printed JSON object on disk
///
/// Browser profiles keep one such document per area under the extension's
/// data directory. A missing file reads as an empty area; an unreadable file
/// surfaces as [`Error::BackendUnavailable`] so the store can fail over, and
/// a file that is not valid JSON surfaces as [`Error::MalformedDocument`].
/// Writes replace the document atomically via a sibling temporary file.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    kind: BackendKind,
    path: PathBuf,
}

impl JsonFileBackend {
    /// Create a backend over the given document path
    ///
    /// The file is not touched until the first operation.
    pub fn new(kind: BackendKind, path: impl Into<PathBuf>) -> Self {
        JsonFileBackend {
            kind,
            path: path.into(),
        }
    }

    /// Path of the backing document
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<SettingsMap> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(SettingsMap::new());
            }
            Err(err) => {
                return Err(Error::BackendUnavailable {
                    backend: self.kind,
                    reason: err.to_string(),
                });
            }
        };
        serde_json::from_slice(&bytes).map_err(|source| Error::MalformedDocument {
            path: self.path.clone(),
            source,
        })
    }

    fn persist(&self, values: &SettingsMap) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(tmp.as_file_mut(), values).map_err(|source| {
            Error::MalformedDocument {
                path: self.path.clone(),
                source,
            }
        })?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(io::Error::from)?;
        trace!(path = %self.path.display(), "persisted settings document");
        Ok(())
    }
}

impl StorageBackend for JsonFileBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn get(&self, keys: Option<&[&str]>) -> Result<SettingsMap> {
        Ok(subset(&self.load()?, keys))
    }

    fn set(&mut self, values: &SettingsMap) -> Result<()> {
        let mut current = self.load()?;
        for (key, value) in values {
            current.insert(key.clone(), value.clone());
        }
        self.persist(&current)
    }

    fn clear(&mut self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::BackendUnavailable {
                backend: self.kind,
                reason: err.to_string(),
            }),
        }
    }
}

fn subset(values: &SettingsMap, keys: Option<&[&str]>) -> SettingsMap {
    match keys {
        None => values.clone(),
        Some(keys) => keys
            .iter()
            .filter_map(|key| {
                values
                    .get(*key)
                    .map(|value: &Value| ((*key).to_string(), value.clone()))
            })
            .collect(),
    }
}
