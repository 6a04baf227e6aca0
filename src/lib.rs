//! # reddsimp - Reddit Simplify Settings Engine
//!
//! This library implements the settings machinery of the Reddit Simplify
//! browser extension: a failover-aware settings store, schema migration,
//! and the three cooperating contexts (background, content, popup) that
//! read and react to those settings. A single-threaded [`Runtime`] plays
//! the role the browser plays in a live installation, fanning storage
//! change events out to every context.
//!
//! ## Features
//!
//! - Preferred/fallback storage with demote-once failover (`sync` then `local`)
//! - Change events reporting old and new values for every key that changed
//! - Canonical settings schema with drift detection and merge-forward migration
//! - Background watcher with a hot-path key cache and the enabled indicator
//! - Per-document content applier with one-shot startup and frame gating
//! - Popup checkbox tree with tri-state masters and diffed persistence
//! - On-disk inspection of a browser profile's persisted settings documents
//!
//! ## Quick Start
//!
//! ### A First Session
//!
//! ```rust
//! use reddsimp::{Document, Runtime, SchemaOutcome};
//!
//! let mut runtime = Runtime::in_memory();
//! let outcome = runtime.startup()?;
//! assert_eq!(outcome, SchemaOutcome::FirstInstall);
//! assert!(runtime.background().indicator_on());
//!
//! // Opening a page applies every visibility flag to its document root.
//! let page = runtime.open_page(Document::top_level())?;
//! let doc = runtime.page(page).unwrap().document();
//! assert_eq!(doc.attribute("hide_promoted"), Some("true"));
//! # Ok::<(), reddsimp::Error>(())
//! ```
//!
//! ### Editing Through the Popup
//!
//! ```rust
//! use reddsimp::{CheckState, Document, Runtime, SectionId};
//!
//! let mut runtime = Runtime::in_memory();
//! runtime.startup()?;
//! let page = runtime.open_page(Document::top_level())?;
//!
//! runtime.open_popup()?;
//! runtime.popup_set_section_master(SectionId::Thread, true)?;
//! let popup = runtime.popup().unwrap();
//! assert_eq!(popup.section_state(SectionId::Thread), CheckState::Checked);
//!
//! // The open page saw the change before the call returned.
//! let doc = runtime.page(page).unwrap().document();
//! assert_eq!(doc.attribute("hide_comment_avatar"), Some("true"));
//! # Ok::<(), reddsimp::Error>(())
//! ```
//!
//! ### Storage Failover
//!
//! ```rust
//! use reddsimp::{BackendKind, MemoryBackend, SettingsStore};
//!
//! let sync = MemoryBackend::new(BackendKind::Sync);
//! let switch = sync.switch();
//! let mut store = SettingsStore::new(
//!     Box::new(sync),
//!     Box::new(MemoryBackend::new(BackendKind::Local)),
//! );
//!
//! switch.set_available(false);
//! store.get_all()?; // demotes and retries on the local area
//! assert_eq!(store.active_kind(), BackendKind::Local);
//! # Ok::<(), reddsimp::Error>(())
//! ```
//!
//! ### Working with Profiles
//!
//! ```rust,no_run
//! use reddsimp::{find_profile_path, open_profile_store};
//!
//! let profile = find_profile_path("default", None)?;
//! let mut store = open_profile_store(&profile);
//! let settings = store.get_all()?;
//! println!("{} stored settings", settings.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Listing All Profiles
//!
//! ```rust,no_run
//! use reddsimp::list_profiles;
//!
//! let profiles = list_profiles(None)?;
//! for profile in profiles {
//!     println!("Profile: {} ({})", profile.name, profile.path.display());
//!     if profile.has_extension_data {
//!         println!("  (extension data present)");
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Querying Settings
//!
//! ```rust
//! use reddsimp::{default_settings, query_settings};
//!
//! let settings = default_settings();
//! let comment_flags = query_settings(&settings, &["hide_comment_*"])?;
//! assert_eq!(comment_flags.len(), 4);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Error Handling
//!
//! All storage-facing functions return [`Result<T, Error>`]. The [`Error`]
//! enum provides detailed context for programmatic handling:
//!
//! ```rust
//! use reddsimp::{Error, SettingsStore};
//!
//! let mut store = SettingsStore::in_memory();
//! match store.get(&["redd_on"]) {
//!     Ok(settings) => println!("read {} keys", settings.len()),
//!     Err(Error::BackendUnavailable { backend, reason }) => {
//!         eprintln!("storage {} unavailable: {}", backend, reason);
//!     }
//!     Err(e) => eprintln!("other error: {}", e),
//! }
//! ```
//!
//! ## Platform Support
//!
//! Profile discovery looks for browser profiles in the standard locations:
//! - **Linux**: `~/.mozilla/firefox/`
//! - **macOS**: `~/Library/Application Support/Firefox/`
//! - **Windows**: `%APPDATA%\Mozilla\Firefox\`
//!
//! The `MOZ_PROFILES_DIR` environment variable overrides auto-detection.

// Re-export error types
pub use error::{Error, Result};

// Re-export the schema surface
pub use schema::{
    default_settings, describe_key, has_drift, merge_into_defaults, reconcile, validate_write,
    SchemaOutcome, SettingsMap, DARK_MODE_KEY, HIDE_MARKER, MASTER_KEY, POPUP_SETTINGS_KEY,
    TREE_STATES_KEY,
};

// Re-export storage backends and the store
pub use storage::{AvailabilitySwitch, BackendKind, JsonFileBackend, MemoryBackend, StorageBackend};
pub use store::{ChangeSet, KeyChange, SettingsStore};

// Re-export the document model
pub use dom::{Document, FrameKind};

// Re-export the three contexts
pub use background::{StateWatcher, WATCHED_KEYS, WELCOME_URL};
pub use content::{PageApplier, PLAYER_ELEMENT_ID, SCRIPT_ELEMENT_ID};
pub use popup::{CheckState, PopupController, SectionId};

// Re-export the host runtime and wire types
pub use runtime::{Message, Reply, Runtime};

// Re-export profile discovery
pub use profile::{
    extension_data_dir, find_profile_path, get_profiles_directory, has_extension_data,
    list_profiles, local_storage_path, open_profile_store, sync_storage_path, ProfileInfo,
    EXTENSION_ID, LOCAL_STORAGE_FILE, SYNC_STORAGE_FILE,
};

// Re-export queries
pub use query::query_settings;

// All modules are private - use re-exports above for public API
mod background;
mod content;
mod dom;
mod error;
mod popup;
mod profile;
mod query;
mod runtime;
mod schema;
mod storage;
mod store;
