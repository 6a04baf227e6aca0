//! Minimal document model for the page-facing contexts
//!
//! The content and popup contexts do not manipulate a real DOM; they only
//! need the handful of document facts the extension touches: attributes on
//! the document root, the presence of elements by id, where the document
//! sits in the frame tree, and whether its content has finished loading.
//! [`Document`] models exactly that surface.

use std::collections::{BTreeMap, BTreeSet};

/// Where a document sits in the frame tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// The top-level page document
    TopLevel,
    /// A document embedded in a frame
    Framed,
}

/// The slice of a document the extension reads and writes
#[derive(Debug, Clone)]
pub struct Document {
    frame: FrameKind,
    ready: bool,
    attributes: BTreeMap<String, String>,
    element_ids: BTreeSet<String>,
}

impl Document {
    /// A top-level document whose content has already loaded
    ///
    /// Page scripts attach after the document is parsed, so top-level
    /// documents start out ready.
    pub fn top_level() -> Self {
        Document {
            frame: FrameKind::TopLevel,
            ready: true,
            attributes: BTreeMap::new(),
            element_ids: BTreeSet::new(),
        }
    }

    /// A framed document that is still loading
    pub fn framed() -> Self {
        Document {
            frame: FrameKind::Framed,
            ready: false,
            attributes: BTreeMap::new(),
            element_ids: BTreeSet::new(),
        }
    }

    /// Where this document sits in the frame tree
    pub fn frame(&self) -> FrameKind {
        self.frame
    }

    /// Whether the document's content has finished loading
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Record that the document's content has finished loading
    pub fn mark_ready(&mut self) {
        self.ready = true;
    }

    /// Set an attribute on the document root
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        self.attributes
            .insert(name.to_string(), value.to_string());
    }

    /// Read an attribute from the document root
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Whether the document root carries the named attribute
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Remove an attribute from the document root, if present
    pub fn remove_attribute(&mut self, name: &str) {
        self.attributes.remove(name);
    }

    /// Names of all attributes currently on the document root
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Add an element with the given id to the document
    pub fn insert_element(&mut self, id: &str) {
        self.element_ids.insert(id.to_string());
    }

    /// Whether an element with the given id exists in the document
    pub fn has_element(&self, id: &str) -> bool {
        self.element_ids.contains(id)
    }
}
