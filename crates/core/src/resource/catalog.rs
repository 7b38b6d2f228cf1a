//! Compiled-in resource implementations.
//!
//! A scanned descriptor carries a name; the catalog maps that name to an
//! implementation. A file on disk activates a catalog entry, nothing more.

use super::Resource;
use std::collections::HashMap;

#[derive(Default, Clone)]
pub struct ResourceCatalog {
    entries: HashMap<String, Resource>,
}

impl ResourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, resource: Resource) {
        self.entries.insert(name.into(), resource);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, resource: Resource) -> Self {
        self.insert(name, resource);
        self
    }

    pub fn resolve(&self, name: &str) -> Option<Resource> {
        self.entries.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
