//! Engine extensions: named implementation handles merged into a registry.
//!
//! The registry is copy-on-write. `snapshot()` hands out the current map behind
//! an `Arc`; a later `merge` clones the map before touching it, so snapshots
//! already given to an engine factory never observe the change.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{require_text, Result};

/// Loadable implementation reference for one extension, e.g. a fully
/// qualified implementation name the engine knows how to instantiate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtensionHandle(String);

impl ExtensionHandle {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExtensionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ExtensionHandle {
    fn from(v: &str) -> Self {
        Self::new(v)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtensionRegistry {
    entries: Arc<BTreeMap<String, ExtensionHandle>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite each entry by name. Entries absent from `mapping`
    /// are kept. Nothing is applied if any name or handle is blank.
    pub fn merge<K, I>(&mut self, mapping: I) -> Result<()>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ExtensionHandle)>,
    {
        let mut staged = Vec::new();
        for (name, handle) in mapping {
            let name = name.into();
            require_text(&name, "extension name")?;
            require_text(handle.as_str(), "extension handle")?;
            staged.push((name, handle));
        }
        if staged.is_empty() {
            return Ok(());
        }
        let entries = Arc::make_mut(&mut self.entries);
        entries.extend(staged);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ExtensionHandle> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Immutable view of the current registrations.
    pub fn snapshot(&self) -> ExtensionSnapshot {
        ExtensionSnapshot {
            entries: Arc::clone(&self.entries),
        }
    }
}

/// Frozen set of extension registrations.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionSnapshot {
    entries: Arc<BTreeMap<String, ExtensionHandle>>,
}

impl ExtensionSnapshot {
    pub fn get(&self, name: &str) -> Option<&ExtensionHandle> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExtensionHandle)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_map(&self) -> BTreeMap<String, ExtensionHandle> {
        (*self.entries).clone()
    }
}
