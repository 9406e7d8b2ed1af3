//! Concurrent registry of execution plans, keyed by plan id.
//!
//! A `PlanRegistry` is a cheap handle: clones share the same underlying map,
//! which is what lets a control path edit plans while a worker reads them to
//! rebuild its engine. Use [`PlanRegistry::deep_copy`] for an independent copy.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use cepctx_core::error::{require_text, Result};
use cepctx_core::id::PlanId;

#[derive(Clone, Default)]
pub struct PlanRegistry {
    plans: Arc<RwLock<BTreeMap<PlanId, String>>>,
}

impl PlanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `body` under a freshly generated id and return that id.
    pub fn add(&self, body: impl Into<String>) -> Result<PlanId> {
        let body = body.into();
        require_text(&body, "execution plan")?;
        let mut plans = self.write();
        loop {
            if let Entry::Vacant(slot) = plans.entry(PlanId::generate()) {
                let id = slot.key().clone();
                slot.insert(body);
                #[cfg(feature = "tracing")]
                tracing::debug!(plan_id = %id, "added execution plan");
                return Ok(id);
            }
        }
    }

    /// Store or overwrite `body` under `id`.
    pub fn add_with_id(&self, id: impl Into<PlanId>, body: impl Into<String>) -> Result<()> {
        let id = id.into();
        let body = body.into();
        require_text(id.as_str(), "plan_id")?;
        require_text(&body, "execution plan")?;
        #[cfg(feature = "tracing")]
        tracing::debug!(plan_id = %id, "stored execution plan");
        self.write().insert(id, body);
        Ok(())
    }

    /// Same as [`PlanRegistry::add_with_id`]: inserts when `id` is unknown.
    pub fn update(&self, id: impl Into<PlanId>, body: impl Into<String>) -> Result<()> {
        self.add_with_id(id, body)
    }

    /// Remove the plan under `id`, returning whether it was present.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.write().remove(id).is_some();
        #[cfg(feature = "tracing")]
        tracing::debug!(plan_id = id, removed, "removed execution plan");
        removed
    }

    pub fn get(&self, id: &str) -> Option<String> {
        self.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    /// Point-in-time copy of every plan, ordered by id.
    pub fn list_all(&self) -> BTreeMap<PlanId, String> {
        self.read().clone()
    }

    pub fn ids(&self) -> Vec<PlanId> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Independent registry holding the same plans.
    pub fn deep_copy(&self) -> Self {
        Self::from_map(self.list_all())
    }

    /// Whether both handles point at the same underlying map.
    pub fn shares_with(&self, other: &PlanRegistry) -> bool {
        Arc::ptr_eq(&self.plans, &other.plans)
    }

    fn from_map(plans: BTreeMap<PlanId, String>) -> Self {
        Self {
            plans: Arc::new(RwLock::new(plans)),
        }
    }

    // A panic while holding the lock cannot leave the map half-written: every
    // mutation is a single insert/remove. Recover the guard instead of failing.
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<PlanId, String>> {
        self.plans.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<PlanId, String>> {
        self.plans.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for PlanRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.read().iter()).finish()
    }
}

impl Serialize for PlanRegistry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.read().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PlanRegistry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        BTreeMap::<PlanId, String>::deserialize(deserializer).map(Self::from_map)
    }
}
