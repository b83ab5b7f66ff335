//! Registry mapping (service key, context key) to descriptors.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::descriptor::ServiceDescriptor;
use crate::key::ServiceId;

/// The flat (key, context) → descriptor map.
///
/// The registry performs no construction and no logging; replacement is
/// a silent overwrite (the container wrapper logs it). Live
/// registration is allowed at any time, which is why the map sits
/// behind an `RwLock` rather than being frozen at build time.
#[derive(Default)]
pub(crate) struct Registry {
    entries: RwLock<HashMap<ServiceId, Arc<ServiceDescriptor>>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces under the descriptor's id. Returns whether
    /// an existing registration was overwritten.
    pub(crate) fn insert(&self, descriptor: ServiceDescriptor) -> bool {
        let mut entries = self.entries.write().unwrap();
        entries
            .insert(descriptor.id, Arc::new(descriptor))
            .is_some()
    }

    pub(crate) fn lookup(&self, id: &ServiceId) -> Option<Arc<ServiceDescriptor>> {
        self.entries.read().unwrap().get(id).cloned()
    }

    pub(crate) fn contains(&self, id: &ServiceId) -> bool {
        self.entries.read().unwrap().contains_key(id)
    }

    /// Snapshot of all registered descriptors, for diagnostics and
    /// module binding.
    pub(crate) fn snapshot(&self) -> Vec<Arc<ServiceDescriptor>> {
        self.entries.read().unwrap().values().cloned().collect()
    }

    pub(crate) fn keys(&self) -> HashSet<ServiceId> {
        self.entries.read().unwrap().keys().copied().collect()
    }

    pub(crate) fn clear(&self) {
        self.entries.write().unwrap().clear();
    }
}
