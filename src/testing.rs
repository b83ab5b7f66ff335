//! Test-mode overlay: mocks that shadow real registrations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::descriptor::AnyArc;
use crate::key::ServiceId;

/// Overlay map consulted before the registry while test mode is on.
///
/// Mocks shadow descriptors but never delete them; disabling test mode
/// clears the overlay and the container evicts singleton cache entries
/// that were built while the flag was on, so mock-derived instances
/// cannot leak into normal operation.
#[derive(Default)]
pub(crate) struct MockOverlay {
    active: AtomicBool,
    mocks: RwLock<HashMap<ServiceId, AnyArc>>,
}

impl MockOverlay {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub(crate) fn activate(&self) {
        self.active.store(true, Ordering::Release);
    }

    /// Deactivates and clears in one step; returns whether the flag was
    /// previously set.
    pub(crate) fn deactivate(&self) -> bool {
        let was = self.active.swap(false, Ordering::AcqRel);
        self.mocks.write().unwrap().clear();
        was
    }

    pub(crate) fn get(&self, id: &ServiceId) -> Option<AnyArc> {
        if !self.active() {
            return None;
        }
        self.mocks.read().unwrap().get(id).cloned()
    }

    pub(crate) fn insert(&self, id: ServiceId, value: AnyArc) {
        self.mocks.write().unwrap().insert(id, value);
    }

    pub(crate) fn remove(&self, id: &ServiceId) -> bool {
        self.mocks.write().unwrap().remove(id).is_some()
    }
}
