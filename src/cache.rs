//! Per-lifecycle instance caches with per-key construction locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use once_cell::sync::OnceCell;

use crate::descriptor::AnyArc;
use crate::error::DiResult;
use crate::key::ServiceId;

/// A committed instance. `test_built` marks entries created while test
/// mode was on so they can be evicted when it ends.
pub(crate) struct CachedValue {
    pub(crate) value: AnyArc,
    pub(crate) test_built: bool,
}

/// Per-key slot: the `OnceCell` is the commit point, the tokio mutex is
/// the construction lock for the async path.
///
/// Sync resolution goes through `get_or_try_init`, which makes the
/// first caller build while losing threads block on the cell. Async
/// resolution takes `build_lock`, re-checks, builds, then commits;
/// losing tasks await the lock cooperatively. A failed or cancelled
/// construction commits nothing, so the slot stays empty and the next
/// caller retries.
pub(crate) struct Slot {
    cell: OnceCell<CachedValue>,
    pub(crate) build_lock: tokio::sync::Mutex<()>,
}

impl Slot {
    fn new() -> Self {
        Self {
            cell: OnceCell::new(),
            build_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Completed value, if any.
    pub(crate) fn completed(&self) -> Option<AnyArc> {
        self.cell.get().map(|cv| cv.value.clone())
    }

    /// Sync winner-builds path.
    pub(crate) fn get_or_build(
        &self,
        build: impl FnOnce() -> DiResult<CachedValue>,
    ) -> DiResult<AnyArc> {
        self.cell.get_or_try_init(build).map(|cv| cv.value.clone())
    }

    /// Commit from the async path; first writer wins.
    pub(crate) fn commit(&self, value: CachedValue) -> AnyArc {
        self.cell.get_or_init(|| value).value.clone()
    }
}

/// One of these per root container (singletons) and per scope (scoped
/// instances).
#[derive(Default)]
pub(crate) struct InstanceCache {
    slots: Mutex<HashMap<ServiceId, Arc<Slot>>>,
}

impl InstanceCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Completed instance for `id`, ignoring slots still mid-build.
    pub(crate) fn get(&self, id: &ServiceId) -> Option<AnyArc> {
        let slots = self.slots.lock().unwrap();
        slots.get(id).and_then(|slot| slot.completed())
    }

    /// Slot for `id`, created on demand. The map lock is released
    /// before any construction happens inside the slot.
    pub(crate) fn slot(&self, id: &ServiceId) -> Arc<Slot> {
        let mut slots = self.slots.lock().unwrap();
        slots.entry(*id).or_insert_with(|| Arc::new(Slot::new())).clone()
    }

    /// Drops entries committed while test mode was active.
    pub(crate) fn evict_test_built(&self) {
        let mut slots = self.slots.lock().unwrap();
        slots.retain(|_, slot| !matches!(slot.cell.get(), Some(cv) if cv.test_built));
    }

    pub(crate) fn clear(&self) {
        self.slots.lock().unwrap().clear();
    }
}
