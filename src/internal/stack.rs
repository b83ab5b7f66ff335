//! Per-resolution in-flight set for cycle and lifecycle checks.

use std::sync::Mutex;

use crate::error::{DiError, DiResult};
use crate::key::ServiceId;
use crate::lifecycle::Lifecycle;

struct Frame {
    name: String,
    lifecycle: Lifecycle,
}

/// The in-flight set of one resolution.
///
/// A fresh stack is created per top-level resolve and threaded through
/// the engine (and through factory callbacks), so cycles spanning
/// factory pulls are still caught. The Mutex only serializes the single
/// task driving this resolution; it is never contended.
#[derive(Default)]
pub(crate) struct ResolutionStack {
    frames: Mutex<Vec<Frame>>,
}

impl ResolutionStack {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Pushes `id`; fails with the full offending chain if it is
    /// already in flight.
    pub(crate) fn enter(&self, id: &ServiceId, lifecycle: Lifecycle) -> DiResult<StackGuard<'_>> {
        let name = id.to_string();
        let mut frames = self.frames.lock().unwrap();
        if frames.iter().any(|f| f.name == name) {
            let mut path: Vec<String> = frames.iter().map(|f| f.name.clone()).collect();
            path.push(name);
            return Err(DiError::CyclicDependency { path });
        }
        frames.push(Frame { name, lifecycle });
        Ok(StackGuard { stack: self })
    }

    /// Lifecycle of the frame the current resolution is being built
    /// for. Transient frames are transparent: a scoped dependency
    /// reached through a chain of transients is still captured by the
    /// nearest caching ancestor.
    pub(crate) fn effective_parent(&self) -> Option<(String, Lifecycle)> {
        let frames = self.frames.lock().unwrap();
        frames
            .iter()
            .rev()
            .find(|f| f.lifecycle != Lifecycle::Transient)
            .map(|f| (f.name.clone(), f.lifecycle))
    }
}

pub(crate) struct StackGuard<'a> {
    stack: &'a ResolutionStack,
}

impl Drop for StackGuard<'_> {
    fn drop(&mut self) {
        self.stack.frames.lock().unwrap().pop();
    }
}
