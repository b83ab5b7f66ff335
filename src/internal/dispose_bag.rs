//! Internal disposal bag for managing cleanup hooks.

use std::future::Future;
use std::pin::Pin;

/// Boxed future used for async providers and disposal hooks.
pub(crate) type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Future type for disposal operations.
pub(crate) type BoxFutureUnit = BoxFuture<()>;

pub(crate) enum Disposer {
    Sync(Box<dyn FnOnce() + Send>),
    Async(Box<dyn FnOnce() -> BoxFutureUnit + Send>),
}

/// Container for disposal hooks, executed in reverse registration order.
///
/// Hooks are kept in one list regardless of flavor so that teardown
/// strictly reverses build order even when sync and async disposers
/// interleave.
#[derive(Default)]
pub(crate) struct DisposeBag {
    hooks: Vec<Disposer>,
}

impl DisposeBag {
    pub(crate) fn push_sync(&mut self, f: Box<dyn FnOnce() + Send>) {
        self.hooks.push(Disposer::Sync(f));
    }

    pub(crate) fn push_async(&mut self, f: Box<dyn FnOnce() -> BoxFutureUnit + Send>) {
        self.hooks.push(Disposer::Async(f));
    }

    /// Run every hook in LIFO order, awaiting async hooks in place.
    pub(crate) async fn run_reverse(&mut self) {
        while let Some(hook) = self.hooks.pop() {
            match hook {
                Disposer::Sync(f) => f(),
                Disposer::Async(f) => f().await,
            }
        }
    }

    /// Run sync hooks in LIFO order; returns how many async hooks had to
    /// be skipped for lack of a runtime.
    pub(crate) fn run_reverse_sync(&mut self) -> usize {
        let mut skipped = 0;
        while let Some(hook) = self.hooks.pop() {
            match hook {
                Disposer::Sync(f) => f(),
                Disposer::Async(_) => skipped += 1,
            }
        }
        skipped
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}
