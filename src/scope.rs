//! Scoped resolution: child resolvers with private caches and
//! guaranteed disposal order.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::cache::InstanceCache;
use crate::container::Container;
use crate::descriptor::{downcast_concrete, downcast_trait};
use crate::error::DiResult;
use crate::internal::DisposeBag;
use crate::key::ServiceId;
use crate::lazy::{Lazy, ResolverHandle};
use crate::resolve::{resolve_entry_async, ResolveEnv};
use crate::traits::Resolver;

pub(crate) struct ScopeInner {
    root: Container,
    cache: InstanceCache,
    disposers: Mutex<DisposeBag>,
    closed: AtomicBool,
}

/// A child resolver with its own scoped cache and disposal list.
///
/// Singleton lookups delegate to the root container; scoped services
/// live and die with the scope; transients are built fresh but may pull
/// scoped dependencies. Scopes form a tree — a scope can create a child
/// scope — and scoped lookups never fall through to a parent scope.
///
/// Clones share state, so a scope can be handed to tasks cheaply.
///
/// # Examples
///
/// ```rust
/// use axon_di::{Container, Lifecycle, Resolver};
///
/// struct RequestId(u64);
///
/// let container = Container::new();
/// let next = std::sync::atomic::AtomicU64::new(1);
/// container.add_factory(Lifecycle::Scoped, move |_| {
///     Ok(RequestId(next.fetch_add(1, std::sync::atomic::Ordering::SeqCst)))
/// });
///
/// let s1 = container.create_scope();
/// let s2 = container.create_scope();
/// assert_eq!(s1.resolve::<RequestId>().unwrap().0, 1);
/// assert_eq!(s1.resolve::<RequestId>().unwrap().0, 1); // cached in s1
/// assert_eq!(s2.resolve::<RequestId>().unwrap().0, 2); // isolated
/// ```
pub struct Scope {
    inner: Arc<ScopeInner>,
}

impl Clone for Scope {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl Scope {
    pub(crate) fn new(root: Container) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                root,
                cache: InstanceCache::new(),
                disposers: Mutex::new(DisposeBag::default()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub(crate) fn root(&self) -> &Container {
        &self.inner.root
    }

    pub(crate) fn cache(&self) -> &InstanceCache {
        &self.inner.cache
    }

    pub(crate) fn disposers(&self) -> &Mutex<DisposeBag> {
        &self.inner.disposers
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Creates a child scope. The child has fresh scoped state and
    /// delegates singletons to the same root; closing the parent does
    /// not close it.
    pub fn create_scope(&self) -> Scope {
        Scope::new(self.inner.root.clone())
    }

    /// Async resolution within this scope.
    pub async fn resolve_async<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        resolve_entry_async(ResolveEnv::for_scope(self), ServiceId::of::<T>())
            .await
            .and_then(downcast_concrete::<T>)
    }

    pub async fn resolve_async_with<T: Send + Sync + 'static>(
        &self,
        context: &'static str,
    ) -> DiResult<Arc<T>> {
        resolve_entry_async(
            ResolveEnv::for_scope(self),
            ServiceId::of::<T>().with_context(context),
        )
        .await
        .and_then(downcast_concrete::<T>)
    }

    pub async fn resolve_trait_async<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>>
    where
        Arc<T>: 'static,
    {
        resolve_entry_async(ResolveEnv::for_scope(self), ServiceId::of_trait::<T>())
            .await
            .and_then(downcast_trait::<T>)
    }

    /// Deferred handle materializing against this scope.
    pub fn lazy<T: Send + Sync + 'static>(&self) -> Lazy<T> {
        Lazy::new(ResolverHandle::Scoped(self.clone()), ServiceId::of::<T>())
    }

    pub fn lazy_with<T: Send + Sync + 'static>(&self, context: &'static str) -> Lazy<T> {
        Lazy::new(
            ResolverHandle::Scoped(self.clone()),
            ServiceId::of::<T>().with_context(context),
        )
    }

    pub fn lazy_trait<T: ?Sized + Send + Sync + 'static>(&self) -> Lazy<T> {
        Lazy::new(ResolverHandle::Scoped(self.clone()), ServiceId::of_trait::<T>())
    }

    /// Closes the scope: disposal hooks run in reverse build order
    /// (async hooks awaited in place), the scoped cache empties, and
    /// further resolution fails with `ScopeClosed`. Idempotent.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut bag = std::mem::take(&mut *self.inner.disposers.lock().unwrap());
        bag.run_reverse().await;
        self.inner.cache.clear();
        debug!("scope closed");
    }

    /// Synchronous close; async disposal hooks cannot run here and are
    /// reported instead.
    pub fn close_sync(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut bag = std::mem::take(&mut *self.inner.disposers.lock().unwrap());
        let skipped = bag.run_reverse_sync();
        if skipped > 0 {
            warn!(skipped, "async disposal hooks skipped by close_sync; use close().await");
        }
        self.inner.cache.clear();
        debug!("scope closed");
    }
}

impl Resolver for Scope {
    fn resolve_any(&self, id: &ServiceId) -> DiResult<Arc<dyn Any + Send + Sync>> {
        crate::resolve::resolve_entry(&ResolveEnv::for_scope(self), id)
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::Acquire) {
            let bag = self.disposers.get_mut().unwrap();
            if !bag.is_empty() {
                warn!("scope dropped with undisposed resources; call close().await");
            }
        }
    }
}
