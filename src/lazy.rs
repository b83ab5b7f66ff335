//! Deferred-resolution proxies.

use std::marker::PhantomData;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::container::Container;
use crate::descriptor::{downcast_concrete, downcast_trait, AnyArc};
use crate::error::DiResult;
use crate::key::ServiceId;
use crate::resolve::{resolve_entry, resolve_entry_async, ResolveEnv};
use crate::scope::Scope;

/// The resolver a proxy materializes against: the root container or a
/// specific scope.
#[derive(Clone)]
pub(crate) enum ResolverHandle {
    Root(Container),
    Scoped(Scope),
}

impl ResolverHandle {
    pub(crate) fn resolve_erased(&self, id: &ServiceId) -> DiResult<AnyArc> {
        match self {
            ResolverHandle::Root(c) => resolve_entry(&ResolveEnv::for_root(c), id),
            ResolverHandle::Scoped(s) => resolve_entry(&ResolveEnv::for_scope(s), id),
        }
    }

    pub(crate) async fn resolve_erased_async(&self, id: ServiceId) -> DiResult<AnyArc> {
        match self {
            ResolverHandle::Root(c) => resolve_entry_async(ResolveEnv::for_root(c), id).await,
            ResolverHandle::Scoped(s) => resolve_entry_async(ResolveEnv::for_scope(s), id).await,
        }
    }
}

struct LazyInner {
    handle: ResolverHandle,
    target: ServiceId,
    slot: OnceCell<AnyArc>,
}

/// Deferred-resolution handle for a service.
///
/// The proxy is built immediately; the target is resolved on the first
/// [`get`](Lazy::get) and memoized. Clones share the memoized slot.
/// Replacing one edge of a dependency cycle with a lazy edge breaks the
/// cycle, since no recursion happens until the proxy is dereferenced.
///
/// # Examples
///
/// ```rust
/// use axon_di::{Container, Resolver};
///
/// struct Config { retries: u32 }
///
/// let container = Container::new();
/// container.add_instance(Config { retries: 3 });
///
/// let lazy = container.lazy::<Config>();
/// // Nothing resolved yet; first get() materializes and memoizes.
/// let config = lazy.get().unwrap();
/// assert_eq!(config.retries, 3);
/// assert!(std::sync::Arc::ptr_eq(&config, &lazy.get().unwrap()));
/// ```
pub struct Lazy<T: ?Sized> {
    inner: Arc<LazyInner>,
    _marker: PhantomData<fn(&T)>,
}

impl<T: ?Sized> Clone for Lazy<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized> Lazy<T> {
    pub(crate) fn new(handle: ResolverHandle, target: ServiceId) -> Self {
        Self {
            inner: Arc::new(LazyInner {
                handle,
                target,
                slot: OnceCell::new(),
            }),
            _marker: PhantomData,
        }
    }

    /// Whether the target has been materialized yet.
    pub fn is_materialized(&self) -> bool {
        self.inner.slot.get().is_some()
    }

    fn materialize(&self) -> DiResult<AnyArc> {
        self.inner
            .slot
            .get_or_try_init(|| self.inner.handle.resolve_erased(&self.inner.target))
            .cloned()
    }

    async fn materialize_async(&self) -> DiResult<AnyArc> {
        if let Some(v) = self.inner.slot.get() {
            return Ok(v.clone());
        }
        let v = self
            .inner
            .handle
            .resolve_erased_async(self.inner.target)
            .await?;
        Ok(self.inner.slot.get_or_init(|| v).clone())
    }
}

impl<T: Send + Sync + 'static> Lazy<T> {
    /// Materializes the target, building it on the first call.
    pub fn get(&self) -> DiResult<Arc<T>> {
        self.materialize().and_then(downcast_concrete::<T>)
    }

    /// Async materialization, required when the target (or anything on
    /// its transitive closure) has async initialization.
    pub async fn get_async(&self) -> DiResult<Arc<T>> {
        self.materialize_async().await.and_then(downcast_concrete::<T>)
    }
}

impl<T: ?Sized + Send + Sync + 'static> Lazy<T> {
    /// Materializes a trait-keyed target.
    pub fn get_trait(&self) -> DiResult<Arc<T>>
    where
        Arc<T>: 'static,
    {
        self.materialize().and_then(downcast_trait::<T>)
    }

    /// Async materialization of a trait-keyed target.
    pub async fn get_trait_async(&self) -> DiResult<Arc<T>>
    where
        Arc<T>: 'static,
    {
        self.materialize_async().await.and_then(downcast_trait::<T>)
    }
}
