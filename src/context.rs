//! Contexts handed to factory closures for resolving their
//! dependencies.

use std::any::Any;
use std::sync::{Arc, Mutex};

use crate::descriptor::{downcast_concrete, downcast_trait};
use crate::error::DiResult;
use crate::internal::DisposeBag;
use crate::key::ServiceId;
use crate::lazy::Lazy;
use crate::lifecycle::Lifecycle;
use crate::resolve::{resolve_entry, resolve_entry_async, ResolveEnv};
use crate::traits::{AsyncDispose, Dispose, Resolver};

/// Context passed to synchronous factories.
///
/// Resolution through the context continues the in-flight resolution,
/// so cycles that run through factory pulls are detected with the full
/// chain. Disposal hooks registered here land on the bag owning the
/// instance under construction: the root container for singletons, the
/// current scope otherwise.
///
/// # Examples
///
/// ```rust
/// use axon_di::{Container, Lifecycle, Resolver};
/// use std::sync::Arc;
///
/// struct Db { url: String }
/// struct Users { db: Arc<Db> }
///
/// let container = Container::new();
/// container.add_instance(Db { url: "postgres://localhost".into() });
/// container.add_factory(Lifecycle::Transient, |ctx| {
///     Ok(Users { db: ctx.resolve::<Db>()? })
/// });
///
/// let users = container.resolve::<Users>().unwrap();
/// assert_eq!(users.db.url, "postgres://localhost");
/// ```
pub struct ResolverContext<'a> {
    env: &'a ResolveEnv,
    lifecycle: Lifecycle,
}

impl<'a> ResolverContext<'a> {
    pub(crate) fn new(env: &'a ResolveEnv, lifecycle: Lifecycle) -> Self {
        Self { env, lifecycle }
    }

    pub(crate) fn env(&self) -> &ResolveEnv {
        self.env
    }

    fn bag(&self) -> &Mutex<DisposeBag> {
        match (&self.env.scope, self.lifecycle) {
            (Some(scope), lc) if lc != Lifecycle::Singleton => scope.disposers(),
            _ => self.env.root.disposers(),
        }
    }

    /// Deferred handle for a service; nothing resolves until `get()`.
    pub fn lazy<T: Send + Sync + 'static>(&self) -> Lazy<T> {
        Lazy::new(self.env.handle(), ServiceId::of::<T>())
    }

    pub fn lazy_with<T: Send + Sync + 'static>(&self, context: &'static str) -> Lazy<T> {
        Lazy::new(self.env.handle(), ServiceId::of::<T>().with_context(context))
    }

    pub fn lazy_trait<T: ?Sized + Send + Sync + 'static>(&self) -> Lazy<T> {
        Lazy::new(self.env.handle(), ServiceId::of_trait::<T>())
    }

    /// Registers a sync disposal hook for the service being built.
    pub fn register_disposer<T: Dispose>(&self, service: Arc<T>) {
        self.bag()
            .lock()
            .unwrap()
            .push_sync(Box::new(move || service.dispose()));
    }

    /// Registers an async disposal hook for the service being built.
    pub fn register_async_disposer<T: AsyncDispose>(&self, service: Arc<T>) {
        self.bag().lock().unwrap().push_async(Box::new(move || {
            Box::pin(async move { service.dispose().await })
        }));
    }
}

impl Resolver for ResolverContext<'_> {
    fn resolve_any(&self, id: &ServiceId) -> DiResult<Arc<dyn Any + Send + Sync>> {
        resolve_entry(self.env, id)
    }
}

/// Context passed to asynchronous factories and constructors.
///
/// Owns its resolution state so the factory future can be `'static`;
/// resolution awaits async initializers along the way.
pub struct AsyncResolverContext {
    env: ResolveEnv,
    lifecycle: Lifecycle,
}

impl AsyncResolverContext {
    pub(crate) fn new(env: ResolveEnv, lifecycle: Lifecycle) -> Self {
        Self { env, lifecycle }
    }

    pub(crate) fn env(&self) -> &ResolveEnv {
        &self.env
    }

    fn bag(&self) -> &Mutex<DisposeBag> {
        match (&self.env.scope, self.lifecycle) {
            (Some(scope), lc) if lc != Lifecycle::Singleton => scope.disposers(),
            _ => self.env.root.disposers(),
        }
    }

    /// Resolves a concrete service, awaiting async initialization.
    pub async fn resolve<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        resolve_entry_async(self.env.clone(), ServiceId::of::<T>())
            .await
            .and_then(downcast_concrete::<T>)
    }

    pub async fn resolve_with<T: Send + Sync + 'static>(
        &self,
        context: &'static str,
    ) -> DiResult<Arc<T>> {
        resolve_entry_async(self.env.clone(), ServiceId::of::<T>().with_context(context))
            .await
            .and_then(downcast_concrete::<T>)
    }

    pub async fn resolve_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>>
    where
        Arc<T>: 'static,
    {
        resolve_entry_async(self.env.clone(), ServiceId::of_trait::<T>())
            .await
            .and_then(downcast_trait::<T>)
    }

    pub fn lazy<T: Send + Sync + 'static>(&self) -> Lazy<T> {
        Lazy::new(self.env.handle(), ServiceId::of::<T>())
    }

    pub fn lazy_trait<T: ?Sized + Send + Sync + 'static>(&self) -> Lazy<T> {
        Lazy::new(self.env.handle(), ServiceId::of_trait::<T>())
    }

    pub fn register_disposer<T: Dispose>(&self, service: Arc<T>) {
        self.bag()
            .lock()
            .unwrap()
            .push_sync(Box::new(move || service.dispose()));
    }

    pub fn register_async_disposer<T: AsyncDispose>(&self, service: Arc<T>) {
        self.bag().lock().unwrap().push_async(Box::new(move || {
            Box::pin(async move { service.dispose().await })
        }));
    }
}
