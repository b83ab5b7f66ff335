//! The root container: registration surface, resolution, teardown.

use std::any::Any;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::builder::Registration;
use crate::cache::InstanceCache;
use crate::context::{AsyncResolverContext, ResolverContext};
use crate::descriptor::{
    downcast_concrete, downcast_trait, AnyArc, DependencySpec, Provider, ProviderKind,
    ResolvedDeps, ServiceDescriptor, ServiceInfo,
};
use crate::error::{BoxError, DiResult};
use crate::internal::{BoxFuture, DisposeBag};
use crate::key::ServiceId;
use crate::lazy::{Lazy, ResolverHandle};
use crate::lifecycle::Lifecycle;
use crate::registry::Registry;
use crate::resolve::{resolve_entry_async, ResolveEnv};
use crate::scope::Scope;
use crate::testing::MockOverlay;
use crate::traits::Resolver;

pub(crate) struct ContainerInner {
    registry: Registry,
    singletons: InstanceCache,
    disposers: Mutex<DisposeBag>,
    overlay: MockOverlay,
    pub(crate) modules: Mutex<HashMap<String, HashSet<ServiceId>>>,
    closed: AtomicBool,
}

/// The dependency-injection container.
///
/// Services are registered against it at any time and resolved from it
/// or from scopes created off it. The container is cheap to clone
/// (`Arc` internally) and fully thread-safe: concurrent resolutions of
/// the same singleton produce exactly one instance.
///
/// # Examples
///
/// ```rust
/// use axon_di::{Container, Lifecycle, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let container = Container::new();
/// container.add_instance(Database { url: "postgres://localhost".into() });
/// container.add_factory(Lifecycle::Singleton, |ctx| {
///     Ok(UserService { db: ctx.resolve::<Database>()? })
/// });
///
/// let users = container.resolve::<UserService>().unwrap();
/// assert_eq!(users.db.url, "postgres://localhost");
/// ```
pub struct Container {
    inner: Arc<ContainerInner>,
}

impl Clone for Container {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                registry: Registry::new(),
                singletons: InstanceCache::new(),
                disposers: Mutex::new(DisposeBag::default()),
                overlay: MockOverlay::new(),
                modules: Mutex::new(HashMap::new()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub(crate) fn singletons(&self) -> &InstanceCache {
        &self.inner.singletons
    }

    pub(crate) fn disposers(&self) -> &Mutex<DisposeBag> {
        &self.inner.disposers
    }

    pub(crate) fn overlay(&self) -> &MockOverlay {
        &self.inner.overlay
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    pub(crate) fn inner_modules(&self) -> &Mutex<HashMap<String, HashSet<ServiceId>>> {
        &self.inner.modules
    }

    pub(crate) fn insert_descriptor(&self, descriptor: ServiceDescriptor) {
        let id = descriptor.id;
        let lifecycle = descriptor.lifecycle;
        let replaced = self.inner.registry.insert(descriptor);
        if replaced {
            debug!(key = %id, %lifecycle, "replaced existing registration");
        } else {
            debug!(key = %id, %lifecycle, "registered");
        }
    }

    // ----- Registration: instances -----

    /// Registers a pre-built singleton value returned as-is by every
    /// resolution.
    pub fn add_instance<T: Send + Sync + 'static>(&self, value: T) -> &Self {
        self.insert_instance(ServiceId::of::<T>(), Arc::new(value));
        self
    }

    /// Registers a pre-built singleton under a context key.
    pub fn add_instance_with<T: Send + Sync + 'static>(
        &self,
        context: &'static str,
        value: T,
    ) -> &Self {
        self.insert_instance(ServiceId::of::<T>().with_context(context), Arc::new(value));
        self
    }

    /// Registers a pre-built trait implementation as a singleton.
    pub fn add_trait_instance<T: ?Sized + Send + Sync + 'static>(&self, value: Arc<T>) -> &Self {
        self.insert_instance(ServiceId::of_trait::<T>(), Arc::new(value));
        self
    }

    /// Registers a pre-built trait implementation under a context key.
    pub fn add_trait_instance_with<T: ?Sized + Send + Sync + 'static>(
        &self,
        context: &'static str,
        value: Arc<T>,
    ) -> &Self {
        self.insert_instance(
            ServiceId::of_trait::<T>().with_context(context),
            Arc::new(value),
        );
        self
    }

    fn insert_instance(&self, id: ServiceId, value: AnyArc) {
        self.insert_descriptor(ServiceDescriptor {
            id,
            lifecycle: Lifecycle::Singleton,
            kind: ProviderKind::Instance,
            provider: Provider::Instance(value),
            dependencies: Vec::new(),
            properties: Vec::new(),
            async_init: false,
            on_destroy: None,
        });
    }

    // ----- Registration: factories -----

    /// Registers a factory closure. The factory pulls what it needs
    /// from the [`ResolverContext`]; its declared dependency list is
    /// empty.
    pub fn add_factory<T, F>(&self, lifecycle: Lifecycle, factory: F) -> &Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.insert_factory(ServiceId::of::<T>(), lifecycle, factory);
        self
    }

    /// Registers a factory under a context key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use axon_di::{Container, Lifecycle, Resolver};
    /// use std::collections::HashMap;
    ///
    /// let container = Container::new();
    /// container.add_factory_with(Lifecycle::Singleton, "db_config", |_| {
    ///     Ok(HashMap::from([("pool".to_string(), "10".to_string())]))
    /// });
    ///
    /// let cfg = container
    ///     .resolve_with::<HashMap<String, String>>("db_config")
    ///     .unwrap();
    /// assert_eq!(cfg["pool"], "10");
    /// assert!(container.resolve_with::<HashMap<String, String>>("other").is_err());
    /// ```
    pub fn add_factory_with<T, F>(
        &self,
        lifecycle: Lifecycle,
        context: &'static str,
        factory: F,
    ) -> &Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.insert_factory(ServiceId::of::<T>().with_context(context), lifecycle, factory);
        self
    }

    fn insert_factory<T, F>(&self, id: ServiceId, lifecycle: Lifecycle, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.insert_descriptor(ServiceDescriptor {
            id,
            lifecycle,
            kind: ProviderKind::Factory,
            provider: Provider::Sync(Arc::new(
                move |ctx: &ResolverContext<'_>, _: &ResolvedDeps| {
                    factory(ctx).map(|t| Arc::new(t) as AnyArc)
                },
            )),
            dependencies: Vec::new(),
            properties: Vec::new(),
            async_init: false,
            on_destroy: None,
        });
    }

    /// Registers an async factory; the service then requires
    /// [`resolve_async`](Container::resolve_async).
    pub fn add_factory_async<T, F, Fut>(&self, lifecycle: Lifecycle, factory: F) -> &Self
    where
        T: Send + Sync + 'static,
        F: Fn(AsyncResolverContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        self.insert_factory_async(ServiceId::of::<T>(), lifecycle, factory);
        self
    }

    /// Registers an async factory under a context key.
    pub fn add_factory_async_with<T, F, Fut>(
        &self,
        lifecycle: Lifecycle,
        context: &'static str,
        factory: F,
    ) -> &Self
    where
        T: Send + Sync + 'static,
        F: Fn(AsyncResolverContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        self.insert_factory_async(ServiceId::of::<T>().with_context(context), lifecycle, factory);
        self
    }

    fn insert_factory_async<T, F, Fut>(&self, id: ServiceId, lifecycle: Lifecycle, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn(AsyncResolverContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        self.insert_descriptor(ServiceDescriptor {
            id,
            lifecycle,
            kind: ProviderKind::Factory,
            provider: Provider::Async(Arc::new(
                move |ctx: AsyncResolverContext, _: ResolvedDeps| {
                    let fut = factory(ctx);
                    Box::pin(async move { fut.await.map(|t| Arc::new(t) as AnyArc) })
                        as BoxFuture<Result<AnyArc, BoxError>>
                },
            )),
            dependencies: Vec::new(),
            properties: Vec::new(),
            async_init: true,
            on_destroy: None,
        });
    }

    /// Registers a factory producing a trait object.
    pub fn add_trait_factory<T, F>(&self, lifecycle: Lifecycle, factory: F) -> &Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> Result<Arc<T>, BoxError> + Send + Sync + 'static,
    {
        self.insert_trait_factory(ServiceId::of_trait::<T>(), lifecycle, factory);
        self
    }

    /// Registers a trait factory under a context key.
    pub fn add_trait_factory_with<T, F>(
        &self,
        lifecycle: Lifecycle,
        context: &'static str,
        factory: F,
    ) -> &Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> Result<Arc<T>, BoxError> + Send + Sync + 'static,
    {
        self.insert_trait_factory(
            ServiceId::of_trait::<T>().with_context(context),
            lifecycle,
            factory,
        );
        self
    }

    fn insert_trait_factory<T, F>(&self, id: ServiceId, lifecycle: Lifecycle, factory: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> Result<Arc<T>, BoxError> + Send + Sync + 'static,
    {
        self.insert_descriptor(ServiceDescriptor {
            id,
            lifecycle,
            kind: ProviderKind::Factory,
            provider: Provider::Sync(Arc::new(
                move |ctx: &ResolverContext<'_>, _: &ResolvedDeps| {
                    factory(ctx).map(|t| Arc::new(t) as AnyArc)
                },
            )),
            dependencies: Vec::new(),
            properties: Vec::new(),
            async_init: false,
            on_destroy: None,
        });
    }

    /// Registers `Lazy<T>` as a resolvable alias over `T`: resolving
    /// `Lazy<T>` hands out an unmaterialized proxy instead of building
    /// `T`.
    pub fn add_lazy<T: Send + Sync + 'static>(&self) -> &Self {
        let target = ServiceId::of::<T>();
        self.insert_descriptor(ServiceDescriptor {
            id: ServiceId::of::<Lazy<T>>(),
            lifecycle: Lifecycle::Transient,
            kind: ProviderKind::Lazy,
            provider: Provider::Sync(Arc::new(
                move |ctx: &ResolverContext<'_>, _: &ResolvedDeps| {
                    Ok(Arc::new(Lazy::<T>::new(ctx.env().handle(), target)) as AnyArc)
                },
            )),
            dependencies: vec![DependencySpec {
                name: "target",
                target,
                optional: false,
                lazy: true,
            }],
            properties: Vec::new(),
            async_init: false,
            on_destroy: None,
        });
        self
    }

    /// Starts a constructor-form registration with an explicit
    /// dependency list. See [`Registration`].
    pub fn register<T: Send + Sync + 'static>(&self, lifecycle: Lifecycle) -> Registration<'_, T> {
        Registration::new(self, lifecycle)
    }

    // ----- Resolution -----

    /// Async resolution; equivalent to [`Resolver::resolve`] on an
    /// all-sync graph, and additionally awaits async initializers in
    /// dependency order.
    pub async fn resolve_async<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        resolve_entry_async(ResolveEnv::for_root(self), ServiceId::of::<T>())
            .await
            .and_then(downcast_concrete::<T>)
    }

    /// Async resolution under a context key.
    pub async fn resolve_async_with<T: Send + Sync + 'static>(
        &self,
        context: &'static str,
    ) -> DiResult<Arc<T>> {
        resolve_entry_async(
            ResolveEnv::for_root(self),
            ServiceId::of::<T>().with_context(context),
        )
        .await
        .and_then(downcast_concrete::<T>)
    }

    /// Async resolution of a trait-keyed service.
    pub async fn resolve_trait_async<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>>
    where
        Arc<T>: 'static,
    {
        resolve_entry_async(ResolveEnv::for_root(self), ServiceId::of_trait::<T>())
            .await
            .and_then(downcast_trait::<T>)
    }

    /// Deferred handle over `T`; the target is resolved and memoized on
    /// first `get()`.
    pub fn lazy<T: Send + Sync + 'static>(&self) -> Lazy<T> {
        Lazy::new(ResolverHandle::Root(self.clone()), ServiceId::of::<T>())
    }

    pub fn lazy_with<T: Send + Sync + 'static>(&self, context: &'static str) -> Lazy<T> {
        Lazy::new(
            ResolverHandle::Root(self.clone()),
            ServiceId::of::<T>().with_context(context),
        )
    }

    pub fn lazy_trait<T: ?Sized + Send + Sync + 'static>(&self) -> Lazy<T> {
        Lazy::new(ResolverHandle::Root(self.clone()), ServiceId::of_trait::<T>())
    }

    /// Creates a scope with its own scoped cache and disposal list.
    pub fn create_scope(&self) -> Scope {
        Scope::new(self.clone())
    }

    // ----- Teardown -----

    /// Closes the container: runs disposal hooks in reverse build
    /// order (async hooks awaited in place), then drops the singleton
    /// cache and all descriptors. Idempotent.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut bag = std::mem::take(&mut *self.inner.disposers.lock().unwrap());
        bag.run_reverse().await;
        self.inner.singletons.clear();
        self.inner.registry.clear();
        debug!("container closed");
    }

    /// Synchronous close for runtimes-free teardown; async disposal
    /// hooks cannot run here and are reported instead.
    pub fn close_sync(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut bag = std::mem::take(&mut *self.inner.disposers.lock().unwrap());
        let skipped = bag.run_reverse_sync();
        if skipped > 0 {
            warn!(skipped, "async disposal hooks skipped by close_sync; use close().await");
        }
        self.inner.singletons.clear();
        self.inner.registry.clear();
        debug!("container closed");
    }

    // ----- Test mode -----

    /// Turns on the mock overlay. Real registrations and caches are
    /// untouched; mocks shadow them.
    pub fn enable_test_mode(&self) -> &Self {
        self.inner.overlay.activate();
        debug!("test mode enabled");
        self
    }

    /// Turns off the mock overlay, clears all mocks, and evicts
    /// singleton cache entries built while test mode was on, so
    /// mock-derived instances cannot leak.
    pub fn disable_test_mode(&self) -> &Self {
        if self.inner.overlay.deactivate() {
            self.inner.singletons.evict_test_built();
            debug!("test mode disabled");
        }
        self
    }

    /// Shadows `T` with a mock while test mode is on.
    pub fn mock<T: Send + Sync + 'static>(&self, value: T) -> &Self {
        self.inner.overlay.insert(ServiceId::of::<T>(), Arc::new(value));
        self
    }

    /// Shadows `(T, context)` with a mock.
    pub fn mock_with<T: Send + Sync + 'static>(&self, context: &'static str, value: T) -> &Self {
        self.inner
            .overlay
            .insert(ServiceId::of::<T>().with_context(context), Arc::new(value));
        self
    }

    /// Shadows a trait key with a mock implementation.
    pub fn mock_trait<T: ?Sized + Send + Sync + 'static>(&self, value: Arc<T>) -> &Self {
        self.inner
            .overlay
            .insert(ServiceId::of_trait::<T>(), Arc::new(value));
        self
    }

    pub fn mock_trait_with<T: ?Sized + Send + Sync + 'static>(
        &self,
        context: &'static str,
        value: Arc<T>,
    ) -> &Self {
        self.inner
            .overlay
            .insert(ServiceId::of_trait::<T>().with_context(context), Arc::new(value));
        self
    }

    /// Removes a single mock; the real registration shows through
    /// again.
    pub fn unmock<T: Send + Sync + 'static>(&self) -> &Self {
        self.inner.overlay.remove(&ServiceId::of::<T>());
        self
    }

    pub fn unmock_with<T: Send + Sync + 'static>(&self, context: &'static str) -> &Self {
        self.inner
            .overlay
            .remove(&ServiceId::of::<T>().with_context(context));
        self
    }

    pub fn unmock_trait<T: ?Sized + Send + Sync + 'static>(&self) -> &Self {
        self.inner.overlay.remove(&ServiceId::of_trait::<T>());
        self
    }

    // ----- Diagnostics -----

    /// Snapshot of every registration.
    pub fn descriptors(&self) -> Vec<ServiceInfo> {
        self.inner
            .registry
            .snapshot()
            .iter()
            .map(|d| ServiceInfo {
                id: d.id,
                lifecycle: d.lifecycle,
                kind: d.kind,
                async_init: d.async_init,
                dependencies: d
                    .dependencies
                    .iter()
                    .map(|dep| dep.target.to_string())
                    .chain(d.properties.iter().map(|p| p.target.to_string()))
                    .collect(),
            })
            .collect()
    }

    /// Adjacency map of the declared dependency graph, keyed by display
    /// name. Factory registrations contribute nodes without edges since
    /// their pulls are not declared.
    pub fn dependency_graph(&self) -> BTreeMap<String, Vec<String>> {
        let mut graph = BTreeMap::new();
        for info in self.descriptors() {
            graph.insert(info.id.to_string(), info.dependencies);
        }
        graph
    }
}

impl Resolver for Container {
    fn resolve_any(&self, id: &ServiceId) -> DiResult<Arc<dyn Any + Send + Sync>> {
        crate::resolve::resolve_entry(&ResolveEnv::for_root(self), id)
    }
}
