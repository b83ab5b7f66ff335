//! Builder DSL for constructor-form registrations with declared
//! dependency lists.

use std::future::Future;
use std::sync::Arc;

use crate::container::Container;
use crate::context::{AsyncResolverContext, ResolverContext};
use crate::descriptor::{
    downcast_concrete, downcast_trait, AnyArc, DependencySpec, DisposeHook, PropertySpec,
    Provider, ProviderKind, ResolvedDeps, ServiceDescriptor,
};
use crate::error::{BoxError, DiResult};
use crate::internal::BoxFutureUnit;
use crate::key::ServiceId;
use crate::lazy::Lazy;
use crate::lifecycle::Lifecycle;
use crate::resolve::{resolve_entry, ResolveEnv};

type Applier<T> = Box<dyn Fn(&mut T, &ResolveEnv) -> Result<(), BoxError> + Send + Sync>;
type InitHook<T> = Box<dyn Fn(&mut T) -> Result<(), BoxError> + Send + Sync>;

/// In-progress constructor registration for `T`.
///
/// Where a factory pulls dependencies imperatively, a constructor
/// registration declares them up front; the resolver constructs them in
/// declaration order and hands them to the closure as a
/// [`ResolvedDeps`] bundle. The declared list is what drives cycle
/// reporting, async propagation, and graph export.
///
/// # Examples
///
/// ```rust
/// use axon_di::{Container, Lifecycle, Resolver};
/// use std::sync::Arc;
///
/// struct Db;
/// struct Cache;
/// struct Users {
///     db: Arc<Db>,
///     cache: Option<Arc<Cache>>,
/// }
///
/// let container = Container::new();
/// container.add_instance(Db);
/// container
///     .register::<Users>(Lifecycle::Singleton)
///     .depends_on::<Db>("db")
///     .depends_on_optional::<Cache>("cache")
///     .construct(|deps| {
///         Ok(Users {
///             db: deps.required::<Db>("db")?,
///             cache: deps.optional::<Cache>("cache")?,
///         })
///     })
///     .unwrap();
///
/// let users = container.resolve::<Users>().unwrap();
/// assert!(users.cache.is_none()); // Cache was never registered
/// ```
pub struct Registration<'c, T: Send + Sync + 'static> {
    container: &'c Container,
    id: ServiceId,
    lifecycle: Lifecycle,
    dependencies: Vec<DependencySpec>,
    properties: Vec<PropertySpec>,
    appliers: Vec<Applier<T>>,
    init_hooks: Vec<InitHook<T>>,
    on_destroy: Option<DisposeHook>,
}

impl<'c, T: Send + Sync + 'static> Registration<'c, T> {
    pub(crate) fn new(container: &'c Container, lifecycle: Lifecycle) -> Self {
        Self {
            container,
            id: ServiceId::of::<T>(),
            lifecycle,
            dependencies: Vec::new(),
            properties: Vec::new(),
            appliers: Vec::new(),
            init_hooks: Vec::new(),
            on_destroy: None,
        }
    }

    /// Registers under `(T, context)` instead of the bare key.
    pub fn with_context(mut self, context: &'static str) -> Self {
        self.id = ServiceId::of::<T>().with_context(context);
        self
    }

    fn push_dep(mut self, name: &'static str, target: ServiceId, optional: bool, lazy: bool) -> Self {
        self.dependencies.push(DependencySpec {
            name,
            target,
            optional,
            lazy,
        });
        self
    }

    /// Declares a required dependency on `D`, available to the
    /// constructor as `deps.required::<D>(name)`.
    pub fn depends_on<D: Send + Sync + 'static>(self, name: &'static str) -> Self {
        self.push_dep(name, ServiceId::of::<D>(), false, false)
    }

    /// Declares a required dependency on `(D, context)`.
    pub fn depends_on_with<D: Send + Sync + 'static>(
        self,
        name: &'static str,
        context: &'static str,
    ) -> Self {
        self.push_dep(name, ServiceId::of::<D>().with_context(context), false, false)
    }

    /// Declares an optional dependency: resolution substitutes absence
    /// when `D` is unregistered instead of failing.
    pub fn depends_on_optional<D: Send + Sync + 'static>(self, name: &'static str) -> Self {
        self.push_dep(name, ServiceId::of::<D>(), true, false)
    }

    /// Declares a lazy edge: the constructor receives an
    /// unmaterialized [`Lazy<D>`] and no recursion happens at build
    /// time, which is how construction cycles are broken.
    pub fn depends_on_lazy<D: Send + Sync + 'static>(self, name: &'static str) -> Self {
        self.push_dep(name, ServiceId::of::<D>(), false, true)
    }

    /// Declares a required dependency on a trait key.
    pub fn depends_on_trait<D: ?Sized + Send + Sync + 'static>(self, name: &'static str) -> Self {
        self.push_dep(name, ServiceId::of_trait::<D>(), false, false)
    }

    pub fn depends_on_trait_with<D: ?Sized + Send + Sync + 'static>(
        self,
        name: &'static str,
        context: &'static str,
    ) -> Self {
        self.push_dep(
            name,
            ServiceId::of_trait::<D>().with_context(context),
            false,
            false,
        )
    }

    /// Declares a lazy edge to a trait key.
    pub fn depends_on_trait_lazy<D: ?Sized + Send + Sync + 'static>(
        self,
        name: &'static str,
    ) -> Self {
        self.push_dep(name, ServiceId::of_trait::<D>(), false, true)
    }

    /// Declares a property injection: after construction the resolver
    /// resolves `P` and installs it through `setter`.
    ///
    /// Property targets are resolved synchronously; use
    /// [`inject_property_lazy`](Registration::inject_property_lazy) for
    /// targets that need async initialization.
    pub fn inject_property<P: Send + Sync + 'static>(
        mut self,
        name: &'static str,
        setter: impl Fn(&mut T, Arc<P>) + Send + Sync + 'static,
    ) -> Self {
        let target = ServiceId::of::<P>();
        self.properties.push(PropertySpec {
            name,
            target,
            lazy: false,
        });
        self.appliers.push(Box::new(move |value, env| {
            let dep = downcast_concrete::<P>(resolve_entry(env, &target)?)?;
            setter(value, dep);
            Ok(())
        }));
        self
    }

    /// Property injection through a trait key.
    pub fn inject_property_trait<P: ?Sized + Send + Sync + 'static>(
        mut self,
        name: &'static str,
        setter: impl Fn(&mut T, Arc<P>) + Send + Sync + 'static,
    ) -> Self
    where
        Arc<P>: 'static,
    {
        let target = ServiceId::of_trait::<P>();
        self.properties.push(PropertySpec {
            name,
            target,
            lazy: false,
        });
        self.appliers.push(Box::new(move |value, env| {
            let dep = downcast_trait::<P>(resolve_entry(env, &target)?)?;
            setter(value, dep);
            Ok(())
        }));
        self
    }

    /// Installs a lazy accessor instead of an eager value: the target
    /// resolves on the proxy's first dereference.
    pub fn inject_property_lazy<P: Send + Sync + 'static>(
        mut self,
        name: &'static str,
        setter: impl Fn(&mut T, Lazy<P>) + Send + Sync + 'static,
    ) -> Self {
        let target = ServiceId::of::<P>();
        self.properties.push(PropertySpec {
            name,
            target,
            lazy: true,
        });
        self.appliers.push(Box::new(move |value, env| {
            setter(value, Lazy::new(env.handle(), target));
            Ok(())
        }));
        self
    }

    /// Post-construction hook, run after property injection.
    pub fn on_init(
        mut self,
        hook: impl Fn(&mut T) -> Result<(), BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.init_hooks.push(Box::new(hook));
        self
    }

    /// Disposal hook invoked on the cached instance, in reverse build
    /// order, when the owning container or scope closes. Only cached
    /// lifecycles participate; transient instances are owned by the
    /// caller.
    pub fn on_destroy(mut self, hook: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_destroy = Some(DisposeHook::Sync(Arc::new(move |any: &AnyArc| {
            if let Some(value) = any.downcast_ref::<T>() {
                hook(value);
            }
        })));
        self
    }

    /// Async disposal hook, awaited during `close()`.
    pub fn on_destroy_async<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_destroy = Some(DisposeHook::Async(Arc::new(move |any: AnyArc| {
            match any.downcast::<T>() {
                Ok(value) => Box::pin(hook(value)) as BoxFutureUnit,
                Err(_) => Box::pin(async {}) as BoxFutureUnit,
            }
        })));
        self
    }

    /// Finishes the registration with a synchronous constructor.
    pub fn construct<F>(self, ctor: F) -> DiResult<()>
    where
        F: Fn(&ResolvedDeps) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let Registration {
            container,
            id,
            lifecycle,
            dependencies,
            properties,
            appliers,
            init_hooks,
            on_destroy,
        } = self;

        let provider = Provider::Sync(Arc::new(
            move |ctx: &ResolverContext<'_>, deps: &ResolvedDeps| {
                let mut value = ctor(deps)?;
                for apply in &appliers {
                    apply(&mut value, ctx.env())?;
                }
                for hook in &init_hooks {
                    hook(&mut value)?;
                }
                Ok(Arc::new(value) as AnyArc)
            },
        ));

        let descriptor = ServiceDescriptor {
            id,
            lifecycle,
            kind: ProviderKind::Constructor,
            provider,
            dependencies,
            properties,
            async_init: false,
            on_destroy,
        };
        descriptor.validate()?;
        container.insert_descriptor(descriptor);
        Ok(())
    }

    /// Finishes the registration with an asynchronous constructor; the
    /// service then requires `resolve_async`, and sync resolution of
    /// anything depending on it fails with `AsyncRequired`.
    pub fn construct_async<F, Fut>(self, ctor: F) -> DiResult<()>
    where
        F: Fn(ResolvedDeps) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        let Registration {
            container,
            id,
            lifecycle,
            dependencies,
            properties,
            appliers,
            init_hooks,
            on_destroy,
        } = self;

        let ctor = Arc::new(ctor);
        let appliers = Arc::new(appliers);
        let init_hooks = Arc::new(init_hooks);
        let provider = Provider::Async(Arc::new(
            move |ctx: AsyncResolverContext, deps: ResolvedDeps| {
                let ctor = ctor.clone();
                let appliers = appliers.clone();
                let init_hooks = init_hooks.clone();
                Box::pin(async move {
                    let mut value = ctor(deps).await?;
                    for apply in appliers.iter() {
                        apply(&mut value, ctx.env())?;
                    }
                    for hook in init_hooks.iter() {
                        hook(&mut value)?;
                    }
                    Ok(Arc::new(value) as AnyArc)
                }) as crate::internal::BoxFuture<Result<AnyArc, BoxError>>
            },
        ));

        let descriptor = ServiceDescriptor {
            id,
            lifecycle,
            kind: ProviderKind::Constructor,
            provider,
            dependencies,
            properties,
            async_init: true,
            on_destroy,
        };
        descriptor.validate()?;
        container.insert_descriptor(descriptor);
        Ok(())
    }
}
