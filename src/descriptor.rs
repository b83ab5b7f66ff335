//! Service descriptors: how to build and manage one service.

use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;

use crate::context::{AsyncResolverContext, ResolverContext};
use crate::error::{BoxError, DiError, DiResult};
use crate::internal::{BoxFuture, BoxFutureUnit};
use crate::key::ServiceId;
use crate::lazy::{Lazy, ResolverHandle};
use crate::lifecycle::Lifecycle;

/// Type-erased instance as stored in caches and passed between the
/// engine and providers. Trait-keyed services are stored as
/// `Arc<Arc<dyn Trait>>` inside the `Any`.
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

pub(crate) type SyncProviderFn =
    Arc<dyn Fn(&ResolverContext<'_>, &ResolvedDeps) -> Result<AnyArc, BoxError> + Send + Sync>;

pub(crate) type AsyncProviderFn = Arc<
    dyn Fn(AsyncResolverContext, ResolvedDeps) -> BoxFuture<Result<AnyArc, BoxError>>
        + Send
        + Sync,
>;

/// The provider form of a registration, for introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Pre-built value returned as-is.
    Instance,
    /// Build closure invoked with the resolved declared dependencies.
    Constructor,
    /// User closure pulling what it needs from the resolver context.
    Factory,
    /// Alias that materializes to a [`Lazy`] proxy over a target key.
    Lazy,
}

/// Runtime provider. The `Async` flavor is what `async_init` means:
/// construction may suspend, so it is reachable only via
/// `resolve_async`.
pub(crate) enum Provider {
    Instance(AnyArc),
    Sync(SyncProviderFn),
    Async(AsyncProviderFn),
}

/// One declared dependency edge: resolved by the engine in declaration
/// order and handed to the constructor under `name`.
pub(crate) struct DependencySpec {
    pub(crate) name: &'static str,
    pub(crate) target: ServiceId,
    pub(crate) optional: bool,
    pub(crate) lazy: bool,
}

/// One property-injection entry, applied as a setter call after
/// construction.
pub(crate) struct PropertySpec {
    pub(crate) name: &'static str,
    pub(crate) target: ServiceId,
    pub(crate) lazy: bool,
}

/// Descriptor-level disposal hook, invoked on the cached instance when
/// the owning container or scope closes.
pub(crate) enum DisposeHook {
    Sync(Arc<dyn Fn(&AnyArc) + Send + Sync>),
    Async(Arc<dyn Fn(AnyArc) -> BoxFutureUnit + Send + Sync>),
}

/// Immutable record of how to build one service.
///
/// Created at registration, never mutated afterwards; descriptors
/// compare by identity and define no equality.
pub(crate) struct ServiceDescriptor {
    pub(crate) id: ServiceId,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) kind: ProviderKind,
    pub(crate) provider: Provider,
    pub(crate) dependencies: Vec<DependencySpec>,
    pub(crate) properties: Vec<PropertySpec>,
    pub(crate) async_init: bool,
    pub(crate) on_destroy: Option<DisposeHook>,
}

impl ServiceDescriptor {
    /// Registration-time validation.
    pub(crate) fn validate(&self) -> DiResult<()> {
        if matches!(self.kind, ProviderKind::Instance) && self.lifecycle != Lifecycle::Singleton {
            return Err(DiError::InvalidDescriptor {
                key: self.id.to_string(),
                reason: "instance registrations must be singletons".to_string(),
            });
        }
        let mut seen = HashSet::new();
        for name in self
            .dependencies
            .iter()
            .map(|d| d.name)
            .chain(self.properties.iter().map(|p| p.name))
        {
            if !seen.insert(name) {
                return Err(DiError::InvalidDescriptor {
                    key: self.id.to_string(),
                    reason: format!("duplicate dependency name `{name}`"),
                });
            }
        }
        Ok(())
    }
}

/// Public snapshot of a registration, for diagnostics and module
/// binding.
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    pub id: ServiceId,
    pub lifecycle: Lifecycle,
    pub kind: ProviderKind,
    pub async_init: bool,
    /// Declared dependency and property targets, in declaration order.
    pub dependencies: Vec<String>,
}

pub(crate) enum DepValue {
    Present(AnyArc),
    /// Optional dependency that was not registered.
    Absent,
    /// Lazy edge: no recursion happened; the handle materializes on
    /// first dereference.
    Deferred(ResolverHandle, ServiceId),
}

/// The dependencies the resolver constructed for a descriptor, in
/// declaration order, keyed by parameter name.
///
/// Constructors pull values out with the typed accessors:
///
/// ```rust
/// use axon_di::{Container, Lifecycle, Resolver};
/// use std::sync::Arc;
///
/// struct Db;
/// struct Users { db: Arc<Db> }
///
/// let container = Container::new();
/// container.add_instance(Db);
/// container
///     .register::<Users>(Lifecycle::Singleton)
///     .depends_on::<Db>("db")
///     .construct(|deps| Ok(Users { db: deps.required::<Db>("db")? }))
///     .unwrap();
///
/// let users = container.resolve::<Users>().unwrap();
/// assert!(Arc::ptr_eq(&users.db, &container.resolve::<Db>().unwrap()));
/// ```
pub struct ResolvedDeps {
    entries: Vec<(&'static str, DepValue)>,
}

impl ResolvedDeps {
    pub(crate) fn new(entries: Vec<(&'static str, DepValue)>) -> Self {
        Self { entries }
    }

    fn entry(&self, name: &str) -> DiResult<&DepValue> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
            .ok_or_else(|| DiError::InvalidDescriptor {
                key: name.to_string(),
                reason: "constructor requested an undeclared dependency".to_string(),
            })
    }

    /// A required concrete dependency.
    pub fn required<T: Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<T>> {
        match self.entry(name)? {
            DepValue::Present(any) => downcast_concrete::<T>(any.clone()),
            DepValue::Absent => Err(DiError::Unregistered {
                key: ServiceId::of::<T>().to_string(),
            }),
            DepValue::Deferred(_, _) => Err(DiError::InvalidDescriptor {
                key: name.to_string(),
                reason: "dependency was declared lazy; use `lazy()`".to_string(),
            }),
        }
    }

    /// A required trait-object dependency.
    pub fn required_trait<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<T>>
    where
        Arc<T>: 'static,
    {
        match self.entry(name)? {
            DepValue::Present(any) => downcast_trait::<T>(any.clone()),
            DepValue::Absent => Err(DiError::Unregistered {
                key: ServiceId::of_trait::<T>().to_string(),
            }),
            DepValue::Deferred(_, _) => Err(DiError::InvalidDescriptor {
                key: name.to_string(),
                reason: "dependency was declared lazy; use `lazy_trait()`".to_string(),
            }),
        }
    }

    /// An optional dependency: `None` when the target was unregistered.
    pub fn optional<T: Send + Sync + 'static>(&self, name: &str) -> DiResult<Option<Arc<T>>> {
        match self.entry(name)? {
            DepValue::Absent => Ok(None),
            _ => self.required::<T>(name).map(Some),
        }
    }

    /// A dependency declared lazy, as an unmaterialized proxy.
    pub fn lazy<T: Send + Sync + 'static>(&self, name: &str) -> DiResult<Lazy<T>> {
        match self.entry(name)? {
            DepValue::Deferred(handle, target) => Ok(Lazy::new(handle.clone(), *target)),
            _ => Err(DiError::InvalidDescriptor {
                key: name.to_string(),
                reason: "dependency was not declared lazy".to_string(),
            }),
        }
    }

    /// A trait-object dependency declared lazy.
    pub fn lazy_trait<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> DiResult<Lazy<T>> {
        match self.entry(name)? {
            DepValue::Deferred(handle, target) => Ok(Lazy::new(handle.clone(), *target)),
            _ => Err(DiError::InvalidDescriptor {
                key: name.to_string(),
                reason: "dependency was not declared lazy".to_string(),
            }),
        }
    }
}

pub(crate) fn downcast_concrete<T: Send + Sync + 'static>(any: AnyArc) -> DiResult<Arc<T>> {
    any.downcast::<T>()
        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
}

// Trait objects are stored as Arc<Arc<dyn Trait>> inside the Any, so
// the downcast targets the inner Arc and clones it out.
pub(crate) fn downcast_trait<T: ?Sized + Send + Sync + 'static>(any: AnyArc) -> DiResult<Arc<T>>
where
    Arc<T>: 'static,
{
    any.downcast::<Arc<T>>()
        .map(|boxed| (*boxed).clone())
        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
}
