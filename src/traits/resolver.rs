//! The resolution trait shared by containers, scopes, and factory
//! contexts.

use std::any::Any;
use std::sync::Arc;

use crate::descriptor::{downcast_concrete, downcast_trait};
use crate::error::DiResult;
use crate::key::ServiceId;

/// Synchronous resolution surface.
///
/// Implemented by [`Container`](crate::Container),
/// [`Scope`](crate::Scope), and the factory-facing
/// [`ResolverContext`](crate::ResolverContext), so factories are
/// agnostic about where they run. The typed methods are thin wrappers
/// over the type-erased [`resolve_any`](Resolver::resolve_any).
///
/// Asynchronous resolution lives as inherent `resolve_async*` methods
/// on each implementor, since it must be driven from an async context.
pub trait Resolver {
    /// Resolves a service by identity, type-erased.
    ///
    /// On a container or scope this starts a fresh resolution; on a
    /// factory context it continues the in-flight resolution so cycle
    /// detection spans factory pulls.
    fn resolve_any(&self, id: &ServiceId) -> DiResult<Arc<dyn Any + Send + Sync>>;

    /// Resolves a concrete service type.
    fn resolve<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.resolve_any(&ServiceId::of::<T>())
            .and_then(downcast_concrete::<T>)
    }

    /// Resolves a concrete service type under a context key.
    fn resolve_with<T: Send + Sync + 'static>(&self, context: &'static str) -> DiResult<Arc<T>> {
        self.resolve_any(&ServiceId::of::<T>().with_context(context))
            .and_then(downcast_concrete::<T>)
    }

    /// Resolves a trait-keyed service, e.g.
    /// `resolver.resolve_trait::<dyn Logger>()`.
    fn resolve_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>>
    where
        Arc<T>: 'static,
    {
        self.resolve_any(&ServiceId::of_trait::<T>())
            .and_then(downcast_trait::<T>)
    }

    /// Resolves a trait-keyed service under a context key.
    fn resolve_trait_with<T: ?Sized + Send + Sync + 'static>(
        &self,
        context: &'static str,
    ) -> DiResult<Arc<T>>
    where
        Arc<T>: 'static,
    {
        self.resolve_any(&ServiceId::of_trait::<T>().with_context(context))
            .and_then(downcast_trait::<T>)
    }
}
