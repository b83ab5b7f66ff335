//! Disposal traits for resource cleanup.

/// Trait for synchronous resource disposal.
///
/// Services that need structured teardown (flushing caches, closing
/// handles) implement this and register themselves from their factory
/// via `register_disposer`. Hooks run in reverse build order when the
/// owning container or scope closes.
///
/// # Examples
///
/// ```rust
/// use axon_di::{Container, Dispose, Lifecycle};
/// use std::sync::Arc;
///
/// struct Cache;
///
/// impl Dispose for Cache {
///     fn dispose(&self) {
///         // flush...
///     }
/// }
///
/// let container = Container::new();
/// container.add_factory(Lifecycle::Singleton, |ctx| {
///     let handle = Arc::new(Cache);
///     ctx.register_disposer(handle.clone());
///     Ok(Cache)
/// });
/// ```
///
/// Registrations made through the builder can use
/// `on_destroy` instead, which receives the cached instance itself.
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self);
}

/// Trait for asynchronous resource disposal (graceful connection
/// shutdown, async I/O cleanup). Runs in the same reverse-build-order
/// pass as sync hooks, awaited in place.
#[async_trait::async_trait]
pub trait AsyncDispose: Send + Sync + 'static {
    /// Perform asynchronous cleanup of resources.
    async fn dispose(&self);
}
