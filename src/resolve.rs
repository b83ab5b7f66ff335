//! The resolution engine: graph walking, caching, and lifecycle
//! enforcement for both the sync and async drivers.

use std::sync::Arc;

use tracing::trace;

use crate::cache::CachedValue;
use crate::container::Container;
use crate::context::{AsyncResolverContext, ResolverContext};
use crate::descriptor::{AnyArc, DepValue, DisposeHook, Provider, ResolvedDeps, ServiceDescriptor};
use crate::error::{DiError, DiResult};
use crate::internal::{BoxFuture, ResolutionStack};
use crate::key::ServiceId;
use crate::lazy::ResolverHandle;
use crate::lifecycle::Lifecycle;
use crate::scope::Scope;

/// Everything one resolution carries: the root container, the scope it
/// was started on (if any), and the in-flight stack. Cloning is cheap
/// (Arcs all the way down) and shares the stack, which is what lets the
/// async driver recurse through owned futures.
#[derive(Clone)]
pub(crate) struct ResolveEnv {
    pub(crate) root: Container,
    pub(crate) scope: Option<Scope>,
    pub(crate) stack: Arc<ResolutionStack>,
}

impl ResolveEnv {
    pub(crate) fn for_root(container: &Container) -> Self {
        Self {
            root: container.clone(),
            scope: None,
            stack: Arc::new(ResolutionStack::new()),
        }
    }

    pub(crate) fn for_scope(scope: &Scope) -> Self {
        Self {
            root: scope.root().clone(),
            scope: Some(scope.clone()),
            stack: Arc::new(ResolutionStack::new()),
        }
    }

    pub(crate) fn handle(&self) -> ResolverHandle {
        match &self.scope {
            Some(scope) => ResolverHandle::Scoped(scope.clone()),
            None => ResolverHandle::Root(self.root.clone()),
        }
    }
}

/// A scoped dependency reached from a singleton (directly or through a
/// chain of transients) would outlive its scope; reject it before any
/// side effect.
fn check_scoped_capture(env: &ResolveEnv, id: &ServiceId) -> DiResult<()> {
    if let Some((parent, parent_lifecycle)) = env.stack.effective_parent() {
        if parent_lifecycle == Lifecycle::Singleton {
            return Err(DiError::LifecycleMismatch {
                dependent: parent,
                dependent_lifecycle: parent_lifecycle,
                dependency: id.to_string(),
                dependency_lifecycle: Lifecycle::Scoped,
            });
        }
    }
    Ok(())
}

fn check_open(env: &ResolveEnv) -> DiResult<()> {
    if env.root.is_closed() {
        return Err(DiError::ScopeClosed("container"));
    }
    if let Some(scope) = &env.scope {
        if scope.is_closed() {
            return Err(DiError::ScopeClosed("scope"));
        }
    }
    Ok(())
}

/// Records the descriptor's disposal hook against the bag owning the
/// freshly cached instance.
fn record_disposer(
    desc: &ServiceDescriptor,
    value: &AnyArc,
    bag: &std::sync::Mutex<crate::internal::DisposeBag>,
) {
    match &desc.on_destroy {
        Some(DisposeHook::Sync(hook)) => {
            let hook = hook.clone();
            let value = value.clone();
            bag.lock().unwrap().push_sync(Box::new(move || hook(&value)));
        }
        Some(DisposeHook::Async(hook)) => {
            let hook = hook.clone();
            let value = value.clone();
            bag.lock().unwrap().push_async(Box::new(move || hook(value)));
        }
        None => {}
    }
}

// ===== Synchronous driver =====

pub(crate) fn resolve_entry(env: &ResolveEnv, id: &ServiceId) -> DiResult<AnyArc> {
    check_open(env)?;

    // Mocks shadow everything while test mode is on.
    if let Some(mock) = env.root.overlay().get(id) {
        trace!(key = %id, "resolved from test-mode overlay");
        return Ok(mock);
    }

    // Cache consultation precedes the registry so a cached singleton is
    // returned unchanged even if its descriptor was replaced since.
    if let Some(value) = env.root.singletons().get(id) {
        return Ok(value);
    }
    if let Some(scope) = &env.scope {
        if let Some(value) = scope.cache().get(id) {
            check_scoped_capture(env, id)?;
            return Ok(value);
        }
    }

    let desc = env
        .root
        .registry()
        .lookup(id)
        .ok_or_else(|| DiError::Unregistered { key: id.to_string() })?;

    if desc.lifecycle == Lifecycle::Scoped {
        check_scoped_capture(env, id)?;
        if env.scope.is_none() {
            return Err(DiError::ScopeRequired { key: id.to_string() });
        }
    }
    if desc.async_init {
        return Err(DiError::AsyncRequired { key: id.to_string() });
    }

    let _guard = env.stack.enter(id, desc.lifecycle)?;
    trace!(key = %id, lifecycle = %desc.lifecycle, "resolving");

    match desc.lifecycle {
        Lifecycle::Transient => build_sync(env, &desc),
        Lifecycle::Singleton => {
            let slot = env.root.singletons().slot(id);
            let test_built = env.root.overlay().active();
            slot.get_or_build(|| {
                let value = build_sync(env, &desc)?;
                record_disposer(&desc, &value, env.root.disposers());
                Ok(CachedValue { value, test_built })
            })
        }
        Lifecycle::Scoped => match &env.scope {
            Some(scope) => {
                let slot = scope.cache().slot(id);
                let test_built = env.root.overlay().active();
                slot.get_or_build(|| {
                    let value = build_sync(env, &desc)?;
                    record_disposer(&desc, &value, scope.disposers());
                    Ok(CachedValue { value, test_built })
                })
            }
            None => Err(DiError::ScopeRequired { key: id.to_string() }),
        },
    }
}

fn build_sync(env: &ResolveEnv, desc: &ServiceDescriptor) -> DiResult<AnyArc> {
    let deps = resolve_deps_sync(env, desc)?;
    match &desc.provider {
        Provider::Instance(value) => Ok(value.clone()),
        Provider::Sync(build) => {
            let ctx = ResolverContext::new(env, desc.lifecycle);
            build(&ctx, &deps).map_err(|e| DiError::from_provider(&desc.id, e))
        }
        Provider::Async(_) => Err(DiError::AsyncRequired {
            key: desc.id.to_string(),
        }),
    }
}

fn resolve_deps_sync(env: &ResolveEnv, desc: &ServiceDescriptor) -> DiResult<ResolvedDeps> {
    let mut entries = Vec::with_capacity(desc.dependencies.len());
    for dep in &desc.dependencies {
        let value = if dep.lazy {
            DepValue::Deferred(env.handle(), dep.target)
        } else {
            match resolve_entry(env, &dep.target) {
                Ok(v) => DepValue::Present(v),
                Err(DiError::Unregistered { .. }) if dep.optional => DepValue::Absent,
                Err(e) => return Err(e),
            }
        };
        entries.push((dep.name, value));
    }
    Ok(ResolvedDeps::new(entries))
}

// ===== Asynchronous driver =====

pub(crate) fn resolve_entry_async(
    env: ResolveEnv,
    id: ServiceId,
) -> BoxFuture<DiResult<AnyArc>> {
    Box::pin(async move {
        check_open(&env)?;

        if let Some(mock) = env.root.overlay().get(&id) {
            trace!(key = %id, "resolved from test-mode overlay");
            return Ok(mock);
        }

        if let Some(value) = env.root.singletons().get(&id) {
            return Ok(value);
        }
        if let Some(scope) = &env.scope {
            if let Some(value) = scope.cache().get(&id) {
                check_scoped_capture(&env, &id)?;
                return Ok(value);
            }
        }

        let desc = env
            .root
            .registry()
            .lookup(&id)
            .ok_or_else(|| DiError::Unregistered { key: id.to_string() })?;

        if desc.lifecycle == Lifecycle::Scoped {
            check_scoped_capture(&env, &id)?;
            if env.scope.is_none() {
                return Err(DiError::ScopeRequired { key: id.to_string() });
            }
        }

        let _guard = env.stack.enter(&id, desc.lifecycle)?;
        trace!(key = %id, lifecycle = %desc.lifecycle, "resolving (async)");

        match desc.lifecycle {
            Lifecycle::Transient => build_async(&env, &desc).await,
            Lifecycle::Singleton => {
                let slot = env.root.singletons().slot(&id);
                // Winner builds under the per-key lock; losers await it
                // and pick up the committed value. A cancelled build
                // commits nothing and releases the lock.
                let _build = slot.build_lock.lock().await;
                if let Some(value) = slot.completed() {
                    return Ok(value);
                }
                let value = build_async(&env, &desc).await?;
                record_disposer(&desc, &value, env.root.disposers());
                Ok(slot.commit(CachedValue {
                    value,
                    test_built: env.root.overlay().active(),
                }))
            }
            Lifecycle::Scoped => match env.scope.clone() {
                Some(scope) => {
                    let slot = scope.cache().slot(&id);
                    let _build = slot.build_lock.lock().await;
                    if let Some(value) = slot.completed() {
                        return Ok(value);
                    }
                    let value = build_async(&env, &desc).await?;
                    record_disposer(&desc, &value, scope.disposers());
                    Ok(slot.commit(CachedValue {
                        value,
                        test_built: env.root.overlay().active(),
                    }))
                }
                None => Err(DiError::ScopeRequired { key: id.to_string() }),
            },
        }
    })
}

async fn build_async(env: &ResolveEnv, desc: &Arc<ServiceDescriptor>) -> DiResult<AnyArc> {
    let deps = resolve_deps_async(env, desc).await?;
    match &desc.provider {
        Provider::Instance(value) => Ok(value.clone()),
        Provider::Sync(build) => {
            let ctx = ResolverContext::new(env, desc.lifecycle);
            build(&ctx, &deps).map_err(|e| DiError::from_provider(&desc.id, e))
        }
        Provider::Async(build) => {
            let ctx = AsyncResolverContext::new(env.clone(), desc.lifecycle);
            build(ctx, deps)
                .await
                .map_err(|e| DiError::from_provider(&desc.id, e))
        }
    }
}

async fn resolve_deps_async(
    env: &ResolveEnv,
    desc: &Arc<ServiceDescriptor>,
) -> DiResult<ResolvedDeps> {
    let mut entries = Vec::with_capacity(desc.dependencies.len());
    // Declared order is the construction order, so each async init is
    // awaited before the next dependency starts.
    for dep in &desc.dependencies {
        let value = if dep.lazy {
            DepValue::Deferred(env.handle(), dep.target)
        } else {
            match resolve_entry_async(env.clone(), dep.target).await {
                Ok(v) => DepValue::Present(v),
                Err(DiError::Unregistered { .. }) if dep.optional => DepValue::Absent,
                Err(e) => return Err(e),
            }
        };
        entries.push((dep.name, value));
    }
    Ok(ResolvedDeps::new(entries))
}
