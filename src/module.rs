//! Modular registration: declarative groupings of services installed
//! as a unit.

use std::sync::Arc;

use tracing::debug;

use crate::container::Container;
use crate::descriptor::downcast_concrete;
use crate::error::{DiError, DiResult};
use crate::key::ServiceId;
use crate::traits::Resolver;

/// A named grouping of related registrations.
///
/// Implementors register their services against the target container;
/// the container remembers which keys each module contributed, so
/// services remain reachable both through the flat (key, context) map
/// — the primary contract — and through the module as a nested path.
///
/// # Examples
///
/// ```rust
/// use axon_di::{Container, DiResult, Lifecycle, Resolver, ServiceModule};
/// use std::sync::Arc;
///
/// struct AuthConfig { issuer: String }
/// struct TokenService { config: Arc<AuthConfig> }
///
/// struct AuthModule;
///
/// impl ServiceModule for AuthModule {
///     fn name(&self) -> &str {
///         "auth"
///     }
///
///     fn register_services(&self, container: &Container) -> DiResult<()> {
///         container.add_instance(AuthConfig { issuer: "axon".into() });
///         container.add_factory(Lifecycle::Singleton, |ctx| {
///             Ok(TokenService { config: ctx.resolve::<AuthConfig>()? })
///         });
///         Ok(())
///     }
/// }
///
/// let container = Container::new();
/// container.install_module(&AuthModule).unwrap();
///
/// // Flat lookup keeps working; the module path is a convenience.
/// let flat = container.resolve::<TokenService>().unwrap();
/// let nested = container.resolve_from_module::<TokenService>("auth").unwrap();
/// assert!(Arc::ptr_eq(&flat, &nested));
/// ```
pub trait ServiceModule {
    /// The grouping's identity, used for nested lookups.
    fn name(&self) -> &str;

    /// Register this module's services with the container.
    fn register_services(&self, container: &Container) -> DiResult<()>;
}

impl Container {
    /// Runs the module's registrations against this container and
    /// records which keys it contributed.
    pub fn install_module(&self, module: &dyn ServiceModule) -> DiResult<()> {
        let before = self.registry().keys();
        module.register_services(self)?;
        let added: std::collections::HashSet<ServiceId> = self
            .registry()
            .keys()
            .difference(&before)
            .copied()
            .collect();
        debug!(module = module.name(), services = added.len(), "module installed");
        self.inner_modules()
            .lock()
            .unwrap()
            .entry(module.name().to_string())
            .or_default()
            .extend(added);
        Ok(())
    }

    /// Keys contributed by a module; empty when the module is unknown.
    pub fn module_services(&self, name: &str) -> Vec<ServiceId> {
        self.inner_modules()
            .lock()
            .unwrap()
            .get(name)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Resolves `T` through a module path: fails with `Unregistered`
    /// unless the module contributed the key.
    pub fn resolve_from_module<T: Send + Sync + 'static>(
        &self,
        module: &str,
    ) -> DiResult<Arc<T>> {
        let id = ServiceId::of::<T>();
        let owned = self
            .inner_modules()
            .lock()
            .unwrap()
            .get(module)
            .is_some_and(|ids| ids.contains(&id));
        if !owned {
            return Err(DiError::Unregistered {
                key: format!("{module}::{id}"),
            });
        }
        self.resolve_any(&id).and_then(downcast_concrete::<T>)
    }
}
