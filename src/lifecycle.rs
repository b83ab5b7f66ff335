//! Service lifecycle definitions.

use std::fmt;

/// Lifecycles controlling how often instances are created and where they
/// are cached.
///
/// # Examples
///
/// ```rust
/// use axon_di::{Container, Lifecycle, Resolver};
///
/// struct Config { url: String }
///
/// let container = Container::new();
/// container.add_factory(Lifecycle::Singleton, |_| {
///     Ok(Config { url: "postgres://localhost".to_string() })
/// });
///
/// let a = container.resolve::<Config>().unwrap();
/// let b = container.resolve::<Config>().unwrap();
/// assert!(std::sync::Arc::ptr_eq(&a, &b));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Exactly one instance per owning container, shared by all
    /// resolutions and cached until the container is closed.
    Singleton,
    /// A fresh instance per resolution. The container never retains it;
    /// the caller owns the instance.
    Transient,
    /// Exactly one instance per scope; distinct across sibling scopes
    /// and destroyed when the scope closes.
    Scoped,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Singleton => write!(f, "singleton"),
            Lifecycle::Transient => write!(f, "transient"),
            Lifecycle::Scoped => write!(f, "scoped"),
        }
    }
}
