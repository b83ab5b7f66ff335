//! Error types for the dependency injection container.

use crate::lifecycle::Lifecycle;

/// Boxed error type accepted from factories, constructors, and
/// initialization hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Dependency injection errors.
///
/// Every failure mode of registration and resolution surfaces as one of
/// these variants; the container never panics on bad graphs.
///
/// # Examples
///
/// ```rust
/// use axon_di::{Container, DiError, Resolver};
///
/// let container = Container::new();
/// match container.resolve::<String>() {
///     Err(DiError::Unregistered { key }) => {
///         assert!(key.contains("String"));
///     }
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DiError {
    /// No descriptor for the requested (key, context) and no mock.
    #[error("no registration found for {key}")]
    Unregistered { key: String },

    /// The resolution path revisited a key already in flight. The path
    /// lists every key on the cycle in declaration order.
    #[error("circular dependency detected: {}", .path.join(" -> "))]
    CyclicDependency { path: Vec<String> },

    /// A dependency's lifecycle is incompatible with its dependent's
    /// (a singleton capturing a scoped instance).
    #[error(
        "lifecycle mismatch: {dependent} ({dependent_lifecycle}) cannot depend on {dependency} ({dependency_lifecycle})"
    )]
    LifecycleMismatch {
        dependent: String,
        dependent_lifecycle: Lifecycle,
        dependency: String,
        dependency_lifecycle: Lifecycle,
    },

    /// A synchronous resolve reached a descriptor that requires async
    /// initialization somewhere on its transitive closure.
    #[error("{key} requires async initialization; use resolve_async")]
    AsyncRequired { key: String },

    /// A scoped service was resolved with no scope active.
    #[error("{key} is scoped and cannot be resolved outside a scope")]
    ScopeRequired { key: String },

    /// Operation attempted on a closed scope or container.
    #[error("{0} is closed")]
    ScopeClosed(&'static str),

    /// A provider failed while building; carries the underlying cause
    /// and names the offending key.
    #[error("failed to construct {key}")]
    ConstructionFailed {
        key: String,
        #[source]
        source: BoxError,
    },

    /// Malformed descriptor rejected at registration.
    #[error("invalid descriptor for {key}: {reason}")]
    InvalidDescriptor { key: String, reason: String },

    /// A stored instance failed to downcast to the requested type.
    #[error("type mismatch resolving {0}")]
    TypeMismatch(&'static str),
}

impl DiError {
    /// Wraps a provider failure, leaving structured DI errors (cycles,
    /// missing registrations, lifecycle violations) to propagate
    /// unchanged so parents see the original cause.
    pub(crate) fn from_provider(key: &crate::key::ServiceId, err: BoxError) -> DiError {
        match err.downcast::<DiError>() {
            Ok(di) => *di,
            Err(other) => DiError::ConstructionFailed {
                key: key.to_string(),
                source: other,
            },
        }
    }
}

/// Result type for DI operations.
pub type DiResult<T> = Result<T, DiError>;
