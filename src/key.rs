//! Service identity: keys and context qualifiers.

use std::any::TypeId;
use std::fmt;

/// The abstract identity of a service.
///
/// A key denotes either a concrete type or a trait object. Two keys
/// compare equal iff they denote the same abstract service; the stored
/// type name exists only for diagnostics.
#[derive(Debug, Clone, Copy)]
pub enum ServiceKey {
    /// Concrete type, identified by `TypeId` (the name is carried for
    /// error messages and graph export).
    Type(TypeId, &'static str),
    /// Trait object, identified by its `type_name` (traits have no
    /// `TypeId`).
    Trait(&'static str),
}

impl ServiceKey {
    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceKey::Type(_, name) => name,
            ServiceKey::Trait(name) => name,
        }
    }
}

// Equality and hashing ignore the type name for concrete keys: the
// TypeId alone is the identity.
impl PartialEq for ServiceKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ServiceKey::Type(a, _), ServiceKey::Type(b, _)) => a == b,
            (ServiceKey::Trait(a), ServiceKey::Trait(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ServiceKey {}

impl std::hash::Hash for ServiceKey {
    #[inline]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            ServiceKey::Type(id, _) => {
                0u8.hash(state);
                id.hash(state);
            }
            ServiceKey::Trait(name) => {
                1u8.hash(state);
                name.hash(state);
            }
        }
    }
}

/// Full lookup identity: a [`ServiceKey`] plus an optional context key.
///
/// The context key disambiguates multiple registrations under one
/// service key, e.g. two `Config` registrations under `"db"` and
/// `"cache"`.
///
/// # Examples
///
/// ```rust
/// use axon_di::ServiceId;
///
/// struct Config;
/// let plain = ServiceId::of::<Config>();
/// let db = ServiceId::of::<Config>().with_context("db");
/// assert_ne!(plain, db);
/// assert_eq!(db, ServiceId::of::<Config>().with_context("db"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceId {
    pub key: ServiceKey,
    pub context: Option<&'static str>,
}

impl ServiceId {
    /// Identity of a concrete type.
    pub fn of<T: 'static>() -> Self {
        ServiceId {
            key: ServiceKey::Type(TypeId::of::<T>(), std::any::type_name::<T>()),
            context: None,
        }
    }

    /// Identity of a trait object, e.g. `ServiceId::of_trait::<dyn Logger>()`.
    pub fn of_trait<T: ?Sized + 'static>() -> Self {
        ServiceId {
            key: ServiceKey::Trait(std::any::type_name::<T>()),
            context: None,
        }
    }

    /// Qualifies the identity with a context key.
    pub fn with_context(mut self, context: &'static str) -> Self {
        self.context = Some(context);
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.key.display_name()
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.context {
            Some(ctx) => write!(f, "{}[{}]", self.key.display_name(), ctx),
            None => write!(f, "{}", self.key.display_name()),
        }
    }
}
