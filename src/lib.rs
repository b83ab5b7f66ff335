//! # axon-di
//!
//! Type-safe dependency injection for Rust: a registry mapping service
//! keys (types or traits, optionally qualified by a context key) to
//! providers, with declared lifecycles, automatic graph resolution,
//! scopes, lazy proxies, async initialization, and test-mode mocking.
//!
//! ## Quick start
//!
//! ```rust
//! use axon_di::{Container, Lifecycle, Resolver};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let container = Container::new();
//! container.add_instance(Database {
//!     url: "postgres://localhost".to_string(),
//! });
//! container
//!     .register::<UserService>(Lifecycle::Singleton)
//!     .depends_on::<Database>("db")
//!     .construct(|deps| Ok(UserService { db: deps.required::<Database>("db")? }))
//!     .unwrap();
//!
//! let users = container.resolve::<UserService>().unwrap();
//! assert_eq!(users.db.url, "postgres://localhost");
//!
//! // Singletons resolve to the same instance every time.
//! assert!(Arc::ptr_eq(&users, &container.resolve::<UserService>().unwrap()));
//! ```
//!
//! ## Lifecycles
//!
//! - **Singleton** — one instance per container, cached until `close()`.
//! - **Scoped** — one instance per [`Scope`]; sibling scopes are isolated
//!   and a scope disposes its instances in reverse build order on close.
//! - **Transient** — a fresh instance per resolution, owned by the caller.
//!
//! A singleton may depend on singletons and transients only; capturing a
//! scoped instance from a singleton is rejected at resolve time.
//!
//! ## Trait services and mocking
//!
//! ```rust
//! use axon_di::{Container, Lifecycle, Resolver};
//! use std::sync::Arc;
//!
//! trait Mailer: Send + Sync {
//!     fn send(&self, to: &str) -> bool;
//! }
//!
//! struct Smtp;
//! impl Mailer for Smtp {
//!     fn send(&self, _to: &str) -> bool {
//!         true
//!     }
//! }
//!
//! struct NullMailer;
//! impl Mailer for NullMailer {
//!     fn send(&self, _to: &str) -> bool {
//!         false
//!     }
//! }
//!
//! let container = Container::new();
//! container.add_trait_instance::<dyn Mailer>(Arc::new(Smtp));
//!
//! container.enable_test_mode();
//! container.mock_trait::<dyn Mailer>(Arc::new(NullMailer));
//! assert!(!container.resolve_trait::<dyn Mailer>().unwrap().send("a"));
//!
//! container.disable_test_mode();
//! assert!(container.resolve_trait::<dyn Mailer>().unwrap().send("a"));
//! ```
//!
//! ## Async initialization
//!
//! Registrations made with `construct_async` or `add_factory_async` may
//! suspend while building. They are reachable only through the
//! `resolve_async` family; a synchronous `resolve` that hits one
//! anywhere on the transitive closure fails with
//! [`DiError::AsyncRequired`]. Concurrent async resolutions of one
//! singleton run the provider exactly once; losers await the winner.

#![forbid(unsafe_code)]

mod builder;
mod cache;
mod container;
mod context;
mod descriptor;
mod error;
mod internal;
mod key;
mod lazy;
mod lifecycle;
mod module;
mod registry;
mod resolve;
mod scope;
mod testing;
mod traits;

pub use builder::Registration;
pub use container::Container;
pub use context::{AsyncResolverContext, ResolverContext};
pub use descriptor::{ProviderKind, ResolvedDeps, ServiceInfo};
pub use error::{BoxError, DiError, DiResult};
pub use key::{ServiceId, ServiceKey};
pub use lazy::Lazy;
pub use lifecycle::Lifecycle;
pub use module::ServiceModule;
pub use scope::Scope;
pub use traits::{AsyncDispose, Dispose, Resolver};
