use axon_di::{Container, DiError, DiResult, Lifecycle, Resolver, ServiceModule};
use std::sync::Arc;

struct AuthConfig {
    issuer: String,
}

struct TokenService {
    config: Arc<AuthConfig>,
}

struct AuthModule;

impl ServiceModule for AuthModule {
    fn name(&self) -> &str {
        "auth"
    }

    fn register_services(&self, container: &Container) -> DiResult<()> {
        container.add_instance(AuthConfig {
            issuer: "axon".to_string(),
        });
        container
            .register::<TokenService>(Lifecycle::Singleton)
            .depends_on::<AuthConfig>("config")
            .construct(|deps| {
                Ok(TokenService {
                    config: deps.required::<AuthConfig>("config")?,
                })
            })
    }
}

struct BillingModule;

impl ServiceModule for BillingModule {
    fn name(&self) -> &str {
        "billing"
    }

    fn register_services(&self, container: &Container) -> DiResult<()> {
        container.add_instance_with("billing", 42u64);
        Ok(())
    }
}

#[test]
fn test_module_installs_into_flat_registry() {
    let container = Container::new();
    container.install_module(&AuthModule).unwrap();

    // The primary contract is the flat (key, context) map.
    let svc = container.resolve::<TokenService>().unwrap();
    assert_eq!(svc.config.issuer, "axon");
}

#[test]
fn test_module_path_lookup() {
    let container = Container::new();
    container.install_module(&AuthModule).unwrap();

    let flat = container.resolve::<TokenService>().unwrap();
    let nested = container.resolve_from_module::<TokenService>("auth").unwrap();
    assert!(Arc::ptr_eq(&flat, &nested));

    // The nested path only sees keys the module contributed.
    assert!(matches!(
        container.resolve_from_module::<String>("auth"),
        Err(DiError::Unregistered { .. })
    ));
    assert!(matches!(
        container.resolve_from_module::<TokenService>("billing"),
        Err(DiError::Unregistered { .. })
    ));
}

#[test]
fn test_module_services_snapshot() {
    let container = Container::new();
    container.install_module(&AuthModule).unwrap();
    container.install_module(&BillingModule).unwrap();

    let auth_keys = container.module_services("auth");
    assert_eq!(auth_keys.len(), 2);
    assert!(auth_keys.iter().any(|id| id.type_name().contains("AuthConfig")));
    assert!(auth_keys.iter().any(|id| id.type_name().contains("TokenService")));

    let billing_keys = container.module_services("billing");
    assert_eq!(billing_keys.len(), 1);
    assert_eq!(billing_keys[0].context, Some("billing"));

    assert!(container.module_services("unknown").is_empty());
}

#[test]
fn test_module_services_resolve_across_modules() {
    // Module groupings are bookkeeping only; dependencies still flow
    // through the flat registry, so a service from one module can use
    // one from another.
    struct Gateway {
        _token: Arc<TokenService>,
        fee: Arc<u64>,
    }

    struct GatewayModule;

    impl ServiceModule for GatewayModule {
        fn name(&self) -> &str {
            "gateway"
        }

        fn register_services(&self, container: &Container) -> DiResult<()> {
            container.add_factory(Lifecycle::Singleton, |ctx| {
                Ok(Gateway {
                    _token: ctx.resolve::<TokenService>()?,
                    fee: ctx.resolve_with::<u64>("billing")?,
                })
            });
            Ok(())
        }
    }

    let container = Container::new();
    container.install_module(&AuthModule).unwrap();
    container.install_module(&BillingModule).unwrap();
    container.install_module(&GatewayModule).unwrap();

    let gateway = container.resolve_from_module::<Gateway>("gateway").unwrap();
    assert_eq!(*gateway.fee, 42);
}
