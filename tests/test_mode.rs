use axon_di::{Container, DiError, Lifecycle, Resolver};
use std::sync::{Arc, Mutex};

trait Email: Send + Sync {
    fn send(&self, to: &str);
}

struct Smtp;

impl Email for Smtp {
    fn send(&self, _to: &str) {}
}

#[derive(Default)]
struct RecordingEmail {
    sent: Mutex<Vec<String>>,
}

impl Email for RecordingEmail {
    fn send(&self, to: &str) {
        self.sent.lock().unwrap().push(to.to_string());
    }
}

struct UserSvc {
    email: Arc<dyn Email>,
}

impl UserSvc {
    fn register_user(&self, name: &str) {
        self.email.send(name);
    }
}

fn container_with_user_svc() -> Container {
    let container = Container::new();
    container.add_trait_instance::<dyn Email>(Arc::new(Smtp));
    container
        .register::<UserSvc>(Lifecycle::Transient)
        .depends_on_trait::<dyn Email>("email")
        .construct(|deps| {
            Ok(UserSvc {
                email: deps.required_trait::<dyn Email>("email")?,
            })
        })
        .unwrap();
    container
}

#[test]
fn test_mock_shadows_real_service() {
    // E5: mock the email sender with a recorder and drive the real
    // service through it.
    let container = container_with_user_svc();
    let recorder = Arc::new(RecordingEmail::default());

    container.enable_test_mode();
    container.mock_trait::<dyn Email>(recorder.clone());

    let svc = container.resolve::<UserSvc>().unwrap();
    svc.register_user("x");

    assert_eq!(*recorder.sent.lock().unwrap(), vec!["x".to_string()]);
}

#[test]
fn test_mocks_ignored_while_test_mode_off() {
    let container = container_with_user_svc();
    let recorder = Arc::new(RecordingEmail::default());

    // Inserting a mock without the flag changes nothing.
    container.enable_test_mode();
    container.mock_trait::<dyn Email>(recorder.clone());
    container.disable_test_mode();

    let svc = container.resolve::<UserSvc>().unwrap();
    svc.register_user("x");
    assert!(recorder.sent.lock().unwrap().is_empty());
}

#[test]
fn test_disable_restores_real_instance() {
    // Property 6: under test mode the mock is returned; after
    // disabling, a freshly built real instance is.
    struct Config {
        url: String,
    }

    let container = Container::new();
    container.add_factory(Lifecycle::Singleton, |_| {
        Ok(Config {
            url: "real".to_string(),
        })
    });

    container.enable_test_mode();
    container.mock(Config {
        url: "mock".to_string(),
    });

    assert_eq!(container.resolve::<Config>().unwrap().url, "mock");

    container.disable_test_mode();
    assert_eq!(container.resolve::<Config>().unwrap().url, "real");
}

#[test]
fn test_singletons_built_under_test_mode_are_evicted() {
    // UserDir is real but was constructed while its dependency was
    // mocked; keeping it after test mode would leak the mock.
    struct Origin {
        name: &'static str,
    }

    struct UserDir {
        origin: Arc<Origin>,
    }

    let container = Container::new();
    container.add_instance(Origin { name: "real" });
    container.add_factory(Lifecycle::Singleton, |ctx| {
        Ok(UserDir {
            origin: ctx.resolve::<Origin>()?,
        })
    });

    container.enable_test_mode();
    container.mock(Origin { name: "mock" });

    let tainted = container.resolve::<UserDir>().unwrap();
    assert_eq!(tainted.origin.name, "mock");

    container.disable_test_mode();
    let fresh = container.resolve::<UserDir>().unwrap();
    assert!(!Arc::ptr_eq(&tainted, &fresh));
    assert_eq!(fresh.origin.name, "real");
}

#[test]
fn test_singletons_built_before_test_mode_survive() {
    struct Config;

    let container = Container::new();
    container.add_factory(Lifecycle::Singleton, |_| Ok(Config));

    let original = container.resolve::<Config>().unwrap();

    container.enable_test_mode();
    container.disable_test_mode();

    // Real cache entries from before the transition stay untouched.
    assert!(Arc::ptr_eq(&original, &container.resolve::<Config>().unwrap()));
}

#[test]
fn test_unmock_restores_single_key() {
    let container = Container::new();
    container.add_instance_with("db", 1u32);
    container.add_instance_with("cache", 2u32);

    container.enable_test_mode();
    container.mock_with("db", 10u32);
    container.mock_with("cache", 20u32);

    assert_eq!(*container.resolve_with::<u32>("db").unwrap(), 10);

    container.unmock_with::<u32>("db");
    assert_eq!(*container.resolve_with::<u32>("db").unwrap(), 1);
    assert_eq!(*container.resolve_with::<u32>("cache").unwrap(), 20);

    container.disable_test_mode();
}

#[test]
fn test_mock_without_registration_resolves() {
    // A mock can stand in for a key that was never registered at all.
    struct Stub;

    let container = Container::new();
    container.enable_test_mode();
    container.mock(Stub);

    assert!(container.resolve::<Stub>().is_ok());

    container.disable_test_mode();
    assert!(matches!(
        container.resolve::<Stub>(),
        Err(DiError::Unregistered { .. })
    ));
}

#[test]
fn test_mock_visible_from_scopes() {
    struct Session;

    let container = Container::new();
    container.add_factory(Lifecycle::Scoped, |_| Ok(Session));

    container.enable_test_mode();
    container.mock(Session);

    let scope = container.create_scope();
    let from_scope = scope.resolve::<Session>().unwrap();
    let again = scope.resolve::<Session>().unwrap();
    assert!(Arc::ptr_eq(&from_scope, &again));
}
