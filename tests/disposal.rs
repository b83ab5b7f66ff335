use axon_di::{AsyncDispose, Container, Dispose, Lifecycle, Resolver};
use std::sync::{Arc, Mutex};

type Log = Arc<Mutex<Vec<&'static str>>>;

#[tokio::test]
async fn test_scope_disposes_in_reverse_build_order() {
    // Property 8: Repo is built after Conn (it depends on it), so the
    // scope tears Repo down first.
    struct Conn;
    struct Repo {
        _conn: Arc<Conn>,
    }

    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let container = Container::new();
    let log_conn = log.clone();
    container
        .register::<Conn>(Lifecycle::Scoped)
        .on_destroy(move |_| log_conn.lock().unwrap().push("conn"))
        .construct(|_| Ok(Conn))
        .unwrap();
    let log_repo = log.clone();
    container
        .register::<Repo>(Lifecycle::Scoped)
        .depends_on::<Conn>("conn")
        .on_destroy(move |_| log_repo.lock().unwrap().push("repo"))
        .construct(|deps| Ok(Repo { _conn: deps.required::<Conn>("conn")? }))
        .unwrap();

    let scope = container.create_scope();
    let _repo = scope.resolve::<Repo>().unwrap();
    scope.close().await;

    assert_eq!(*log.lock().unwrap(), vec!["repo", "conn"]);
}

#[tokio::test]
async fn test_container_close_disposes_singletons() {
    struct Db;
    struct App {
        _db: Arc<Db>,
    }

    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let container = Container::new();
    let log_db = log.clone();
    container
        .register::<Db>(Lifecycle::Singleton)
        .on_destroy(move |_| log_db.lock().unwrap().push("db"))
        .construct(|_| Ok(Db))
        .unwrap();
    let log_app = log.clone();
    container
        .register::<App>(Lifecycle::Singleton)
        .depends_on::<Db>("db")
        .on_destroy(move |_| log_app.lock().unwrap().push("app"))
        .construct(|deps| Ok(App { _db: deps.required::<Db>("db")? }))
        .unwrap();

    let _app = container.resolve::<App>().unwrap();
    container.close().await;

    assert_eq!(*log.lock().unwrap(), vec!["app", "db"]);

    // Close is idempotent and the container stays closed.
    container.close().await;
    assert!(container.resolve::<Db>().is_err());
}

#[tokio::test]
async fn test_unresolved_services_have_no_disposers() {
    struct Db;

    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let container = Container::new();
    let log_db = log.clone();
    container
        .register::<Db>(Lifecycle::Singleton)
        .on_destroy(move |_| log_db.lock().unwrap().push("db"))
        .construct(|_| Ok(Db))
        .unwrap();

    // Never resolved, never built, nothing to dispose.
    container.close().await;
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_async_and_sync_hooks_interleave_in_build_order() {
    struct A;
    struct B {
        _a: Arc<A>,
    }

    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let container = Container::new();
    let log_a = log.clone();
    container
        .register::<A>(Lifecycle::Singleton)
        .on_destroy(move |_| log_a.lock().unwrap().push("a-sync"))
        .construct(|_| Ok(A))
        .unwrap();
    let log_b = log.clone();
    container
        .register::<B>(Lifecycle::Singleton)
        .depends_on::<A>("a")
        .on_destroy_async(move |_b| {
            let log = log_b.clone();
            async move {
                tokio::task::yield_now().await;
                log.lock().unwrap().push("b-async");
            }
        })
        .construct(|deps| Ok(B { _a: deps.required::<A>("a")? }))
        .unwrap();

    let _b = container.resolve::<B>().unwrap();
    container.close().await;

    // Strict reverse build order even across hook flavors.
    assert_eq!(*log.lock().unwrap(), vec!["b-async", "a-sync"]);
}

#[tokio::test]
async fn test_factory_registered_disposers() {
    struct Conn {
        log: Log,
    }

    impl Dispose for Conn {
        fn dispose(&self) {
            self.log.lock().unwrap().push("conn");
        }
    }

    struct Client {
        log: Log,
    }

    #[async_trait::async_trait]
    impl AsyncDispose for Client {
        async fn dispose(&self) {
            self.log.lock().unwrap().push("client");
        }
    }

    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let container = Container::new();
    let log_conn = log.clone();
    container.add_factory(Lifecycle::Scoped, move |ctx| {
        let conn = Arc::new(Conn {
            log: log_conn.clone(),
        });
        ctx.register_disposer(conn.clone());
        Ok(Conn {
            log: log_conn.clone(),
        })
    });
    let log_client = log.clone();
    container.add_factory(Lifecycle::Scoped, move |ctx| {
        let client = Arc::new(Client {
            log: log_client.clone(),
        });
        ctx.register_async_disposer(client.clone());
        Ok(Client {
            log: log_client.clone(),
        })
    });

    let scope = container.create_scope();
    let _conn = scope.resolve::<Conn>().unwrap();
    let _client = scope.resolve::<Client>().unwrap();
    scope.close().await;

    assert_eq!(*log.lock().unwrap(), vec!["client", "conn"]);
}

#[tokio::test]
async fn test_singleton_disposer_goes_to_root_even_from_scope() {
    struct Global;

    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let container = Container::new();
    let log_global = log.clone();
    container
        .register::<Global>(Lifecycle::Singleton)
        .on_destroy(move |_| log_global.lock().unwrap().push("global"))
        .construct(|_| Ok(Global))
        .unwrap();

    let scope = container.create_scope();
    let _global = scope.resolve::<Global>().unwrap();

    // The singleton outlives the scope that first resolved it.
    scope.close().await;
    assert!(log.lock().unwrap().is_empty());

    container.close().await;
    assert_eq!(*log.lock().unwrap(), vec!["global"]);
}

#[test]
fn test_close_sync_runs_sync_hooks() {
    struct Db;

    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let container = Container::new();
    let log_db = log.clone();
    container
        .register::<Db>(Lifecycle::Singleton)
        .on_destroy(move |_| log_db.lock().unwrap().push("db"))
        .construct(|_| Ok(Db))
        .unwrap();

    let _db = container.resolve::<Db>().unwrap();
    container.close_sync();

    assert_eq!(*log.lock().unwrap(), vec!["db"]);
}
