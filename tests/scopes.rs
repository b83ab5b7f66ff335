use axon_di::{Container, DiError, Lifecycle, Resolver};
use std::sync::{Arc, Mutex};

#[test]
fn test_scope_isolation() {
    // E3: scoped context and repository; each scope sees its own pair.
    struct Ctx {
        user: String,
    }

    struct Repo {
        ctx: Arc<Ctx>,
    }

    let users = Arc::new(Mutex::new(vec!["a".to_string(), "b".to_string()]));
    let users_clone = users.clone();

    let container = Container::new();
    container.add_factory(Lifecycle::Scoped, move |_| {
        Ok(Ctx {
            user: users_clone.lock().unwrap().remove(0),
        })
    });
    container
        .register::<Repo>(Lifecycle::Scoped)
        .depends_on::<Ctx>("ctx")
        .construct(|deps| Ok(Repo { ctx: deps.required::<Ctx>("ctx")? }))
        .unwrap();

    let s1 = container.create_scope();
    let s2 = container.create_scope();

    let repo1 = s1.resolve::<Repo>().unwrap();
    let repo2 = s2.resolve::<Repo>().unwrap();

    assert_eq!(repo1.ctx.user, "a");
    assert_eq!(repo2.ctx.user, "b");
    assert!(!Arc::ptr_eq(&repo1, &repo2));

    // Within one scope, repeated resolves are identical.
    assert!(Arc::ptr_eq(&repo1, &s1.resolve::<Repo>().unwrap()));
    assert!(Arc::ptr_eq(&repo1.ctx, &s1.resolve::<Ctx>().unwrap()));
}

#[test]
fn test_singleton_shared_across_scopes() {
    struct Db;

    let container = Container::new();
    container.add_instance(Db);

    let s1 = container.create_scope();
    let s2 = container.create_scope();

    let a = s1.resolve::<Db>().unwrap();
    let b = s2.resolve::<Db>().unwrap();
    let c = container.resolve::<Db>().unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&a, &c));
}

#[test]
fn test_scoped_from_root_fails() {
    struct PerRequest;

    let container = Container::new();
    container.add_factory(Lifecycle::Scoped, |_| Ok(PerRequest));

    match container.resolve::<PerRequest>() {
        Err(DiError::ScopeRequired { key }) => assert!(key.contains("PerRequest")),
        _ => panic!("expected ScopeRequired"),
    }
}

#[test]
fn test_transient_pulls_scoped_dependency() {
    struct Session {
        id: u32,
    }

    struct Handler {
        session: Arc<Session>,
    }

    let counter = Arc::new(Mutex::new(0u32));
    let counter_clone = counter.clone();

    let container = Container::new();
    container.add_factory(Lifecycle::Scoped, move |_| {
        let mut c = counter_clone.lock().unwrap();
        *c += 1;
        Ok(Session { id: *c })
    });
    container.add_factory(Lifecycle::Transient, |ctx| {
        Ok(Handler {
            session: ctx.resolve::<Session>()?,
        })
    });

    let scope = container.create_scope();
    let h1 = scope.resolve::<Handler>().unwrap();
    let h2 = scope.resolve::<Handler>().unwrap();

    assert!(!Arc::ptr_eq(&h1, &h2));
    assert!(Arc::ptr_eq(&h1.session, &h2.session));
    assert_eq!(h1.session.id, 1);
}

#[test]
fn test_child_scopes_do_not_inherit_scoped_instances() {
    struct Ctx;

    let container = Container::new();
    container.add_factory(Lifecycle::Scoped, |_| Ok(Ctx));

    let parent = container.create_scope();
    let child = parent.create_scope();

    let from_parent = parent.resolve::<Ctx>().unwrap();
    let from_child = child.resolve::<Ctx>().unwrap();

    // Scoped lookup never falls through to the parent scope.
    assert!(!Arc::ptr_eq(&from_parent, &from_child));
}

#[tokio::test]
async fn test_closed_scope_rejects_resolution() {
    struct Ctx;

    let container = Container::new();
    container.add_factory(Lifecycle::Scoped, |_| Ok(Ctx));

    let scope = container.create_scope();
    let _ = scope.resolve::<Ctx>().unwrap();

    scope.close().await;
    assert!(scope.is_closed());
    assert!(matches!(
        scope.resolve::<Ctx>(),
        Err(DiError::ScopeClosed(_))
    ));

    // Closing again is a no-op.
    scope.close().await;
}

#[tokio::test]
async fn test_closing_scope_does_not_touch_siblings_or_root() {
    struct Db;
    struct Ctx;

    let container = Container::new();
    container.add_instance(Db);
    container.add_factory(Lifecycle::Scoped, |_| Ok(Ctx));

    let s1 = container.create_scope();
    let s2 = container.create_scope();
    let _ = s1.resolve::<Ctx>().unwrap();
    let before = s2.resolve::<Ctx>().unwrap();

    s1.close().await;

    assert!(Arc::ptr_eq(&before, &s2.resolve::<Ctx>().unwrap()));
    assert!(container.resolve::<Db>().is_ok());
}
