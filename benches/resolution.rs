use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use axon_di::{Container, Lifecycle, Resolver};

fn bench_singleton_hit(c: &mut Criterion) {
    let container = Container::new();
    container.add_instance(42u64);

    // Prime the cache.
    let _ = container.resolve::<u64>().unwrap();

    c.bench_function("singleton_hit", |b| {
        b.iter(|| {
            let v = container.resolve::<u64>().unwrap();
            black_box(v);
        })
    });
}

fn bench_transient_build(c: &mut Criterion) {
    struct Message {
        body: String,
    }

    let container = Container::new();
    container.add_factory(Lifecycle::Transient, |_| {
        Ok(Message {
            body: "payload".to_string(),
        })
    });

    c.bench_function("transient_build", |b| {
        b.iter(|| {
            let v = container.resolve::<Message>().unwrap();
            black_box(v.body.len());
        })
    });
}

fn bench_scoped_hit(c: &mut Criterion) {
    struct Session;

    let container = Container::new();
    container.add_factory(Lifecycle::Scoped, |_| Ok(Session));
    let scope = container.create_scope();
    let _ = scope.resolve::<Session>().unwrap();

    c.bench_function("scoped_hit", |b| {
        b.iter(|| {
            let v = scope.resolve::<Session>().unwrap();
            black_box(v);
        })
    });
}

fn bench_deep_graph_transient(c: &mut Criterion) {
    struct Leaf;
    struct Mid {
        _leaf: Arc<Leaf>,
    }
    struct Root {
        _mid: Arc<Mid>,
    }

    let container = Container::new();
    container.add_factory(Lifecycle::Transient, |_| Ok(Leaf));
    container.add_factory(Lifecycle::Transient, |ctx| {
        Ok(Mid {
            _leaf: ctx.resolve::<Leaf>()?,
        })
    });
    container.add_factory(Lifecycle::Transient, |ctx| {
        Ok(Root {
            _mid: ctx.resolve::<Mid>()?,
        })
    });

    c.bench_function("deep_graph_transient", |b| {
        b.iter(|| {
            let v = container.resolve::<Root>().unwrap();
            black_box(v);
        })
    });
}

criterion_group!(
    benches,
    bench_singleton_hit,
    bench_transient_build,
    bench_scoped_hit,
    bench_deep_graph_transient
);
criterion_main!(benches);
