use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use fluxgate::{state, ActionRegistry, Dispatcher, HandlerResult, Store, StorePrototype, Value};

fn make_stores(dispatcher: &Dispatcher, count: usize) -> Vec<Store> {
    let actions = ActionRegistry::new(dispatcher, ["tick"]).unwrap();
    (0..count)
        .map(|_| {
            let prototype = StorePrototype::builder()
                .action_set(actions.clone())
                .initial_state(|| state([("count", 0)]))
                .handler("tick", |store, args| {
                    let step = args.first().and_then(Value::as_int).unwrap_or(1);
                    let count = store.get("count").and_then(|v| v.as_int()).unwrap_or(0);
                    store.set_state(state([("count", count + step)]));
                    HandlerResult::Sync
                })
                .build()
                .unwrap();
            Store::new(&prototype, &[]).unwrap()
        })
        .collect()
}

fn bench_dispatch_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch/fanout");
    for store_count in [1usize, 8, 64] {
        group.throughput(Throughput::Elements(store_count as u64));
        group.bench_function(format!("{store_count}_stores"), |b| {
            let dispatcher = Dispatcher::new();
            let _stores = make_stores(&dispatcher, store_count);
            let args = [Value::Int(1)];
            b.iter(|| dispatcher.dispatch("tick", &args));
        });
    }
    group.finish();
}

fn bench_set_state_noop(c: &mut Criterion) {
    c.bench_function("store/set_state_unchanged", |b| {
        let dispatcher = Dispatcher::new();
        let stores = make_stores(&dispatcher, 1);
        let store = &stores[0];
        store.set_state(state([("count", 42)]));
        b.iter(|| store.set_state(state([("count", 42)])));
    });
}

fn bench_registration(c: &mut Criterion) {
    c.bench_function("dispatch/register_unregister", |b| {
        let dispatcher = Dispatcher::new();
        let stores = make_stores(&dispatcher, 1);
        let store = &stores[0];
        b.iter(|| {
            dispatcher.unregister("tick", store);
            dispatcher.register("tick", store);
        });
    });
}

criterion_group!(
    benches,
    bench_dispatch_fanout,
    bench_set_state_noop,
    bench_registration
);
criterion_main!(benches);
