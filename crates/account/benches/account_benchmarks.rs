use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use cardbank_account::{Account, CardExpiry, EventKind};

fn bench_account(observers: usize) -> Account {
    let account = Account::open(
        "4000-1234-5678-9010",
        "Bench Holder",
        CardExpiry::new(2030, 1).unwrap(),
        4321,
        1_000_000,
    )
    .unwrap();

    for _ in 0..observers {
        account.subscribe(None, |event| {
            black_box(event.amount);
        });
    }

    account
}

fn bench_operation_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("operation_latency");
    group.sample_size(1000);

    group.bench_function("replenish_no_observers", |b| {
        let account = bench_account(0);
        b.iter(|| {
            account.replenish(black_box(10)).unwrap();
        });
    });

    group.bench_function("replenish_then_spend_no_observers", |b| {
        let account = bench_account(0);
        b.iter(|| {
            account.replenish(black_box(10)).unwrap();
            account.spend(black_box(10)).unwrap();
        });
    });

    group.finish();
}

fn bench_dispatch_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_fanout");
    group.sample_size(500);

    for observers in [1usize, 4, 16, 64] {
        group.throughput(Throughput::Elements(observers as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(observers),
            &observers,
            |b, &observers| {
                let account = bench_account(observers);
                b.iter(|| {
                    account.replenish(black_box(10)).unwrap();
                });
            },
        );
    }

    group.finish();
}

fn bench_subscribe_unsubscribe(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_churn");

    group.bench_function("subscribe_unsubscribe", |b| {
        let account = bench_account(0);
        b.iter(|| {
            let token = account.subscribe(Some(EventKind::MoneySpent), |_| {});
            account.unsubscribe(black_box(token));
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_operation_latency,
    bench_dispatch_fanout,
    bench_subscribe_unsubscribe
);
criterion_main!(benches);
