//! List filter performance benchmark.

use cookieguard::policy::ListFilter;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn filter(size: usize) -> ListFilter {
    let blacklist: Vec<String> = (0..size).map(|n| format!("*.ads{}.example.com", n)).collect();
    let whitelist: Vec<String> = (0..size).map(|n| format!("partner{}.org", n)).collect();
    ListFilter::new(&blacklist, &whitelist)
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_evaluate");

    for size in [10, 200] {
        let filter = filter(size);
        group.bench_function(format!("blocked_first_{}", size), |b| {
            b.iter(|| filter.evaluate(black_box("x.ads0.example.com")))
        });
        group.bench_function(format!("undecided_{}", size), |b| {
            b.iter(|| filter.evaluate(black_box("mybank.com")))
        });
    }

    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    c.bench_function("list_compile_200", |b| b.iter(|| filter(black_box(200))));
}

criterion_group!(benches, bench_evaluate, bench_compile);
criterion_main!(benches);
