//! Rule resolution performance benchmark.

use cookieguard::cookies::category::classify;
use cookieguard::policy::{resolve, Rule, RulePattern, RuleSet};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn rule_set(size: usize) -> RuleSet {
    let mut rules = RuleSet::with_default(Rule::new(30));
    for n in 0..size {
        let rule = if n % 4 == 0 {
            Rule::new(15).with_pattern(RulePattern::parse(&format!("/^site{}\\./i", n)).unwrap())
        } else {
            Rule::new(60)
        };
        rules.save(&format!("site{}", n), rule).unwrap();
    }
    rules
        .save(
            "bank",
            Rule::new(15)
                .encrypted()
                .with_pattern(RulePattern::parse("/bank/i").unwrap()),
        )
        .unwrap();
    rules
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");

    for size in [10, 100] {
        let rules = rule_set(size);
        group.bench_function(format!("pattern_hit_{}_rules", size), |b| {
            b.iter(|| resolve(black_box("mybank.com"), &rules))
        });
        group.bench_function(format!("default_{}_rules", size), |b| {
            b.iter(|| resolve(black_box("unknown-domain-12345.org"), &rules))
        });
    }

    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let cookies = [
        ("_ga", ".example.com"),
        ("IDE", ".doubleclick.net"),
        ("session_token", "mybank.com"),
        ("zzz", "example.com"),
    ];
    c.bench_function("classify_mixed", |b| {
        b.iter(|| {
            for (name, domain) in &cookies {
                black_box(classify(name, domain));
            }
        })
    });
}

criterion_group!(benches, bench_resolve, bench_classify);
criterion_main!(benches);
