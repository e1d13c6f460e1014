use criterion::{criterion_group, criterion_main, Criterion};

use scorecast::factorial::LnLookup;
use scorecast::poisson;

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("cri_poisson_masses_16", |b| {
        let mut masses = [0.0; 16];
        b.iter(|| poisson::fill_masses(1.4, &mut masses));
    });

    let ln_lookup = LnLookup::default();
    c.bench_function("cri_poisson_ln_univariate_10", |b| {
        b.iter(|| {
            (0..10)
                .map(|k| poisson::ln_univariate(k, 1.4, &ln_lookup))
                .sum::<f64>()
        });
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
