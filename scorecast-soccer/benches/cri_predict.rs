use criterion::{criterion_group, criterion_main, Criterion};

use scorecast_soccer::domain::{OverUnder, Side};
use scorecast_soccer::fixtures::{FixtureDataset, Weights};
use scorecast_soccer::model::poisson_mle::PoissonGoalModel;
use scorecast_soccer::model::{GoalModel, MaximumLikelihoodConfig, DEFAULT_MAX_GOALS};
use scorecast_soccer::scoregrid::ScorelineGrid;

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("cri_scoregrid_from_expectations_15", |b| {
        b.iter(|| ScorelineGrid::from_expectations(1.6, 1.1, DEFAULT_MAX_GOALS));
    });

    let scoregrid = ScorelineGrid::from_expectations(1.6, 1.1, DEFAULT_MAX_GOALS);
    c.bench_function("cri_scoregrid_markets_15", |b| {
        b.iter(|| {
            scoregrid.home_win()
                + scoregrid.total_goals(OverUnder::Over, 2.5)
                + scoregrid.both_teams_to_score()
                + scoregrid.asian_handicap(Side::Home, -0.75).unwrap_or_default()
        });
    });

    let dataset = FixtureDataset::try_new(
        &[2, 1, 0, 3, 1, 2],
        &[1, 1, 2, 1, 0, 2],
        &["A", "B", "C", "A", "B", "C"],
        &["B", "C", "A", "C", "A", "B"],
        Weights::default(),
    )
    .unwrap();
    let mut model = PoissonGoalModel::new(dataset, MaximumLikelihoodConfig::default());
    model.fit().unwrap();
    c.bench_function("cri_poisson_predict_15", |b| {
        b.iter(|| model.predict("A", "B", DEFAULT_MAX_GOALS).unwrap());
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
