use super::*;
use crate::mcmc::spec::Precision;
use crate::probs::SliceExt;
use assert_float_eq::*;

fn seeded(seed: u64) -> SamplerConfig {
    SamplerConfig {
        draws: 4_000,
        tune: 1_000,
        seed: Some(seed),
        ..SamplerConfig::default()
    }
}

#[test]
fn normal_likelihood_with_flat_prior() {
    // y ~ N(mu, 1) with y = [1.2, 0.8, 1.0, 1.4]; the posterior of mu is N(1.1, 1/4)
    let observations = [1.2, 0.8, 1.0, 1.4];
    let mut builder = ModelSpec::builder();
    let mu = builder.flat("mu");
    builder.potential(move |values| {
        let mu = mu.get(values);
        observations.iter().map(|y| -0.5 * (y - mu).powi(2)).sum()
    });
    let spec = builder.build().unwrap();

    let trace = sample(&spec, &seeded(1)).unwrap();
    assert_eq!(4_000, trace.total_draws());
    assert_float_absolute_eq!(1.1, trace.mean(mu), 0.05);

    let draws = trace.draws().map(|draw| mu.get(draw)).collect::<Vec<_>>();
    assert_float_absolute_eq!(0.25, draws.variance(), 0.05);

    let acceptance = trace.acceptance(mu.index());
    assert!(acceptance > 0.25 && acceptance < 0.65, "acceptance {acceptance}");
}

#[test]
fn normal_prior_without_data() {
    let mut builder = ModelSpec::builder();
    let x = builder.normal("x", -3.0, Precision::Fixed(4.0));
    let spec = builder.build().unwrap();

    let trace = sample(&spec, &seeded(2)).unwrap();
    assert_float_absolute_eq!(-3.0, trace.mean(x), 0.05);
    let draws = trace.draws().map(|draw| x.get(draw)).collect::<Vec<_>>();
    assert_float_absolute_eq!(0.25, draws.variance(), 0.05);
}

#[test]
fn gamma_prior_stays_positive() {
    let mut builder = ModelSpec::builder();
    let tau = builder.gamma("tau", 3.0, 2.0);
    let spec = builder.build().unwrap();

    let trace = sample(
        &spec,
        &SamplerConfig {
            draws: 10_000,
            ..seeded(3)
        },
    )
    .unwrap();
    assert!(trace.draws().all(|draw| tau.get(draw) > 0.0));
    assert_float_absolute_eq!(1.5, trace.mean(tau), 0.1);
}

#[test]
fn hierarchical_block_is_shrunk_by_shared_precision() {
    // three groups with one observation each, pooled through a common precision
    let observations = [0.5, -0.2, -0.3];
    let mut builder = ModelSpec::builder();
    let tau = builder.gamma("tau", 2.0, 1.0);
    let effects = builder.normal_vector("effect", 3, 0.0, Precision::Of(tau));
    builder.potential(move |values| {
        effects
            .slice(values)
            .iter()
            .zip(observations)
            .map(|(effect, y)| -2.0 * (y - effect).powi(2))
            .sum()
    });
    let spec = builder.build().unwrap();
    assert_eq!(vec!["tau", "effect[0]", "effect[1]", "effect[2]"], spec.names());

    let trace = sample(&spec, &seeded(4)).unwrap();
    let means = trace.mean_block(effects);
    assert_eq!(3, means.len());
    for (mean, observation) in means.iter().zip(observations) {
        assert!(mean.abs() < observation.abs() + 0.05, "{mean} vs {observation}");
        assert_eq!(mean.signum(), observation.signum());
    }

    let centred = trace.mean_of(3, |draw, out| {
        out.copy_from_slice(effects.slice(draw));
        out.centre();
    });
    assert_float_absolute_eq!(0.0, centred.sum(), 1e-9);
}

#[test]
fn seeded_runs_are_reproducible() {
    let mut builder = ModelSpec::builder();
    let x = builder.normal("x", 0.0, Precision::Fixed(1.0));
    let spec = builder.build().unwrap();
    let config = SamplerConfig {
        draws: 200,
        tune: 100,
        chains: 2,
        threads: 2,
        seed: Some(99),
        ..SamplerConfig::default()
    };

    let first = sample(&spec, &config).unwrap();
    let second = sample(&spec, &config).unwrap();
    assert_eq!(first, second);
    assert_ne!(first.chains()[0], first.chains()[1]);
    assert_eq!(first.mean(x), second.mean(x));
}

#[test]
fn chains_are_pooled() {
    let mut builder = ModelSpec::builder();
    builder.normal("x", 1.0, Precision::Fixed(1.0));
    let spec = builder.build().unwrap();
    let config = SamplerConfig {
        draws: 300,
        tune: 100,
        chains: 4,
        threads: 2,
        seed: Some(5),
        ..SamplerConfig::default()
    };

    let trace = sample(&spec, &config).unwrap();
    assert_eq!(4, trace.chains().len());
    assert_eq!(1_200, trace.total_draws());
    assert_eq!(1_200, trace.draws().count());
    let rhat = trace.rhat(0).unwrap();
    assert!(rhat < 1.1, "rhat {rhat}");
}

#[test]
fn zero_timeout_fails() {
    let mut builder = ModelSpec::builder();
    builder.flat("x");
    builder.potential(|values| -values[0].powi(2));
    let spec = builder.build().unwrap();

    let err = sample(
        &spec,
        &SamplerConfig {
            timeout: Some(Duration::ZERO),
            ..seeded(6)
        },
    )
    .unwrap_err();
    assert!(matches!(err, SamplingFailure::Timeout { chain: 0, .. }), "{err:?}");
}

#[test]
fn unrepresentable_timeout_is_unbounded() {
    let mut builder = ModelSpec::builder();
    let x = builder.flat("x");
    builder.potential(move |values| -0.5 * x.get(values).powi(2));
    let spec = builder.build().unwrap();

    let trace = sample(
        &spec,
        &SamplerConfig {
            draws: 200,
            tune: 100,
            timeout: Some(Duration::MAX),
            ..seeded(6)
        },
    )
    .unwrap();
    assert_eq!(200, trace.total_draws());
}

#[test]
fn non_finite_density_fails_initialisation() {
    let mut builder = ModelSpec::builder();
    builder.flat("x");
    builder.potential(|_| f64::NAN);
    let spec = builder.build().unwrap();

    let err = sample(&spec, &seeded(7)).unwrap_err();
    assert!(matches!(err, SamplingFailure::NonFiniteDensity { chain: 0 }), "{err:?}");
}

#[test]
fn invalid_config_rejected() {
    let mut builder = ModelSpec::builder();
    builder.flat("x");
    let spec = builder.build().unwrap();

    let err = sample(
        &spec,
        &SamplerConfig {
            draws: 0,
            ..SamplerConfig::default()
        },
    )
    .unwrap_err();
    assert_eq!(
        "invalid sampler configuration: at least one draw must be specified",
        err.to_string()
    );

    let err = SamplerConfig {
        target_acceptance: 1.0,
        ..SamplerConfig::default()
    }
    .validate()
    .unwrap_err();
    assert_eq!("target acceptance must lie strictly between 0 and 1", err.to_string());
}

#[test]
fn builder_validation() {
    let err = ModelSpec::builder().build().unwrap_err();
    assert_eq!("at least one latent variable must be declared", err.to_string());

    let mut builder = ModelSpec::builder();
    builder.flat("x");
    builder.flat("x");
    let err = builder.build().unwrap_err();
    assert_eq!("duplicate latent variable 'x'", err.to_string());

    let mut builder = ModelSpec::builder();
    let x = builder.flat("x");
    builder.normal("y", 0.0, Precision::Of(x));
    let err = builder.build().unwrap_err();
    assert_eq!("precision of 'y' must refer to a positive latent variable", err.to_string());

    let mut builder = ModelSpec::builder();
    builder.normal("y", 0.0, Precision::Fixed(0.0));
    let err = builder.build().unwrap_err();
    assert_eq!("precision of 'y' must be positive", err.to_string());

    let mut builder = ModelSpec::builder();
    builder.gamma("tau", 0.1, -1.0);
    let err = builder.build().unwrap_err();
    assert_eq!("shape and rate of 'tau' must be positive", err.to_string());
}

#[test]
fn divergent_chains_fail_convergence_check() {
    let chains = vec![
        ChainTrace {
            draws: vec![0.0, 0.1, -0.1, 0.05],
            acceptance: vec![0.4],
            steps: vec![0.1],
        },
        ChainTrace {
            draws: vec![5.0, 5.1, 4.9, 5.05],
            acceptance: vec![0.4],
            steps: vec![0.1],
        },
    ];
    let trace = Trace::new(vec!["x".into()], chains);
    let rhat = trace.rhat(0).unwrap();
    assert!(rhat > 10.0, "rhat {rhat}");

    assert!(check_convergence(&trace, None).is_ok());
    let err = check_convergence(&trace, Some(1.05)).unwrap_err();
    assert!(
        matches!(&err, SamplingFailure::NotConverged { latent, limit, .. } if latent == "x" && *limit == 1.05),
        "{err:?}"
    );
}

#[test]
fn single_chain_has_no_rhat() {
    let trace = Trace::new(
        vec!["x".into()],
        vec![ChainTrace {
            draws: vec![0.0, 1.0, 2.0],
            acceptance: vec![0.5],
            steps: vec![0.1],
        }],
    );
    assert_eq!(None, trace.rhat(0));
    assert_eq!(3, trace.total_draws());
    assert_eq!(vec![1.0], trace.mean_of(1, |draw, out| out[0] = draw[0]));
}
