//! Bayesian hierarchical Poisson goal model. Team attack and defence strengths are drawn from
//! zero-mean normal populations whose precisions are themselves learned, which shrinks the
//! strengths of sparsely observed teams towards the league average.

use std::num::NonZeroUsize;
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use scorecast::factorial::LnLookup;
use scorecast::mcmc;
use scorecast::mcmc::spec::{ModelSpec, Precision, VarBlock};
use scorecast::mcmc::{SamplerConfig, SamplingFailure};
use scorecast::probs::SliceExt;
use scorecast::timed::Timed;

use crate::fixtures::FixtureDataset;
use crate::model::{ln_likelihood, predict_independent, GoalModel, ModelError, Params, Strengths};
use crate::scoregrid::ScorelineGrid;

const PRECISION_SHAPE: f64 = 0.1;
const PRECISION_RATE: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct HierarchicalConfig {
    /// Retained posterior draws per chain.
    pub draws: usize,
    /// Warm-up iterations per chain.
    pub tune: usize,
    /// Parallel chains: `None` uses every available processor, `Some(0)` runs a single chain
    /// serially.
    pub jobs: Option<usize>,
    pub seed: Option<u64>,
    pub timeout: Option<Duration>,
    pub max_rhat: Option<f64>,
}
impl HierarchicalConfig {
    pub fn chains(&self) -> usize {
        match self.jobs {
            None => thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            Some(0) => 1,
            Some(jobs) => jobs,
        }
    }

    fn sampler_config(&self) -> SamplerConfig {
        let chains = self.chains();
        SamplerConfig {
            draws: self.draws,
            tune: self.tune,
            chains,
            threads: chains,
            seed: self.seed,
            timeout: self.timeout,
            max_rhat: self.max_rhat,
            ..SamplerConfig::default()
        }
    }
}

impl Default for HierarchicalConfig {
    fn default() -> Self {
        Self {
            draws: 2500,
            tune: 1500,
            jobs: None,
            seed: None,
            timeout: None,
            max_rhat: None,
        }
    }
}

#[derive(Debug)]
pub struct BayesianHierarchicalGoalModel {
    dataset: FixtureDataset,
    config: HierarchicalConfig,
    params: Option<Params>,
}
impl BayesianHierarchicalGoalModel {
    pub fn new(dataset: FixtureDataset, config: HierarchicalConfig) -> Self {
        Self {
            dataset,
            config,
            params: None,
        }
    }

    pub fn dataset(&self) -> &FixtureDataset {
        &self.dataset
    }

    pub fn config(&self) -> &HierarchicalConfig {
        &self.config
    }
}

impl GoalModel for BayesianHierarchicalGoalModel {
    fn fit(&mut self) -> Result<(), ModelError> {
        if self.params.is_some() {
            return Err(ModelError::AlreadyFitted);
        }
        let sampler_config = self.config.sampler_config();
        info!(
            "fitting hierarchical model: {} fixtures, {} teams, {} chains",
            self.dataset.len(),
            self.dataset.n_teams(),
            sampler_config.chains
        );
        let timed = Timed::result(|| posterior_means(&self.dataset, &sampler_config))?;
        info!("fitted hierarchical model in {:?}", timed.elapsed);
        self.params = Some(timed.value);
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        self.params.is_some()
    }

    fn params(&self) -> Result<Params, ModelError> {
        self.params.clone().ok_or(ModelError::NotFitted)
    }

    fn predict(
        &self,
        home: &str,
        away: &str,
        max_goals: usize,
    ) -> Result<ScorelineGrid, ModelError> {
        predict_independent(self.params.as_ref(), &self.dataset, home, away, max_goals)
    }
}

fn posterior_means(
    dataset: &FixtureDataset,
    sampler_config: &SamplerConfig,
) -> Result<Params, ModelError> {
    let teams = dataset.n_teams();
    let mut builder = ModelSpec::builder();
    let home_advantage = builder.flat("home_advantage");
    let intercept = builder.flat("intercept");
    let tau_attack = builder.gamma("tau_attack", PRECISION_SHAPE, PRECISION_RATE);
    let tau_defence = builder.gamma("tau_defence", PRECISION_SHAPE, PRECISION_RATE);
    let attack = builder.normal_vector("attack_raw", teams, 0.0, Precision::Of(tau_attack));
    let defence = builder.normal_vector("defence_raw", teams, 0.0, Precision::Of(tau_defence));

    let fixtures = dataset.fixtures();
    let ln_factorial = LnLookup::default();
    builder.potential(move |values| {
        let strengths = Strengths::centred(
            intercept.get(values),
            home_advantage.get(values),
            attack.slice(values),
            defence.slice(values),
        );
        ln_likelihood(fixtures, &strengths, &ln_factorial, |_, _, _| 0.0)
    });
    let spec = builder.build().map_err(SamplingFailure::InvalidConfig)?;

    let trace = mcmc::sample(&spec, sampler_config)?;
    debug!(
        "pooled {} draws; mean acceptance {:.3}",
        trace.total_draws(),
        (0..trace.dim())
            .map(|index| trace.acceptance(index))
            .sum::<f64>()
            / trace.dim() as f64
    );

    let centred = |block: VarBlock| {
        trace.mean_of(teams, |draw, out| {
            out.copy_from_slice(block.slice(draw));
            out.centre();
        })
    };
    let (attack_means, defence_means) = (centred(attack), centred(defence));
    let strengths = Strengths::centred(
        trace.mean(intercept),
        trace.mean(home_advantage),
        &attack_means,
        &defence_means,
    );
    let mut params = Params::default();
    strengths.export(dataset.teams(), &mut params);
    Ok(params)
}
