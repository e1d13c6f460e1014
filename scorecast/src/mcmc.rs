//! Adaptive Metropolis-within-Gibbs sampling over an explicit [`ModelSpec`].
//!
//! Every iteration updates each latent in turn with a Gaussian random-walk proposal (on the log
//! scale for positive latents). During warm-up the per-latent step sizes are tuned in windows
//! towards a target acceptance rate, after which they are frozen and draws are retained.
//! Independent chains run on a bounded worker pool and are pooled in chain order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::bail;
use rayon::prelude::*;
use rayon::{ThreadPoolBuildError, ThreadPoolBuilder};
use thiserror::Error;
use tinyrand::{Rand, Seeded, StdRand};
use tracing::{debug, warn};

use crate::mcmc::spec::ModelSpec;
use crate::mcmc::trace::{ChainTrace, Trace};
use crate::random;

pub mod spec;
pub mod trace;

const INIT_JITTER: f64 = 0.5;
const MAX_INIT_ATTEMPTS: usize = 20;
const MAX_ADAPTATION: f64 = 0.25;
const RHAT_WARNING: f64 = 1.1;

#[derive(Debug, Error)]
pub enum SamplingFailure {
    #[error("invalid sampler configuration: {0}")]
    InvalidConfig(#[from] anyhow::Error),

    #[error("log density is not finite at the initial point of chain {chain}")]
    NonFiniteDensity { chain: usize },

    #[error("chain {chain} exceeded the time budget of {timeout:?}")]
    Timeout { chain: usize, timeout: Duration },

    #[error("sampling did not converge: R-hat of '{latent}' is {rhat:.3}, above the limit of {limit}")]
    NotConverged {
        latent: String,
        rhat: f64,
        limit: f64,
    },

    #[error("failed to start the sampling pool: {0}")]
    Pool(#[from] ThreadPoolBuildError),

    #[error("chain {chain} aborted after another chain failed")]
    Aborted { chain: usize },
}

#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Retained draws per chain.
    pub draws: usize,
    /// Discarded warm-up iterations per chain, during which step sizes are adapted.
    pub tune: usize,
    pub chains: usize,
    /// Worker threads; chains beyond this number queue for a free worker.
    pub threads: usize,
    pub seed: Option<u64>,
    /// Wall-clock budget for the whole run.
    pub timeout: Option<Duration>,
    /// Fails the run if any latent's R-hat exceeds this value (only checked with two or more
    /// chains).
    pub max_rhat: Option<f64>,
    pub init_step: f64,
    pub target_acceptance: f64,
    pub adaptation_window: usize,
}
impl SamplerConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.draws == 0 {
            bail!("at least one draw must be specified")
        }
        if self.chains == 0 {
            bail!("at least one chain must be specified")
        }
        if self.threads == 0 {
            bail!("at least one thread must be specified")
        }
        if !(self.init_step.is_finite() && self.init_step > 0.0) {
            bail!("initial step must be positive")
        }
        if !(self.target_acceptance > 0.0 && self.target_acceptance < 1.0) {
            bail!("target acceptance must lie strictly between 0 and 1")
        }
        if self.adaptation_window == 0 {
            bail!("adaptation window cannot be empty")
        }
        if let Some(max_rhat) = self.max_rhat {
            if !(max_rhat >= 1.0) {
                bail!("R-hat limit cannot be less than 1")
            }
        }
        Ok(())
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            draws: 2500,
            tune: 1500,
            chains: 1,
            threads: 1,
            seed: None,
            timeout: None,
            max_rhat: None,
            init_step: 0.1,
            target_acceptance: 0.44,
            adaptation_window: 50,
        }
    }
}

/// Samples the posterior described by `spec`, blocking until every chain has finished or one of
/// them has failed.
pub fn sample(spec: &ModelSpec, config: &SamplerConfig) -> Result<Trace, SamplingFailure> {
    config.validate()?;
    let seed = config.seed.unwrap_or_else(random::clock_seed);
    // a budget too large to represent as an instant imposes no deadline
    let deadline = config
        .timeout
        .and_then(|timeout| Instant::now().checked_add(timeout));
    let abort = AtomicBool::new(false);

    let pool = ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .thread_name(|index| format!("mcmc-{index}"))
        .build()?;
    debug!(
        "sampling {} latents: {} chains on {} threads, {} warm-up + {} draws per chain",
        spec.dim(),
        config.chains,
        config.threads,
        config.tune,
        config.draws
    );
    let outcomes = pool.install(|| {
        (0..config.chains)
            .into_par_iter()
            .map(|chain| {
                let chain_seed = seed.wrapping_add(chain as u64);
                let outcome = run_chain(spec, config, chain, chain_seed, deadline, &abort);
                if outcome.is_err() {
                    abort.store(true, Ordering::Relaxed);
                }
                outcome
            })
            .collect::<Vec<_>>()
    });

    let mut chains = Vec::with_capacity(config.chains);
    let mut aborted = None;
    for outcome in outcomes {
        match outcome {
            Ok(chain) => chains.push(chain),
            Err(err @ SamplingFailure::Aborted { .. }) => {
                aborted.get_or_insert(err);
            }
            Err(err) => return Err(err),
        }
    }
    if let Some(err) = aborted {
        return Err(err);
    }

    let trace = Trace::new(spec.names(), chains);
    check_convergence(&trace, config.max_rhat)?;
    Ok(trace)
}

fn check_convergence(trace: &Trace, max_rhat: Option<f64>) -> Result<(), SamplingFailure> {
    for (index, name) in trace.names().iter().enumerate() {
        if let Some(rhat) = trace.rhat(index) {
            match max_rhat {
                Some(limit) if rhat > limit => {
                    return Err(SamplingFailure::NotConverged {
                        latent: name.clone(),
                        rhat,
                        limit,
                    })
                }
                _ if rhat > RHAT_WARNING => {
                    warn!("R-hat of '{name}' is {rhat:.3}; chains may not have converged")
                }
                _ => {}
            }
        }
    }
    Ok(())
}

fn run_chain(
    spec: &ModelSpec,
    config: &SamplerConfig,
    chain: usize,
    seed: u64,
    deadline: Option<Instant>,
    abort: &AtomicBool,
) -> Result<ChainTrace, SamplingFailure> {
    let mut rand = StdRand::seed(seed);
    let (mut values, mut density) = initialise(spec, chain, &mut rand)?;
    let dim = spec.dim();
    let mut steps = vec![config.init_step; dim];
    let mut window_accepts = vec![0usize; dim];
    let mut accepts = vec![0usize; dim];
    let mut adaptations = 0;
    let mut draws = Vec::with_capacity(config.draws * dim);

    for iteration in 0..config.tune + config.draws {
        if abort.load(Ordering::Relaxed) {
            return Err(SamplingFailure::Aborted { chain });
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                return Err(SamplingFailure::Timeout {
                    chain,
                    timeout: config.timeout.unwrap_or_default(),
                });
            }
        }

        let tuning = iteration < config.tune;
        for index in 0..dim {
            if update(spec, index, steps[index], &mut values, &mut density, &mut rand) {
                if tuning {
                    window_accepts[index] += 1;
                } else {
                    accepts[index] += 1;
                }
            }
        }

        if tuning && (iteration + 1) % config.adaptation_window == 0 {
            adaptations += 1;
            let delta = f64::min(MAX_ADAPTATION, 1.0 / (adaptations as f64).sqrt());
            for (step, window_accepts) in steps.iter_mut().zip(window_accepts.iter_mut()) {
                let rate = *window_accepts as f64 / config.adaptation_window as f64;
                if rate > config.target_acceptance {
                    *step *= delta.exp();
                } else {
                    *step /= delta.exp();
                }
                *window_accepts = 0;
            }
        }

        if !tuning {
            draws.extend_from_slice(&values);
        }
    }

    let acceptance = accepts
        .iter()
        .map(|&accepts| accepts as f64 / config.draws as f64)
        .collect::<Vec<_>>();
    debug!(
        "chain {chain} done: mean acceptance {:.3}, steps {steps:.3?}",
        acceptance.iter().sum::<f64>() / dim as f64
    );
    Ok(ChainTrace {
        draws,
        acceptance,
        steps,
    })
}

fn initialise(
    spec: &ModelSpec,
    chain: usize,
    rand: &mut impl Rand,
) -> Result<(Vec<f64>, f64), SamplingFailure> {
    for _ in 0..MAX_INIT_ATTEMPTS {
        let values = spec.initial_point(INIT_JITTER, rand);
        let density = spec.ln_density(&values);
        if density.is_finite() {
            return Ok((values, density));
        }
    }
    Err(SamplingFailure::NonFiniteDensity { chain })
}

/// One random-walk Metropolis update of the latent at `index`. Returns `true` if the proposal
/// was accepted.
#[inline]
fn update(
    spec: &ModelSpec,
    index: usize,
    step: f64,
    values: &mut [f64],
    density: &mut f64,
    rand: &mut impl Rand,
) -> bool {
    let current = values[index];
    let increment = step * random::standard_normal(rand);
    let (proposed, ln_jacobian) = if spec.latents()[index].prior.is_positive() {
        (current * increment.exp(), increment)
    } else {
        (current + increment, 0.0)
    };
    values[index] = proposed;
    let proposed_density = spec.ln_density(values);
    let ln_ratio = proposed_density - *density + ln_jacobian;

    // NaN ratios compare false and are rejected
    if random::uniform_open_zero(rand).ln() < ln_ratio {
        *density = proposed_density;
        true
    } else {
        values[index] = current;
        false
    }
}

#[cfg(test)]
mod tests;
