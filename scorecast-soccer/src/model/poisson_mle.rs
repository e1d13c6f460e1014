//! Independent Poisson goal model, fitted by maximising the weighted likelihood.

use anyhow::anyhow;
use tracing::{debug, info};

use scorecast::factorial::LnLookup;
use scorecast::opt::coordinate_descent;
use scorecast::timed::Timed;

use crate::fixtures::FixtureDataset;
use crate::model::{
    initial_values, ln_likelihood, predict_independent, GoalModel, MaximumLikelihoodConfig,
    ModelError, Params, Strengths,
};
use crate::scoregrid::ScorelineGrid;

#[derive(Debug)]
pub struct PoissonGoalModel {
    dataset: FixtureDataset,
    config: MaximumLikelihoodConfig,
    params: Option<Params>,
}
impl PoissonGoalModel {
    pub fn new(dataset: FixtureDataset, config: MaximumLikelihoodConfig) -> Self {
        Self {
            dataset,
            config,
            params: None,
        }
    }

    pub fn dataset(&self) -> &FixtureDataset {
        &self.dataset
    }
}

impl GoalModel for PoissonGoalModel {
    fn fit(&mut self) -> Result<(), ModelError> {
        if self.params.is_some() {
            return Err(ModelError::AlreadyFitted);
        }
        self.config.validate()?;
        info!(
            "fitting Poisson model: {} fixtures, {} teams",
            self.dataset.len(),
            self.dataset.n_teams()
        );
        let timed = Timed::result(|| maximise(&self.dataset, &self.config))?;
        info!("fitted Poisson model in {:?}", timed.elapsed);
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

fn maximise(
    dataset: &FixtureDataset,
    config: &MaximumLikelihoodConfig,
) -> Result<Params, ModelError> {
    let teams = dataset.n_teams();
    let fixtures = dataset.fixtures();
    let ln_factorial = LnLookup::default();
    let outcome = coordinate_descent(&config.descent, initial_values(dataset, 0), |values| {
        let strengths = Strengths::unpack(values, teams);
        -ln_likelihood(fixtures, &strengths, &ln_factorial, |_, _, _| 0.0)
    })?;
    if !outcome.optimal_residual.is_finite() {
        return Err(anyhow!(
            "negative log-likelihood {} is not finite",
            outcome.optimal_residual
        )
        .into());
    }
    debug!(
        "descent finished after {} sweeps with negative log-likelihood {:.6}",
        outcome.sweeps, outcome.optimal_residual
    );

    let mut params = Params::default();
    Strengths::unpack(&outcome.optimal_values, teams).export(dataset.teams(), &mut params);
    Ok(params)
}
