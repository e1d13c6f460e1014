//! Dixon-Coles goal model: independent Poisson margins with a dependence correction on the four
//! low-scoring results, fitted by maximising the weighted likelihood.

use anyhow::anyhow;
use tracing::{debug, info};

use scorecast::factorial::LnLookup;
use scorecast::linear::matrix::Matrix;
use scorecast::opt::coordinate_descent;
use scorecast::poisson;
use scorecast::timed::Timed;

use crate::fixtures::FixtureDataset;
use crate::model::{
    expectations, initial_values, ln_likelihood, validate_fixture, GoalModel,
    MaximumLikelihoodConfig, ModelError, Params, Strengths,
};
use crate::scoregrid::ScorelineGrid;

pub const RHO: &str = "rho";

/// The Dixon-Coles adjustment factor for a scoreline; `1` outside the four low-scoring cells.
#[inline]
pub fn tau(goals_home: usize, goals_away: usize, home_rate: f64, away_rate: f64, rho: f64) -> f64 {
    match (goals_home, goals_away) {
        (0, 0) => 1.0 - home_rate * away_rate * rho,
        (0, 1) => 1.0 + home_rate * rho,
        (1, 0) => 1.0 + away_rate * rho,
        (1, 1) => 1.0 - rho,
        _ => 1.0,
    }
}

/// The range of `rho` over which every adjustment factor of a fixture with the given rates is
/// non-negative.
pub fn rho_bounds(home_rate: f64, away_rate: f64) -> (f64, f64) {
    let lower = f64::max(-1.0 / home_rate, -1.0 / away_rate);
    let upper = f64::min(1.0 / (home_rate * away_rate), 1.0);
    (lower, upper)
}

#[derive(Debug)]
pub struct DixonColesGoalModel {
    dataset: FixtureDataset,
    config: MaximumLikelihoodConfig,
    params: Option<Params>,
}
impl DixonColesGoalModel {
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

impl GoalModel for DixonColesGoalModel {
    fn fit(&mut self) -> Result<(), ModelError> {
        if self.params.is_some() {
            return Err(ModelError::AlreadyFitted);
        }
        self.config.validate()?;
        info!(
            "fitting Dixon-Coles model: {} fixtures, {} teams",
            self.dataset.len(),
            self.dataset.n_teams()
        );
        let timed = Timed::result(|| maximise(&self.dataset, &self.config))?;
        info!("fitted Dixon-Coles model in {:?}", timed.elapsed);
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
        let params = self.params.as_ref().ok_or(ModelError::NotFitted)?;
        validate_fixture(&self.dataset, home, away, max_goals)?;
        let (home_rate, away_rate) = expectations(params, home, away)?;
        let rho = params.get(RHO)?;

        let mut matrix = Matrix::outer(
            &poisson::masses(home_rate, max_goals),
            &poisson::masses(away_rate, max_goals),
        );
        for goals_home in 0..max_goals.min(2) {
            for goals_away in 0..max_goals.min(2) {
                let factor = tau(goals_home, goals_away, home_rate, away_rate, rho);
                matrix[(goals_home, goals_away)] *= factor.max(0.0);
            }
        }
        Ok(ScorelineGrid::new(matrix, home_rate, away_rate))
    }
}

fn maximise(
    dataset: &FixtureDataset,
    config: &MaximumLikelihoodConfig,
) -> Result<Params, ModelError> {
    let teams = dataset.n_teams();
    let rho_index = 2 + 2 * teams;
    let fixtures = dataset.fixtures();
    let ln_factorial = LnLookup::default();
    let outcome = coordinate_descent(&config.descent, initial_values(dataset, 1), |values| {
        let strengths = Strengths::unpack(values, teams);
        let rho = values[rho_index];
        -ln_likelihood(fixtures, &strengths, &ln_factorial, |fixture, home_rate, away_rate| {
            let (lower, upper) = rho_bounds(home_rate, away_rate);
            if !(lower..=upper).contains(&rho) {
                return f64::NEG_INFINITY;
            }
            let factor = tau(
                fixture.goals_home as usize,
                fixture.goals_away as usize,
                home_rate,
                away_rate,
                rho,
            );
            if factor > 0.0 {
                factor.ln()
            } else {
                f64::NEG_INFINITY
            }
        })
    })?;
    if !outcome.optimal_residual.is_finite() {
        return Err(anyhow!(
            "negative log-likelihood {} is not finite",
            outcome.optimal_residual
        )
        .into());
    }
    let rho = outcome.optimal_values[rho_index];
    debug!(
        "descent finished after {} sweeps with negative log-likelihood {:.6}, rho {rho:.4}",
        outcome.sweeps, outcome.optimal_residual
    );

    let mut params = Params::default();
    Strengths::unpack(&outcome.optimal_values, teams).export(dataset.teams(), &mut params);
    params.insert(RHO, rho);
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_float_eq::*;

    #[test]
    fn tau_corrects_low_scores_only() {
        let (home_rate, away_rate, rho) = (1.5, 1.1, -0.1);
        assert_float_absolute_eq!(1.165, tau(0, 0, home_rate, away_rate, rho), 1e-12);
        assert_float_absolute_eq!(0.85, tau(0, 1, home_rate, away_rate, rho), 1e-12);
        assert_float_absolute_eq!(0.89, tau(1, 0, home_rate, away_rate, rho), 1e-12);
        assert_float_absolute_eq!(1.1, tau(1, 1, home_rate, away_rate, rho), 1e-12);
        assert_eq!(1.0, tau(2, 0, home_rate, away_rate, rho));
        assert_eq!(1.0, tau(1, 2, home_rate, away_rate, rho));
    }

    #[test]
    fn rho_bounds_keep_factors_non_negative() {
        let (home_rate, away_rate) = (2.5, 0.8);
        let (lower, upper) = rho_bounds(home_rate, away_rate);
        assert_float_absolute_eq!(-0.4, lower, 1e-12);
        assert_float_absolute_eq!(0.5, upper, 1e-12);
        for rho in [lower, upper] {
            for (goals_home, goals_away) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
                assert!(tau(goals_home, goals_away, home_rate, away_rate, rho) >= -1e-12);
            }
        }
    }

    #[test]
    fn tau_is_neutral_without_dependence() {
        for goals_home in 0..3 {
            for goals_away in 0..3 {
                assert_eq!(1.0, tau(goals_home, goals_away, 1.3, 0.9, 0.0));
            }
        }
    }
}
