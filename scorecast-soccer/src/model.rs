//! The goal model family. Every model shares one life cycle: construct over a [`FixtureDataset`],
//! [`fit`](GoalModel::fit) once, then [`predict`](GoalModel::predict) any number of fixtures.
//!
//! All variants use the same log-linear parametrisation: a global `intercept`, a
//! `home_advantage`, and per-team `attack` and `defence` strengths, each centred to zero mean.
//! For a fixture between home team `h` and away team `a`,
//!
//! ```text
//! home rate = exp(intercept + home_advantage + attack[h] + defence[a])
//! away rate = exp(intercept + attack[a] + defence[h])
//! ```

use std::collections::btree_map;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

use scorecast::factorial::LnLookup;
use scorecast::mcmc::SamplingFailure;
use scorecast::opt::CoordinateDescentConfig;
use scorecast::poisson;
use scorecast::probs::SliceExt;

use crate::domain::Side;
use crate::fixtures::{Fixture, FixtureDataset};
use crate::scoregrid::ScorelineGrid;

pub mod dixon_coles;
pub mod hierarchical;
pub mod poisson_mle;

pub const DEFAULT_MAX_GOALS: usize = 15;

pub const HOME_ADVANTAGE: &str = "home_advantage";
pub const INTERCEPT: &str = "intercept";

pub fn attack_key(team: &str) -> String {
    format!("attack_{team}")
}

pub fn defence_key(team: &str) -> String {
    format!("defence_{team}")
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model has not been fitted")]
    NotFitted,

    #[error("model has already been fitted")]
    AlreadyFitted,

    #[error("unknown {side} team '{team}'")]
    UnknownTeam { side: Side, team: String },

    #[error("max goals must be positive")]
    InvalidMaxGoals,

    #[error("missing parameter '{0}'")]
    MissingParameter(String),

    #[error("{0}")]
    Sampling(#[from] SamplingFailure),

    #[error("optimisation failed: {0}")]
    Optimisation(#[from] anyhow::Error),
}

/// Fitted parameters, keyed by name. Copies are handed out, so a snapshot never changes under
/// its holder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, f64>);
impl Params {
    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Result<f64, ModelError> {
        self.0
            .get(key)
            .copied()
            .ok_or_else(|| ModelError::MissingParameter(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<String, f64> {
        self.0.iter()
    }
}

impl From<BTreeMap<String, f64>> for Params {
    fn from(map: BTreeMap<String, f64>) -> Self {
        Self(map)
    }
}

pub trait GoalModel {
    /// Fits the model to its dataset. Succeeds at most once; on failure the model stays unfitted
    /// and the fit may be retried.
    fn fit(&mut self) -> Result<(), ModelError>;

    fn is_fitted(&self) -> bool;

    /// A copy of the fitted parameters.
    fn params(&self) -> Result<Params, ModelError>;

    /// The probability grid over scorelines `0..max_goals` for each side.
    fn predict(&self, home: &str, away: &str, max_goals: usize)
        -> Result<ScorelineGrid, ModelError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ModelKind {
    Hierarchical,
    Poisson,
    DixonColes,
}

/// Configuration of the maximum-likelihood variants.
#[derive(Debug, Clone, Default)]
pub struct MaximumLikelihoodConfig {
    pub descent: CoordinateDescentConfig,
}
impl MaximumLikelihoodConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.descent.validate()
    }
}

/// Initial search point for the maximum-likelihood variants: no home advantage, the intercept at
/// the log of the mean goals per side, and level strengths. Any trailing `extra` parameters start
/// at zero.
pub(crate) fn initial_values(dataset: &FixtureDataset, extra: usize) -> Vec<f64> {
    let (goals, weights) = dataset
        .fixtures()
        .iter()
        .fold((0.0, 0.0), |(goals, weights), fixture| {
            let fixture_goals = fixture.goals_home as f64 + fixture.goals_away as f64;
            (goals + fixture.weight * fixture_goals, weights + fixture.weight)
        });
    let mean_goals = goals / (2.0 * weights);
    let intercept = if mean_goals > 0.0 { mean_goals.ln() } else { 0.0 };
    let mut values = vec![0.0; 2 + 2 * dataset.n_teams() + extra];
    values[1] = intercept;
    values
}

/// Team strengths at one point of the parameter space. The raw attack and defence vectors are
/// centred on the fly, so that the likelihood never depends on their means.
#[derive(Debug)]
pub(crate) struct Strengths<'a> {
    intercept: f64,
    home_advantage: f64,
    attack: &'a [f64],
    defence: &'a [f64],
    attack_mean: f64,
    defence_mean: f64,
}
impl<'a> Strengths<'a> {
    pub fn centred(
        intercept: f64,
        home_advantage: f64,
        attack: &'a [f64],
        defence: &'a [f64],
    ) -> Self {
        Self {
            intercept,
            home_advantage,
            attack,
            defence,
            attack_mean: attack.mean(),
            defence_mean: defence.mean(),
        }
    }

    /// Reads strengths from a flat parameter vector laid out as `[home_advantage, intercept,
    /// attack[0..teams], defence[0..teams], ...]`.
    pub fn unpack(values: &'a [f64], teams: usize) -> Self {
        Self::centred(
            values[1],
            values[0],
            &values[2..2 + teams],
            &values[2 + teams..2 + 2 * teams],
        )
    }

    #[inline]
    pub fn attack(&self, team: usize) -> f64 {
        self.attack[team] - self.attack_mean
    }

    #[inline]
    pub fn defence(&self, team: usize) -> f64 {
        self.defence[team] - self.defence_mean
    }

    #[inline]
    pub fn rates(&self, home: usize, away: usize) -> (f64, f64) {
        let home_rate =
            (self.intercept + self.home_advantage + self.attack(home) + self.defence(away)).exp();
        let away_rate = (self.intercept + self.attack(away) + self.defence(home)).exp();
        (home_rate, away_rate)
    }

    /// Writes the strength parameters into `params`, with centred attack and defence.
    pub fn export(&self, teams: &[String], params: &mut Params) {
        params.insert(HOME_ADVANTAGE, self.home_advantage);
        params.insert(INTERCEPT, self.intercept);
        for (index, team) in teams.iter().enumerate() {
            params.insert(attack_key(team), self.attack(index));
            params.insert(defence_key(team), self.defence(index));
        }
    }
}

/// Weighted independent-Poisson log-likelihood of the fixtures. Zero-weight fixtures are skipped;
/// `correction` contributes an additional (weighted) log term per fixture.
pub(crate) fn ln_likelihood(
    fixtures: &[Fixture],
    strengths: &Strengths,
    ln_factorial: &LnLookup,
    mut correction: impl FnMut(&Fixture, f64, f64) -> f64,
) -> f64 {
    let mut ln_likelihood = 0.0;
    for fixture in fixtures {
        if fixture.weight == 0.0 {
            continue;
        }
        let (home_rate, away_rate) = strengths.rates(fixture.home_index, fixture.away_index);
        let ln_mass = poisson::ln_univariate(fixture.goals_home, home_rate, ln_factorial)
            + poisson::ln_univariate(fixture.goals_away, away_rate, ln_factorial)
            + correction(fixture, home_rate, away_rate);
        ln_likelihood += fixture.weight * ln_mass;
    }
    ln_likelihood
}

/// Checks that both teams are indexed and that `max_goals` is usable.
pub(crate) fn validate_fixture(
    dataset: &FixtureDataset,
    home: &str,
    away: &str,
    max_goals: usize,
) -> Result<(), ModelError> {
    for (side, team) in [(Side::Home, home), (Side::Away, away)] {
        if dataset.team_index(team).is_none() {
            return Err(ModelError::UnknownTeam {
                side,
                team: team.to_string(),
            });
        }
    }
    if max_goals == 0 {
        return Err(ModelError::InvalidMaxGoals);
    }
    Ok(())
}

/// Home and away goal expectations from a fitted parameter store.
pub(crate) fn expectations(
    params: &Params,
    home: &str,
    away: &str,
) -> Result<(f64, f64), ModelError> {
    let home_advantage = params.get(HOME_ADVANTAGE)?;
    let intercept = params.get(INTERCEPT)?;
    let attack_home = params.get(&attack_key(home))?;
    let defence_home = params.get(&defence_key(home))?;
    let attack_away = params.get(&attack_key(away))?;
    let defence_away = params.get(&defence_key(away))?;
    let home_rate = (intercept + home_advantage + attack_home + defence_away).exp();
    let away_rate = (intercept + attack_away + defence_home).exp();
    Ok((home_rate, away_rate))
}

/// The shared prediction path of the independent-Poisson variants.
pub(crate) fn predict_independent(
    params: Option<&Params>,
    dataset: &FixtureDataset,
    home: &str,
    away: &str,
    max_goals: usize,
) -> Result<ScorelineGrid, ModelError> {
    let params = params.ok_or(ModelError::NotFitted)?;
    validate_fixture(dataset, home, away, max_goals)?;
    let (home_rate, away_rate) = expectations(params, home, away)?;
    Ok(ScorelineGrid::from_expectations(home_rate, away_rate, max_goals))
}
