//! Probability grids over full-time scorelines, and the markets derived from them. Rows index
//! home goals and columns index away goals; mass beyond the grid is not captured.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use scorecast::linear::matrix::Matrix;
use scorecast::poisson;

use crate::domain::{OverUnder, Score, Side};

#[derive(Debug, Error, Clone, PartialEq)]
#[error("handicap {0} is not a multiple of a quarter goal")]
pub struct InvalidHandicap(pub f64);

/// Settlement probabilities of a handicap bet. Quarter lines settle half the stake on each of
/// the two adjacent lines, so `win` and `lose` include half-wins and half-losses at half weight.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandicapOutcomes {
    pub win: f64,
    pub push: f64,
    pub lose: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScorelineGrid {
    matrix: Matrix<f64>,
    home_goal_expectation: f64,
    away_goal_expectation: f64,
}
impl ScorelineGrid {
    pub fn new(
        matrix: Matrix<f64>,
        home_goal_expectation: f64,
        away_goal_expectation: f64,
    ) -> Self {
        Self {
            matrix,
            home_goal_expectation,
            away_goal_expectation,
        }
    }

    /// The outer product of two independent Poisson distributions, truncated to `max_goals`
    /// outcomes per side.
    pub fn from_expectations(
        home_goal_expectation: f64,
        away_goal_expectation: f64,
        max_goals: usize,
    ) -> Self {
        let matrix = Matrix::outer(
            &poisson::masses(home_goal_expectation, max_goals),
            &poisson::masses(away_goal_expectation, max_goals),
        );
        Self::new(matrix, home_goal_expectation, away_goal_expectation)
    }

    pub fn matrix(&self) -> &Matrix<f64> {
        &self.matrix
    }

    pub fn max_goals(&self) -> usize {
        self.matrix.rows()
    }

    pub fn home_goal_expectation(&self) -> f64 {
        self.home_goal_expectation
    }

    pub fn away_goal_expectation(&self) -> f64 {
        self.away_goal_expectation
    }

    /// Sum over the cells satisfying `filter(home_goals, away_goals)`.
    fn gather(&self, mut filter: impl FnMut(usize, usize) -> bool) -> f64 {
        let mut prob = 0.0;
        for home_goals in 0..self.matrix.rows() {
            for (away_goals, &cell) in self.matrix.row_slice(home_goals).iter().enumerate() {
                if filter(home_goals, away_goals) {
                    prob += cell;
                }
            }
        }
        prob
    }

    /// Total probability captured by the grid.
    pub fn mass(&self) -> f64 {
        self.gather(|_, _| true)
    }

    pub fn home_win(&self) -> f64 {
        self.gather(|home_goals, away_goals| home_goals > away_goals)
    }

    pub fn draw(&self) -> f64 {
        self.gather(|home_goals, away_goals| home_goals == away_goals)
    }

    pub fn away_win(&self) -> f64 {
        self.gather(|home_goals, away_goals| home_goals < away_goals)
    }

    pub fn home_draw_away(&self) -> [f64; 3] {
        [self.home_win(), self.draw(), self.away_win()]
    }

    /// Probability that the total goals lie over or under `line`.
    pub fn total_goals(&self, over_under: OverUnder, line: f64) -> f64 {
        self.gather(|home_goals, away_goals| {
            let total = (home_goals + away_goals) as f64;
            match over_under {
                OverUnder::Over => total > line,
                OverUnder::Under => total < line,
            }
        })
    }

    pub fn both_teams_to_score(&self) -> f64 {
        self.gather(|home_goals, away_goals| home_goals > 0 && away_goals > 0)
    }

    /// Probability of an exact scoreline; zero if the score lies outside the grid.
    pub fn exact_score(&self, home_goals: usize, away_goals: usize) -> f64 {
        if home_goals < self.matrix.rows() && away_goals < self.matrix.cols() {
            self.matrix[(home_goals, away_goals)]
        } else {
            0.0
        }
    }

    /// Win probability of `side` under an Asian handicap: the side wins if its goals plus
    /// `handicap` exceed the opponent's. Quarter lines are the average of the two adjacent lines.
    pub fn asian_handicap(&self, side: Side, handicap: f64) -> Result<f64, InvalidHandicap> {
        Ok(self.asian_handicap_outcomes(side, handicap)?.win)
    }

    pub fn asian_handicap_outcomes(
        &self,
        side: Side,
        handicap: f64,
    ) -> Result<HandicapOutcomes, InvalidHandicap> {
        let lines = split_handicap(handicap)?;
        let mut outcomes = HandicapOutcomes::default();
        let share = 1.0 / lines.len() as f64;
        for line in lines {
            let line_outcomes = self.handicap_line(side, line);
            outcomes.win += share * line_outcomes.win;
            outcomes.push += share * line_outcomes.push;
            outcomes.lose += share * line_outcomes.lose;
        }
        Ok(outcomes)
    }

    fn handicap_line(&self, side: Side, line: f64) -> HandicapOutcomes {
        let mut outcomes = HandicapOutcomes::default();
        for home_goals in 0..self.matrix.rows() {
            for (away_goals, &cell) in self.matrix.row_slice(home_goals).iter().enumerate() {
                let (own, other) = match side {
                    Side::Home => (home_goals, away_goals),
                    Side::Away => (away_goals, home_goals),
                };
                let margin = own as f64 + line - other as f64;
                if margin > 0.0 {
                    outcomes.win += cell;
                } else if margin < 0.0 {
                    outcomes.lose += cell;
                } else {
                    outcomes.push += cell;
                }
            }
        }
        outcomes
    }

    /// Mean home and away goals implied by the grid. Falls short of the goal expectations by the
    /// truncated tail.
    pub fn expectations(&self) -> (f64, f64) {
        let (mut home, mut away) = (0.0, 0.0);
        for home_goals in 0..self.matrix.rows() {
            for (away_goals, &cell) in self.matrix.row_slice(home_goals).iter().enumerate() {
                home += home_goals as f64 * cell;
                away += away_goals as f64 * cell;
            }
        }
        (home, away)
    }

    /// The `n` most probable scorelines, in descending order of probability.
    pub fn most_likely(&self, n: usize) -> Vec<(Score, f64)> {
        let mut scores = Vec::with_capacity(self.matrix.rows() * self.matrix.cols());
        for home_goals in 0..self.matrix.rows() {
            for (away_goals, &cell) in self.matrix.row_slice(home_goals).iter().enumerate() {
                scores.push((Score::new(home_goals as u16, away_goals as u16), cell));
            }
        }
        scores.sort_by(|(_, a), (_, b)| b.total_cmp(a));
        scores.truncate(n);
        scores
    }
}

/// Splits a handicap into the lines it settles on: quarter lines into the two adjacent
/// half-goal and whole-goal lines, anything else into itself.
fn split_handicap(handicap: f64) -> Result<Vec<f64>, InvalidHandicap> {
    let quarters = handicap * 4.0;
    if !quarters.is_finite() || quarters.fract() != 0.0 {
        return Err(InvalidHandicap(handicap));
    }
    if quarters.rem_euclid(2.0) == 1.0 {
        Ok(vec![handicap - 0.25, handicap + 0.25])
    } else {
        Ok(vec![handicap])
    }
}
