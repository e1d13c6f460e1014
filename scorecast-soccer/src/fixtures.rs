//! Historical fixtures and the dense team index that goal models are parametrised over.

use std::collections::BTreeSet;

use thiserror::Error;

use scorecast::hash_lookup::HashLookup;

use crate::domain::Side;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvalidInput {
    #[error("at least one fixture must be supplied")]
    Empty,

    #[error("{field} has {actual} elements, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("negative {side} goal count {goals} in row {row}")]
    NegativeGoals { row: usize, side: Side, goals: i64 },

    #[error("{side} goal count {value} in row {row} is not a whole number")]
    NonIntegerGoals { row: usize, side: Side, value: f64 },

    #[error("{side} goal count {goals} in row {row} exceeds the limit of {}", u16::MAX)]
    GoalsOutOfRange { row: usize, side: Side, goals: i64 },

    #[error("weight {weight} in row {row} must be finite and non-negative")]
    InvalidWeight { row: usize, weight: f64 },

    #[error("away team '{team}' in row {row} never plays at home")]
    UnindexedAwayTeam { row: usize, team: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Weights {
    /// The same weight for every fixture.
    Uniform(f64),
    PerFixture(Vec<f64>),
}
impl Default for Weights {
    fn default() -> Self {
        Self::Uniform(1.0)
    }
}
impl Weights {
    fn get(&self, row: usize) -> f64 {
        match self {
            Weights::Uniform(weight) => *weight,
            Weights::PerFixture(weights) => weights[row],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fixture {
    pub goals_home: u16,
    pub goals_away: u16,
    pub home_index: usize,
    pub away_index: usize,
    pub weight: f64,
}

#[derive(Debug, Clone)]
pub struct FixtureDataset {
    fixtures: Vec<Fixture>,
    teams: HashLookup<String>,
}
impl FixtureDataset {
    /// Validates the parallel columns of a fixture table and indexes its teams. Teams are indexed
    /// by the sorted order of the distinct home team names.
    pub fn try_new(
        goals_home: &[i64],
        goals_away: &[i64],
        teams_home: &[impl AsRef<str>],
        teams_away: &[impl AsRef<str>],
        weights: Weights,
    ) -> Result<Self, InvalidInput> {
        let rows = goals_home.len();
        if rows == 0 {
            return Err(InvalidInput::Empty);
        }
        check_len("goals_away", rows, goals_away.len())?;
        check_len("teams_home", rows, teams_home.len())?;
        check_len("teams_away", rows, teams_away.len())?;
        if let Weights::PerFixture(weights) = &weights {
            check_len("weights", rows, weights.len())?;
        }

        let teams = teams_home
            .iter()
            .map(|team| team.as_ref())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        let teams = HashLookup::from(teams);

        let mut fixtures = Vec::with_capacity(rows);
        for row in 0..rows {
            let goals_home = checked_goals(goals_home[row], row, Side::Home)?;
            let goals_away = checked_goals(goals_away[row], row, Side::Away)?;
            let weight = weights.get(row);
            if !(weight.is_finite() && weight >= 0.0) {
                return Err(InvalidInput::InvalidWeight { row, weight });
            }
            let home_index = teams
                .index_of(teams_home[row].as_ref())
                .unwrap_or_else(|| unreachable!());
            let away_team = teams_away[row].as_ref();
            let away_index =
                teams
                    .index_of(away_team)
                    .ok_or_else(|| InvalidInput::UnindexedAwayTeam {
                        row,
                        team: away_team.to_string(),
                    })?;
            fixtures.push(Fixture {
                goals_home,
                goals_away,
                home_index,
                away_index,
                weight,
            });
        }
        Ok(Self { fixtures, teams })
    }

    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    /// Team names in index order.
    pub fn teams(&self) -> &[String] {
        self.teams.items()
    }

    pub fn n_teams(&self) -> usize {
        self.teams.len()
    }

    pub fn team_index(&self, team: &str) -> Option<usize> {
        self.teams.index_of(team)
    }
}

fn check_len(field: &'static str, expected: usize, actual: usize) -> Result<(), InvalidInput> {
    if actual != expected {
        Err(InvalidInput::LengthMismatch {
            field,
            expected,
            actual,
        })
    } else {
        Ok(())
    }
}

fn checked_goals(goals: i64, row: usize, side: Side) -> Result<u16, InvalidInput> {
    if goals < 0 {
        return Err(InvalidInput::NegativeGoals { row, side, goals });
    }
    u16::try_from(goals).map_err(|_| InvalidInput::GoalsOutOfRange { row, side, goals })
}

/// Converts a real-valued goal count (as read from text) to an integer, rejecting fractional,
/// non-finite and negative values.
pub fn goal_count(value: f64, row: usize, side: Side) -> Result<i64, InvalidInput> {
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(InvalidInput::NonIntegerGoals { row, side, value });
    }
    let goals = value as i64;
    if goals < 0 {
        return Err(InvalidInput::NegativeGoals { row, side, goals });
    }
    Ok(goals)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn teams(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn index_follows_sorted_home_teams() {
        let dataset = FixtureDataset::try_new(
            &[1, 0, 2],
            &[1, 3, 0],
            &teams(&["Tottenham", "Arsenal", "Chelsea"]),
            &teams(&["Arsenal", "Chelsea", "Tottenham"]),
            Weights::default(),
        )
        .unwrap();
        assert_eq!(&["Arsenal", "Chelsea", "Tottenham"], dataset.teams());
        assert_eq!(3, dataset.n_teams());
        assert_eq!(3, dataset.len());
        assert_eq!(Some(1), dataset.team_index("Chelsea"));
        assert_eq!(None, dataset.team_index("Everton"));
        assert_eq!(
            Fixture {
                goals_home: 1,
                goals_away: 1,
                home_index: 2,
                away_index: 0,
                weight: 1.0,
            },
            dataset.fixtures()[0]
        );
    }

    #[test]
    fn index_is_bytewise_ordered() {
        let dataset = FixtureDataset::try_new(
            &[0, 0, 0],
            &[0, 0, 0],
            &["b", "B", "a"],
            &["B", "a", "b"],
            Weights::Uniform(0.5),
        )
        .unwrap();
        assert_eq!(&["B", "a", "b"], dataset.teams());
        assert!(dataset.fixtures().iter().all(|fixture| fixture.weight == 0.5));
    }

    #[test]
    fn per_fixture_weights() {
        let dataset = FixtureDataset::try_new(
            &[0, 1],
            &[2, 1],
            &["a", "b"],
            &["b", "a"],
            Weights::PerFixture(vec![0.25, 0.0]),
        )
        .unwrap();
        assert_eq!(0.25, dataset.fixtures()[0].weight);
        assert_eq!(0.0, dataset.fixtures()[1].weight);
    }

    #[test]
    fn empty_rejected() {
        let err = FixtureDataset::try_new(&[], &[], &[] as &[&str], &[] as &[&str], Weights::default())
            .unwrap_err();
        assert_eq!(InvalidInput::Empty, err);
    }

    #[test]
    fn length_mismatch_rejected() {
        let err = FixtureDataset::try_new(&[1, 2], &[1], &["a", "b"], &["b", "a"], Weights::default())
            .unwrap_err();
        assert_eq!(
            InvalidInput::LengthMismatch {
                field: "goals_away",
                expected: 2,
                actual: 1
            },
            err
        );

        let err = FixtureDataset::try_new(
            &[1, 2],
            &[1, 0],
            &["a", "b"],
            &["b", "a"],
            Weights::PerFixture(vec![1.0]),
        )
        .unwrap_err();
        assert_eq!("weights has 1 elements, expected 2", err.to_string());
    }

    #[test]
    fn negative_goals_rejected() {
        let err = FixtureDataset::try_new(&[1, 2], &[0, -1], &["a", "b"], &["b", "a"], Weights::default())
            .unwrap_err();
        assert_eq!(
            InvalidInput::NegativeGoals {
                row: 1,
                side: Side::Away,
                goals: -1
            },
            err
        );
        assert_eq!("negative away goal count -1 in row 1", err.to_string());
    }

    #[test]
    fn excessive_goals_rejected() {
        let err = FixtureDataset::try_new(&[70_000], &[0], &["a"], &["a"], Weights::default())
            .unwrap_err();
        assert_eq!(
            InvalidInput::GoalsOutOfRange {
                row: 0,
                side: Side::Home,
                goals: 70_000
            },
            err
        );
        assert_eq!(
            "home goal count 70000 in row 0 exceeds the limit of 65535",
            err.to_string()
        );
    }

    #[test]
    fn invalid_weights_rejected() {
        for weight in [-0.1, f64::NAN, f64::INFINITY] {
            let err = FixtureDataset::try_new(&[1], &[0], &["a"], &["a"], Weights::Uniform(weight))
                .unwrap_err();
            assert!(matches!(err, InvalidInput::InvalidWeight { row: 0, .. }), "{err:?}");
        }
    }

    #[test]
    fn away_only_team_rejected() {
        let err = FixtureDataset::try_new(&[1, 2], &[0, 1], &["a", "b"], &["b", "c"], Weights::default())
            .unwrap_err();
        assert_eq!(
            InvalidInput::UnindexedAwayTeam {
                row: 1,
                team: "c".into()
            },
            err
        );
    }

    #[test]
    fn goal_count_conversion() {
        assert_eq!(Ok(3), goal_count(3.0, 0, Side::Home));
        assert_eq!(Ok(0), goal_count(-0.0, 0, Side::Home));
        assert_eq!(
            Err(InvalidInput::NonIntegerGoals {
                row: 4,
                side: Side::Home,
                value: 1.5
            }),
            goal_count(1.5, 4, Side::Home)
        );
        assert!(matches!(
            goal_count(f64::NAN, 2, Side::Away),
            Err(InvalidInput::NonIntegerGoals { row: 2, side: Side::Away, .. })
        ));
        assert_eq!(
            Err(InvalidInput::NegativeGoals {
                row: 0,
                side: Side::Away,
                goals: -2
            }),
            goal_count(-2.0, 0, Side::Away)
        );
    }
}
