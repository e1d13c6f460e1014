//! Loading of fixture tables from CSV files with a header row. The required columns are
//! `goals_home`, `goals_away`, `team_home` and `team_away`; an optional `weights` column assigns
//! per-fixture weights (uniform weights of 1 otherwise). Column order is free. Fields are not
//! quoted, so team names cannot contain commas.

use std::io;
use std::io::BufRead;
use std::path::Path;

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::debug;

use scorecast::csv::CsvReader;

use crate::domain::Side;
use crate::fixtures::{goal_count, FixtureDataset, InvalidInput, Weights};

const GOALS_HOME: &str = "goals_home";
const GOALS_AWAY: &str = "goals_away";
const TEAM_HOME: &str = "team_home";
const TEAM_AWAY: &str = "team_away";
const WEIGHTS: &str = "weights";

#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("missing header row")]
    MissingHeader,

    #[error("missing column '{0}'")]
    MissingColumn(&'static str),

    #[error("row {row} has {actual} fields, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("cannot parse '{value}' in column '{column}' of row {row}")]
    Unparseable {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("{0}")]
    InvalidInput(#[from] InvalidInput),
}

pub fn read_fixtures(path: impl AsRef<Path>) -> Result<FixtureDataset, DataError> {
    let path = path.as_ref();
    debug!("reading fixtures from {path:?}");
    read_fixtures_from(CsvReader::open(path)?)
}

pub fn read_fixtures_from<R: BufRead>(mut csv: CsvReader<R>) -> Result<FixtureDataset, DataError> {
    let header = csv.read().ok_or(DataError::MissingHeader)??;
    let columns = header
        .iter()
        .enumerate()
        .map(|(index, name)| (name.as_str(), index))
        .collect::<FxHashMap<_, _>>();
    let column = |name: &'static str| columns.get(name).copied().ok_or(DataError::MissingColumn(name));
    let goals_home_col = column(GOALS_HOME)?;
    let goals_away_col = column(GOALS_AWAY)?;
    let team_home_col = column(TEAM_HOME)?;
    let team_away_col = column(TEAM_AWAY)?;
    let weights_col = columns.get(WEIGHTS).copied();

    let (mut goals_home, mut goals_away) = (vec![], vec![]);
    let (mut teams_home, mut teams_away) = (vec![], vec![]);
    let mut weights = vec![];
    for (row, record) in csv.enumerate() {
        let record = record?;
        if record.len() != header.len() {
            return Err(DataError::RaggedRow {
                row,
                expected: header.len(),
                actual: record.len(),
            });
        }
        goals_home.push(goal_count(parse(&record, row, goals_home_col, GOALS_HOME)?, row, Side::Home)?);
        goals_away.push(goal_count(parse(&record, row, goals_away_col, GOALS_AWAY)?, row, Side::Away)?);
        teams_home.push(record[team_home_col].clone());
        teams_away.push(record[team_away_col].clone());
        if let Some(weights_col) = weights_col {
            weights.push(parse(&record, row, weights_col, WEIGHTS)?);
        }
    }

    let weights = match weights_col {
        Some(_) => Weights::PerFixture(weights),
        None => Weights::default(),
    };
    let dataset = FixtureDataset::try_new(&goals_home, &goals_away, &teams_home, &teams_away, weights)?;
    debug!("read {} fixtures across {} teams", dataset.len(), dataset.n_teams());
    Ok(dataset)
}

fn parse(record: &[String], row: usize, index: usize, column: &'static str) -> Result<f64, DataError> {
    let value = &record[index];
    value.parse().map_err(|_| DataError::Unparseable {
        row,
        column,
        value: value.clone(),
    })
}
