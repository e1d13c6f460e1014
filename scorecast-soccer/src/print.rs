use stanza::style::HAlign::Left;
use stanza::style::{HAlign, Header, MinWidth, Styles};
use stanza::table::{Cell, Col, Row, Table};
use strum::IntoEnumIterator;

use crate::domain::{OverUnder, Side};
use crate::model::Params;
use crate::scoregrid::ScorelineGrid;

const TOTAL_GOALS_LINES: [f64; 5] = [0.5, 1.5, 2.5, 3.5, 4.5];
const HANDICAP_LINES: [f64; 5] = [-1.5, -1.0, -0.5, -0.25, 0.0];

pub fn tabulate_params(params: &Params) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(20)).with(Left)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec!["Parameter".into(), "Value".into()],
        ));
    for (key, value) in params.iter() {
        table.push_row(Row::new(
            Styles::default(),
            vec![key.clone().into(), format!("{value:.4}").into()],
        ));
    }
    table
}

/// Home goals down the rows, away goals across the columns.
pub fn tabulate_scoregrid(scoregrid: &ScorelineGrid, max_goals: usize) -> Table {
    let max_goals = usize::min(max_goals, scoregrid.max_goals());
    let mut cols = vec![Col::new(Styles::default().with(MinWidth(5)).with(Left))];
    cols.extend(
        (0..max_goals).map(|_| Col::new(Styles::default().with(MinWidth(7)).with(HAlign::Right))),
    );
    let mut header: Vec<Cell> = vec!["H\\A".into()];
    header.extend((0..max_goals).map(|away_goals| format!("{away_goals}").into()));
    let mut table = Table::default()
        .with_cols(cols)
        .with_row(Row::new(Styles::default().with(Header(true)), header));
    for home_goals in 0..max_goals {
        let mut cells: Vec<Cell> = vec![format!("{home_goals}").into()];
        cells.extend((0..max_goals).map(|away_goals| {
            format!("{:.4}", scoregrid.exact_score(home_goals, away_goals)).into()
        }));
        table.push_row(Row::new(Styles::default(), cells));
    }
    table
}

pub fn tabulate_markets(scoregrid: &ScorelineGrid) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(20)).with(Left)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec!["Market".into(), "Probability".into()],
        ));
    let mut push = |market: String, probability: f64| {
        table.push_row(Row::new(
            Styles::default(),
            vec![market.into(), format!("{probability:.4}").into()],
        ));
    };

    let [home, draw, away] = scoregrid.home_draw_away();
    push("home win".into(), home);
    push("draw".into(), draw);
    push("away win".into(), away);
    for line in TOTAL_GOALS_LINES {
        for over_under in OverUnder::iter() {
            push(
                format!("{over_under} {line}"),
                scoregrid.total_goals(over_under, line),
            );
        }
    }
    push("both teams to score".into(), scoregrid.both_teams_to_score());
    for line in HANDICAP_LINES {
        for side in Side::iter() {
            let handicap = match side {
                Side::Home => line,
                Side::Away => 0.0 - line,
            };
            if let Ok(probability) = scoregrid.asian_handicap(side, handicap) {
                push(format!("{side} {handicap:+}"), probability);
            }
        }
    }
    let (home_goals, away_goals) = scoregrid.expectations();
    push("home goals".into(), home_goals);
    push("away goals".into(), away_goals);
    table
}
