use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use clap::Parser;
use serde::Serialize;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use tracing::{debug, info};

use scorecast::file::WriteJsonFile;
use scorecast_soccer::data::read_fixtures;
use scorecast_soccer::domain::Score;
use scorecast_soccer::model::dixon_coles::DixonColesGoalModel;
use scorecast_soccer::model::hierarchical::{BayesianHierarchicalGoalModel, HierarchicalConfig};
use scorecast_soccer::model::poisson_mle::PoissonGoalModel;
use scorecast_soccer::model::{
    GoalModel, MaximumLikelihoodConfig, ModelKind, Params, DEFAULT_MAX_GOALS,
};
use scorecast_soccer::print;

const DISPLAY_GOALS: usize = 6;
const MOST_LIKELY: usize = 5;

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// CSV file with the goals_home, goals_away, team_home, team_away (and optional weights) columns
    file: PathBuf,

    /// home team of the fixture to predict
    #[clap(long)]
    home: String,

    /// away team of the fixture to predict
    #[clap(long)]
    away: String,

    /// goal model to fit
    #[clap(short = 'm', long, default_value_t = ModelKind::Hierarchical)]
    model: ModelKind,

    /// posterior draws per chain
    #[clap(long, default_value_t = 2500)]
    draws: usize,

    /// warm-up iterations per chain
    #[clap(long, default_value_t = 1500)]
    tune: usize,

    /// parallel chains (all processors if omitted, 0 for a single serial chain)
    #[clap(short = 'j', long)]
    jobs: Option<usize>,

    /// seed for reproducible sampling
    #[clap(long)]
    seed: Option<u64>,

    /// abandon sampling after this many seconds
    #[clap(long = "timeout-secs")]
    timeout_secs: Option<u64>,

    /// goals per side covered by the scoreline grid
    #[clap(long = "max-goals", default_value_t = DEFAULT_MAX_GOALS)]
    max_goals: usize,

    /// write the fitted parameters to a JSON file
    #[clap(long = "params-out")]
    params_out: Option<PathBuf>,

    /// print the prediction as JSON instead of tables
    #[clap(long)]
    json: bool,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        if self.max_goals == 0 {
            bail!("--max-goals must be positive");
        }
        if self.model == ModelKind::Hierarchical && self.draws == 0 {
            bail!("--draws must be positive");
        }
        if self.home == self.away {
            bail!("a team cannot play itself");
        }
        Ok(())
    }

    fn hierarchical_config(&self) -> HierarchicalConfig {
        HierarchicalConfig {
            draws: self.draws,
            tune: self.tune,
            jobs: self.jobs,
            seed: self.seed,
            timeout: self.timeout_secs.map(Duration::from_secs),
            ..HierarchicalConfig::default()
        }
    }
}

#[derive(Debug, Serialize)]
struct Prediction<'a> {
    home: &'a str,
    away: &'a str,
    model: String,
    home_goals: f64,
    away_goals: f64,
    home_win: f64,
    draw: f64,
    away_win: f64,
    both_teams_to_score: f64,
    most_likely: Vec<(Score, f64)>,
    params: &'a Params,
}

fn main() -> Result<(), Box<dyn Error>> {
    if env::var("RUST_BACKTRACE").is_err() {
        env::set_var("RUST_BACKTRACE", "full")
    }
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info")
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    args.validate()?;
    debug!("args: {args:?}");

    let dataset = read_fixtures(&args.file)?;
    info!(
        "loaded {} fixtures across {} teams from {:?}",
        dataset.len(),
        dataset.n_teams(),
        args.file
    );

    let mut model: Box<dyn GoalModel> = match args.model {
        ModelKind::Hierarchical => Box::new(BayesianHierarchicalGoalModel::new(
            dataset,
            args.hierarchical_config(),
        )),
        ModelKind::Poisson => Box::new(PoissonGoalModel::new(
            dataset,
            MaximumLikelihoodConfig::default(),
        )),
        ModelKind::DixonColes => Box::new(DixonColesGoalModel::new(
            dataset,
            MaximumLikelihoodConfig::default(),
        )),
    };
    model.fit()?;
    let params = model.params()?;
    if let Some(path) = &args.params_out {
        params.write_json_file(path)?;
        info!("wrote {} parameters to {path:?}", params.len());
    }

    let scoregrid = model.predict(&args.home, &args.away, args.max_goals)?;
    if args.json {
        let (home_goals, away_goals) = scoregrid.expectations();
        let prediction = Prediction {
            home: &args.home,
            away: &args.away,
            model: args.model.to_string(),
            home_goals,
            away_goals,
            home_win: scoregrid.home_win(),
            draw: scoregrid.draw(),
            away_win: scoregrid.away_win(),
            both_teams_to_score: scoregrid.both_teams_to_score(),
            most_likely: scoregrid.most_likely(MOST_LIKELY),
            params: &params,
        };
        println!("{}", serde_json::to_string_pretty(&prediction)?);
        return Ok(());
    }

    info!(
        "{} model parameters:\n{}",
        args.model,
        Console::default().render(&print::tabulate_params(&params))
    );
    info!(
        "{} v {} scorelines:\n{}",
        args.home,
        args.away,
        Console::default().render(&print::tabulate_scoregrid(&scoregrid, DISPLAY_GOALS))
    );
    info!(
        "{} v {} markets:\n{}",
        args.home,
        args.away,
        Console::default().render(&print::tabulate_markets(&scoregrid))
    );
    for (score, probability) in scoregrid.most_likely(MOST_LIKELY) {
        info!("{}-{}: {probability:.4}", score.home, score.away);
    }
    Ok(())
}
