mod config;
mod input;
mod logger;
mod output;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use club_tournament_core::registry::{self, TournamentStore};
use club_tournament_core::{Tournament, TournamentId};
use log::SetLoggerError;
use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::input::{InputError, MatchResult};

#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// Path to the TOML config file. Without one the defaults are used.
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generates the schedule for a roster and prints all matches.
    Generate {
        #[arg(short, long)]
        roster: PathBuf,
    },
    /// Generates the schedule for a roster, plays the given results and prints the outcome.
    Play {
        #[arg(short, long)]
        roster: PathBuf,
        #[arg(long)]
        results: PathBuf,
    },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Logger(#[from] SetLoggerError),
    #[error(transparent)]
    Tournament(#[from] club_tournament_core::Error),
}

fn main() {
    let args = Args::parse();

    if let Err(err) = run(args) {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Error> {
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let config = config.with_environment()?;

    logger::init(config.loglevel)?;
    log::debug!("Using config: {:?}", config);

    let store = TournamentStore::default();

    match args.command {
        Command::Generate { roster } => {
            let id = create(&store, &config, &roster)?;
            store.with(id, |tournament| output::print_matches(tournament))?;
        }
        Command::Play { roster, results } => {
            let id = create(&store, &config, &roster)?;

            for result in input::read_results(results)? {
                play(&store, id, &result);
            }

            store.with(id, |tournament| {
                output::print_matches(tournament);
                output::print_standings(tournament);
                println!("Status: {:?}", tournament.status());
            })?;
        }
    }

    Ok(())
}

/// Registers a tournament for the teams in `roster` and generates its schedule.
fn create(
    store: &TournamentStore,
    config: &Config,
    roster: &Path,
) -> Result<TournamentId, Error> {
    let mut tournament = Tournament::new(
        registry::next_id(),
        config.kind,
        config.start_at,
        config.end_at,
    )
    .with_options(config.settings.clone());

    if let Some(location_id) = config.location_id {
        tournament = tournament.with_location(location_id);
    }

    for team in input::read_roster(roster)? {
        tournament
            .roster_mut()
            .insert(team)
            .map_err(club_tournament_core::Error::from)?;
    }

    let id = store.insert(tournament)?;
    let events = store.apply(id, |tournament| tournament.generate_schedule())?;

    log::info!(
        "Generated tournament {} ({} events)",
        id,
        events.len()
    );

    Ok(id)
}

/// Applies a single result. Rejected results are logged and skipped.
fn play(store: &TournamentStore, id: TournamentId, result: &MatchResult) {
    let res = match result.outcome.score() {
        Some(score) => store.apply(id, |tournament| {
            tournament.finish_match(result.match_id, score)
        }),
        None => store.apply(id, |tournament| tournament.cancel_match(result.match_id)),
    };

    if let Err(err) = res {
        log::warn!("Skipping result for match {}: {}", result.match_id, err);
    }
}
