use std::result;

use thiserror::Error;

use crate::lifecycle::{MatchStatus, Transition};
use crate::sync::SyncError;
use crate::{options, GameId, MatchId, TeamId, TournamentId};

/// An `Result<T>` using [`enum@Error`] as an error type.
pub type Result<T> = result::Result<T, Error>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("invalid roster: {0}")]
    InvalidRoster(#[from] InvalidRosterError),
    #[error("failed to generate schedule: {0}")]
    ScheduleGeneration(#[from] ScheduleGenerationError),
    #[error("invalid result: {0}")]
    InvalidResult(#[from] InvalidResultError),
    #[error("bracket integrity violated: {0}")]
    BracketIntegrity(#[from] BracketIntegrityError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("unknown match {0}")]
    UnknownMatch(MatchId),
    #[error("no match is linked to game {0}")]
    UnknownGame(GameId),
    #[error("unknown tournament {0}")]
    UnknownTournament(TournamentId),
    #[error("game {game} is already linked to match {linked}")]
    DuplicateGame { game: GameId, linked: MatchId },
    #[error(transparent)]
    Sync(#[from] SyncError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InvalidRosterError {
    #[error("team {0} is already registered")]
    DuplicateTeam(TeamId),
    #[error("team {0} is not registered")]
    UnknownTeam(TeamId),
    #[error("the roster is frozen until the schedule is regenerated")]
    RosterFrozen,
    #[error("not enough teams: required {required}, found {found}")]
    NotEnoughTeams { required: usize, found: usize },
    #[error("cannot distribute teams into {0} groups")]
    InvalidGroupCount(usize),
    #[error("team {0} has a group but the tournament has no group stage")]
    UnexpectedGroup(TeamId),
    #[error("team {0} has an empty group name")]
    EmptyGroup(TeamId),
    #[error("expected {expected} groups, found {found}")]
    GroupCountMismatch { expected: usize, found: usize },
    #[error("unbalanced groups: sizes range from {smallest} to {largest}")]
    UnbalancedGroups { smallest: usize, largest: usize },
    #[error("group {group} has {size} teams but at least {required} are required")]
    GroupTooSmall {
        group: String,
        size: usize,
        required: usize,
    },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ScheduleGenerationError {
    #[error("unsupported game mode {0:?}")]
    UnsupportedGameMode(String),
    #[error(transparent)]
    InvalidSettings(#[from] options::Error),
    #[error("value {value} for {key} is out of range")]
    OutOfRange { key: &'static str, value: u64 },
    #[error("a schedule has already been generated")]
    AlreadyGenerated,
    #[error("the schedule cannot be discarded after matches have been played")]
    AlreadyStarted,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InvalidResultError {
    #[error("knockout match {0} cannot end in a tie")]
    KnockoutTie(MatchId),
    #[error("match {0} cannot end in a draw in this game mode")]
    DrawNotAllowed(MatchId),
    #[error("missing score for match {0}")]
    MissingScore(MatchId),
    #[error("match {0} has no opponent to play against")]
    NotPlayable(MatchId),
    #[error("cannot change the result of {source_match}: match {dependent} has already started")]
    DownstreamAlreadyPlayed {
        source_match: MatchId,
        dependent: MatchId,
    },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BracketIntegrityError {
    #[error("match {from} refers to missing next match {to}")]
    DanglingNextMatch { from: MatchId, to: MatchId },
    #[error("match {0} is part of a cycle")]
    Cycle(MatchId),
    #[error("match {from} does not precede its next match {to}")]
    RoundOrder { from: MatchId, to: MatchId },
    #[error("match {0} is fed twice into the same slot")]
    SlotConflict(MatchId),
    #[error("match {0} has the same team in both slots")]
    SameTeam(MatchId),
    #[error("found {0} final matches, expected exactly one")]
    MultipleRoots(usize),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("cannot {transition} match {id} while it is {from}")]
pub struct TransitionError {
    pub id: MatchId,
    pub from: MatchStatus,
    pub transition: Transition,
}
