//! # club-tournament-core
//!
//! This crate contains the tournament engine of the club platform: it turns a roster of teams
//! into a concrete match plan and progresses that plan as results arrive.
//!
//! Three tournament kinds are supported, see [`TournamentKind`]: a round robin league, a
//! single elimination knockout bracket and a group stage feeding into a knockout bracket.
//!
//! Important types:
//! - [`Tournament`]: The aggregate owning the roster, the match arena and the bracket graph.
//! Every mutating operation is applied to a staged copy and committed atomically.
//! - [`TeamRoster`]: The registered teams with their seeds and groups.
//! - [`TournamentMatch`]: A single match. Matches live in an arena and refer to each other by
//! [`MatchId`].
//! - [`Slot`]: A side of a match, which can contain a team, a bye or a to-be-decided placeholder.
//! - [`BracketGraph`]: The winner-advances-to relation between matches.
//! - [`Standings`]: A ranked league or group table.
//! - [`SyncAdapter`]: The boundary to the externally owned games and calendar events.
//!
//! [`BracketGraph`]: bracket::BracketGraph
//! [`Standings`]: standings::Standings
//! [`SyncAdapter`]: sync::SyncAdapter
pub mod bracket;
pub mod error;
pub mod lifecycle;
pub mod options;
pub mod registry;
pub mod roster;
pub mod schedule;
pub mod stage;
pub mod standings;
pub mod sync;
pub mod tournament;

mod event;
mod id;
mod round_robin;
mod single_elimination;
mod utils;

pub use error::{Error, Result};
pub use event::Event;
pub use id::{CalendarEventId, GameId, LocationId, MatchId, TeamId, TournamentId};
pub use lifecycle::{MatchStatus, TournamentStatus};
pub use roster::{TeamRoster, TournamentTeam};
pub use tournament::{Tournament, TournamentKind};

use std::fmt::{self, Display, Formatter};
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A spot for a team in a match.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Team(TeamId),
    /// Permanently empty. The opponent advances without playing.
    Bye,
    /// Waiting for the result of a previous match or stage.
    Pending,
}

impl Slot {
    /// Returns `true` if the `Slot` is [`Team`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use club_tournament_core::{Slot, TeamId};
    /// let slot = Slot::Team(TeamId(1));
    /// assert!(slot.is_team());
    /// ```
    ///
    /// [`Team`]: Self::Team
    #[inline]
    pub fn is_team(&self) -> bool {
        matches!(self, Self::Team(_))
    }

    /// Returns `true` if the `Slot` is [`Bye`].
    ///
    /// [`Bye`]: Self::Bye
    #[inline]
    pub fn is_bye(&self) -> bool {
        matches!(self, Self::Bye)
    }

    /// Returns `true` if the `Slot` is [`Pending`].
    ///
    /// [`Pending`]: Self::Pending
    #[inline]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns the team in this slot, if any.
    #[inline]
    pub fn team(&self) -> Option<TeamId> {
        match self {
            Self::Team(team) => Some(*team),
            _ => None,
        }
    }
}

impl From<Option<TeamId>> for Slot {
    /// A `None` value becomes a [`Bye`](Slot::Bye).
    #[inline]
    fn from(team: Option<TeamId>) -> Self {
        match team {
            Some(team) => Self::Team(team),
            None => Self::Bye,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Home,
    Away,
}

impl Side {
    /// Returns the side a match at `slot` feeds into its next match: even slots feed the home
    /// side, odd slots the away side.
    #[inline]
    pub fn from_slot(slot: u32) -> Self {
        if slot % 2 == 0 {
            Self::Home
        } else {
            Self::Away
        }
    }
}

/// The final score of a match.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

impl Score {
    #[inline]
    pub const fn new(home: u32, away: u32) -> Self {
        Self { home, away }
    }

    /// Returns the side with the strictly higher score, or `None` for a draw.
    #[inline]
    pub fn winner(&self) -> Option<Side> {
        match self.home.cmp(&self.away) {
            std::cmp::Ordering::Greater => Some(Side::Home),
            std::cmp::Ordering::Less => Some(Side::Away),
            std::cmp::Ordering::Equal => None,
        }
    }

    #[inline]
    pub fn is_draw(&self) -> bool {
        self.home == self.away
    }
}

/// A tag distinguishing the phases of a tournament.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Stage {
    /// A plain round robin tournament.
    League,
    /// The round robin of a single group.
    Group(String),
    /// A knockout round with the given number of teams.
    Knockout(u32),
}

impl Stage {
    #[inline]
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }

    #[inline]
    pub fn is_knockout(&self) -> bool {
        matches!(self, Self::Knockout(_))
    }

    /// Returns the group key if this is a group stage.
    #[inline]
    pub fn group(&self) -> Option<&str> {
        match self {
            Self::Group(key) => Some(key),
            _ => None,
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::League => f.write_str("league"),
            Self::Group(key) => write!(f, "group-{}", key),
            Self::Knockout(2) => f.write_str("F"),
            Self::Knockout(4) => f.write_str("SF"),
            Self::Knockout(8) => f.write_str("QF"),
            Self::Knockout(n) => write!(f, "R{}", n),
        }
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "league" => Ok(Self::League),
            "F" => Ok(Self::Knockout(2)),
            "SF" => Ok(Self::Knockout(4)),
            "QF" => Ok(Self::Knockout(8)),
            _ => {
                if let Some(key) = s.strip_prefix("group-") {
                    if !key.is_empty() {
                        return Ok(Self::Group(key.to_owned()));
                    }
                } else if let Some(n) = s.strip_prefix('R') {
                    if let Ok(n) = n.parse() {
                        return Ok(Self::Knockout(n));
                    }
                }

                Err(format!("invalid stage: {}", s))
            }
        }
    }
}

impl From<Stage> for String {
    #[inline]
    fn from(stage: Stage) -> Self {
        stage.to_string()
    }
}

impl TryFrom<String> for Stage {
    type Error = String;

    #[inline]
    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

/// A match of two teams within a tournament.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentMatch {
    pub id: MatchId,
    pub home: Slot,
    pub away: Slot,
    /// The external game this match is played in.
    pub game_id: Option<GameId>,
    /// The match the winner advances to.
    pub next_match_id: Option<MatchId>,
    pub round: u32,
    /// The position of the match within its round.
    pub slot: u32,
    pub stage: Stage,
    pub status: MatchStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub score: Option<Score>,
}

impl TournamentMatch {
    /// Creates a new `pending` match without teams.
    pub fn new(id: MatchId, round: u32, slot: u32, stage: Stage) -> Self {
        Self {
            id,
            home: Slot::Pending,
            away: Slot::Pending,
            game_id: None,
            next_match_id: None,
            round,
            slot,
            stage,
            status: MatchStatus::Pending,
            scheduled_at: None,
            score: None,
        }
    }

    /// Returns `true` if one side of the match is a bye.
    #[inline]
    pub fn is_bye(&self) -> bool {
        self.home.is_bye() || self.away.is_bye()
    }

    /// Returns `true` if both slots contain a team.
    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.home.is_team() && self.away.is_team()
    }

    /// Returns the winning side of a finished match. A bye is won by the side that has a team.
    pub fn winning_side(&self) -> Option<Side> {
        if self.status != MatchStatus::Finished {
            return None;
        }

        match (self.home, self.away) {
            (Slot::Team(_), Slot::Bye) => Some(Side::Home),
            (Slot::Bye, Slot::Team(_)) => Some(Side::Away),
            _ => self.score.as_ref().and_then(Score::winner),
        }
    }

    /// Returns the winning team of a finished match.
    #[inline]
    pub fn winner(&self) -> Option<TeamId> {
        self.winning_side().and_then(|side| self[side].team())
    }
}

impl Index<Side> for TournamentMatch {
    type Output = Slot;

    #[inline]
    fn index(&self, side: Side) -> &Self::Output {
        match side {
            Side::Home => &self.home,
            Side::Away => &self.away,
        }
    }
}

impl IndexMut<Side> for TournamentMatch {
    #[inline]
    fn index_mut(&mut self, side: Side) -> &mut Self::Output {
        match side {
            Side::Home => &mut self.home,
            Side::Away => &mut self.away,
        }
    }
}
