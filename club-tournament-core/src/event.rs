use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{GameId, MatchId, TeamId};

/// A state change produced by a committed engine operation.
///
/// Events are returned to the caller after the operation has been committed. The
/// [`SyncAdapter`] consumes them to keep the external games in step with the matches.
///
/// [`SyncAdapter`]: crate::sync::SyncAdapter
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// Both slots of a match have been resolved.
    MatchScheduled {
        match_id: MatchId,
        home: TeamId,
        away: TeamId,
        scheduled_at: Option<DateTime<Utc>>,
    },
    /// A slot of a scheduled match has been replaced. The linked game is stale.
    MatchUnscheduled {
        match_id: MatchId,
        game_id: Option<GameId>,
    },
    MatchStarted {
        match_id: MatchId,
    },
    MatchFinished {
        match_id: MatchId,
        winner: Option<TeamId>,
    },
    MatchCancelled {
        match_id: MatchId,
        game_id: Option<GameId>,
    },
    /// The group stage is complete and its qualifiers have been placed into the bracket.
    QualifiersSeated {
        qualifiers: Vec<TeamId>,
    },
    TournamentFinished,
}
