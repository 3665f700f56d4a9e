//! # Match lifecycle
//!
//! Every [`TournamentMatch`] moves through the states of [`MatchStatus`]:
//!
//! ```text
//! pending -> scheduled -> running -> finished
//!    \           \           \
//!     `-----------`-----------`--> cancelled
//! ```
//!
//! A match is `pending` while at least one of its slots is unresolved. Once both slots resolve it
//! becomes `scheduled`. The external game drives `running` and `finished`. Byes are finished
//! without being played ([`Transition::Walkover`]). A `scheduled` match whose slot is replaced by
//! a result correction falls back to `pending` ([`Transition::Unschedule`]).
//!
//! [`TournamentMatch`]: crate::TournamentMatch
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::TransitionError;
use crate::MatchId;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Scheduled,
    Running,
    Finished,
    Cancelled,
}

impl MatchStatus {
    /// Returns `true` if the match can no longer change its state (apart from result
    /// corrections on a finished match).
    #[inline]
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }

    /// Returns `true` if the match has been started or played.
    #[inline]
    pub fn is_started(self) -> bool {
        matches!(self, Self::Running | Self::Finished)
    }

    /// Returns `true` if `transition` is allowed from the current state.
    ///
    /// # Examples
    ///
    /// ```
    /// # use club_tournament_core::lifecycle::{MatchStatus, Transition};
    /// assert!(MatchStatus::Scheduled.can_apply(Transition::Start));
    /// assert!(!MatchStatus::Finished.can_apply(Transition::Cancel));
    /// ```
    pub fn can_apply(self, transition: Transition) -> bool {
        use MatchStatus::*;

        match transition {
            Transition::Schedule => self == Pending,
            Transition::Unschedule => self == Scheduled,
            Transition::Start => self == Scheduled,
            Transition::Finish => self == Running,
            Transition::Walkover => matches!(self, Pending | Scheduled),
            Transition::Cancel => matches!(self, Pending | Scheduled | Running),
        }
    }

    /// Applies `transition` to the match with the given `id`, returning the new state.
    ///
    /// # Errors
    ///
    /// Returns a [`TransitionError`] if the transition is not allowed from the current state.
    pub fn apply(self, id: MatchId, transition: Transition) -> Result<Self, TransitionError> {
        if self.can_apply(transition) {
            log::debug!("Match {}: {} -> {}", id, self, transition.target());
            Ok(transition.target())
        } else {
            Err(TransitionError {
                id,
                from: self,
                transition,
            })
        }
    }
}

impl Display for MatchStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Scheduled => "scheduled",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Cancelled => "cancelled",
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Both slots have been resolved.
    Schedule,
    /// A slot was replaced after the match had been scheduled.
    Unschedule,
    /// The game reported its start.
    Start,
    /// The game reported its final score.
    Finish,
    /// The match is won without being played.
    Walkover,
    Cancel,
}

impl Transition {
    /// Returns the state a match is in after this transition.
    #[inline]
    pub fn target(self) -> MatchStatus {
        match self {
            Self::Schedule => MatchStatus::Scheduled,
            Self::Unschedule => MatchStatus::Pending,
            Self::Start => MatchStatus::Running,
            Self::Finish | Self::Walkover => MatchStatus::Finished,
            Self::Cancel => MatchStatus::Cancelled,
        }
    }
}

impl Display for Transition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Schedule => "schedule",
            Self::Unschedule => "unschedule",
            Self::Start => "start",
            Self::Finish => "finish",
            Self::Walkover => "walk over",
            Self::Cancel => "cancel",
        })
    }
}

/// The state of a whole tournament.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// The roster is still open.
    Draft,
    /// The schedule has been generated.
    Scheduled,
    /// At least one match has been started.
    Running,
    Finished,
}

#[cfg(test)]
mod tests {
    use serde_test::{assert_tokens, Token};

    use super::{MatchStatus, Transition};
    use crate::error::TransitionError;
    use crate::MatchId;

    #[test]
    fn test_match_status_apply() {
        let id = MatchId(0);

        let status = MatchStatus::Pending;
        let status = status.apply(id, Transition::Schedule).unwrap();
        assert_eq!(status, MatchStatus::Scheduled);
        let status = status.apply(id, Transition::Start).unwrap();
        assert_eq!(status, MatchStatus::Running);
        let status = status.apply(id, Transition::Finish).unwrap();
        assert_eq!(status, MatchStatus::Finished);

        assert_eq!(
            status.apply(id, Transition::Cancel).unwrap_err(),
            TransitionError {
                id,
                from: MatchStatus::Finished,
                transition: Transition::Cancel,
            }
        );
    }

    #[test]
    fn test_match_status_illegal() {
        let id = MatchId(3);

        assert!(MatchStatus::Pending.apply(id, Transition::Start).is_err());
        assert!(MatchStatus::Pending.apply(id, Transition::Finish).is_err());
        assert!(MatchStatus::Scheduled.apply(id, Transition::Finish).is_err());
        assert!(MatchStatus::Cancelled.apply(id, Transition::Schedule).is_err());
        assert!(MatchStatus::Running.apply(id, Transition::Walkover).is_err());
    }

    #[test]
    fn test_match_status_cancel() {
        let id = MatchId(1);

        for status in [
            MatchStatus::Pending,
            MatchStatus::Scheduled,
            MatchStatus::Running,
        ] {
            assert_eq!(
                status.apply(id, Transition::Cancel).unwrap(),
                MatchStatus::Cancelled
            );
        }
    }

    #[test]
    fn test_match_status_serde() {
        assert_tokens(
            &MatchStatus::Scheduled,
            &[Token::UnitVariant {
                name: "MatchStatus",
                variant: "scheduled",
            }],
        );
    }
}
