use std::fs;
use std::io;
use std::path::Path;

use club_tournament_core::{MatchId, Score, TournamentTeam};
use serde::de::{self, DeserializeOwned, Unexpected};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// A recorded match result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub match_id: MatchId,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outcome {
    Score {
        home: u32,
        away: u32,
    },
    /// Only `"cancelled": true` is accepted.
    Cancelled {
        #[serde(deserialize_with = "deserialize_true")]
        cancelled: bool,
    },
}

impl Outcome {
    pub fn score(&self) -> Option<Score> {
        match self {
            Self::Score { home, away } => Some(Score::new(*home, *away)),
            Self::Cancelled { .. } => None,
        }
    }
}

fn deserialize_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    if bool::deserialize(deserializer)? {
        Ok(true)
    } else {
        Err(de::Error::invalid_value(Unexpected::Bool(false), &"true"))
    }
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub fn read_roster<P>(path: P) -> Result<Vec<TournamentTeam>, InputError>
where
    P: AsRef<Path>,
{
    read_json(path)
}

pub fn read_results<P>(path: P) -> Result<Vec<MatchResult>, InputError>
where
    P: AsRef<Path>,
{
    read_json(path)
}

fn read_json<P, T>(path: P) -> Result<T, InputError>
where
    P: AsRef<Path>,
    T: DeserializeOwned,
{
    let buf = fs::read(path)?;
    Ok(serde_json::from_slice(&buf)?)
}

#[cfg(test)]
mod tests {
    use club_tournament_core::{MatchId, Score, TeamId, TournamentTeam};

    use super::{MatchResult, Outcome};

    #[test]
    fn test_parse_results() {
        let input = r#"[
            { "match_id": 0, "home": 2, "away": 1 },
            { "match_id": 3, "cancelled": true }
        ]"#;

        let results: Vec<MatchResult> = serde_json::from_str(input).unwrap();
        assert_eq!(results[0].match_id, MatchId(0));
        assert_eq!(results[0].outcome.score(), Some(Score::new(2, 1)));
        assert_eq!(results[1].outcome, Outcome::Cancelled { cancelled: true });
        assert_eq!(results[1].outcome.score(), None);

        assert!(serde_json::from_str::<MatchResult>(r#"{ "match_id": 3, "cancelled": false }"#)
            .is_err());
    }

    #[test]
    fn test_parse_roster() {
        let input = r#"[
            { "team": 10, "seed": 1 },
            { "team": 11, "group": "B", "metadata": { "name": "Rovers" } }
        ]"#;

        let roster: Vec<TournamentTeam> = serde_json::from_str(input).unwrap();
        assert_eq!(roster[0].team, TeamId(10));
        assert_eq!(roster[0].seed, Some(1));
        assert_eq!(roster[1].group.as_deref(), Some("B"));
        assert_eq!(roster[1].metadata["name"], "Rovers");
    }
}
