//! # Tournament Options
//!
//! The settings of a tournament arrive as an untyped key-value blob ([`TournamentOptionValues`]).
//! They are merged against the declared set of recognised keys ([`TournamentOptions`]) and then
//! translated into the typed [`TournamentSettings`] once, when the schedule is generated.
//! [`OptionValue`] contains all types supported.
mod serde_impl;

use std::collections::{
    hash_map::{Iter, Keys},
    HashMap,
};
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ScheduleGenerationError;
use crate::standings::PointsRule;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error("unknown key {0}")]
    UnknownKey(String),
    #[error("invalid value for {key}: expected {expected}, found {found}")]
    InvalidValue {
        key: String,
        found: &'static str,
        expected: &'static str,
    },
}

/// A list of options for a tournament. `TournamentOptions` includes the names and default values
/// and should be used to describe a list of options. [`TournamentOptionValues`] should be used
/// when just expecting a list of key-value pairs.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TournamentOptions(HashMap<String, TournamentOption>);

impl TournamentOptions {
    /// Creates a new [`Builder`].
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Returns the option with the given `key`. Returns `None` if the given key does not exist
    pub fn get(&self, key: &str) -> Option<&TournamentOption> {
        self.0.get(key)
    }

    /// Inserts a new [`TournamentOption`] with the provided `key`, overwriting the previous value
    /// if it exists.
    pub fn insert<K>(&mut self, key: K, option: TournamentOption)
    where
        K: ToString,
    {
        self.0.insert(key.to_string(), option);
    }

    /// Returns an iterator over all keys.
    pub fn keys(&self) -> Keys<'_, String, TournamentOption> {
        self.0.keys()
    }

    /// Returns an iterator over all [`TournamentOption`]s.
    pub fn iter(&self) -> Iter<'_, String, TournamentOption> {
        self.0.iter()
    }
}

/// A list of optional key-values for a tournament which only contains the values.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TournamentOptionValues(HashMap<String, OptionValue>);

impl TournamentOptionValues {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the [`OptionValue`] with the given `key`. Returns `None` if no value exist for the
    /// given `key`.
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.0.get(key)
    }

    pub fn take(&mut self, key: &str) -> Option<OptionValue> {
        self.0.remove(key)
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: ToString,
        V: Into<OptionValue>,
    {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn iter(&self) -> Iter<'_, String, OptionValue> {
        self.0.iter()
    }

    /// Merges the values with the declared `options`. Every key in `self` must be declared in
    /// `options` with a value of the same type. Keys missing in `self` are filled with the
    /// declared defaults.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if a key is unknown or has a value of the wrong type.
    pub fn merge(mut self, mut options: TournamentOptions) -> Result<Self, Error> {
        for (key, value) in self.0.iter() {
            let default_value = match options.0.remove(key) {
                Some(value) => value,
                None => return Err(Error::UnknownKey(key.to_owned())),
            };

            if default_value.value.value_type() != value.value_type() {
                return Err(Error::InvalidValue {
                    key: key.to_owned(),
                    found: value.value_type(),
                    expected: default_value.value.value_type(),
                });
            }
        }

        // Fill the unassigned fields with defaults.
        for (key, value) in options.0.into_iter() {
            self.0.insert(key, value.value);
        }

        Ok(self)
    }
}

impl<K, V> FromIterator<(K, V)> for TournamentOptionValues
where
    K: ToString,
    V: Into<OptionValue>,
{
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.to_string(), value.into()))
                .collect(),
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentOption {
    pub name: String,
    pub value: OptionValue,
}

/// The value of a [`TournamentOption`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    I64(i64),
    U64(u64),
    String(String),
}

impl OptionValue {
    /// Returns the name of the type of this value.
    pub fn value_type(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::I64(_) => "i64",
            Self::U64(_) => "u64",
            Self::String(_) => "string",
        }
    }

    /// Returns the contained [`Bool`] value or the provided default.
    ///
    /// # Examples
    ///
    /// ```
    /// # use club_tournament_core::options::OptionValue;
    /// let val = OptionValue::Bool(true);
    /// assert!(val.unwrap_bool_or(false));
    ///
    /// let val = OptionValue::U64(0);
    /// assert!(val.unwrap_bool_or(true));
    /// ```
    ///
    /// [`Bool`]: Self::Bool
    #[inline]
    pub fn unwrap_bool_or(self, default: bool) -> bool {
        match self {
            Self::Bool(val) => val,
            _ => default,
        }
    }

    /// Returns the contained [`U64`] value or the provided default.
    ///
    /// [`U64`]: Self::U64
    #[inline]
    pub fn unwrap_u64_or(self, default: u64) -> u64 {
        match self {
            Self::U64(val) => val,
            _ => default,
        }
    }

    /// Returns the contained [`String`] or computes it from the provided closure.
    ///
    /// [`String`]: Self::String
    #[inline]
    pub fn unwrap_string_or_else<F>(self, f: F) -> String
    where
        F: FnOnce() -> String,
    {
        match self {
            Self::String(val) => val,
            _ => f(),
        }
    }
}

impl From<bool> for OptionValue {
    #[inline]
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for OptionValue {
    #[inline]
    fn from(value: i64) -> Self {
        Self::I64(value)
    }
}

impl From<u64> for OptionValue {
    #[inline]
    fn from(value: u64) -> Self {
        Self::U64(value)
    }
}

impl<'a> From<&'a str> for OptionValue {
    #[inline]
    fn from(value: &'a str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for OptionValue {
    #[inline]
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// A builder for [`TournamentOptions`].
#[derive(Clone, Debug, Default)]
pub struct Builder {
    options: TournamentOptions,
}

impl Builder {
    /// Inserts a new [`TournamentOption`]. If the `key` already exists, it is overwritten.
    pub fn option<T, V>(mut self, key: &'static str, name: T, value: V) -> Self
    where
        T: ToString,
        V: Into<OptionValue>,
    {
        self.options.insert(
            key.to_string(),
            TournamentOption {
                name: name.to_string(),
                value: value.into(),
            },
        );
        self
    }

    /// Consumes the `Builder`, returning the collected [`TournamentOptions`].
    #[inline]
    pub fn build(self) -> TournamentOptions {
        self.options
    }
}

/// How matches are decided.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// League and group matches may end in a draw.
    Standard,
    /// Every match must have a winner.
    NoDraws,
}

impl GameMode {
    /// Parses a `game_mode` setting.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleGenerationError::UnsupportedGameMode`] for unrecognised modes.
    pub fn parse(s: &str) -> Result<Self, ScheduleGenerationError> {
        match s {
            "standard" => Ok(Self::Standard),
            "no_draws" => Ok(Self::NoDraws),
            _ => Err(ScheduleGenerationError::UnsupportedGameMode(s.to_owned())),
        }
    }
}

impl Display for GameMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Standard => "standard",
            Self::NoDraws => "no_draws",
        })
    }
}

/// Upper bound for any duration in minutes (one week).
const MAX_MINUTES: u64 = 7 * 24 * 60;

/// The typed settings of a tournament.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentSettings {
    pub round_duration_minutes: u64,
    pub break_minutes: u64,
    pub game_mode: GameMode,
    pub number_of_groups: u64,
    pub qualifiers_per_group: u64,
    pub points: PointsRule,
    /// Whether matches with unresolved slots get a provisional time when the schedule is
    /// generated. Otherwise the time is computed once both slots are resolved.
    pub provisional_times: bool,
}

impl TournamentSettings {
    /// Returns the [`TournamentOptions`] recognised in the settings of a tournament.
    pub fn options() -> TournamentOptions {
        TournamentOptions::builder()
            .option(
                "round_duration_minutes",
                "Length of a single match in minutes",
                90u64,
            )
            .option("break_minutes", "Break between two matches in minutes", 15u64)
            .option("game_mode", "How matches are decided", "standard")
            .option("number_of_groups", "Number of groups in the group stage", 2u64)
            .option(
                "qualifiers_per_group",
                "Teams per group advancing to the knockout stage",
                2u64,
            )
            .option("points_win", "Points awarded for a win", 3u64)
            .option("points_draw", "Points awarded for a draw", 1u64)
            .option("points_loss", "Points awarded for a loss", 0u64)
            .option(
                "provisional_times",
                "Assign times to matches before their teams are known",
                true,
            )
            .build()
    }

    /// Translates the untyped `values` into `TournamentSettings`, filling missing keys with
    /// their defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ScheduleGenerationError`] if a key is unknown, has the wrong type, is out of
    /// range or if the game mode is not supported.
    pub fn from_values(values: TournamentOptionValues) -> Result<Self, ScheduleGenerationError> {
        let mut values = values.merge(Self::options())?;

        let mut take_u64 = |key: &'static str| values.take(key).map_or(0, |v| v.unwrap_u64_or(0));

        let round_duration_minutes = take_u64("round_duration_minutes");
        let break_minutes = take_u64("break_minutes");
        let number_of_groups = take_u64("number_of_groups");
        let qualifiers_per_group = take_u64("qualifiers_per_group");
        let points = PointsRule {
            win: take_u64("points_win"),
            draw: take_u64("points_draw"),
            loss: take_u64("points_loss"),
        };

        let game_mode = values
            .take("game_mode")
            .map(|v| v.unwrap_string_or_else(String::new))
            .unwrap_or_default();
        let game_mode = GameMode::parse(&game_mode)?;

        let provisional_times = values
            .take("provisional_times")
            .map_or(true, |v| v.unwrap_bool_or(true));

        for (key, value, min, max) in [
            ("round_duration_minutes", round_duration_minutes, 1, MAX_MINUTES),
            ("break_minutes", break_minutes, 0, MAX_MINUTES),
            ("number_of_groups", number_of_groups, 1, 64),
            ("qualifiers_per_group", qualifiers_per_group, 1, 64),
        ] {
            if value < min || value > max {
                return Err(ScheduleGenerationError::OutOfRange { key, value });
            }
        }

        Ok(Self {
            round_duration_minutes,
            break_minutes,
            game_mode,
            number_of_groups,
            qualifiers_per_group,
            points,
            provisional_times,
        })
    }
}

impl Default for TournamentSettings {
    fn default() -> Self {
        Self {
            round_duration_minutes: 90,
            break_minutes: 15,
            game_mode: GameMode::Standard,
            number_of_groups: 2,
            qualifiers_per_group: 2,
            points: PointsRule::default(),
            provisional_times: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, GameMode, TournamentOptionValues, TournamentSettings};
    use crate::error::ScheduleGenerationError;
    use crate::option_values;

    #[test]
    fn test_settings_defaults() {
        let settings = TournamentSettings::from_values(TournamentOptionValues::new()).unwrap();
        assert_eq!(settings, TournamentSettings::default());
    }

    #[test]
    fn test_settings_values() {
        let values = option_values!(
            "round_duration_minutes" => 40u64,
            "break_minutes" => 5u64,
            "game_mode" => "no_draws",
            "points_win" => 2u64,
            "provisional_times" => false,
        );

        let settings = TournamentSettings::from_values(values).unwrap();
        assert_eq!(settings.round_duration_minutes, 40);
        assert_eq!(settings.break_minutes, 5);
        assert_eq!(settings.game_mode, GameMode::NoDraws);
        assert_eq!(settings.points.win, 2);
        assert_eq!(settings.points.draw, 1);
        assert!(!settings.provisional_times);
    }

    #[test]
    fn test_settings_invalid() {
        let values = option_values!("penalties" => true);
        assert_eq!(
            TournamentSettings::from_values(values).unwrap_err(),
            ScheduleGenerationError::InvalidSettings(Error::UnknownKey("penalties".into()))
        );

        let values = option_values!("break_minutes" => "ten");
        assert_eq!(
            TournamentSettings::from_values(values).unwrap_err(),
            ScheduleGenerationError::InvalidSettings(Error::InvalidValue {
                key: "break_minutes".into(),
                found: "string",
                expected: "u64",
            })
        );

        let values = option_values!("game_mode" => "golden_goal");
        assert_eq!(
            TournamentSettings::from_values(values).unwrap_err(),
            ScheduleGenerationError::UnsupportedGameMode("golden_goal".into())
        );

        let values = option_values!("round_duration_minutes" => 0u64);
        assert_eq!(
            TournamentSettings::from_values(values).unwrap_err(),
            ScheduleGenerationError::OutOfRange {
                key: "round_duration_minutes",
                value: 0
            }
        );
    }

    #[test]
    fn test_settings_from_json() {
        let values: TournamentOptionValues =
            serde_json::from_str(r#"{"number_of_groups": 4, "game_mode": "standard"}"#).unwrap();

        let settings = TournamentSettings::from_values(values).unwrap();
        assert_eq!(settings.number_of_groups, 4);
        assert_eq!(settings.game_mode, GameMode::Standard);
    }
}
