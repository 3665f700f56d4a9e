use std::env;
use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use club_tournament_core::options::TournamentOptionValues;
use club_tournament_core::{LocationId, TournamentKind};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use thiserror::Error;

macro_rules! from_environment {
    ($config:expr, $($key:expr, $name:tt),*$(,)?) => {{
        $(
            {
                if let Ok(value) = env::var($key) {
                    match value.parse() {
                        Ok(value) => $config.$name = value,
                        Err(_) => return Err(ConfigError::InvalidField($key)),
                    }
                }
            }
        )*
    }};
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_loglevel")]
    pub loglevel: LevelFilter,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    #[serde(default)]
    pub location_id: Option<LocationId>,
    pub kind: TournamentKind,
    #[serde(default)]
    pub settings: TournamentOptionValues,
}

impl Config {
    pub fn from_file<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let buf = fs::read(path)?;
        Ok(toml::from_slice(&buf)?)
    }

    /// Overrides all scalar fields that are set in the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] if a variable is set but cannot be parsed.
    pub fn with_environment(mut self) -> Result<Self, ConfigError> {
        from_environment!(
            self,
            "CT_LOGLEVEL",
            loglevel,
            "CT_START_AT",
            start_at,
            "CT_END_AT",
            end_at,
            "CT_KIND",
            kind,
        );

        if let Ok(value) = env::var("CT_LOCATION_ID") {
            let id = value
                .parse()
                .map_err(|_| ConfigError::InvalidField("CT_LOCATION_ID"))?;
            self.location_id = Some(id);
        }

        Ok(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        let start_at = Utc::now();

        Self {
            loglevel: default_loglevel(),
            start_at,
            end_at: start_at + Duration::days(1),
            location_id: None,
            kind: TournamentKind::Knockout,
            settings: TournamentOptionValues::new(),
        }
    }
}

fn default_loglevel() -> LevelFilter {
    LevelFilter::Info
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error("invalid config field: {0}")]
    InvalidField(&'static str),
}
