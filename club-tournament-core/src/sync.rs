//! # Synchronization with external collaborators
//!
//! Matches are played in externally owned games and every tournament is presented through an
//! externally owned calendar event. The [`SyncAdapter`] keeps both in step with the engine:
//! it consumes the [`Event`]s returned by committed [`Tournament`] operations and feeds game
//! updates back into the tournament.
//!
//! The collaborators are abstracted by the [`GameService`] and [`CalendarService`] traits.
//! [`MemoryGames`] and [`MemoryCalendar`] are in-memory implementations.
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tournament::Tournament;
use crate::{
    CalendarEventId, Event, GameId, LocationId, MatchId, MatchStatus, Result, TeamId,
};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("game service failed: {0}")]
    Game(String),
    #[error("calendar service failed: {0}")]
    Calendar(String),
}

/// The data a game is created with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRequest {
    pub tournament_match_id: MatchId,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub scheduled_at: DateTime<Utc>,
}

/// A state report of an external game.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameUpdate {
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub is_finished: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub location_id: Option<LocationId>,
}

pub trait GameService {
    fn create_game(&mut self, request: &GameRequest) -> std::result::Result<GameId, SyncError>;

    fn cancel_game(&mut self, game: GameId) -> std::result::Result<(), SyncError>;
}

pub trait CalendarService {
    fn create_event(
        &mut self,
        event: &CalendarEvent,
    ) -> std::result::Result<CalendarEventId, SyncError>;

    fn delete_event(&mut self, id: CalendarEventId) -> std::result::Result<(), SyncError>;
}

#[derive(Clone, Debug)]
pub struct SyncAdapter<G, C> {
    games: G,
    calendar: C,
}

impl<G, C> SyncAdapter<G, C>
where
    G: GameService,
    C: CalendarService,
{
    #[inline]
    pub fn new(games: G, calendar: C) -> Self {
        Self { games, calendar }
    }

    #[inline]
    pub fn games(&self) -> &G {
        &self.games
    }

    #[inline]
    pub fn games_mut(&mut self) -> &mut G {
        &mut self.games
    }

    #[inline]
    pub fn calendar(&self) -> &C {
        &self.calendar
    }

    #[inline]
    pub fn calendar_mut(&mut self) -> &mut C {
        &mut self.calendar
    }

    /// Creates the calendar event of `tournament`. An existing event is kept.
    pub fn create_calendar_event(&mut self, tournament: &mut Tournament) -> Result<CalendarEventId> {
        if let Some(id) = tournament.calendar_event_id() {
            return Ok(id);
        }

        let id = self.calendar.create_event(&CalendarEvent {
            start_at: tournament.start_at(),
            end_at: tournament.end_at(),
            location_id: tournament.location_id(),
        })?;

        log::debug!(
            "Created calendar event {} for tournament {}",
            id,
            tournament.id()
        );

        tournament.set_calendar_event_id(Some(id));
        Ok(id)
    }

    /// Deletes the calendar event of `tournament`, if it has one.
    pub fn delete_calendar_event(&mut self, tournament: &mut Tournament) -> Result<()> {
        if let Some(id) = tournament.calendar_event_id() {
            self.calendar.delete_event(id)?;
            tournament.set_calendar_event_id(None);
        }

        Ok(())
    }

    /// Reacts to the `events` of a committed operation on `tournament`.
    ///
    /// A game is created for every scheduled match that has a time and no game yet. The games
    /// of unscheduled and cancelled matches are cancelled.
    ///
    /// A failing collaborator does not stop the remaining events from being dispatched. The first
    /// error is returned; the operation itself stays committed. Games that could not be created
    /// or cancelled are picked up again by [`sync_pending_games`].
    ///
    /// [`sync_pending_games`]: Self::sync_pending_games
    pub fn dispatch(&mut self, tournament: &mut Tournament, events: &[Event]) -> Result<()> {
        let mut first = None;

        for event in events {
            let res = match event {
                Event::MatchScheduled { match_id, .. } => {
                    self.create_game(tournament, *match_id).map(drop)
                }
                Event::MatchUnscheduled {
                    match_id,
                    game_id: Some(game),
                }
                | Event::MatchCancelled {
                    match_id,
                    game_id: Some(game),
                } => {
                    log::debug!("Cancelling game {} of match {}", game, match_id);
                    self.cancel_game(tournament, *game)
                }
                _ => Ok(()),
            };

            if let Err(err) = res {
                log::warn!("Failed to sync tournament {}: {}", tournament.id(), err);
                first.get_or_insert(err);
            }
        }

        match first {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Applies an update of the external `game` to `tournament` and dispatches the resulting
    /// events.
    pub fn apply_game_update(
        &mut self,
        tournament: &mut Tournament,
        game: GameId,
        update: &GameUpdate,
    ) -> Result<Vec<Event>> {
        let events = tournament.apply_game_update(game, update)?;
        self.dispatch(tournament, &events)?;
        Ok(events)
    }

    /// Cancels the stale games of `tournament`, then creates the games of all scheduled matches
    /// that are still missing one. Returns the number of created games.
    pub fn sync_pending_games(&mut self, tournament: &mut Tournament) -> Result<usize> {
        let mut first = self.cancel_stale_games(tournament).err();

        let pending: Vec<MatchId> = tournament
            .matches()
            .iter()
            .filter(|m| m.status == MatchStatus::Scheduled && m.game_id.is_none())
            .map(|m| m.id)
            .collect();

        let mut created = 0;
        for id in pending {
            match self.create_game(tournament, id) {
                Ok(true) => created += 1,
                Ok(false) => (),
                Err(err) => {
                    log::warn!("Failed to create game for match {}: {}", id, err);
                    first.get_or_insert(err);
                }
            }
        }

        match first {
            Some(err) => Err(err),
            None => Ok(created),
        }
    }

    /// Cancels all games of `tournament` that are still waiting for their cancellation. Returns
    /// the number of cancelled games.
    pub fn cancel_stale_games(&mut self, tournament: &mut Tournament) -> Result<usize> {
        let mut first = None;
        let mut cancelled = 0;

        for game in tournament.stale_games().to_vec() {
            match self.cancel_game(tournament, game) {
                Ok(()) => cancelled += 1,
                Err(err) => {
                    log::warn!("Failed to cancel stale game {}: {}", game, err);
                    first.get_or_insert(err);
                }
            }
        }

        match first {
            Some(err) => Err(err),
            None => Ok(cancelled),
        }
    }

    /// Cancels `game`. It stays a stale game of `tournament` until the cancellation succeeds.
    fn cancel_game(&mut self, tournament: &mut Tournament, game: GameId) -> Result<()> {
        match self.games.cancel_game(game) {
            Ok(()) => {
                tournament.release_game(game);
                Ok(())
            }
            Err(err) => {
                tournament.retire_game(game);
                Err(err.into())
            }
        }
    }

    /// Creates and links a game for the match `id` based on its current state. Returns `false`
    /// if the match needs no game (anymore).
    fn create_game(&mut self, tournament: &mut Tournament, id: MatchId) -> Result<bool> {
        let request = match tournament.get(id) {
            Some(m) if m.status == MatchStatus::Scheduled && m.game_id.is_none() => {
                match (m.home.team(), m.away.team(), m.scheduled_at) {
                    (Some(home), Some(away), Some(scheduled_at)) => GameRequest {
                        tournament_match_id: id,
                        home_team_id: home,
                        away_team_id: away,
                        scheduled_at,
                    },
                    _ => return Ok(false),
                }
            }
            _ => return Ok(false),
        };

        let game = self.games.create_game(&request)?;
        tournament.link_game(id, game)?;

        log::debug!("Linked game {} to match {}", game, id);
        Ok(true)
    }
}

/// An in-memory [`GameService`].
#[derive(Clone, Debug, Default)]
pub struct MemoryGames {
    next_id: u64,
    games: BTreeMap<GameId, GameRequest>,
    cancelled: Vec<GameId>,
    unavailable: bool,
}

impl MemoryGames {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all active games.
    #[inline]
    pub fn games(&self) -> &BTreeMap<GameId, GameRequest> {
        &self.games
    }

    #[inline]
    pub fn cancelled(&self) -> &[GameId] {
        &self.cancelled
    }

    /// Returns the active game of the match `id`.
    pub fn game_of(&self, id: MatchId) -> Option<(GameId, &GameRequest)> {
        self.games
            .iter()
            .find(|(_, request)| request.tournament_match_id == id)
            .map(|(game, request)| (*game, request))
    }

    /// Makes every following call fail while `unavailable` is `true`.
    #[inline]
    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    fn check_available(&self) -> std::result::Result<(), SyncError> {
        if self.unavailable {
            Err(SyncError::Game(String::from("service unavailable")))
        } else {
            Ok(())
        }
    }
}

impl GameService for MemoryGames {
    fn create_game(&mut self, request: &GameRequest) -> std::result::Result<GameId, SyncError> {
        self.check_available()?;

        self.next_id += 1;
        let id = GameId(self.next_id);
        self.games.insert(id, request.clone());
        Ok(id)
    }

    fn cancel_game(&mut self, game: GameId) -> std::result::Result<(), SyncError> {
        self.check_available()?;

        match self.games.remove(&game) {
            Some(_) => {
                self.cancelled.push(game);
                Ok(())
            }
            None => Err(SyncError::Game(format!("unknown game {}", game))),
        }
    }
}

/// An in-memory [`CalendarService`].
#[derive(Clone, Debug, Default)]
pub struct MemoryCalendar {
    next_id: u64,
    events: BTreeMap<CalendarEventId, CalendarEvent>,
    unavailable: bool,
}

impl MemoryCalendar {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, id: CalendarEventId) -> Option<&CalendarEvent> {
        self.events.get(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Makes every following call fail while `unavailable` is `true`.
    #[inline]
    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    fn check_available(&self) -> std::result::Result<(), SyncError> {
        if self.unavailable {
            Err(SyncError::Calendar(String::from("service unavailable")))
        } else {
            Ok(())
        }
    }
}

impl CalendarService for MemoryCalendar {
    fn create_event(
        &mut self,
        event: &CalendarEvent,
    ) -> std::result::Result<CalendarEventId, SyncError> {
        self.check_available()?;

        self.next_id += 1;
        let id = CalendarEventId(self.next_id);
        self.events.insert(id, event.clone());
        Ok(id)
    }

    fn delete_event(&mut self, id: CalendarEventId) -> std::result::Result<(), SyncError> {
        self.check_available()?;

        match self.events.remove(&id) {
            Some(_) => Ok(()),
            None => Err(SyncError::Calendar(format!("unknown calendar event {}", id))),
        }
    }
}
