//! # Tournament registry
//!
//! The [`TournamentStore`] holds all live tournaments of a process. Operations on the same
//! tournament are serialized by its own lock, operations on different tournaments run
//! concurrently. The collaborators are shared by all tournaments behind a single lock.
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use snowflaked::sync::Generator;

use crate::sync::{
    CalendarService, GameService, GameUpdate, MemoryCalendar, MemoryGames, SyncAdapter,
};
use crate::tournament::{Tournament, TournamentKind, TournamentParts};
use crate::{Error, Event, GameId, Result, TournamentId};

const INSTANCE: u16 = 0;

static TOURNAMENT_ID: Generator = Generator::new_unchecked(INSTANCE);

/// Returns a new unique tournament id.
#[inline]
pub fn next_id() -> TournamentId {
    TournamentId(TOURNAMENT_ID.generate())
}

#[derive(Debug)]
pub struct TournamentStore<G = MemoryGames, C = MemoryCalendar> {
    tournaments: RwLock<HashMap<TournamentId, Arc<Mutex<Tournament>>>>,
    sync: Mutex<SyncAdapter<G, C>>,
}

impl<G, C> TournamentStore<G, C>
where
    G: GameService,
    C: CalendarService,
{
    pub fn new(sync: SyncAdapter<G, C>) -> Self {
        Self {
            tournaments: RwLock::new(HashMap::new()),
            sync: Mutex::new(sync),
        }
    }

    /// Creates a new empty tournament together with its calendar event.
    pub fn create(
        &self,
        kind: TournamentKind,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    ) -> Result<TournamentId> {
        self.insert(Tournament::new(next_id(), kind, start_at, end_at))
    }

    /// Registers an existing tournament, creating its calendar event if it has none.
    pub fn insert(&self, mut tournament: Tournament) -> Result<TournamentId> {
        self.sync.lock().create_calendar_event(&mut tournament)?;

        let id = tournament.id();
        log::debug!("Registering tournament {}", id);

        self.tournaments
            .write()
            .insert(id, Arc::new(Mutex::new(tournament)));
        Ok(id)
    }

    /// Resumes a persisted tournament and registers it.
    pub fn resume(&self, parts: TournamentParts) -> Result<TournamentId> {
        self.insert(Tournament::resume(parts)?)
    }

    /// Cancels the open games and deletes the calendar event of the tournament `id`, then
    /// removes it.
    ///
    /// # Errors
    ///
    /// If a collaborator fails the tournament stays registered and the deletion can be retried.
    /// Games that have already been cancelled are not cancelled again.
    pub fn delete(&self, id: TournamentId) -> Result<Tournament> {
        let handle = self.get(id)?;
        let mut tournament = handle.lock();

        tournament.retire_open_games();

        {
            let mut sync = self.sync.lock();
            sync.cancel_stale_games(&mut tournament)?;
            sync.delete_calendar_event(&mut tournament)?;
        }

        self.tournaments
            .write()
            .remove(&id)
            .ok_or(Error::UnknownTournament(id))?;

        log::info!("Deleted tournament {}", id);
        Ok(tournament.clone())
    }

    pub fn contains(&self, id: TournamentId) -> bool {
        self.tournaments.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.tournaments.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tournaments.read().is_empty()
    }

    /// Runs `f` with exclusive access to the tournament `id`.
    pub fn with<F, T>(&self, id: TournamentId, f: F) -> Result<T>
    where
        F: FnOnce(&mut Tournament) -> T,
    {
        let handle = self.get(id)?;
        let mut tournament = handle.lock();
        Ok(f(&mut tournament))
    }

    /// Runs the engine operation `f` on the tournament `id` and dispatches the events it
    /// produced to the collaborators.
    pub fn apply<F>(&self, id: TournamentId, f: F) -> Result<Vec<Event>>
    where
        F: FnOnce(&mut Tournament) -> Result<Vec<Event>>,
    {
        let handle = self.get(id)?;
        let mut tournament = handle.lock();

        let events = f(&mut tournament)?;
        self.sync.lock().dispatch(&mut tournament, &events)?;
        Ok(events)
    }

    /// Applies an update of an external `game` of the tournament `id`.
    pub fn apply_game_update(
        &self,
        id: TournamentId,
        game: GameId,
        update: &GameUpdate,
    ) -> Result<Vec<Event>> {
        let handle = self.get(id)?;
        let mut tournament = handle.lock();

        self.sync
            .lock()
            .apply_game_update(&mut tournament, game, update)
    }

    /// Retries the collaborator calls of the tournament `id` that failed before.
    pub fn sync_pending_games(&self, id: TournamentId) -> Result<usize> {
        let handle = self.get(id)?;
        let mut tournament = handle.lock();

        self.sync.lock().sync_pending_games(&mut tournament)
    }

    /// Runs `f` with shared access to the collaborators.
    pub fn with_sync<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&SyncAdapter<G, C>) -> T,
    {
        f(&self.sync.lock())
    }

    /// Runs `f` with exclusive access to the collaborators.
    pub fn with_sync_mut<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut SyncAdapter<G, C>) -> T,
    {
        f(&mut self.sync.lock())
    }

    fn get(&self, id: TournamentId) -> Result<Arc<Mutex<Tournament>>> {
        self.tournaments
            .read()
            .get(&id)
            .cloned()
            .ok_or(Error::UnknownTournament(id))
    }
}

impl Default for TournamentStore {
    fn default() -> Self {
        Self::new(SyncAdapter::new(MemoryGames::new(), MemoryCalendar::new()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    use chrono::{Duration, TimeZone, Utc};

    use super::{next_id, TournamentStore};
    use crate::sync::{GameUpdate, SyncError};
    use crate::tournament::TournamentKind;
    use crate::{Error, Event, MatchId, MatchStatus, Score, Slot, TeamId, TournamentId};

    fn store_with_knockout() -> (TournamentStore, TournamentId) {
        let store = TournamentStore::default();
        let start = Utc.with_ymd_and_hms(2023, 7, 1, 9, 0, 0).unwrap();

        let id = store
            .create(TournamentKind::Knockout, start, start + Duration::hours(8))
            .unwrap();

        store
            .with(id, |tournament| {
                for team in 1..=4 {
                    tournament
                        .add_team(TeamId(team), Some(team as u32), None)
                        .unwrap();
                }
            })
            .unwrap();

        store.apply(id, |t| t.generate_schedule()).unwrap();
        (store, id)
    }

    #[test]
    fn test_next_id_unique() {
        let ids: HashSet<TournamentId> = (0..64).map(|_| next_id()).collect();
        assert_eq!(ids.len(), 64);
    }

    #[test]
    fn test_create_delete() {
        let (store, id) = store_with_knockout();
        assert!(store.contains(id));
        assert_eq!(store.with_sync(|sync| sync.calendar().len()), 1);
        assert_eq!(store.with_sync(|sync| sync.games().games().len()), 2);

        let tournament = store.delete(id).unwrap();
        assert_eq!(tournament.calendar_event_id(), None);
        assert!(store.is_empty());
        assert!(store.with_sync(|sync| sync.calendar().is_empty()));
        assert!(store.with_sync(|sync| sync.games().games().is_empty()));

        assert_eq!(
            store.delete(id).unwrap_err(),
            Error::UnknownTournament(id)
        );
    }

    #[test]
    fn test_concurrent_duplicate_results() {
        let (store, id) = store_with_knockout();
        let store = Arc::new(store);

        let game = store
            .with(id, |t| t.get(MatchId(0)).and_then(|m| m.game_id))
            .unwrap()
            .unwrap();

        let update = GameUpdate {
            home_score: Some(3),
            away_score: Some(1),
            is_finished: true,
        };

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let update = update.clone();
                thread::spawn(move || store.apply_game_update(id, game, &update).unwrap())
            })
            .collect();

        let events: Vec<Vec<Event>> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        // Exactly one submission changed the tournament.
        assert_eq!(events.iter().filter(|events| !events.is_empty()).count(), 1);

        store
            .with(id, |t| {
                let m = t.get(MatchId(0)).unwrap();
                assert_eq!(m.status, MatchStatus::Finished);
                assert_eq!(m.score, Some(Score::new(3, 1)));
                assert_eq!(
                    t.get(MatchId(2)).unwrap().home.team(),
                    Some(TeamId(1))
                );
            })
            .unwrap();
    }

    #[test]
    fn test_failed_operation_is_not_dispatched() {
        let (store, id) = store_with_knockout();

        assert!(store
            .apply(id, |t| t.finish_match(MatchId(0), Score::new(1, 1)))
            .is_err());
        assert_eq!(store.with_sync(|sync| sync.games().games().len()), 2);
        assert!(store
            .with(id, |t| t.get(MatchId(0)).unwrap().score.is_none())
            .unwrap());
    }

    #[test]
    fn test_correction_with_unavailable_games() {
        let (store, id) = store_with_knockout();
        store
            .apply(id, |t| t.finish_match(MatchId(0), Score::new(1, 0)))
            .unwrap();
        store
            .apply(id, |t| t.finish_match(MatchId(1), Score::new(1, 0)))
            .unwrap();

        let last = store
            .with(id, |t| t.get(MatchId(2)).and_then(|m| m.game_id))
            .unwrap()
            .unwrap();

        store.with_sync_mut(|sync| sync.games_mut().set_unavailable(true));
        assert_eq!(
            store
                .apply(id, |t| t.finish_match(MatchId(0), Score::new(0, 1)))
                .unwrap_err(),
            Error::Sync(SyncError::Game("service unavailable".into()))
        );
        assert_eq!(
            store.with(id, |t| t.stale_games().to_vec()).unwrap(),
            [last]
        );

        store.with_sync_mut(|sync| sync.games_mut().set_unavailable(false));
        assert_eq!(store.sync_pending_games(id).unwrap(), 1);

        assert!(store.with_sync(|sync| !sync.games().games().contains_key(&last)));
        store
            .with(id, |t| {
                assert!(t.stale_games().is_empty());
                let game = t.get(MatchId(2)).unwrap().game_id.unwrap();
                assert_eq!(t.match_by_game(game).unwrap().home, Slot::Team(TeamId(4)));
            })
            .unwrap();
    }

    #[test]
    fn test_delete_retry() {
        let (store, id) = store_with_knockout();

        store.with_sync_mut(|sync| sync.calendar_mut().set_unavailable(true));
        assert_eq!(
            store.delete(id).unwrap_err(),
            Error::Sync(SyncError::Calendar("service unavailable".into()))
        );

        // The games are gone, the tournament and its calendar event are still there.
        assert!(store.contains(id));
        assert!(store.with_sync(|sync| sync.games().games().is_empty()));
        assert_eq!(store.with_sync(|sync| sync.calendar().len()), 1);
        assert!(store.with(id, |t| t.stale_games().is_empty()).unwrap());

        store.with_sync_mut(|sync| sync.calendar_mut().set_unavailable(false));
        let tournament = store.delete(id).unwrap();
        assert_eq!(tournament.calendar_event_id(), None);
        assert!(store.is_empty());
        assert!(store.with_sync(|sync| sync.calendar().is_empty()));
        assert_eq!(store.with_sync(|sync| sync.games().cancelled().len()), 2);
    }
}
