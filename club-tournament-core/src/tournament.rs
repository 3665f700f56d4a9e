//! # Tournament
//!
//! The [`Tournament`] aggregate owns the roster, the match arena and the bracket graph of a
//! single tournament. All mutating operations are applied to a staged copy of the tournament
//! and only committed if they succeed completely, so a failed operation never leaves a partially
//! advanced bracket behind.
//!
//! Operations return the [`Event`]s they produced. The caller hands them to a
//! [`SyncAdapter`] after the operation has been committed.
//!
//! [`SyncAdapter`]: crate::sync::SyncAdapter
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bracket::BracketGraph;
use crate::error::{InvalidResultError, ScheduleGenerationError};
use crate::lifecycle::Transition;
use crate::options::{GameMode, TournamentOptionValues, TournamentSettings};
use crate::schedule::{ScheduleGenerator, Timeline};
use crate::stage::{GroupStage, KnockoutStage};
use crate::standings::{Standings, StandingsCalculator};
use crate::sync::GameUpdate;
use crate::{
    CalendarEventId, Error, Event, GameId, LocationId, MatchId, MatchStatus, Result, Score,
    Slot, Stage, TeamId, TeamRoster, TournamentId, TournamentMatch, TournamentStatus,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentKind {
    /// Every team plays every other team once.
    RoundRobin,
    /// A single elimination bracket.
    Knockout,
    /// A round robin per group, followed by a knockout bracket of the best teams of every group.
    GroupsKnockout,
}

impl TournamentKind {
    #[inline]
    pub fn has_groups(self) -> bool {
        matches!(self, Self::GroupsKnockout)
    }
}

impl Display for TournamentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RoundRobin => "round_robin",
            Self::Knockout => "knockout",
            Self::GroupsKnockout => "groups_knockout",
        })
    }
}

impl FromStr for TournamentKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "round_robin" => Ok(Self::RoundRobin),
            "knockout" => Ok(Self::Knockout),
            "groups_knockout" => Ok(Self::GroupsKnockout),
            _ => Err(format!("invalid tournament kind: {}", s)),
        }
    }
}

/// The persisted state of a [`Tournament`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TournamentParts {
    pub id: TournamentId,
    pub kind: TournamentKind,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    #[serde(default)]
    pub location_id: Option<LocationId>,
    #[serde(default)]
    pub calendar_event_id: Option<CalendarEventId>,
    #[serde(default)]
    pub options: TournamentOptionValues,
    pub roster: TeamRoster,
    #[serde(default)]
    pub matches: Vec<TournamentMatch>,
    #[serde(default)]
    pub group_stage: Option<GroupStage>,
    #[serde(default)]
    pub knockout: Option<KnockoutStage>,
    pub status: TournamentStatus,
    #[serde(default)]
    pub stale_games: Vec<GameId>,
}

#[derive(Clone, Debug)]
pub struct Tournament {
    id: TournamentId,
    kind: TournamentKind,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    location_id: Option<LocationId>,
    calendar_event_id: Option<CalendarEventId>,
    options: TournamentOptionValues,
    settings: TournamentSettings,
    roster: TeamRoster,
    matches: Vec<TournamentMatch>,
    graph: BracketGraph,
    group_stage: Option<GroupStage>,
    knockout: Option<KnockoutStage>,
    status: TournamentStatus,
    /// Games that were detached from their matches but whose cancellation has not been
    /// confirmed by the game service yet.
    stale_games: Vec<GameId>,
}

impl Tournament {
    /// Creates a new empty tournament.
    pub fn new(
        id: TournamentId,
        kind: TournamentKind,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind,
            start_at,
            end_at,
            location_id: None,
            calendar_event_id: None,
            options: TournamentOptionValues::new(),
            settings: TournamentSettings::default(),
            roster: TeamRoster::new(),
            matches: Vec::new(),
            graph: BracketGraph::default(),
            group_stage: None,
            knockout: None,
            status: TournamentStatus::Draft,
            stale_games: Vec::new(),
        }
    }

    #[inline]
    pub fn with_options(mut self, options: TournamentOptionValues) -> Self {
        self.options = options;
        self
    }

    #[inline]
    pub fn with_location(mut self, location_id: LocationId) -> Self {
        self.location_id = Some(location_id);
        self
    }

    /// Resumes a tournament from its persisted state.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid or the matches do not form a valid bracket.
    pub fn resume(parts: TournamentParts) -> Result<Self> {
        let settings = if parts.matches.is_empty() {
            TournamentSettings::default()
        } else {
            TournamentSettings::from_values(parts.options.clone())?
        };

        let graph = BracketGraph::build(&parts.matches)?;

        Ok(Self {
            id: parts.id,
            kind: parts.kind,
            start_at: parts.start_at,
            end_at: parts.end_at,
            location_id: parts.location_id,
            calendar_event_id: parts.calendar_event_id,
            options: parts.options,
            settings,
            roster: parts.roster,
            matches: parts.matches,
            graph,
            group_stage: parts.group_stage,
            knockout: parts.knockout,
            status: parts.status,
            stale_games: parts.stale_games,
        })
    }

    pub fn into_parts(self) -> TournamentParts {
        TournamentParts {
            id: self.id,
            kind: self.kind,
            start_at: self.start_at,
            end_at: self.end_at,
            location_id: self.location_id,
            calendar_event_id: self.calendar_event_id,
            options: self.options,
            roster: self.roster,
            matches: self.matches,
            group_stage: self.group_stage,
            knockout: self.knockout,
            status: self.status,
            stale_games: self.stale_games,
        }
    }

    #[inline]
    pub fn id(&self) -> TournamentId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> TournamentKind {
        self.kind
    }

    #[inline]
    pub fn status(&self) -> TournamentStatus {
        self.status
    }

    #[inline]
    pub fn start_at(&self) -> DateTime<Utc> {
        self.start_at
    }

    #[inline]
    pub fn end_at(&self) -> DateTime<Utc> {
        self.end_at
    }

    #[inline]
    pub fn location_id(&self) -> Option<LocationId> {
        self.location_id
    }

    #[inline]
    pub fn calendar_event_id(&self) -> Option<CalendarEventId> {
        self.calendar_event_id
    }

    #[inline]
    pub(crate) fn set_calendar_event_id(&mut self, id: Option<CalendarEventId>) {
        self.calendar_event_id = id;
    }

    /// Returns the games that still have to be cancelled in the game service.
    #[inline]
    pub fn stale_games(&self) -> &[GameId] {
        &self.stale_games
    }

    /// Remembers `game` as detached until its cancellation is confirmed.
    pub(crate) fn retire_game(&mut self, game: GameId) {
        if !self.stale_games.contains(&game) {
            self.stale_games.push(game);
        }
    }

    /// Forgets `game` after the game service confirmed its cancellation.
    pub(crate) fn release_game(&mut self, game: GameId) {
        self.stale_games.retain(|stale| *stale != game);
    }

    /// Detaches the games of all matches that have not been settled. Used when the tournament
    /// is deleted.
    pub(crate) fn retire_open_games(&mut self) {
        let games: Vec<GameId> = self
            .matches
            .iter_mut()
            .filter(|m| !m.status.is_settled())
            .filter_map(|m| m.game_id.take())
            .collect();

        for game in games {
            self.retire_game(game);
        }
    }

    #[inline]
    pub fn options(&self) -> &TournamentOptionValues {
        &self.options
    }

    /// Replaces the settings of the tournament.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleGenerationError::AlreadyGenerated`] if the schedule has already been
    /// generated.
    pub fn set_options(&mut self, options: TournamentOptionValues) -> Result<()> {
        if !self.matches.is_empty() {
            return Err(ScheduleGenerationError::AlreadyGenerated.into());
        }

        self.options = options;
        Ok(())
    }

    /// Returns the typed settings the schedule was generated with.
    #[inline]
    pub fn settings(&self) -> &TournamentSettings {
        &self.settings
    }

    #[inline]
    pub fn roster(&self) -> &TeamRoster {
        &self.roster
    }

    #[inline]
    pub fn roster_mut(&mut self) -> &mut TeamRoster {
        &mut self.roster
    }

    /// Registers a team.
    ///
    /// # Errors
    ///
    /// Returns an error if the team is already registered or the schedule has been generated.
    pub fn add_team(
        &mut self,
        team: TeamId,
        seed: Option<u32>,
        group: Option<String>,
    ) -> Result<()> {
        self.roster.add_team(team, seed, group)?;
        Ok(())
    }

    /// Removes a registered team.
    ///
    /// # Errors
    ///
    /// Returns an error if the team is not registered or the schedule has been generated.
    pub fn remove_team(&mut self, team: TeamId) -> Result<()> {
        self.roster.remove_team(team)?;
        Ok(())
    }

    #[inline]
    pub fn matches(&self) -> &[TournamentMatch] {
        &self.matches
    }

    #[inline]
    pub fn get(&self, id: MatchId) -> Option<&TournamentMatch> {
        self.matches.get(id.index())
    }

    /// Returns the match linked to `game`.
    pub fn match_by_game(&self, game: GameId) -> Option<&TournamentMatch> {
        self.matches.iter().find(|m| m.game_id == Some(game))
    }

    #[inline]
    pub fn graph(&self) -> &BracketGraph {
        &self.graph
    }

    #[inline]
    pub fn group_stage(&self) -> Option<&GroupStage> {
        self.group_stage.as_ref()
    }

    #[inline]
    pub fn knockout_stage(&self) -> Option<&KnockoutStage> {
        self.knockout.as_ref()
    }

    /// Generates the schedule of the tournament and freezes the roster.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings or the roster are invalid or if the schedule has already
    /// been generated. The tournament is left unchanged.
    pub fn generate_schedule(&mut self) -> Result<Vec<Event>> {
        if !self.matches.is_empty() {
            return Err(ScheduleGenerationError::AlreadyGenerated.into());
        }

        let settings = TournamentSettings::from_values(self.options.clone())?;

        let schedule = ScheduleGenerator::new(
            self.roster.clone(),
            self.kind,
            settings.clone(),
            self.start_at,
        )
        .generate()?;

        if let Some(ends_at) = schedule.ends_at {
            if ends_at > self.end_at {
                log::warn!(
                    "Tournament {} is planned until {}, after its end at {}",
                    self.id,
                    ends_at,
                    self.end_at
                );
            }
        }

        self.settings = settings;
        self.roster = schedule.roster;
        self.matches = schedule.matches;
        self.graph = schedule.graph;
        self.group_stage = schedule.group_stage;
        self.knockout = schedule.knockout;
        self.status = TournamentStatus::Scheduled;

        log::info!(
            "Generated schedule for tournament {} with {} matches",
            self.id,
            self.matches.len()
        );

        Ok(schedule.events)
    }

    /// Discards the schedule and unfreezes the roster.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleGenerationError::AlreadyStarted`] if a match has been played.
    pub fn clear_schedule(&mut self) -> Result<Vec<Event>> {
        if self
            .matches
            .iter()
            .any(|m| m.status.is_started() && !m.is_bye())
        {
            return Err(ScheduleGenerationError::AlreadyStarted.into());
        }

        // The games of cancelled matches have been retired already.
        let events: Vec<Event> = self
            .matches
            .iter()
            .filter(|m| m.game_id.is_some() && m.status != MatchStatus::Cancelled)
            .map(|m| Event::MatchCancelled {
                match_id: m.id,
                game_id: m.game_id,
            })
            .collect();

        self.retire_games(&events);

        self.matches.clear();
        self.graph = BracketGraph::default();
        self.group_stage = None;
        self.knockout = None;
        self.roster.unfreeze();
        self.status = TournamentStatus::Draft;

        log::info!("Cleared schedule of tournament {}", self.id);

        Ok(events)
    }

    /// Starts the match `id`.
    pub fn start_match(&mut self, id: MatchId) -> Result<Vec<Event>> {
        self.transaction(|tournament| {
            let mut events = Vec::new();
            tournament.start(id, &mut events)?;
            Ok(events)
        })
    }

    /// Records the final `score` of the match `id` and advances the tournament.
    ///
    /// A scheduled match is started implicitly. Recording the same score again has no effect.
    /// A different score for a finished match corrects the result: the winner is advanced again,
    /// replacing the previous winner in every match that has not been started.
    ///
    /// # Errors
    ///
    /// Returns an [`InvalidResultError`] if the score is not allowed for the match or the
    /// correction would change a match that has already been started. The tournament is left
    /// unchanged.
    pub fn finish_match(&mut self, id: MatchId, score: Score) -> Result<Vec<Event>> {
        self.transaction(|tournament| {
            let mut events = Vec::new();
            tournament.finish(id, score, &mut events)?;
            Ok(events)
        })
    }

    /// Cancels the match `id`. Matches depending on its result stay pending.
    pub fn cancel_match(&mut self, id: MatchId) -> Result<Vec<Event>> {
        self.transaction(|tournament| {
            let mut events = Vec::new();

            let m = tournament.match_mut(id)?;
            m.status = m.status.apply(id, Transition::Cancel)?;
            events.push(Event::MatchCancelled {
                match_id: id,
                game_id: m.game_id,
            });

            let is_group = m.stage.is_group();
            log::info!("Cancelled match {} of tournament {}", id, tournament.id);

            if is_group {
                tournament.seat_qualifiers(id, &mut events)?;
            }

            tournament.update_status(&mut events);
            Ok(events)
        })
    }

    /// Links the external `game` to the match `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateGame`] if `game` is already linked to another match.
    pub fn link_game(&mut self, id: MatchId, game: GameId) -> Result<()> {
        if let Some(linked) = self.match_by_game(game) {
            if linked.id == id {
                return Ok(());
            }

            return Err(Error::DuplicateGame {
                game,
                linked: linked.id,
            });
        }

        let m = self.match_mut(id)?;
        if let Some(previous) = m.game_id.replace(game) {
            log::debug!("Replacing game {} of match {} with {}", previous, id, game);
        }

        Ok(())
    }

    /// Applies an update of an external game to its linked match.
    ///
    /// Updates that have already been applied are ignored.
    pub fn apply_game_update(&mut self, game: GameId, update: &GameUpdate) -> Result<Vec<Event>> {
        let m = self.match_by_game(game).ok_or(Error::UnknownGame(game))?;
        let (id, status) = (m.id, m.status);

        if update.is_finished {
            let score = match (update.home_score, update.away_score) {
                (Some(home), Some(away)) => Score::new(home, away),
                _ => return Err(InvalidResultError::MissingScore(id).into()),
            };

            self.finish_match(id, score)
        } else if status == MatchStatus::Scheduled {
            self.start_match(id)
        } else {
            Ok(Vec::new())
        }
    }

    /// Returns the tables of all groups, or the single table of a league.
    pub fn standings(&self) -> Vec<Standings> {
        let calculator = StandingsCalculator::new(&self.roster, self.settings.points);

        match (&self.group_stage, self.kind) {
            (Some(groups), _) => groups.standings(&calculator, &self.matches),
            (None, TournamentKind::RoundRobin) => {
                let teams: Vec<TeamId> = self.roster.ordered().iter().map(|t| t.team).collect();
                vec![calculator.calculate(None, &teams, &self.matches)]
            }
            (None, _) => Vec::new(),
        }
    }

    /// Returns all matches grouped by stage. Stages and matches are in round and slot order.
    pub fn matches_by_stage(&self) -> Vec<(Stage, Vec<&TournamentMatch>)> {
        let mut ordered: Vec<&TournamentMatch> = self.matches.iter().collect();
        ordered.sort_by_key(|m| (m.round, m.slot));

        let mut stages: Vec<(Stage, Vec<&TournamentMatch>)> = Vec::new();
        for m in ordered {
            match stages.iter_mut().find(|(stage, _)| *stage == m.stage) {
                Some((_, matches)) => matches.push(m),
                None => stages.push((m.stage.clone(), vec![m])),
            }
        }

        stages
    }

    fn transaction<F>(&mut self, f: F) -> Result<Vec<Event>>
    where
        F: FnOnce(&mut Self) -> Result<Vec<Event>>,
    {
        let mut staged = self.clone();

        match f(&mut staged) {
            Ok(events) => {
                staged.retire_games(&events);
                *self = staged;
                Ok(events)
            }
            Err(err) => {
                log::debug!("Rolling back tournament {}: {}", self.id, err);
                Err(err)
            }
        }
    }

    /// Records the games detached by `events` until the game service confirms their
    /// cancellation.
    fn retire_games(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::MatchUnscheduled {
                    game_id: Some(game),
                    ..
                }
                | Event::MatchCancelled {
                    game_id: Some(game),
                    ..
                } => self.retire_game(*game),
                _ => (),
            }
        }
    }

    #[inline]
    fn timeline(&self) -> Timeline {
        Timeline::new(self.start_at, &self.settings)
    }

    fn match_mut(&mut self, id: MatchId) -> Result<&mut TournamentMatch> {
        self.matches
            .get_mut(id.index())
            .ok_or(Error::UnknownMatch(id))
    }

    fn start(&mut self, id: MatchId, events: &mut Vec<Event>) -> Result<()> {
        let m = self.match_mut(id)?;
        m.status = m.status.apply(id, Transition::Start)?;
        events.push(Event::MatchStarted { match_id: id });

        if self.status == TournamentStatus::Scheduled {
            log::info!("Tournament {} is running", self.id);
            self.status = TournamentStatus::Running;
        }

        Ok(())
    }

    fn finish(&mut self, id: MatchId, score: Score, events: &mut Vec<Event>) -> Result<()> {
        let game_mode = self.settings.game_mode;
        let m = self
            .matches
            .get(id.index())
            .ok_or(Error::UnknownMatch(id))?;

        if !m.is_resolved() {
            return Err(InvalidResultError::NotPlayable(id).into());
        }

        if m.status == MatchStatus::Finished && m.score == Some(score) {
            log::debug!("Ignoring duplicate result for match {}", id);
            return Ok(());
        }

        if score.is_draw() {
            if m.stage.is_knockout() {
                return Err(InvalidResultError::KnockoutTie(id).into());
            }

            if game_mode == GameMode::NoDraws {
                return Err(InvalidResultError::DrawNotAllowed(id).into());
            }
        }

        let status = m.status;
        if status == MatchStatus::Scheduled {
            self.start(id, events)?;
        }

        let m = self.match_mut(id)?;
        if status == MatchStatus::Finished {
            log::info!(
                "Correcting result of match {} from {:?} to {:?}",
                id,
                m.score,
                score
            );
        } else {
            m.status = m.status.apply(id, Transition::Finish)?;
        }

        m.score = Some(score);
        events.push(Event::MatchFinished {
            match_id: id,
            winner: m.winner(),
        });

        let stage = m.stage.clone();
        match stage {
            Stage::Knockout(_) => {
                let timeline = self.timeline();
                self.graph
                    .advance(&mut self.matches, id, &timeline, events)?;
            }
            Stage::Group(_) => self.seat_qualifiers(id, events)?,
            Stage::League => (),
        }

        self.update_status(events);
        Ok(())
    }

    /// Hands the qualifiers of a complete group stage to the knockout stage. If the qualifiers
    /// have changed since they were last seated, the bracket is updated.
    fn seat_qualifiers(&mut self, source: MatchId, events: &mut Vec<Event>) -> Result<()> {
        let (qualifiers, seats) = match (&self.group_stage, &self.knockout) {
            (Some(groups), Some(knockout)) => {
                if !groups.is_complete(&self.matches) {
                    return Ok(());
                }

                let calculator = StandingsCalculator::new(&self.roster, self.settings.points);
                let standings = groups.standings(&calculator, &self.matches);
                let qualifiers = groups.qualifiers(&standings);

                if groups.seated() == Some(qualifiers.as_slice()) {
                    return Ok(());
                }

                let seats: Vec<_> = knockout.seat(&qualifiers).collect();
                (qualifiers, seats)
            }
            _ => return Ok(()),
        };

        log::info!(
            "Group stage of tournament {} complete, seating {} qualifiers",
            self.id,
            qualifiers.len()
        );

        let timeline = self.timeline();

        // Clear every changed slot first so that a team moving within the bracket never
        // occupies two slots at once.
        for (match_id, side, team) in &seats {
            let current = self.matches.get(match_id.index()).map(|m| m[*side]);
            if current != Some(Slot::Team(*team)) {
                self.graph
                    .vacate(&mut self.matches, source, *match_id, *side, events)?;
            }
        }

        for (match_id, side, team) in seats {
            self.graph.place(
                &mut self.matches,
                source,
                match_id,
                side,
                team,
                &timeline,
                events,
            )?;
        }

        if let Some(groups) = &mut self.group_stage {
            groups.set_seated(qualifiers.clone());
        }

        events.push(Event::QualifiersSeated { qualifiers });
        Ok(())
    }

    fn update_status(&mut self, events: &mut Vec<Event>) {
        if self.status == TournamentStatus::Finished {
            return;
        }

        let finished = match self.graph.root() {
            Some(root) => self
                .matches
                .get(root.index())
                .map_or(false, |m| m.status == MatchStatus::Finished),
            None => {
                !self.matches.is_empty() && self.matches.iter().all(|m| m.status.is_settled())
            }
        };

        if finished {
            log::info!("Tournament {} is finished", self.id);
            self.status = TournamentStatus::Finished;
            events.push(Event::TournamentFinished);
        }
    }
}
