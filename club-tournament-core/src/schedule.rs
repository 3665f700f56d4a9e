//! # Schedule generation
//!
//! The [`ScheduleGenerator`] turns a roster into the complete initial match set of a tournament:
//! round robin pairings for leagues and groups, a single elimination bracket for the knockout
//! portion, the links between the bracket matches and the match times.
//!
//! Generation works on its own copy of the roster and either produces a complete [`Schedule`]
//! or fails without any effect.
use chrono::{DateTime, Duration, Utc};

use crate::bracket::BracketGraph;
use crate::error::{InvalidRosterError, ScheduleGenerationError};
use crate::lifecycle::Transition;
use crate::options::TournamentSettings;
use crate::round_robin::RoundRobin;
use crate::single_elimination::SingleElimination;
use crate::stage::{GroupStage, KnockoutStage};
use crate::tournament::TournamentKind;
use crate::{
    Event, MatchId, MatchStatus, Result, Slot, Stage, TeamId, TeamRoster, TournamentMatch,
};

/// Assigns times to matches.
///
/// Matches are played one after another. Every match takes the configured duration and is
/// followed by a break. An additional break separates two rounds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Timeline {
    start_at: DateTime<Utc>,
    match_duration: Duration,
    break_duration: Duration,
}

impl Timeline {
    pub fn new(start_at: DateTime<Utc>, settings: &TournamentSettings) -> Self {
        Self {
            start_at,
            match_duration: Duration::minutes(settings.round_duration_minutes as i64),
            break_duration: Duration::minutes(settings.break_minutes as i64),
        }
    }

    #[inline]
    pub fn start_at(&self) -> DateTime<Utc> {
        self.start_at
    }

    #[inline]
    pub fn match_duration(&self) -> Duration {
        self.match_duration
    }

    /// Returns the time of a match following a round that started at `latest`.
    #[inline]
    pub fn after(&self, latest: DateTime<Utc>) -> DateTime<Utc> {
        latest + self.match_duration + self.break_duration * 2
    }

    /// Assigns sequential times to `matches` in round and slot order. Byes are skipped. Matches
    /// with unresolved slots are only timed if `provisional` is set.
    ///
    /// Returns the end of the last match.
    pub fn assign(
        &self,
        matches: &mut [TournamentMatch],
        provisional: bool,
    ) -> Option<DateTime<Utc>> {
        let mut order: Vec<usize> = (0..matches.len()).collect();
        order.sort_by_key(|&index| (matches[index].round, matches[index].slot));

        let mut next = self.start_at;
        let mut round = None;
        let mut end = None;

        for index in order {
            let m = &mut matches[index];
            if m.is_bye() || (!provisional && !m.is_resolved()) {
                continue;
            }

            if round.map_or(false, |round| round != m.round) {
                next = next + self.break_duration;
            }

            m.scheduled_at = Some(next);
            end = Some(next + self.match_duration);

            next = next + self.match_duration + self.break_duration;
            round = Some(m.round);
        }

        end
    }
}

/// The generated match plan of a tournament.
#[derive(Clone, Debug)]
pub struct Schedule {
    /// The frozen roster the schedule was generated from, with all group assignments.
    pub roster: TeamRoster,
    pub matches: Vec<TournamentMatch>,
    pub graph: BracketGraph,
    pub group_stage: Option<GroupStage>,
    pub knockout: Option<KnockoutStage>,
    pub events: Vec<Event>,
    /// The end of the last match with a known time.
    pub ends_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug)]
pub struct ScheduleGenerator {
    roster: TeamRoster,
    kind: TournamentKind,
    settings: TournamentSettings,
    start_at: DateTime<Utc>,
}

impl ScheduleGenerator {
    pub fn new(
        roster: TeamRoster,
        kind: TournamentKind,
        settings: TournamentSettings,
        start_at: DateTime<Utc>,
    ) -> Self {
        Self {
            roster,
            kind,
            settings,
            start_at,
        }
    }

    /// Generates the schedule.
    ///
    /// # Errors
    ///
    /// Returns an [`InvalidRosterError`] if the roster does not fit the tournament kind and
    /// settings. Teams without a group are distributed automatically for tournaments with
    /// groups.
    pub fn generate(mut self) -> Result<Schedule> {
        if self.roster.is_frozen() {
            return Err(ScheduleGenerationError::AlreadyGenerated.into());
        }

        self.validate()?;

        log::debug!(
            "Generating {:?} schedule for {} teams",
            self.kind,
            self.roster.len()
        );

        let mut matches = Vec::new();
        let mut group_stage = None;
        let mut knockout = None;

        match self.kind {
            TournamentKind::RoundRobin => {
                let teams: Vec<TeamId> = self.roster.ordered().iter().map(|t| t.team).collect();
                push_round_robin(&mut matches, &[(Stage::League, teams)], 1)?;
            }
            TournamentKind::Knockout => {
                let stage = push_knockout(&mut matches, self.roster.len(), 1);

                let seeded: Vec<TeamId> = self.roster.ordered().iter().map(|t| t.team).collect();
                for (id, side, team) in stage.seat(&seeded) {
                    matches[id.index()][side] = Slot::Team(team);
                }

                knockout = Some(stage);
            }
            TournamentKind::GroupsKnockout => {
                let groups = self.roster.groups();
                let stages: Vec<(Stage, Vec<TeamId>)> = groups
                    .iter()
                    .map(|(key, teams)| (Stage::Group(key.clone()), teams.clone()))
                    .collect();

                let rounds = push_round_robin(&mut matches, &stages, 1)?;

                let groups = GroupStage::new(groups, self.settings.qualifiers_per_group as usize);
                knockout = Some(push_knockout(
                    &mut matches,
                    groups.num_qualifiers(),
                    rounds + 1,
                ));
                group_stage = Some(groups);
            }
        }

        let timeline = Timeline::new(self.start_at, &self.settings);
        let ends_at = timeline.assign(&mut matches, self.settings.provisional_times);

        let graph = BracketGraph::build(&matches)?;

        let mut events = Vec::new();
        for m in &matches {
            match (m.status, m.home, m.away) {
                (MatchStatus::Scheduled, Slot::Team(home), Slot::Team(away)) => {
                    events.push(Event::MatchScheduled {
                        match_id: m.id,
                        home,
                        away,
                        scheduled_at: m.scheduled_at,
                    });
                }
                (MatchStatus::Finished, _, _) => events.push(Event::MatchFinished {
                    match_id: m.id,
                    winner: m.winner(),
                }),
                _ => (),
            }
        }

        // The teams of a plain knockout are known, so the first round can be resolved right
        // away.
        if self.kind == TournamentKind::Knockout {
            if let Some(stage) = &knockout {
                let mut leaves: Vec<MatchId> =
                    stage.leaves().iter().map(|leaf| leaf.match_id).collect();
                leaves.dedup();

                for id in leaves {
                    graph.resolve(&mut matches, id, &timeline, &mut events)?;
                }
            }
        }

        self.roster.freeze();

        log::debug!("Generated {} matches", matches.len());

        Ok(Schedule {
            roster: self.roster,
            matches,
            graph,
            group_stage,
            knockout,
            events,
            ends_at,
        })
    }

    fn validate(&mut self) -> std::result::Result<(), InvalidRosterError> {
        let found = self.roster.len();
        if found < 2 {
            return Err(InvalidRosterError::NotEnoughTeams { required: 2, found });
        }

        if !self.kind.has_groups() {
            if let Some(team) = self.roster.iter().find(|t| t.group.is_some()) {
                return Err(InvalidRosterError::UnexpectedGroup(team.team));
            }

            return Ok(());
        }

        let expected = self.settings.number_of_groups as usize;
        let qualifiers = self.settings.qualifiers_per_group as usize;

        if self.roster.iter().any(|t| t.group.is_none()) {
            self.roster.auto_assign_groups(expected)?;
        }

        let groups = self.roster.groups();
        if groups.len() != expected {
            return Err(InvalidRosterError::GroupCountMismatch {
                expected,
                found: groups.len(),
            });
        }

        let smallest = groups.values().map(Vec::len).min().unwrap_or(0);
        let largest = groups.values().map(Vec::len).max().unwrap_or(0);
        if largest - smallest > 1 {
            return Err(InvalidRosterError::UnbalancedGroups { smallest, largest });
        }

        let required = qualifiers.max(2);
        for (group, teams) in &groups {
            if teams.len() < required {
                return Err(InvalidRosterError::GroupTooSmall {
                    group: group.clone(),
                    size: teams.len(),
                    required,
                });
            }
        }

        if expected * qualifiers < 2 {
            return Err(InvalidRosterError::NotEnoughTeams {
                required: 2,
                found: expected * qualifiers,
            });
        }

        Ok(())
    }
}

/// Appends the round robin of every `(stage, teams)` pair to `matches`, playing the same round
/// of all stages together. Returns the number of rounds.
fn push_round_robin(
    matches: &mut Vec<TournamentMatch>,
    stages: &[(Stage, Vec<TeamId>)],
    first_round: u32,
) -> Result<u32> {
    let schedules: Vec<RoundRobin> = stages
        .iter()
        .map(|(_, teams)| RoundRobin::new(teams.len()))
        .collect();

    let num_rounds = schedules
        .iter()
        .map(|schedule| schedule.rounds().len())
        .max()
        .unwrap_or(0);

    for round in 0..num_rounds {
        let mut slot = 0;

        for ((stage, teams), schedule) in stages.iter().zip(&schedules) {
            let pairs = match schedule.rounds().get(round) {
                Some(pairs) => pairs,
                None => continue,
            };

            for [home, away] in pairs {
                let id = MatchId::from(matches.len());
                let mut m =
                    TournamentMatch::new(id, first_round + round as u32, slot, stage.clone());
                m.home = Slot::from(home.map(|index| teams[index]));
                m.away = Slot::from(away.map(|index| teams[index]));

                let transition = if m.is_bye() {
                    Transition::Walkover
                } else {
                    Transition::Schedule
                };
                m.status = m.status.apply(id, transition)?;

                matches.push(m);
                slot += 1;
            }
        }
    }

    Ok(num_rounds as u32)
}

/// Appends a bracket for `entrants` teams to `matches`.
fn push_knockout(
    matches: &mut Vec<TournamentMatch>,
    entrants: usize,
    first_round: u32,
) -> KnockoutStage {
    let (bracket, stage) =
        SingleElimination::new(entrants, MatchId::from(matches.len()), first_round).into_parts();
    matches.extend(bracket);
    stage
}
