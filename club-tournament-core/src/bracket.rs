//! # Bracket graph
//!
//! The winner-advances-to relation between matches. Every match refers to the match its winner
//! advances to by [`TournamentMatch::next_match_id`]. The [`BracketGraph`] is built from these
//! references, validated to be a forest with a single final, and used to write the winners of
//! finished matches into the slots of their next matches.
use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::{BracketIntegrityError, InvalidResultError};
use crate::lifecycle::Transition;
use crate::schedule::Timeline;
use crate::{Error, Event, MatchId, MatchStatus, Result, Side, Slot, TeamId, TournamentMatch};

/// The slot a match feeds its winner into.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    pub parent: MatchId,
    pub side: Side,
}

#[derive(Clone, Debug, Default)]
pub struct BracketGraph {
    next: HashMap<MatchId, Edge>,
    feeders: HashMap<MatchId, [Option<MatchId>; 2]>,
    root: Option<MatchId>,
}

impl BracketGraph {
    /// Builds the graph from the match arena.
    ///
    /// # Errors
    ///
    /// Returns a [`BracketIntegrityError`] if a match refers to a missing match, the references
    /// contain a cycle, a match does not precede its next match, two matches feed the same slot,
    /// a match has the same team in both slots or the knockout matches have more than one final.
    pub fn build(matches: &[TournamentMatch]) -> std::result::Result<Self, BracketIntegrityError> {
        let lookup = |id: MatchId| matches.get(id.index()).filter(|m| m.id == id);

        for m in matches {
            if let (Slot::Team(home), Slot::Team(away)) = (m.home, m.away) {
                if home == away {
                    return Err(BracketIntegrityError::SameTeam(m.id));
                }
            }
        }

        // 0 = unvisited, 1 = on the current path, 2 = done
        let mut state = vec![0u8; matches.len()];
        for start in 0..matches.len() {
            let mut path = Vec::new();
            let mut current = Some(start);

            while let Some(index) = current {
                match state[index] {
                    2 => break,
                    1 => return Err(BracketIntegrityError::Cycle(matches[index].id)),
                    _ => (),
                }

                state[index] = 1;
                path.push(index);

                current = match matches[index].next_match_id {
                    Some(next) => match lookup(next) {
                        Some(parent) => Some(parent.id.index()),
                        None => {
                            return Err(BracketIntegrityError::DanglingNextMatch {
                                from: matches[index].id,
                                to: next,
                            })
                        }
                    },
                    None => None,
                };
            }

            for index in path {
                state[index] = 2;
            }
        }

        let mut graph = Self::default();

        for m in matches {
            let next = match m.next_match_id {
                Some(next) => next,
                None => continue,
            };

            let parent = lookup(next).ok_or(BracketIntegrityError::DanglingNextMatch {
                from: m.id,
                to: next,
            })?;

            if m.round >= parent.round {
                return Err(BracketIntegrityError::RoundOrder {
                    from: m.id,
                    to: next,
                });
            }

            let side = Side::from_slot(m.slot);
            let feeder = &mut graph.feeders.entry(next).or_insert([None; 2])[side_index(side)];
            if feeder.is_some() {
                return Err(BracketIntegrityError::SlotConflict(next));
            }

            *feeder = Some(m.id);
            graph.next.insert(m.id, Edge { parent: next, side });
        }

        let roots: Vec<MatchId> = matches
            .iter()
            .filter(|m| m.stage.is_knockout() && m.next_match_id.is_none())
            .map(|m| m.id)
            .collect();

        graph.root = match roots.as_slice() {
            [] => None,
            [root] => Some(*root),
            roots => return Err(BracketIntegrityError::MultipleRoots(roots.len())),
        };

        log::debug!(
            "Built bracket graph with {} edges, root {:?}",
            graph.next.len(),
            graph.root
        );

        Ok(graph)
    }

    /// Returns the slot the winner of `id` advances to.
    #[inline]
    pub fn next(&self, id: MatchId) -> Option<Edge> {
        self.next.get(&id).copied()
    }

    /// Returns the matches feeding into `id`, home side first.
    pub fn feeders(&self, id: MatchId) -> Vec<MatchId> {
        self.feeders
            .get(&id)
            .map(|feeders| feeders.iter().flatten().copied().collect())
            .unwrap_or_default()
    }

    /// Returns the final of the knockout matches.
    #[inline]
    pub fn root(&self) -> Option<MatchId> {
        self.root
    }

    /// Writes the winner of the finished match `id` into its next match.
    ///
    /// Advancing the same winner again is a no-op.
    pub(crate) fn advance(
        &self,
        matches: &mut [TournamentMatch],
        id: MatchId,
        timeline: &Timeline,
        events: &mut Vec<Event>,
    ) -> Result<()> {
        let edge = match self.next(id) {
            Some(edge) => edge,
            None => return Ok(()),
        };

        let winner = match matches.get(id.index()).and_then(TournamentMatch::winner) {
            Some(winner) => winner,
            None => return Ok(()),
        };

        self.place(matches, id, edge.parent, edge.side, winner, timeline, events)
    }

    /// Places `team` into the `side` slot of `target`. `source` is the match whose result
    /// decided the placement.
    ///
    /// A different team already occupying the slot is replaced. A scheduled `target` falls back
    /// to `pending` and loses its game.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidResultError::DownstreamAlreadyPlayed`] if the slot is taken by a
    /// different team and `target` has already been started.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn place(
        &self,
        matches: &mut [TournamentMatch],
        source: MatchId,
        target: MatchId,
        side: Side,
        team: TeamId,
        timeline: &Timeline,
        events: &mut Vec<Event>,
    ) -> Result<()> {
        let m = matches
            .get_mut(target.index())
            .ok_or(Error::UnknownMatch(target))?;

        if m[side] == Slot::Team(team) {
            return Ok(());
        }

        if !reopen(m, source, events)? {
            log::debug!("Not advancing team {} into cancelled match {}", team, target);
            return Ok(());
        }

        if let Slot::Team(previous) = m[side] {
            log::info!(
                "Replacing team {} with {} in match {}",
                previous,
                team,
                target
            );
        }

        m[side] = Slot::Team(team);

        self.resolve(matches, target, timeline, events)
    }

    /// Clears the `side` slot of `target` so that it can be filled again by [`place`].
    ///
    /// [`place`]: Self::place
    pub(crate) fn vacate(
        &self,
        matches: &mut [TournamentMatch],
        source: MatchId,
        target: MatchId,
        side: Side,
        events: &mut Vec<Event>,
    ) -> Result<()> {
        let m = matches
            .get_mut(target.index())
            .ok_or(Error::UnknownMatch(target))?;

        if m[side].is_team() && reopen(m, source, events)? {
            m[side] = Slot::Pending;
        }

        Ok(())
    }

    /// Updates the state of `id` after one of its slots changed. A match with two teams becomes
    /// `scheduled`, a match with a team and a bye is won by the team without being played.
    pub(crate) fn resolve(
        &self,
        matches: &mut [TournamentMatch],
        id: MatchId,
        timeline: &Timeline,
        events: &mut Vec<Event>,
    ) -> Result<()> {
        let deferred = self.deferred_time(matches, id, timeline);

        let m = matches.get_mut(id.index()).ok_or(Error::UnknownMatch(id))?;

        match (m.home, m.away) {
            (Slot::Team(home), Slot::Team(away)) => {
                if home == away {
                    return Err(BracketIntegrityError::SameTeam(id).into());
                }

                if m.status != MatchStatus::Pending {
                    return Ok(());
                }

                m.status = m.status.apply(id, Transition::Schedule)?;
                if m.scheduled_at.is_none() {
                    m.scheduled_at = deferred;
                }

                events.push(Event::MatchScheduled {
                    match_id: id,
                    home,
                    away,
                    scheduled_at: m.scheduled_at,
                });

                Ok(())
            }
            (Slot::Team(_), Slot::Bye) | (Slot::Bye, Slot::Team(_)) => {
                if !m.status.can_apply(Transition::Walkover) {
                    return Ok(());
                }

                m.status = m.status.apply(id, Transition::Walkover)?;
                events.push(Event::MatchFinished {
                    match_id: id,
                    winner: m.winner(),
                });

                self.advance(matches, id, timeline, events)
            }
            _ => Ok(()),
        }
    }

    /// Returns the time for a match that has no provisional time yet: one match and two breaks
    /// after the latest of its feeders, or after the latest match of an earlier round.
    fn deferred_time(
        &self,
        matches: &[TournamentMatch],
        id: MatchId,
        timeline: &Timeline,
    ) -> Option<DateTime<Utc>> {
        let m = matches.get(id.index())?;
        if m.scheduled_at.is_some() {
            return m.scheduled_at;
        }

        let latest = self
            .feeders(id)
            .into_iter()
            .filter_map(|feeder| matches.get(feeder.index())?.scheduled_at)
            .max()
            .or_else(|| {
                matches
                    .iter()
                    .filter(|other| other.round < m.round)
                    .filter_map(|other| other.scheduled_at)
                    .max()
            });

        Some(match latest {
            Some(latest) => timeline.after(latest),
            None => timeline.start_at(),
        })
    }
}

/// Prepares `m` for a change of one of its slots. Returns `false` if `m` has been cancelled and
/// must stay untouched.
fn reopen(m: &mut TournamentMatch, source: MatchId, events: &mut Vec<Event>) -> Result<bool> {
    match m.status {
        MatchStatus::Pending => Ok(true),
        MatchStatus::Scheduled => {
            m.status = m.status.apply(m.id, Transition::Unschedule)?;
            events.push(Event::MatchUnscheduled {
                match_id: m.id,
                game_id: m.game_id.take(),
            });
            Ok(true)
        }
        // A walkover has not been played and can be decided again.
        MatchStatus::Finished if m.is_bye() => {
            log::debug!("Reopening walkover {}", m.id);
            m.status = MatchStatus::Pending;
            Ok(true)
        }
        MatchStatus::Running | MatchStatus::Finished => {
            log::warn!(
                "Rejecting change of match {}: it has already been started",
                m.id
            );

            Err(InvalidResultError::DownstreamAlreadyPlayed {
                source_match: source,
                dependent: m.id,
            }
            .into())
        }
        MatchStatus::Cancelled => Ok(false),
    }
}

#[inline]
fn side_index(side: Side) -> usize {
    match side {
        Side::Home => 0,
        Side::Away => 1,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{BracketGraph, Edge};
    use crate::error::{BracketIntegrityError, InvalidResultError};
    use crate::options::TournamentSettings;
    use crate::schedule::Timeline;
    use crate::single_elimination::SingleElimination;
    use crate::{
        Error, Event, MatchId, MatchStatus, Score, Side, Slot, Stage, TeamId, TournamentMatch,
    };

    fn timeline() -> Timeline {
        Timeline::new(
            Utc.with_ymd_and_hms(2023, 5, 1, 10, 0, 0).unwrap(),
            &TournamentSettings::default(),
        )
    }

    /// A four team bracket with teams 1 to 4 seated and the first round scheduled.
    fn bracket() -> (Vec<TournamentMatch>, BracketGraph) {
        let (mut matches, stage) = SingleElimination::new(4, MatchId(0), 1).into_parts();
        let seeded: Vec<_> = (1..=4).map(TeamId).collect();

        for (id, side, team) in stage.seat(&seeded) {
            matches[id.index()][side] = Slot::Team(team);
        }

        for m in &mut matches[..2] {
            m.status = MatchStatus::Scheduled;
        }

        let graph = BracketGraph::build(&matches).unwrap();
        (matches, graph)
    }

    fn finish(matches: &mut [TournamentMatch], id: usize, home: u32, away: u32) {
        matches[id].status = MatchStatus::Finished;
        matches[id].score = Some(Score::new(home, away));
    }

    #[test]
    fn test_build() {
        let (_, graph) = bracket();

        assert_eq!(graph.root(), Some(MatchId(2)));
        assert_eq!(
            graph.next(MatchId(0)),
            Some(Edge {
                parent: MatchId(2),
                side: Side::Home
            })
        );
        assert_eq!(
            graph.next(MatchId(1)),
            Some(Edge {
                parent: MatchId(2),
                side: Side::Away
            })
        );
        assert_eq!(graph.next(MatchId(2)), None);
        assert_eq!(graph.feeders(MatchId(2)), [MatchId(0), MatchId(1)]);
        assert!(graph.feeders(MatchId(0)).is_empty());
    }

    #[test]
    fn test_build_errors() {
        let knockout = |id: u64, round: u32, slot: u32, next: Option<u64>| {
            let mut m = TournamentMatch::new(MatchId(id), round, slot, Stage::Knockout(4));
            m.next_match_id = next.map(MatchId);
            m
        };

        let matches = [knockout(0, 1, 0, Some(5))];
        assert_eq!(
            BracketGraph::build(&matches).unwrap_err(),
            BracketIntegrityError::DanglingNextMatch {
                from: MatchId(0),
                to: MatchId(5)
            }
        );

        let matches = [knockout(0, 1, 0, Some(1)), knockout(1, 2, 0, Some(0))];
        assert_eq!(
            BracketGraph::build(&matches).unwrap_err(),
            BracketIntegrityError::Cycle(MatchId(0))
        );

        let matches = [knockout(0, 2, 0, Some(1)), knockout(1, 2, 0, None)];
        assert_eq!(
            BracketGraph::build(&matches).unwrap_err(),
            BracketIntegrityError::RoundOrder {
                from: MatchId(0),
                to: MatchId(1)
            }
        );

        let matches = [
            knockout(0, 1, 0, Some(2)),
            knockout(1, 1, 2, Some(2)),
            knockout(2, 2, 0, None),
        ];
        assert_eq!(
            BracketGraph::build(&matches).unwrap_err(),
            BracketIntegrityError::SlotConflict(MatchId(2))
        );

        let matches = [knockout(0, 1, 0, None), knockout(1, 1, 1, None)];
        assert_eq!(
            BracketGraph::build(&matches).unwrap_err(),
            BracketIntegrityError::MultipleRoots(2)
        );

        let mut matches = [knockout(0, 1, 0, None)];
        matches[0].home = Slot::Team(TeamId(3));
        matches[0].away = Slot::Team(TeamId(3));
        assert_eq!(
            BracketGraph::build(&matches).unwrap_err(),
            BracketIntegrityError::SameTeam(MatchId(0))
        );

        let league = [TournamentMatch::new(MatchId(0), 1, 0, Stage::League)];
        assert_eq!(BracketGraph::build(&league).unwrap().root(), None);
    }

    #[test]
    fn test_advance() {
        let (mut matches, graph) = bracket();
        let timeline = timeline();
        let mut events = Vec::new();

        // 1 beats 4
        finish(&mut matches, 0, 2, 0);
        graph
            .advance(&mut matches, MatchId(0), &timeline, &mut events)
            .unwrap();
        assert_eq!(matches[2].home, Slot::Team(TeamId(1)));
        assert_eq!(matches[2].status, MatchStatus::Pending);
        assert!(events.is_empty());

        // Advancing the same result again changes nothing.
        let before = matches.clone();
        graph
            .advance(&mut matches, MatchId(0), &timeline, &mut events)
            .unwrap();
        assert_eq!(matches, before);
        assert!(events.is_empty());

        // 2 beats 3
        finish(&mut matches, 1, 1, 0);
        graph
            .advance(&mut matches, MatchId(1), &timeline, &mut events)
            .unwrap();
        assert_eq!(matches[2].away, Slot::Team(TeamId(2)));
        assert_eq!(matches[2].status, MatchStatus::Scheduled);

        // No provisional time was assigned, so the final is placed after its feeders.
        assert_eq!(
            events,
            [Event::MatchScheduled {
                match_id: MatchId(2),
                home: TeamId(1),
                away: TeamId(2),
                scheduled_at: Some(timeline.start_at()),
            }]
        );
    }

    #[test]
    fn test_advance_deferred_time() {
        let (mut matches, graph) = bracket();
        let timeline = timeline();
        let mut events = Vec::new();

        let start = timeline.start_at();
        matches[0].scheduled_at = Some(start);
        matches[1].scheduled_at = Some(start + Duration::minutes(105));

        finish(&mut matches, 0, 2, 0);
        finish(&mut matches, 1, 2, 0);
        graph
            .advance(&mut matches, MatchId(0), &timeline, &mut events)
            .unwrap();
        graph
            .advance(&mut matches, MatchId(1), &timeline, &mut events)
            .unwrap();

        // 105 + 90 + 2 * 15
        assert_eq!(
            matches[2].scheduled_at,
            Some(start + Duration::minutes(225))
        );
    }

    #[test]
    fn test_advance_correction() {
        let (mut matches, graph) = bracket();
        let timeline = timeline();
        let mut events = Vec::new();

        finish(&mut matches, 0, 2, 0);
        finish(&mut matches, 1, 2, 0);
        graph
            .advance(&mut matches, MatchId(0), &timeline, &mut events)
            .unwrap();
        graph
            .advance(&mut matches, MatchId(1), &timeline, &mut events)
            .unwrap();
        matches[2].game_id = Some(crate::GameId(44));
        events.clear();

        // 4 beats 1 after all.
        matches[0].score = Some(Score::new(2, 3));
        graph
            .advance(&mut matches, MatchId(0), &timeline, &mut events)
            .unwrap();

        assert_eq!(matches[2].home, Slot::Team(TeamId(4)));
        assert_eq!(matches[2].status, MatchStatus::Scheduled);
        assert_eq!(matches[2].game_id, None);
        assert_eq!(
            events[0],
            Event::MatchUnscheduled {
                match_id: MatchId(2),
                game_id: Some(crate::GameId(44)),
            }
        );
        assert!(matches!(events[1], Event::MatchScheduled { home: TeamId(4), .. }));

        // Once the final has started the result can no longer change.
        matches[2].status = MatchStatus::Running;
        matches[0].score = Some(Score::new(2, 0));
        assert_eq!(
            graph
                .advance(&mut matches, MatchId(0), &timeline, &mut events)
                .unwrap_err(),
            Error::InvalidResult(InvalidResultError::DownstreamAlreadyPlayed {
                source_match: MatchId(0),
                dependent: MatchId(2),
            })
        );
    }

    #[test]
    fn test_resolve_bye() {
        let (mut matches, stage) = SingleElimination::new(3, MatchId(0), 1).into_parts();
        let graph = BracketGraph::build(&matches).unwrap();
        let timeline = timeline();
        let mut events = Vec::new();

        let seeded: Vec<_> = (1..=3).map(TeamId).collect();
        for (id, side, team) in stage.seat(&seeded) {
            matches[id.index()][side] = Slot::Team(team);
        }

        // Seed 1 has a bye.
        graph
            .resolve(&mut matches, MatchId(0), &timeline, &mut events)
            .unwrap();
        assert_eq!(matches[0].status, MatchStatus::Finished);
        assert_eq!(matches[2].home, Slot::Team(TeamId(1)));
        assert_eq!(
            events,
            [Event::MatchFinished {
                match_id: MatchId(0),
                winner: Some(TeamId(1)),
            }]
        );

        // Cancelling the final leaves it untouched by later results.
        matches[2].status = MatchStatus::Cancelled;
        finish(&mut matches, 1, 0, 1);
        graph
            .advance(&mut matches, MatchId(1), &timeline, &mut events)
            .unwrap();
        assert_eq!(matches[2].away, Slot::Pending);
    }
}
