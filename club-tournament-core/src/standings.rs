//! # Standings
//!
//! Ranked tables for league and group stages. A [`StandingsCalculator`] accumulates the finished
//! matches of a set of teams into one [`Record`] per team and ranks them by:
//!
//! 1. points (descending)
//! 2. goal difference (descending)
//! 3. goals scored (descending)
//! 4. the direct encounters, if exactly two teams are still tied
//! 5. the seed order of the roster
use std::cmp::Ordering;
use std::iter::FusedIterator;

use serde::{Deserialize, Serialize};

use crate::roster::TeamRoster;
use crate::{MatchStatus, Score, TeamId, TournamentMatch};

/// The points awarded per match result.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointsRule {
    pub win: u64,
    pub draw: u64,
    pub loss: u64,
}

impl Default for PointsRule {
    #[inline]
    fn default() -> Self {
        Self {
            win: 3,
            draw: 1,
            loss: 0,
        }
    }
}

/// The accumulated results of a single team.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub team: TeamId,
    pub played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_for: u64,
    pub goals_against: u64,
    pub points: u64,
}

impl Record {
    #[inline]
    pub const fn new(team: TeamId) -> Self {
        Self {
            team,
            played: 0,
            wins: 0,
            draws: 0,
            losses: 0,
            goals_for: 0,
            goals_against: 0,
            points: 0,
        }
    }

    #[inline]
    pub fn goal_difference(&self) -> i64 {
        self.goals_for as i64 - self.goals_against as i64
    }

    fn add(&mut self, scored: u32, conceded: u32, points: &PointsRule) {
        self.played += 1;
        self.goals_for += u64::from(scored);
        self.goals_against += u64::from(conceded);

        match scored.cmp(&conceded) {
            Ordering::Greater => {
                self.wins += 1;
                self.points += points.win;
            }
            Ordering::Equal => {
                self.draws += 1;
                self.points += points.draw;
            }
            Ordering::Less => {
                self.losses += 1;
                self.points += points.loss;
            }
        }
    }

    /// The criteria compared before the direct encounters.
    #[inline]
    fn primary_key(&self) -> (u64, i64, u64) {
        (self.points, self.goal_difference(), self.goals_for)
    }
}

/// A ranked table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standings {
    /// The group this table belongs to, `None` for a league.
    pub group: Option<String>,
    entries: Vec<Record>,
}

impl Standings {
    const KEYS: [&'static str; 9] = ["Team", "P", "W", "D", "L", "GF", "GA", "GD", "Pts"];

    /// Returns an iterator over the records from first to last place.
    #[inline]
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self,
            next: 0,
        }
    }

    /// Returns the column headers of the table.
    #[inline]
    pub fn keys(&self) -> impl Iterator<Item = &'static str> {
        Self::KEYS.into_iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn get(&self, rank: usize) -> Option<&Record> {
        self.entries.get(rank)
    }

    /// Returns the zero-based rank of `team`.
    pub fn position(&self, team: TeamId) -> Option<usize> {
        self.entries.iter().position(|r| r.team == team)
    }

    /// Returns the `k` best ranked teams.
    pub fn qualifiers(&self, k: usize) -> Vec<TeamId> {
        self.entries.iter().take(k).map(|r| r.team).collect()
    }
}

impl<'a> IntoIterator for &'a Standings {
    type Item = &'a Record;
    type IntoIter = Iter<'a>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Clone, Debug)]
pub struct Iter<'a> {
    inner: &'a Standings,
    next: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Record;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.inner.entries.get(self.next)?;
        self.next += 1;
        Some(entry)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len(), Some(self.len()))
    }
}

impl<'a> ExactSizeIterator for Iter<'a> {
    #[inline]
    fn len(&self) -> usize {
        self.inner.entries.len() - self.next
    }
}

impl<'a> FusedIterator for Iter<'a> {}

/// Computes [`Standings`] from match results.
#[derive(Copy, Clone, Debug)]
pub struct StandingsCalculator<'a> {
    roster: &'a TeamRoster,
    points: PointsRule,
}

impl<'a> StandingsCalculator<'a> {
    #[inline]
    pub fn new(roster: &'a TeamRoster, points: PointsRule) -> Self {
        Self { roster, points }
    }

    /// Ranks `teams` by the results of `matches`.
    ///
    /// Only finished matches between two teams of `teams` count. Byes and cancelled matches are
    /// ignored.
    pub fn calculate<'m, I>(&self, group: Option<String>, teams: &[TeamId], matches: I) -> Standings
    where
        I: IntoIterator<Item = &'m TournamentMatch>,
    {
        let results: Vec<(TeamId, TeamId, Score)> = matches
            .into_iter()
            .filter(|m| m.status == MatchStatus::Finished)
            .filter_map(|m| {
                let home = m.home.team()?;
                let away = m.away.team()?;
                let score = m.score?;

                (teams.contains(&home) && teams.contains(&away)).then_some((home, away, score))
            })
            .collect();

        let mut entries: Vec<Record> = teams.iter().map(|team| Record::new(*team)).collect();

        for (home, away, score) in &results {
            for entry in entries.iter_mut() {
                if entry.team == *home {
                    entry.add(score.home, score.away, &self.points);
                } else if entry.team == *away {
                    entry.add(score.away, score.home, &self.points);
                }
            }
        }

        entries.sort_by(|a, b| {
            b.primary_key()
                .cmp(&a.primary_key())
                .then_with(|| self.seed_order(a.team, b.team))
        });

        // Apply the direct encounter to every pair that is tied on all primary criteria.
        let mut start = 0;
        while start < entries.len() {
            let key = entries[start].primary_key();
            let end = entries[start..]
                .iter()
                .position(|e| e.primary_key() != key)
                .map_or(entries.len(), |len| start + len);

            if end - start == 2
                && head_to_head(&results, &self.points, entries[start].team, entries[start + 1].team)
                    == Ordering::Less
            {
                log::debug!(
                    "Team {} ranks above {} by direct encounter",
                    entries[start + 1].team,
                    entries[start].team
                );

                entries.swap(start, start + 1);
            }

            start = end;
        }

        Standings { group, entries }
    }

    fn seed_order(&self, a: TeamId, b: TeamId) -> Ordering {
        let a_pos = self.roster.position(a).unwrap_or(usize::MAX);
        let b_pos = self.roster.position(b).unwrap_or(usize::MAX);

        a_pos.cmp(&b_pos).then(a.cmp(&b))
    }
}

/// Compares the direct encounters of `a` and `b`. Returns [`Ordering::Greater`] if `a` did better.
fn head_to_head(
    results: &[(TeamId, TeamId, Score)],
    points: &PointsRule,
    a: TeamId,
    b: TeamId,
) -> Ordering {
    let mut record_a = Record::new(a);
    let mut record_b = Record::new(b);

    for (home, away, score) in results {
        if *home == a && *away == b {
            record_a.add(score.home, score.away, points);
            record_b.add(score.away, score.home, points);
        } else if *home == b && *away == a {
            record_a.add(score.away, score.home, points);
            record_b.add(score.home, score.away, points);
        }
    }

    (record_a.points, record_a.goal_difference()).cmp(&(record_b.points, record_b.goal_difference()))
}

#[cfg(test)]
mod tests {
    use super::{PointsRule, Record, StandingsCalculator};
    use crate::roster::TeamRoster;
    use crate::{teams, MatchId, MatchStatus, Score, Slot, Stage, TeamId, TournamentMatch};

    fn roster(n: u64) -> TeamRoster {
        let mut roster = TeamRoster::new();
        for team in 1..=n {
            roster.add_team(TeamId(team), Some(team as u32), None).unwrap();
        }
        roster
    }

    fn played(id: usize, home: u64, away: u64, score: (u32, u32)) -> TournamentMatch {
        let mut m = TournamentMatch::new(MatchId::from(id), 1, 0, Stage::League);
        m.home = Slot::Team(TeamId(home));
        m.away = Slot::Team(TeamId(away));
        m.status = MatchStatus::Finished;
        m.score = Some(Score::new(score.0, score.1));
        m
    }

    fn ranking(roster: &TeamRoster, teams: &[TeamId], matches: &[TournamentMatch]) -> Vec<TeamId> {
        StandingsCalculator::new(roster, PointsRule::default())
            .calculate(None, teams, matches)
            .iter()
            .map(|r| r.team)
            .collect()
    }

    #[test]
    fn test_standings_full_group() {
        let roster = roster(4);
        let teams = teams![1, 2, 3, 4];
        let matches = [
            played(0, 1, 2, (2, 0)),
            played(1, 3, 4, (1, 1)),
            played(2, 1, 3, (0, 1)),
            played(3, 2, 4, (3, 0)),
            played(4, 1, 4, (4, 0)),
            played(5, 2, 3, (2, 2)),
        ];

        let standings = StandingsCalculator::new(&roster, PointsRule::default())
            .calculate(Some("A".into()), &teams, &matches);

        // 1: 6 pts (+5), 3: 5 pts (+1), 2: 4 pts (+1), 4: 1 pt (-7)
        let order: Vec<_> = standings.iter().map(|r| r.team).collect();
        assert_eq!(order, teams![1, 3, 2, 4]);

        assert_eq!(
            standings.get(0),
            Some(&Record {
                team: TeamId(1),
                played: 3,
                wins: 2,
                draws: 0,
                losses: 1,
                goals_for: 6,
                goals_against: 1,
                points: 6,
            })
        );
        assert_eq!(standings.get(3).unwrap().goal_difference(), -7);
        assert_eq!(standings.qualifiers(2), teams![1, 3]);
        assert_eq!(standings.position(TeamId(2)), Some(2));
        assert_eq!(standings.group.as_deref(), Some("A"));
        assert_eq!(standings.keys().count(), 9);
    }

    #[test]
    fn test_standings_head_to_head() {
        let roster = roster(3);
        let teams = teams![1, 2, 3];
        // All teams have 3 points and a goal difference of 0. Team 1 scored the most goals,
        // 2 and 3 are level and 3 won the direct encounter.
        let matches = [
            played(0, 2, 3, (0, 1)),
            played(1, 1, 3, (2, 1)),
            played(2, 2, 1, (2, 1)),
        ];

        assert_eq!(ranking(&roster, &teams, &matches), teams![1, 3, 2]);
    }

    #[test]
    fn test_standings_three_way_tie_uses_seed() {
        let roster = roster(3);
        let teams = teams![3, 1, 2];
        let matches = [
            played(0, 1, 2, (1, 0)),
            played(1, 2, 3, (1, 0)),
            played(2, 3, 1, (1, 0)),
        ];

        assert_eq!(ranking(&roster, &teams, &matches), teams![1, 2, 3]);
    }

    #[test]
    fn test_standings_ignores_byes_and_cancelled() {
        let roster = roster(3);
        let teams = teams![1, 2, 3];

        let mut bye = TournamentMatch::new(MatchId(0), 1, 0, Stage::League);
        bye.home = Slot::Team(TeamId(3));
        bye.away = Slot::Bye;
        bye.status = MatchStatus::Finished;

        let mut cancelled = played(1, 3, 1, (5, 0));
        cancelled.status = MatchStatus::Cancelled;

        let matches = [bye, cancelled, played(2, 2, 1, (1, 0))];
        let standings = StandingsCalculator::new(&roster, PointsRule::default())
            .calculate(None, &teams, &matches);

        assert_eq!(
            standings.iter().map(|r| r.team).collect::<Vec<_>>(),
            teams![2, 3, 1]
        );
        assert_eq!(standings.get(1).unwrap().played, 0);
        assert_eq!(standings.get(2).unwrap().played, 1);
    }

    #[test]
    fn test_standings_swap_keeps_other_teams() {
        let roster = roster(5);
        let teams = teams![1, 2, 3, 4, 5];

        let base = [
            played(0, 1, 2, (3, 0)),
            played(1, 3, 4, (1, 0)),
            played(2, 5, 1, (2, 2)),
            played(3, 2, 3, (1, 1)),
            played(4, 4, 5, (0, 2)),
        ];

        // Teams 3 and 4 exchange all of their results.
        let swapped = [
            played(0, 1, 2, (3, 0)),
            played(1, 4, 3, (1, 0)),
            played(2, 5, 1, (2, 2)),
            played(3, 2, 4, (1, 1)),
            played(4, 3, 5, (0, 2)),
        ];

        let a = ranking(&roster, &teams, &base);
        let b = ranking(&roster, &teams, &swapped);

        let others = |order: &[TeamId]| -> Vec<TeamId> {
            order
                .iter()
                .copied()
                .filter(|t| *t != TeamId(3) && *t != TeamId(4))
                .collect()
        };
        assert_eq!(others(&a), others(&b));
    }

    #[test]
    fn test_points_rule() {
        let roster = roster(2);
        let teams = teams![1, 2];
        let matches = [played(0, 1, 2, (1, 1))];

        let standings = StandingsCalculator::new(
            &roster,
            PointsRule {
                win: 2,
                draw: 2,
                loss: 0,
            },
        )
        .calculate(None, &teams, &matches);

        assert_eq!(standings.get(0).unwrap().points, 2);
        assert_eq!(standings.get(1).unwrap().points, 2);
    }
}
