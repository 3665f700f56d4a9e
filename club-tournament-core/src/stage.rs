//! # Stages
//!
//! A groups + knockout tournament is a pipeline of two stages. The [`GroupStage`] plays a round
//! robin per group and, once every group match is settled, hands its ranked qualifiers to the
//! [`KnockoutStage`], which seats them into the first round of the bracket.
//!
//! A plain knockout tournament uses the [`KnockoutStage`] alone, seating the roster in seed
//! order when the schedule is generated.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::standings::{Standings, StandingsCalculator};
use crate::{MatchId, Side, TeamId, TournamentMatch};

/// A first round slot of the bracket and the seed placed into it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Leaf {
    pub match_id: MatchId,
    pub side: Side,
    /// One-based seed.
    pub seed: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnockoutStage {
    entrants: usize,
    leaves: Vec<Leaf>,
}

impl KnockoutStage {
    #[inline]
    pub fn new(entrants: usize, leaves: Vec<Leaf>) -> Self {
        Self { entrants, leaves }
    }

    /// Returns the number of teams entering the bracket.
    #[inline]
    pub fn entrants(&self) -> usize {
        self.entrants
    }

    #[inline]
    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    /// Returns the slot every team of `seeded` is placed into. `seeded` is in seed order, the
    /// first team being seed 1.
    pub fn seat<'a>(
        &'a self,
        seeded: &'a [TeamId],
    ) -> impl Iterator<Item = (MatchId, Side, TeamId)> + 'a {
        if seeded.len() != self.entrants {
            log::warn!(
                "Seating {} teams into a bracket for {} entrants",
                seeded.len(),
                self.entrants
            );
        }

        self.leaves.iter().filter_map(move |leaf| {
            seeded
                .get(leaf.seed - 1)
                .map(|team| (leaf.match_id, leaf.side, *team))
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStage {
    groups: BTreeMap<String, Vec<TeamId>>,
    qualifiers_per_group: usize,
    /// The qualifiers handed to the knockout stage.
    seated: Option<Vec<TeamId>>,
}

impl GroupStage {
    #[inline]
    pub fn new(groups: BTreeMap<String, Vec<TeamId>>, qualifiers_per_group: usize) -> Self {
        Self {
            groups,
            qualifiers_per_group,
            seated: None,
        }
    }

    #[inline]
    pub fn groups(&self) -> &BTreeMap<String, Vec<TeamId>> {
        &self.groups
    }

    #[inline]
    pub fn qualifiers_per_group(&self) -> usize {
        self.qualifiers_per_group
    }

    /// Returns the number of teams advancing to the knockout stage.
    #[inline]
    pub fn num_qualifiers(&self) -> usize {
        self.groups.len() * self.qualifiers_per_group
    }

    /// Returns the qualifiers that have been handed to the knockout stage, if any.
    #[inline]
    pub fn seated(&self) -> Option<&[TeamId]> {
        self.seated.as_deref()
    }

    #[inline]
    pub(crate) fn set_seated(&mut self, qualifiers: Vec<TeamId>) {
        self.seated = Some(qualifiers);
    }

    /// Returns `true` if every group match is finished or cancelled.
    pub fn is_complete(&self, matches: &[TournamentMatch]) -> bool {
        matches
            .iter()
            .filter(|m| m.stage.is_group())
            .all(|m| m.status.is_settled())
    }

    /// Computes the table of every group.
    pub fn standings(
        &self,
        calculator: &StandingsCalculator<'_>,
        matches: &[TournamentMatch],
    ) -> Vec<Standings> {
        self.groups
            .iter()
            .map(|(key, teams)| {
                calculator.calculate(
                    Some(key.clone()),
                    teams,
                    matches.iter().filter(|m| m.stage.group() == Some(key.as_str())),
                )
            })
            .collect()
    }

    /// Returns the qualifiers of all groups in seed order for the knockout stage: all group
    /// winners first, then all runners-up and so on. Within the same rank groups are ordered
    /// by key.
    pub fn qualifiers(&self, standings: &[Standings]) -> Vec<TeamId> {
        let mut qualifiers = Vec::with_capacity(self.num_qualifiers());

        for rank in 0..self.qualifiers_per_group {
            for table in standings {
                if let Some(record) = table.get(rank) {
                    qualifiers.push(record.team);
                }
            }
        }

        qualifiers
    }
}
