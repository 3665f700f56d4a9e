//! # Team roster
//!
//! The [`TeamRoster`] holds the teams registered for a single tournament together with their
//! seeds and group assignments. Once a schedule has been generated the roster is frozen; it is
//! only unfrozen again when the schedule is discarded.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::InvalidRosterError;
use crate::utils::group_key;
use crate::TeamId;

/// A team registered for a tournament.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TournamentTeam {
    pub team: TeamId,
    /// The rank used for bracket placement. Lower is stronger.
    #[serde(default)]
    pub seed: Option<u32>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl TournamentTeam {
    #[inline]
    pub fn new(team: TeamId) -> Self {
        Self {
            team,
            seed: None,
            group: None,
            metadata: Map::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamRoster {
    teams: Vec<TournamentTeam>,
    #[serde(default)]
    frozen: bool,
}

impl TeamRoster {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new team.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRosterError::DuplicateTeam`] if `team` is already registered,
    /// [`InvalidRosterError::EmptyGroup`] if `group` is blank and
    /// [`InvalidRosterError::RosterFrozen`] if the schedule has already been generated.
    pub fn add_team(
        &mut self,
        team: TeamId,
        seed: Option<u32>,
        group: Option<String>,
    ) -> Result<&mut TournamentTeam, InvalidRosterError> {
        self.insert(TournamentTeam {
            team,
            seed,
            group,
            metadata: Map::new(),
        })
    }

    /// Registers a fully described team.
    ///
    /// # Errors
    ///
    /// See [`add_team`](Self::add_team).
    pub fn insert(
        &mut self,
        team: TournamentTeam,
    ) -> Result<&mut TournamentTeam, InvalidRosterError> {
        self.check_frozen()?;

        if self.get(team.team).is_some() {
            return Err(InvalidRosterError::DuplicateTeam(team.team));
        }

        if team.group.as_deref().map_or(false, |g| g.trim().is_empty()) {
            return Err(InvalidRosterError::EmptyGroup(team.team));
        }

        log::debug!("Adding team {} (seed {:?})", team.team, team.seed);

        self.teams.push(team);
        let index = self.teams.len() - 1;
        Ok(&mut self.teams[index])
    }

    /// Removes a registered team.
    ///
    /// # Errors
    ///
    /// Returns an error if the team is not registered or the roster is frozen.
    pub fn remove_team(&mut self, team: TeamId) -> Result<TournamentTeam, InvalidRosterError> {
        self.check_frozen()?;

        match self.teams.iter().position(|t| t.team == team) {
            Some(index) => Ok(self.teams.remove(index)),
            None => Err(InvalidRosterError::UnknownTeam(team)),
        }
    }

    #[inline]
    pub fn get(&self, team: TeamId) -> Option<&TournamentTeam> {
        self.teams.iter().find(|t| t.team == team)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.teams.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// Returns an iterator over the teams in registration order.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, TournamentTeam> {
        self.teams.iter()
    }

    /// Returns the teams ordered by seed. Unseeded teams come last, teams with equal seeds keep
    /// their registration order.
    pub fn ordered(&self) -> Vec<&TournamentTeam> {
        let mut teams: Vec<_> = self.teams.iter().collect();
        // `sort_by_key` is stable.
        teams.sort_by_key(|t| (t.seed.is_none(), t.seed));
        teams
    }

    /// Returns the position of `team` in the seed order.
    pub fn position(&self, team: TeamId) -> Option<usize> {
        self.ordered().iter().position(|t| t.team == team)
    }

    /// Distributes all teams without an explicit group over `number_of_groups` groups named `A`,
    /// `B`, ... in snake order: the strongest team goes into `A`, the next into `B` and so on.
    /// After the last group the direction is reversed.
    ///
    /// Teams with an explicit group count towards the size of their group. Every team goes into
    /// the smallest group, the snake direction only decides between groups of equal size.
    ///
    /// # Errors
    ///
    /// Returns an error if the roster is frozen or `number_of_groups` is zero.
    pub fn auto_assign_groups(&mut self, number_of_groups: usize) -> Result<(), InvalidRosterError> {
        self.check_frozen()?;

        if number_of_groups == 0 {
            return Err(InvalidRosterError::InvalidGroupCount(number_of_groups));
        }

        let unassigned: Vec<TeamId> = self
            .ordered()
            .into_iter()
            .filter(|t| t.group.is_none())
            .map(|t| t.team)
            .collect();

        log::debug!(
            "Distributing {} teams over {} groups",
            unassigned.len(),
            number_of_groups
        );

        let keys: Vec<String> = (0..number_of_groups).map(group_key).collect();
        let mut sizes: Vec<usize> = keys
            .iter()
            .map(|key| {
                self.teams
                    .iter()
                    .filter(|t| t.group.as_ref() == Some(key))
                    .count()
            })
            .collect();

        let mut forward = true;
        for team in unassigned {
            let smallest = sizes.iter().copied().min().unwrap_or(0);
            let mut candidates = (0..number_of_groups).filter(|&index| sizes[index] == smallest);

            let group = if forward {
                candidates.next()
            } else {
                candidates.next_back()
            };

            let group = match group {
                Some(group) => group,
                None => break,
            };

            sizes[group] += 1;
            if let Some(t) = self.teams.iter_mut().find(|t| t.team == team) {
                t.group = Some(keys[group].clone());
            }

            // A pass is complete once all groups are level again.
            if sizes.iter().all(|&size| size == sizes[0]) {
                forward = !forward;
            }
        }

        Ok(())
    }

    /// Returns the teams of every group in seed order. Teams without a group are skipped.
    pub fn groups(&self) -> BTreeMap<String, Vec<TeamId>> {
        let mut groups: BTreeMap<String, Vec<TeamId>> = BTreeMap::new();

        for team in self.ordered() {
            if let Some(group) = &team.group {
                groups.entry(group.clone()).or_default().push(team.team);
            }
        }

        groups
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    #[inline]
    pub(crate) fn freeze(&mut self) {
        self.frozen = true;
    }

    #[inline]
    pub(crate) fn unfreeze(&mut self) {
        self.frozen = false;
    }

    fn check_frozen(&self) -> Result<(), InvalidRosterError> {
        if self.frozen {
            Err(InvalidRosterError::RosterFrozen)
        } else {
            Ok(())
        }
    }
}

impl<'a> IntoIterator for &'a TeamRoster {
    type Item = &'a TournamentTeam;
    type IntoIter = std::slice::Iter<'a, TournamentTeam>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.teams.iter()
    }
}
