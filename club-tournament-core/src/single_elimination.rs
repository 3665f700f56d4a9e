use crate::stage::{KnockoutStage, Leaf};
use crate::utils::NumExt;
use crate::{MatchId, Side, Slot, Stage, TournamentMatch};

/// A single elimination bracket.
///
/// Matches are laid out round by round: the first `size / 2` matches form the first round, the
/// next `size / 4` the second round and so on. The last match is the final. The winner of the
/// match at position `i` within its round advances to position `i / 2` of the next round.
#[derive(Clone, Debug)]
pub struct SingleElimination {
    matches: Vec<TournamentMatch>,
    stage: KnockoutStage,
}

impl SingleElimination {
    /// Creates a new bracket for `entrants` entrants. The bracket is padded to the next power of
    /// two with byes. All non-bye slots of the first round are left [`Slot::Pending`] and are
    /// described by the returned [`KnockoutStage`].
    ///
    /// `first_id` is the id of the first match, `first_round` the round number of the first
    /// bracket round.
    pub fn new(entrants: usize, first_id: MatchId, first_round: u32) -> Self {
        log::debug!(
            "Creating new SingleElimination bracket with {} entrants",
            entrants
        );

        let size = match entrants {
            0 | 1 => 2,
            n => n.next_power_of_two(),
        };
        let num_rounds = size.ilog2_ceil();

        let base = first_id.index();
        let mut matches = Vec::with_capacity(size - 1);
        let mut leaves = Vec::with_capacity(entrants);

        let seeds = seeding_order(size);

        for round in 0..num_rounds {
            let teams_in_round = size >> round;
            let matches_in_round = teams_in_round / 2;
            // Index of the first match of this and the next round.
            let offset = size - teams_in_round;
            let next_offset = size - teams_in_round / 2;

            for index in 0..matches_in_round {
                let id = MatchId::from(base + offset + index);
                let mut m = TournamentMatch::new(
                    id,
                    first_round + round as u32,
                    index as u32,
                    Stage::Knockout(teams_in_round as u32),
                );

                if round + 1 < num_rounds {
                    m.next_match_id = Some(MatchId::from(base + next_offset + index / 2));
                }

                if round == 0 {
                    for (side, seed) in [
                        (Side::Home, seeds[index * 2]),
                        (Side::Away, seeds[index * 2 + 1]),
                    ] {
                        if seed > entrants {
                            m[side] = Slot::Bye;
                        } else {
                            leaves.push(Leaf {
                                match_id: id,
                                side,
                                seed,
                            });
                        }
                    }
                }

                matches.push(m);
            }
        }

        log::debug!(
            "Created new SingleElimination bracket with {} matches",
            matches.len()
        );

        Self {
            matches,
            stage: KnockoutStage::new(entrants, leaves),
        }
    }

    #[inline]
    pub fn into_parts(self) -> (Vec<TournamentMatch>, KnockoutStage) {
        (self.matches, self.stage)
    }
}

/// Returns the seeds of a bracket of `size` entrants in bracket order. Adjacent pairs form the
/// first round matches, so that seed 1 plays seed `size`, seed 2 plays seed `size - 1` and the
/// top two seeds can only meet in the final.
pub fn seeding_order(size: usize) -> Vec<usize> {
    debug_assert!(size.is_power_of_two());

    let mut seeds = vec![1];
    while seeds.len() < size {
        let sum = seeds.len() * 2 + 1;
        seeds = seeds.iter().flat_map(|&seed| [seed, sum - seed]).collect();
    }

    seeds
}

#[cfg(test)]
mod tests {
    use super::{seeding_order, SingleElimination};
    use crate::stage::Leaf;
    use crate::{MatchId, Side, Slot, Stage};

    #[test]
    fn test_seeding_order() {
        assert_eq!(seeding_order(1), [1]);
        assert_eq!(seeding_order(2), [1, 2]);
        assert_eq!(seeding_order(4), [1, 4, 2, 3]);
        assert_eq!(seeding_order(8), [1, 8, 4, 5, 2, 7, 3, 6]);
        assert_eq!(
            seeding_order(16),
            [1, 16, 8, 9, 4, 13, 5, 12, 2, 15, 7, 10, 3, 14, 6, 11]
        );
    }

    #[test]
    fn test_single_elimination() {
        let (matches, stage) = SingleElimination::new(4, MatchId(0), 1).into_parts();

        assert_eq!(matches.len(), 3);
        assert_eq!(matches[0].next_match_id, Some(MatchId(2)));
        assert_eq!(matches[1].next_match_id, Some(MatchId(2)));
        assert_eq!(matches[2].next_match_id, None);

        assert_eq!(matches[0].stage, Stage::Knockout(4));
        assert_eq!(matches[2].stage, Stage::Knockout(2));
        assert_eq!(matches[2].round, 2);
        assert_eq!(matches[1].slot, 1);

        assert_eq!(
            stage.leaves(),
            [
                Leaf {
                    match_id: MatchId(0),
                    side: Side::Home,
                    seed: 1
                },
                Leaf {
                    match_id: MatchId(0),
                    side: Side::Away,
                    seed: 4
                },
                Leaf {
                    match_id: MatchId(1),
                    side: Side::Home,
                    seed: 2
                },
                Leaf {
                    match_id: MatchId(1),
                    side: Side::Away,
                    seed: 3
                },
            ]
        );
    }

    #[test]
    fn test_single_elimination_byes() {
        let (matches, stage) = SingleElimination::new(5, MatchId(10), 3).into_parts();

        assert_eq!(matches.len(), 7);
        assert_eq!(matches[0].id, MatchId(10));
        assert_eq!(matches[6].id, MatchId(16));
        assert_eq!(matches[6].round, 5);
        assert_eq!(stage.leaves().len(), 5);

        // 1 v 8, 4 v 5, 2 v 7, 3 v 6
        assert_eq!(matches[0].away, Slot::Bye);
        assert_eq!(matches[1].away, Slot::Pending);
        assert_eq!(matches[2].away, Slot::Bye);
        assert_eq!(matches[3].away, Slot::Bye);

        assert_eq!(matches[0].next_match_id, Some(MatchId(14)));
        assert_eq!(matches[3].next_match_id, Some(MatchId(15)));
        assert_eq!(matches[4].next_match_id, Some(MatchId(16)));
        assert_eq!(matches[5].next_match_id, Some(MatchId(16)));
    }
}
