/// The pairings of a round robin using the circle method.
///
/// Entrants are referred to by their index. An odd number of entrants is padded with a bye,
/// represented by `None`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundRobin {
    rounds: Vec<Vec<[Option<usize>; 2]>>,
}

impl RoundRobin {
    pub fn new(entrants: usize) -> Self {
        log::debug!("Creating new RoundRobin with {} entrants", entrants);

        // entrants if even, entrants + 1 if odd.
        let entrants_even = entrants + entrants % 2;

        let num_rounds = match entrants_even {
            0 => 0,
            n => n - 1,
        };

        let matches_per_round = entrants_even / 2;

        let mut rounds = Vec::with_capacity(num_rounds);

        // Entrant 0 is pinned to the first match of every round. The remaining entrants rotate
        // once per round around the circle.
        for round in 0..num_rounds {
            let mut matches = Vec::with_capacity(matches_per_round);

            for index in 0..matches_per_round {
                let first = Self::circle_entrant(entrants_even, round, index);
                let second = Self::circle_entrant(entrants_even, round, entrants_even - index - 1);

                let first = (first < entrants).then_some(first);
                let second = (second < entrants).then_some(second);

                // The pinned entrant alternates between home and away.
                if index == 0 && round % 2 == 1 {
                    matches.push([second, first]);
                } else {
                    matches.push([first, second]);
                }
            }

            rounds.push(matches);
        }

        Self { rounds }
    }

    /// Returns the pairings of every round.
    #[inline]
    pub fn rounds(&self) -> &[Vec<[Option<usize>; 2]>] {
        &self.rounds
    }

    /// Returns the index of entrant of the at the given `index` in a circle of length `n` at
    /// the given `round`.
    #[inline]
    fn circle_entrant(n: usize, round: usize, index: usize) -> usize {
        debug_assert!(n % 2 == 0);

        if index == 0 {
            return 0;
        }

        match index as isize - round as isize {
            res if res <= 0 => n - res.unsigned_abs() - 1,
            res => res as usize,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::RoundRobin;

    #[test]
    fn test_circle_entrant() {
        let entrants = 10;
        let mut round = 0;

        macro_rules! test {
            ($($in:expr => $out:expr),*,) => {
                $(
                    assert_eq!(RoundRobin::circle_entrant(entrants, round, $in), $out);
                )*
            };
        }

        test! {
            0 => 0,
            1 => 1,
            2 => 2,
            3 => 3,
            4 => 4,
            5 => 5,
            6 => 6,
            7 => 7,
            8 => 8,
            9 => 9,
        }

        round = 1;

        test! {
            0 => 0,
            1 => 9,
            2 => 1,
            3 => 2,
            4 => 3,
            5 => 4,
            6 => 5,
            7 => 6,
            8 => 7,
            9 => 8,
        }

        round = 2;

        test! {
            0 => 0,
            1 => 8,
            2 => 9,
            3 => 1,
            4 => 2,
            5 => 3,
            6 => 4,
            7 => 5,
            8 => 6,
            9 => 7,
        }
    }

    #[test]
    fn test_round_robin() {
        assert_eq!(RoundRobin::new(0).rounds(), &[] as &[Vec<[Option<usize>; 2]>]);

        assert_eq!(
            RoundRobin::new(3).rounds(),
            [
                vec![[Some(0), None], [Some(1), Some(2)]],
                vec![[Some(2), Some(0)], [None, Some(1)]],
                vec![[Some(0), Some(1)], [Some(2), None]],
            ]
        );

        assert_eq!(
            RoundRobin::new(4).rounds(),
            [
                vec![[Some(0), Some(3)], [Some(1), Some(2)]],
                vec![[Some(2), Some(0)], [Some(3), Some(1)]],
                vec![[Some(0), Some(1)], [Some(2), Some(3)]],
            ]
        );
    }

    #[test]
    fn test_round_robin_pairs_meet_once() {
        for entrants in 2..=13 {
            let tournament = RoundRobin::new(entrants);
            let even = entrants + entrants % 2;
            assert_eq!(tournament.rounds().len(), even - 1);

            let mut pairs = HashSet::new();
            for round in tournament.rounds() {
                let mut seen = HashSet::new();
                for [home, away] in round {
                    for index in [home, away].into_iter().flatten() {
                        assert!(seen.insert(*index), "entrant plays twice in one round");
                    }

                    if let (Some(home), Some(away)) = (home, away) {
                        assert!(pairs.insert((*home.min(away), *home.max(away))));
                    }
                }
            }

            assert_eq!(pairs.len(), entrants * (entrants - 1) / 2);
        }
    }
}
