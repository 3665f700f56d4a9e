use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! id {
    ($name:ident, $id:ty) => {
        #[derive(
            Copy,
            Clone,
            Debug,
            Default,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Serialize,
            Deserialize,
        )]
        #[repr(transparent)]
        #[serde(transparent)]
        pub struct $name(pub $id);

        impl Display for $name {
            #[inline]
            fn fmt(&self, f: &mut Formatter) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl AsRef<$id> for $name {
            #[inline]
            fn as_ref(&self) -> &$id {
                &self.0
            }
        }

        impl PartialEq<$id> for $name {
            #[inline]
            fn eq(&self, other: &$id) -> bool {
                self.0 == *other
            }
        }

        impl From<$id> for $name {
            #[inline]
            fn from(id: $id) -> Self {
                Self(id)
            }
        }

        impl FromStr for $name {
            type Err = <$id as FromStr>::Err;

            #[inline]
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse::<$id>()?))
            }
        }
    };
}

id!(TournamentId, u64);
id!(TeamId, u64);
id!(MatchId, u64);
id!(GameId, u64);
id!(CalendarEventId, u64);
id!(LocationId, u64);

impl MatchId {
    /// Returns the position of the match in the match arena of its tournament.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for MatchId {
    #[inline]
    fn from(index: usize) -> Self {
        Self(index as u64)
    }
}

#[cfg(test)]
mod tests {
    use serde_test::{assert_tokens, Token};

    use super::{MatchId, TeamId};

    #[test]
    fn test_id_serde() {
        assert_tokens(&TeamId(7), &[Token::U64(7)]);
        assert_tokens(&MatchId(0), &[Token::U64(0)]);
    }

    #[test]
    fn test_id_parse() {
        assert_eq!("42".parse::<TeamId>().unwrap(), TeamId(42));
        assert!("x".parse::<TeamId>().is_err());
        assert_eq!(MatchId::from(3_usize).index(), 3);
    }
}
