//! serde impls for src/options.rs
//!
//! Option values are stored untagged. Numbers are normalized while reading: non-negative numbers
//! become [`OptionValue::U64`] and whole floats (`90.0`) are read as integers, so that a setting
//! has the same type whether it came from JSON, TOML or the environment.
use std::fmt::{self, Formatter};

use serde::de::{self, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::OptionValue;

impl Serialize for OptionValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Bool(flag) => serializer.serialize_bool(*flag),
            Self::I64(n) => serializer.serialize_i64(*n),
            Self::U64(n) => serializer.serialize_u64(*n),
            Self::String(name) => serializer.serialize_str(name),
        }
    }
}

impl<'de> Deserialize<'de> for OptionValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl ValueVisitor {
    fn integer(n: i64) -> OptionValue {
        match u64::try_from(n) {
            Ok(n) => OptionValue::U64(n),
            Err(_) => OptionValue::I64(n),
        }
    }
}

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = OptionValue;

    fn expecting(&self, formatter: &mut Formatter) -> fmt::Result {
        formatter.write_str("a flag, a whole number or a name")
    }

    fn visit_bool<E>(self, flag: bool) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(OptionValue::Bool(flag))
    }

    fn visit_i64<E>(self, n: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Self::integer(n))
    }

    fn visit_u64<E>(self, n: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(OptionValue::U64(n))
    }

    fn visit_f64<E>(self, n: f64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        // i64::MAX is not exactly representable, the bounds are checked as floats.
        if n.fract() != 0.0 || !(i64::MIN as f64..i64::MAX as f64).contains(&n) {
            return Err(E::invalid_value(Unexpected::Float(n), &self));
        }

        Ok(Self::integer(n as i64))
    }

    fn visit_str<E>(self, name: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(OptionValue::String(name.to_owned()))
    }

    fn visit_string<E>(self, name: String) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(OptionValue::String(name))
    }
}

#[cfg(test)]
mod tests {
    use serde_test::{assert_de_tokens, assert_de_tokens_error, assert_tokens, Token};

    use super::OptionValue;

    #[test]
    fn test_option_value_serde() {
        assert_tokens(&OptionValue::Bool(false), &[Token::Bool(false)]);
        assert_tokens(&OptionValue::U64(45), &[Token::U64(45)]);
        assert_tokens(&OptionValue::I64(-5), &[Token::I64(-5)]);
        assert_tokens(
            &OptionValue::String("no_draws".into()),
            &[Token::Str("no_draws")],
        );
    }

    #[test]
    fn test_option_value_numbers() {
        // TOML only knows signed integers.
        assert_de_tokens(&OptionValue::U64(90), &[Token::I64(90)]);
        assert_de_tokens(&OptionValue::U64(90), &[Token::F64(90.0)]);
        assert_de_tokens(&OptionValue::I64(-2), &[Token::F64(-2.0)]);

        assert_de_tokens_error::<OptionValue>(
            &[Token::F64(2.5)],
            "invalid value: floating point `2.5`, expected a flag, a whole number or a name",
        );
    }
}
