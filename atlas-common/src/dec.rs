use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Number of fractional digits carried by [`Dec`].
pub const PRECISION: usize = 18;
const ONE: u128 = 1_000_000_000_000_000_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecError {
    #[error("Invalid decimal: {0}")]
    Invalid(String),

    #[error("Too many fractional digits (max 18): {0}")]
    TooPrecise(String),

    #[error("Decimal out of range: {0}")]
    Overflow(String),
}

/// Non-negative fixed point decimal with 18 fractional digits.
///
/// Used for commission rates, where binary floats would make `0.1 <= 0.1`
/// round unpredictably.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dec(u128);

impl Dec {
    pub const fn zero() -> Self {
        Dec(0)
    }

    pub const fn one() -> Self {
        Dec(ONE)
    }

    pub fn from_atomics(raw: u128) -> Self {
        Dec(raw)
    }

    pub fn atomics(&self) -> u128 {
        self.0
    }
}

impl std::str::FromStr for Dec {
    type Err = DecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };

        let digits_only = |p: &str| p.chars().all(|c| c.is_ascii_digit());
        if int_part.is_empty() || !digits_only(int_part) || !digits_only(frac_part) {
            return Err(DecError::Invalid(s.to_string()));
        }
        if s.ends_with('.') {
            return Err(DecError::Invalid(s.to_string()));
        }
        if frac_part.len() > PRECISION {
            return Err(DecError::TooPrecise(s.to_string()));
        }

        let int_value = int_part
            .parse::<u128>()
            .map_err(|_| DecError::Overflow(s.to_string()))?;

        let padded = format!("{:0<width$}", frac_part, width = PRECISION);
        let frac_value = padded
            .parse::<u128>()
            .map_err(|_| DecError::Invalid(s.to_string()))?;

        int_value
            .checked_mul(ONE)
            .and_then(|v| v.checked_add(frac_value))
            .map(Dec)
            .ok_or_else(|| DecError::Overflow(s.to_string()))
    }
}

impl std::fmt::Display for Dec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:0width$}", self.0 / ONE, self.0 % ONE, width = PRECISION)
    }
}

impl Serialize for Dec {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Dec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let d: Dec = "0.1".parse().unwrap();
        assert_eq!(d.to_string(), "0.100000000000000000");
        assert_eq!("1".parse::<Dec>().unwrap(), Dec::one());
    }

    #[test]
    fn test_ordering_is_exact() {
        let a: Dec = "0.1".parse().unwrap();
        let b: Dec = "0.100000000000000000".parse().unwrap();
        let c: Dec = "0.2".parse().unwrap();
        assert_eq!(a, b);
        assert!(a < c);
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(matches!("-0.1".parse::<Dec>(), Err(DecError::Invalid(_))));
        assert!(matches!(".5".parse::<Dec>(), Err(DecError::Invalid(_))));
        assert!(matches!("1.".parse::<Dec>(), Err(DecError::Invalid(_))));
        assert!(matches!("abc".parse::<Dec>(), Err(DecError::Invalid(_))));
        assert!(matches!(
            "0.1234567890123456789".parse::<Dec>(),
            Err(DecError::TooPrecise(_))
        ));
    }
}
