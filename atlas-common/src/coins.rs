//! Denominated token amounts.
//!
//! Coins are written as `<amount><denom>` and joined with commas, e.g.
//! `100000000stake,5atom`. Amounts travel as decimal strings in JSON so
//! they survive tools that parse numbers as doubles.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoinError {
    #[error("Invalid coin expression: {0}")]
    InvalidExpression(String),

    #[error("Invalid denom: {0}")]
    InvalidDenom(String),

    #[error("Invalid amount for {denom}: {amount}")]
    InvalidAmount { denom: String, amount: String },

    #[error("Duplicate denom: {0}")]
    DuplicateDenom(String),

    #[error("Coin amount must be positive: {0}")]
    NotPositive(String),

    #[error("Coins are not sorted by denom: {0}")]
    Unsorted(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    #[serde(with = "amount_string")]
    pub amount: u128,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u128) -> Result<Self, CoinError> {
        let denom = denom.into();
        validate_denom(&denom)?;
        Ok(Self { denom, amount })
    }

    /// Parses a single `<amount><denom>` expression.
    pub fn parse(expr: &str) -> Result<Self, CoinError> {
        let expr = expr.trim();
        let split = expr
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| CoinError::InvalidExpression(expr.to_string()))?;
        let (amount, denom) = expr.split_at(split);

        if amount.is_empty() {
            return Err(CoinError::InvalidExpression(expr.to_string()));
        }

        let amount_value = amount.parse::<u128>().map_err(|_| CoinError::InvalidAmount {
            denom: denom.to_string(),
            amount: amount.to_string(),
        })?;

        Coin::new(denom, amount_value)
    }

    pub fn is_positive(&self) -> bool {
        self.amount > 0
    }
}

impl std::fmt::Display for Coin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// A set of coins, sorted by denom with at most one entry per denom.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coins(Vec<Coin>);

impl Coins {
    pub fn new(mut coins: Vec<Coin>) -> Result<Self, CoinError> {
        coins.sort_by(|a, b| a.denom.cmp(&b.denom));
        let coins = Coins(coins);
        coins.validate()?;
        Ok(coins)
    }

    /// Parses a comma separated list. An empty string is an empty set.
    pub fn parse(expr: &str) -> Result<Self, CoinError> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Ok(Coins::default());
        }
        let coins = expr
            .split(',')
            .map(Coin::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Coins::new(coins)
    }

    /// Checks ordering, uniqueness and positivity.
    ///
    /// Deserialized values are not validated automatically; genesis modules
    /// call this on everything they read.
    pub fn validate(&self) -> Result<(), CoinError> {
        for coin in &self.0 {
            validate_denom(&coin.denom)?;
            if !coin.is_positive() {
                return Err(CoinError::NotPositive(coin.to_string()));
            }
        }
        for pair in self.0.windows(2) {
            match pair[0].denom.cmp(&pair[1].denom) {
                std::cmp::Ordering::Less => {}
                std::cmp::Ordering::Equal => {
                    return Err(CoinError::DuplicateDenom(pair[1].denom.clone()))
                }
                std::cmp::Ordering::Greater => return Err(CoinError::Unsorted(self.to_string())),
            }
        }
        Ok(())
    }

    pub fn amount_of(&self, denom: &str) -> u128 {
        self.0
            .iter()
            .find(|c| c.denom == denom)
            .map(|c| c.amount)
            .unwrap_or(0)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Coin> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Coin> for Coins {
    fn from(coin: Coin) -> Self {
        Coins(vec![coin])
    }
}

impl std::fmt::Display for Coins {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(Coin::to_string).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Denoms are 3 to 128 characters: a lowercase letter followed by
/// lowercase letters, digits or `/`.
pub fn validate_denom(denom: &str) -> Result<(), CoinError> {
    let mut chars = denom.chars();
    let first_ok = chars.next().map(|c| c.is_ascii_lowercase()).unwrap_or(false);
    let rest_ok = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '/');

    if !first_ok || !rest_ok || denom.len() < 3 || denom.len() > 128 {
        return Err(CoinError::InvalidDenom(denom.to_string()));
    }
    Ok(())
}

pub(crate) mod amount_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(amount: &u128, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&amount.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u128, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<u128>().map_err(serde::de::Error::custom)
    }
}
