use thiserror::Error;

use crate::{address::AddressError, coins::CoinError};

/// Errors raised while building, encoding or checking a transaction.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// A message failed its stateless checks.
    ///
    /// This can happen if:
    /// - the delegator and validator addresses are not the same key.
    /// - commission rates are out of bounds.
    /// - the self delegation is below the declared minimum.
    #[error("Invalid message: {0}")]
    InvalidMsg(String),

    #[error("Address error: {0}")]
    Address(#[from] AddressError),

    #[error("Coin error: {0}")]
    Coin(#[from] CoinError),

    /// The transaction could not be serialized to its wire form.
    #[error("Failed to encode transaction: {0}")]
    Encoding(serde_json::Error),

    /// The bytes do not hold a transaction in wire form.
    #[error("Failed to decode transaction: {0}")]
    Decoding(serde_json::Error),

    /// A signature is missing, malformed or does not verify.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
}
