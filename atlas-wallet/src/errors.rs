use std::path::PathBuf;

use thiserror::Error;

use crate::keyring::KeyType;

/// Errors raised by the local key store.
#[derive(Debug, Error)]
pub enum KeyringError {
    /// The key store directory is missing or unreadable.
    #[error("key store at {path} is unavailable: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No key is stored under the requested name.
    #[error("key {0} not found")]
    KeyNotFound(String),

    #[error("key {0} already exists")]
    KeyExists(String),

    /// Names become file names, so only a safe subset is accepted.
    #[error("invalid key name: {0:?}")]
    InvalidName(String),

    #[error("key file for {name} is corrupt: {reason}")]
    Corrupt { name: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize key file: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Address error: {0}")]
    Address(#[from] atlas_common::address::AddressError),

    #[error("Failed to encode/decode base58: {0}")]
    FromBase58(#[from] bs58::decode::Error),

    /// Argon2 parameters stored alongside the key are unusable.
    #[error("Invalid key derivation parameters: {0}")]
    InvalidKdfParams(String),

    #[error("Failed to encrypt key material: {0}")]
    EncryptionFailed(String),

    /// Usually a wrong passphrase.
    #[error("Failed to decrypt key material: {0}")]
    DecryptionFailed(String),

    /// Offline and multisig keys hold no private material here.
    #[error("key {name} is of type {key_type} and cannot sign locally")]
    CannotSign { name: String, key_type: KeyType },

    #[error("ledger device signing is not supported for key {0}")]
    LedgerUnsupported(String),

    #[error("invalid multisig: {0}")]
    InvalidMultisig(String),
}
