//! Named key storage used to sign genesis transactions.

pub mod file;
pub mod serde_pubkey;
pub mod types;

use ed25519_dalek::VerifyingKey;

use crate::errors::KeyringError;

pub use file::FileKeybase;
pub use types::{KeyRecord, KeyType, PublicKeyInfo};

/// Read and sign access to a set of named keys.
pub trait Keybase {
    /// Looks up a key by name.
    fn get(&self, name: &str) -> Result<KeyRecord, KeyringError>;

    /// All stored keys, sorted by name.
    fn list(&self) -> Result<Vec<KeyRecord>, KeyringError>;

    /// Signs `msg` with the named key, unlocking it with `passphrase`.
    ///
    /// Only [`KeyType::Local`] keys can sign.
    fn sign(
        &self,
        name: &str,
        passphrase: &str,
        msg: &[u8],
    ) -> Result<([u8; 64], VerifyingKey), KeyringError>;
}
