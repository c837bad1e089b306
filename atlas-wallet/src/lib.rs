//! Local key store used to sign genesis transactions.

pub mod errors;
pub mod keyring;
pub mod vault;

pub use errors::KeyringError;
pub use keyring::{FileKeybase, KeyRecord, KeyType, Keybase, PublicKeyInfo};
