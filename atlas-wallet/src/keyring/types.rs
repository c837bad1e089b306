use std::fmt;

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};

use atlas_common::address::Address;

use super::serde_pubkey;

/// Where a key's private material lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    /// Encrypted in the key store.
    Local,
    /// Public key only; signing happens on another machine.
    Offline,
    Multisig,
    /// Held by a hardware device.
    Ledger,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyType::Local => "local",
            KeyType::Offline => "offline",
            KeyType::Multisig => "multisig",
            KeyType::Ledger => "ledger",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PublicKeyInfo {
    Single {
        #[serde(with = "serde_pubkey")]
        key: VerifyingKey,
    },
    Multisig {
        threshold: u32,
        #[serde(with = "serde_pubkey::vec")]
        keys: Vec<VerifyingKey>,
    },
}

impl PublicKeyInfo {
    /// The single key, if this is not a multisig.
    pub fn single(&self) -> Option<&VerifyingKey> {
        match self {
            PublicKeyInfo::Single { key } => Some(key),
            PublicKeyInfo::Multisig { .. } => None,
        }
    }
}

/// Public view of a stored key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    pub name: String,
    pub key_type: KeyType,
    pub address: Address,
    pub public_key: PublicKeyInfo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;

    #[test]
    fn test_key_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&KeyType::Offline).unwrap(), "\"offline\"");
        assert_eq!(serde_json::from_str::<KeyType>("\"ledger\"").unwrap(), KeyType::Ledger);
        assert_eq!(KeyType::Multisig.to_string(), "multisig");
    }

    #[test]
    fn test_public_key_info_tagging() {
        let pk = SigningKey::from_bytes(&[3u8; 32]).verifying_key();
        let single = PublicKeyInfo::Single { key: pk };
        let json = serde_json::to_value(&single).unwrap();

        assert_eq!(json["kind"], "single");
        assert_eq!(json["key"], hex::encode(pk.to_bytes()));
        assert_eq!(single.single(), Some(&pk));

        let multi = PublicKeyInfo::Multisig { threshold: 1, keys: vec![pk] };
        let back: PublicKeyInfo =
            serde_json::from_value(serde_json::to_value(&multi).unwrap()).unwrap();
        assert_eq!(back, multi);
        assert!(back.single().is_none());
    }
}
