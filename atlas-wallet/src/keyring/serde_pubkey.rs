//! Hex serde for ed25519 public keys, for human readable key files.

use ed25519_dalek::VerifyingKey;
use serde::de::Error;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S>(key: &VerifyingKey, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&hex::encode(key.as_bytes()))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<VerifyingKey, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let bytes = hex::decode(&s).map_err(D::Error::custom)?;
    let array: [u8; 32] = bytes.try_into().map_err(|_| D::Error::custom("Invalid length"))?;
    VerifyingKey::from_bytes(&array).map_err(D::Error::custom)
}

pub mod vec {
    use super::*;
    use serde::ser::SerializeSeq;

    pub fn serialize<S>(keys: &[VerifyingKey], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(keys.len()))?;
        for key in keys {
            seq.serialize_element(&hex::encode(key.as_bytes()))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<VerifyingKey>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = Vec::<String>::deserialize(deserializer)?;
        encoded
            .iter()
            .map(|s| {
                let bytes = hex::decode(s).map_err(D::Error::custom)?;
                let array: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| D::Error::custom("Invalid length"))?;
                VerifyingKey::from_bytes(&array).map_err(D::Error::custom)
            })
            .collect()
    }
}
