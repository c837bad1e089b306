use bech32::{decode, encode, FromBase32, ToBase32, Variant};
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::errors::AddressError;

/// Prefix of account (delegator) addresses.
pub const ACCOUNT_HRP: &str = "nbex";
/// Prefix of validator operator addresses.
pub const VALOPER_HRP: &str = "nbvaloper";
/// Prefix of bech32 encoded consensus public keys.
pub const CONSPUB_HRP: &str = "nbvalconspub";

/// A bech32m encoded 32 byte identifier.
///
/// The same bytes can be rendered under different prefixes; an operator's
/// account address and validator address differ only by prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Address::decode_bytes(&s)?;
        Ok(Address(s))
    }
}

impl TryFrom<&str> for Address {
    type Error = AddressError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Address::try_from(s.to_string())
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl std::ops::Deref for Address {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Address {
    /// Returns whether the given string is a well formed address under any prefix.
    pub fn is_valid(address: &str) -> bool {
        Self::decode_bytes(address).is_ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses `address` and requires it to carry the `hrp` prefix.
    pub fn parse(address: &str, hrp: &str) -> Result<Self, AddressError> {
        let (actual, _) = Self::decode_bytes(address)?;
        if actual != hrp {
            return Err(AddressError::InvalidPrefix {
                expected: hrp.to_string(),
                actual,
            });
        }
        Ok(Address(address.to_string()))
    }

    /// Encodes raw bytes under the given prefix.
    pub fn from_bytes(hrp: &str, bytes: &[u8; 32]) -> Result<Self, AddressError> {
        let encoded = encode(hrp, bytes.to_base32(), Variant::Bech32m)
            .map_err(|_| AddressError::EncodingFailed)?;
        Ok(Address(encoded))
    }

    /// Converts a `VerifyingKey` into an address with the given prefix.
    ///
    /// The public key bytes are used directly as the address payload.
    pub fn address_from_pk(public_key: &VerifyingKey, hrp: &str) -> Result<Self, AddressError> {
        Self::from_bytes(hrp, &public_key.to_bytes())
    }

    /// Re-encodes the same payload under another prefix.
    pub fn with_hrp(&self, hrp: &str) -> Result<Self, AddressError> {
        let (_, bytes) = Self::decode_bytes(&self.0)?;
        Self::from_bytes(hrp, &bytes)
    }

    pub fn hrp(&self) -> String {
        Self::decode_bytes(&self.0)
            .map(|(hrp, _)| hrp)
            .unwrap_or_default()
    }

    pub fn to_bytes(&self) -> Result<[u8; 32], AddressError> {
        Self::decode_bytes(&self.0).map(|(_, bytes)| bytes)
    }

    /// Decodes a bech32m string into its prefix and 32 byte payload.
    pub fn decode_bytes(address: &str) -> Result<(String, [u8; 32]), AddressError> {
        let (hrp, data, variant) = decode(address)?;

        if variant != Variant::Bech32m {
            return Err(AddressError::InvalidVariant(address.to_string()));
        }

        let bytes = Vec::<u8>::from_base32(&data)?;
        let bytes_array: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::InvalidLength(bytes.len()))?;

        Ok((hrp, bytes_array))
    }
}

/// An ed25519 consensus public key, rendered as bech32m with [`CONSPUB_HRP`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsensusPubKey(VerifyingKey);

impl ConsensusPubKey {
    pub fn new(key: VerifyingKey) -> Self {
        Self(key)
    }

    /// Parses a bech32 consensus key, e.g. the value given to `--pubkey`.
    pub fn from_bech32(s: &str) -> Result<Self, AddressError> {
        let (hrp, bytes) = Address::decode_bytes(s)?;
        if hrp != CONSPUB_HRP {
            return Err(AddressError::InvalidPrefix {
                expected: CONSPUB_HRP.to_string(),
                actual: hrp,
            });
        }
        let key = VerifyingKey::from_bytes(&bytes)?;
        Ok(Self(key))
    }

    pub fn to_bech32(&self) -> Result<String, AddressError> {
        Address::address_from_pk(&self.0, CONSPUB_HRP).map(String::from)
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.0
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }
}

impl std::fmt::Display for ConsensusPubKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let encoded = self.to_bech32().map_err(|_| std::fmt::Error)?;
        write!(f, "{}", encoded)
    }
}

impl Serialize for ConsensusPubKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let encoded = self.to_bech32().map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&encoded)
    }
}

impl<'de> Deserialize<'de> for ConsensusPubKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ConsensusPubKey::from_bech32(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::SigningKey;

    use super::*;
    use crate::utils::security::generate_seed;

    fn public_key() -> VerifyingKey {
        SigningKey::from_bytes(&generate_seed()).verifying_key()
    }

    #[test]
    fn test_address_from_public_key_and_back() -> Result<(), AddressError> {
        let pk = public_key();

        let address = Address::address_from_pk(&pk, ACCOUNT_HRP)?;
        assert!(address.starts_with("nbex1"));

        let (hrp, bytes) = Address::decode_bytes(&address)?;
        assert_eq!(hrp, ACCOUNT_HRP);
        assert_eq!(bytes, pk.to_bytes());

        Ok(())
    }

    #[test]
    fn test_with_hrp_keeps_payload() -> Result<(), AddressError> {
        let account = Address::address_from_pk(&public_key(), ACCOUNT_HRP)?;
        let valoper = account.with_hrp(VALOPER_HRP)?;

        assert!(valoper.starts_with("nbvaloper1"));
        assert_eq!(account.to_bytes()?, valoper.to_bytes()?);
        assert_eq!(valoper.hrp(), VALOPER_HRP);

        Ok(())
    }

    #[test]
    fn test_parse_rejects_wrong_prefix() {
        let valoper = Address::address_from_pk(&public_key(), VALOPER_HRP).unwrap();
        let result = Address::parse(&valoper, ACCOUNT_HRP);
        assert!(matches!(result, Err(AddressError::InvalidPrefix { .. })));
    }

    #[test]
    fn test_invalid_address_is_rejected() {
        assert!(!Address::is_valid("nimble1invalidaddress"));
        assert!(Address::try_from("not_even_bech32_encoded").is_err());
    }

    #[test]
    fn test_consensus_pubkey_bech32() {
        let key = ConsensusPubKey::new(public_key());
        let encoded = key.to_bech32().unwrap();
        assert!(encoded.starts_with("nbvalconspub1"));

        let decoded = ConsensusPubKey::from_bech32(&encoded).unwrap();
        assert_eq!(decoded, key);
    }

    #[test]
    fn test_consensus_pubkey_rejects_account_prefix() {
        let account = Address::address_from_pk(&public_key(), ACCOUNT_HRP).unwrap();
        assert!(ConsensusPubKey::from_bech32(&account).is_err());
    }

    #[test]
    fn test_address_serde_validates() {
        let address = Address::address_from_pk(&public_key(), ACCOUNT_HRP).unwrap();
        let json = serde_json::to_string(&address).unwrap();
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);

        assert!(serde_json::from_str::<Address>("\"garbage\"").is_err());
    }
}
