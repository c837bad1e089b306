use serde::{Deserialize, Serialize};

use crate::{
    address::{Address, ConsensusPubKey, ACCOUNT_HRP, VALOPER_HRP},
    coins::{amount_string, Coin},
    dec::Dec,
};

use super::errors::TransactionError;

pub const MAX_MONIKER_LEN: usize = 70;
pub const MAX_DETAILS_LEN: usize = 280;

/// A message carried by a transaction.
///
/// Serialized with an explicit type tag so decoders of other versions can
/// reject what they do not know instead of guessing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Msg {
    #[serde(rename = "atlas/MsgCreateValidator")]
    CreateValidator(CreateValidatorMsg),
}

impl Msg {
    pub fn validate_basic(&self) -> Result<(), TransactionError> {
        match self {
            Msg::CreateValidator(msg) => msg.validate_basic(),
        }
    }

    /// Accounts whose signatures the message requires.
    pub fn signers(&self) -> Vec<&Address> {
        match self {
            Msg::CreateValidator(msg) => vec![&msg.delegator_address],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    pub moniker: String,
    #[serde(default)]
    pub identity: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub security_contact: String,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionRates {
    pub rate: Dec,
    pub max_rate: Dec,
    pub max_change_rate: Dec,
}

impl CommissionRates {
    /// `0 <= rate <= max_rate <= 1` and `max_change_rate <= max_rate`.
    pub fn validate(&self) -> Result<(), TransactionError> {
        if self.max_rate > Dec::one() {
            return Err(TransactionError::InvalidMsg(
                "commission max rate cannot be more than 100%".into(),
            ));
        }
        if self.rate > self.max_rate {
            return Err(TransactionError::InvalidMsg(
                "commission rate cannot be more than the max rate".into(),
            ));
        }
        if self.max_change_rate > self.max_rate {
            return Err(TransactionError::InvalidMsg(
                "commission max change rate cannot be more than the max rate".into(),
            ));
        }
        Ok(())
    }
}

/// Registers a new validator bonded with the operator's own funds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateValidatorMsg {
    pub description: Description,
    pub commission: CommissionRates,
    #[serde(with = "amount_string")]
    pub min_self_delegation: u128,
    pub delegator_address: Address,
    pub validator_address: Address,
    pub pubkey: ConsensusPubKey,
    pub value: Coin,
}

impl CreateValidatorMsg {
    pub fn validate_basic(&self) -> Result<(), TransactionError> {
        Address::parse(&self.delegator_address, ACCOUNT_HRP)?;
        Address::parse(&self.validator_address, VALOPER_HRP)?;

        if self.delegator_address.to_bytes()? != self.validator_address.to_bytes()? {
            return Err(TransactionError::InvalidMsg(
                "validator address is invalid: must belong to the delegator".into(),
            ));
        }

        let moniker = self.description.moniker.trim();
        if moniker.is_empty() {
            return Err(TransactionError::InvalidMsg("description must include a moniker".into()));
        }
        if moniker.len() > MAX_MONIKER_LEN {
            return Err(TransactionError::InvalidMsg(format!(
                "moniker is longer than {} characters",
                MAX_MONIKER_LEN
            )));
        }
        if self.description.details.len() > MAX_DETAILS_LEN {
            return Err(TransactionError::InvalidMsg(format!(
                "details are longer than {} characters",
                MAX_DETAILS_LEN
            )));
        }

        self.commission.validate()?;

        if !self.value.is_positive() {
            return Err(TransactionError::InvalidMsg(
                "self delegation amount must be positive".into(),
            ));
        }
        if self.min_self_delegation == 0 {
            return Err(TransactionError::InvalidMsg(
                "minimum self delegation must be a positive integer".into(),
            ));
        }
        if self.value.amount < self.min_self_delegation {
            return Err(TransactionError::InvalidMsg(format!(
                "self delegation {} is below the minimum self delegation {}",
                self.value.amount, self.min_self_delegation
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;

    pub(crate) fn sample_msg(operator: &SigningKey) -> CreateValidatorMsg {
        let delegator = Address::address_from_pk(&operator.verifying_key(), ACCOUNT_HRP).unwrap();
        let validator = delegator.with_hrp(VALOPER_HRP).unwrap();
        let consensus = SigningKey::from_bytes(&[9u8; 32]).verifying_key();

        CreateValidatorMsg {
            description: Description {
                moniker: "node0".into(),
                ..Default::default()
            },
            commission: CommissionRates {
                rate: "0.1".parse().unwrap(),
                max_rate: "0.2".parse().unwrap(),
                max_change_rate: "0.01".parse().unwrap(),
            },
            min_self_delegation: 1,
            delegator_address: delegator,
            validator_address: validator,
            pubkey: ConsensusPubKey::new(consensus),
            value: Coin::new("stake", 100_000_000).unwrap(),
        }
    }

    #[test]
    fn test_sample_msg_is_valid() {
        let msg = sample_msg(&SigningKey::from_bytes(&[1u8; 32]));
        assert!(msg.validate_basic().is_ok());
    }

    #[test]
    fn test_rate_above_max_is_rejected() {
        let mut msg = sample_msg(&SigningKey::from_bytes(&[1u8; 32]));
        msg.commission.rate = "0.3".parse().unwrap();
        assert!(matches!(msg.validate_basic(), Err(TransactionError::InvalidMsg(_))));
    }

    #[test]
    fn test_mismatched_operator_is_rejected() {
        let mut msg = sample_msg(&SigningKey::from_bytes(&[1u8; 32]));
        let other = sample_msg(&SigningKey::from_bytes(&[2u8; 32]));
        msg.validator_address = other.validator_address;
        assert!(matches!(msg.validate_basic(), Err(TransactionError::InvalidMsg(_))));
    }

    #[test]
    fn test_delegation_below_minimum_is_rejected() {
        let mut msg = sample_msg(&SigningKey::from_bytes(&[1u8; 32]));
        msg.min_self_delegation = msg.value.amount + 1;
        assert!(matches!(msg.validate_basic(), Err(TransactionError::InvalidMsg(_))));
    }

    #[test]
    fn test_msg_json_is_type_tagged() {
        let msg = Msg::CreateValidator(sample_msg(&SigningKey::from_bytes(&[1u8; 32])));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "atlas/MsgCreateValidator");
        assert_eq!(json["value"]["description"]["moniker"], "node0");
        assert_eq!(json["value"]["commission"]["rate"], "0.100000000000000000");
    }
}
