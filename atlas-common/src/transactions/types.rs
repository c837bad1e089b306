use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::coins::Coins;

use super::{errors::TransactionError, msg::Msg};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdFee {
    pub amount: Coins,
    pub gas: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdSignature {
    #[serde(with = "hex::serde")]
    pub pub_key: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub signature: Vec<u8>,
}

/// The standard transaction: messages plus authentication data.
///
/// An unsigned transaction has an empty `signatures` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StdTx {
    pub msg: Vec<Msg>,
    pub fee: StdFee,
    #[serde(default)]
    pub signatures: Vec<StdSignature>,
    #[serde(default)]
    pub memo: String,
}

/// The document a signer commits to.
///
/// Signatures cover [`StdSignDoc::sign_bytes`], never the transaction JSON
/// itself, so re-ordering of the tx envelope cannot invalidate them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StdSignDoc {
    pub account_number: u64,
    pub chain_id: String,
    pub fee: StdFee,
    pub memo: String,
    pub msgs: Vec<Msg>,
    pub sequence: u64,
}

impl StdSignDoc {
    /// Canonical bytes: JSON with sorted object keys and no whitespace.
    pub fn sign_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        // serde_json::Value keeps object keys in a BTreeMap, which sorts them.
        let value = serde_json::to_value(self).map_err(TransactionError::Encoding)?;
        serde_json::to_vec(&value).map_err(TransactionError::Encoding)
    }
}

impl StdTx {
    pub fn is_signed(&self) -> bool {
        !self.signatures.is_empty()
    }

    pub fn validate_basic(&self) -> Result<(), TransactionError> {
        if self.msg.is_empty() {
            return Err(TransactionError::InvalidMsg("transaction carries no messages".into()));
        }
        self.msg.iter().try_for_each(Msg::validate_basic)
    }

    /// Checks every attached signature against `doc`.
    pub fn verify_signatures(&self, doc: &StdSignDoc) -> Result<(), TransactionError> {
        if self.signatures.is_empty() {
            return Err(TransactionError::InvalidSignature("transaction is not signed".into()));
        }

        let msg = doc.sign_bytes()?;
        for sig in &self.signatures {
            let key_bytes: [u8; 32] = sig
                .pub_key
                .as_slice()
                .try_into()
                .map_err(|_| {
                    TransactionError::InvalidSignature(
                        "Invalid public key length (must be 32 bytes)".into(),
                    )
                })?;
            let verifying_key = VerifyingKey::from_bytes(&key_bytes)
                .map_err(|e| TransactionError::InvalidSignature(e.to_string()))?;
            let signature = Signature::from_slice(&sig.signature)
                .map_err(|e| TransactionError::InvalidSignature(e.to_string()))?;

            verifying_key
                .verify(&msg, &signature)
                .map_err(|e| TransactionError::InvalidSignature(e.to_string()))?;
        }
        Ok(())
    }
}
