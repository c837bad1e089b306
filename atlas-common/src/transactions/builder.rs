use crate::coins::Coins;

use super::{
    msg::Msg,
    types::{StdFee, StdSignDoc, StdTx},
};

/// Gas limit used when the caller does not pick one.
pub const DEFAULT_GAS: u64 = 200_000;

/// Accumulates the authentication parameters of a transaction.
///
/// Genesis transactions are always signed at account number and sequence
/// zero, since no account exists on chain yet.
#[derive(Debug, Clone)]
pub struct TxBuilder {
    chain_id: String,
    account_number: u64,
    sequence: u64,
    gas: u64,
    fees: Coins,
    memo: String,
}

impl Default for TxBuilder {
    fn default() -> Self {
        Self {
            chain_id: String::new(),
            account_number: 0,
            sequence: 0,
            gas: DEFAULT_GAS,
            fees: Coins::default(),
            memo: String::new(),
        }
    }
}

impl TxBuilder {
    pub fn new(chain_id: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            ..Default::default()
        }
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn memo(&self) -> &str {
        &self.memo
    }

    pub fn fee(&self) -> StdFee {
        StdFee {
            amount: self.fees.clone(),
            gas: self.gas,
        }
    }

    /// Wraps `msgs` into a transaction with no signatures.
    pub fn build_unsigned(&self, msgs: Vec<Msg>) -> StdTx {
        StdTx {
            msg: msgs,
            fee: self.fee(),
            signatures: Vec::new(),
            memo: self.memo.clone(),
        }
    }

    /// The sign document for `tx` under this builder's chain parameters.
    ///
    /// Messages, fee and memo are taken from the transaction, so a decoded
    /// transaction is signed exactly as it was read.
    pub fn sign_doc_for(&self, tx: &StdTx) -> StdSignDoc {
        StdSignDoc {
            account_number: self.account_number,
            chain_id: self.chain_id.clone(),
            fee: tx.fee.clone(),
            memo: tx.memo.clone(),
            msgs: tx.msg.clone(),
            sequence: self.sequence,
        }
    }
}
