use thiserror::Error;
use tracing::{debug, warn};

use atlas_common::transactions::{Msg, StdSignature, StdTx, TransactionError, TxBuilder, TxCodec};
use atlas_wallet::{KeyRecord, KeyType, Keybase, KeyringError};

use crate::error::{keyring_error_kind, ErrorKind, GenTxError, Stage};

#[derive(Debug, Clone, PartialEq)]
pub enum SignOutcome {
    /// Carries exactly one signature, from the key record's key.
    Signed(StdTx),
    /// The key cannot sign here; the transaction must be signed elsewhere.
    Unsigned(StdTx),
}

impl SignOutcome {
    pub fn tx(&self) -> &StdTx {
        match self {
            SignOutcome::Signed(tx) | SignOutcome::Unsigned(tx) => tx,
        }
    }
}

#[derive(Debug, Error)]
pub enum SignError {
    #[error("failed to encode unsigned tx: {0}")]
    Encode(#[source] TransactionError),

    #[error("failed to decode unsigned tx: {0}")]
    Decode(#[source] TransactionError),

    #[error("decoded tx does not match: {0}")]
    Mismatch(String),

    #[error(transparent)]
    SignDoc(TransactionError),

    #[error(transparent)]
    Keyring(#[from] KeyringError),
}

impl SignError {
    pub fn stage(&self) -> Stage {
        match self {
            SignError::Encode(_) => Stage::PrintUnsignedTx,
            SignError::Decode(_) | SignError::Mismatch(_) => Stage::ReadUnsignedTx,
            SignError::SignDoc(_) | SignError::Keyring(_) => Stage::SignTx,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SignError::Encode(_)
            | SignError::Decode(_)
            | SignError::Mismatch(_)
            | SignError::SignDoc(_) => ErrorKind::Signing,
            SignError::Keyring(e) => match keyring_error_kind(e) {
                ErrorKind::NotFound => ErrorKind::NotFound,
                _ => ErrorKind::Signing,
            },
        }
    }
}

impl From<SignError> for GenTxError {
    fn from(e: SignError) -> Self {
        GenTxError::new(e.stage(), e.kind(), e)
    }
}

/// Wraps `msg` in a transaction and signs it with `key`.
///
/// The unsigned transaction goes through the codec and back before signing,
/// so what is signed is exactly what a reader of the encoded form sees.
/// Offline and multisig keys yield [`SignOutcome::Unsigned`].
pub fn sign_gentx(
    keybase: &dyn Keybase,
    key: &KeyRecord,
    passphrase: &str,
    codec: &dyn TxCodec,
    tx_builder: &TxBuilder,
    msg: Msg,
) -> Result<SignOutcome, SignError> {
    let unsigned = tx_builder.build_unsigned(vec![msg]);

    match key.key_type {
        KeyType::Offline | KeyType::Multisig => {
            warn!(
                key = %key.name,
                key_type = %key.key_type,
                "key cannot sign locally, emitting unsigned tx"
            );
            return Ok(SignOutcome::Unsigned(unsigned));
        }
        KeyType::Ledger => return Err(KeyringError::LedgerUnsupported(key.name.clone()).into()),
        KeyType::Local => {}
    }

    let mut buf = codec.encode(&unsigned).map_err(SignError::Encode)?;
    buf.push(b'\n');

    let mut tx = codec.decode(&buf).map_err(SignError::Decode)?;
    if tx.msg != unsigned.msg {
        return Err(SignError::Mismatch("messages changed on decode".into()));
    }

    let doc = tx_builder.sign_doc_for(&tx);
    let sign_bytes = doc.sign_bytes().map_err(SignError::SignDoc)?;
    let (signature, pk) = keybase.sign(&key.name, passphrase, &sign_bytes)?;

    if key.public_key.single() != Some(&pk) {
        return Err(SignError::Mismatch(format!(
            "key {} signed with an unexpected public key",
            key.name
        )));
    }

    tx.signatures = vec![StdSignature {
        pub_key: pk.to_bytes().to_vec(),
        signature: signature.to_vec(),
    }];
    tx.verify_signatures(&doc).map_err(SignError::SignDoc)?;

    debug!(key = %key.name, chain_id = tx_builder.chain_id(), "signed genesis transaction");
    Ok(SignOutcome::Signed(tx))
}
