use super::{errors::TransactionError, types::StdTx};

/// Produces the wire bytes of a transaction.
pub trait TxEncoder {
    fn encode(&self, tx: &StdTx) -> Result<Vec<u8>, TransactionError>;
}

/// Reads a transaction back from its wire bytes.
pub trait TxDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<StdTx, TransactionError>;
}

pub trait TxCodec: TxEncoder + TxDecoder {}

impl<T: TxEncoder + TxDecoder> TxCodec for T {}

/// Compact JSON wire encoding.
///
/// Struct fields serialize in declaration order, so encoding is a pure
/// function of the value: `encode(decode(encode(tx))) == encode(tx)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTxCodec;

impl TxEncoder for JsonTxCodec {
    fn encode(&self, tx: &StdTx) -> Result<Vec<u8>, TransactionError> {
        serde_json::to_vec(tx).map_err(TransactionError::Encoding)
    }
}

impl TxDecoder for JsonTxCodec {
    fn decode(&self, bytes: &[u8]) -> Result<StdTx, TransactionError> {
        serde_json::from_slice(bytes).map_err(TransactionError::Decoding)
    }
}
