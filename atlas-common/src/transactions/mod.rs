pub mod builder;
pub mod codec;
pub mod errors;
pub mod msg;
pub mod types;

pub use builder::{TxBuilder, DEFAULT_GAS};
pub use codec::{JsonTxCodec, TxCodec, TxDecoder, TxEncoder};
pub use errors::TransactionError;
pub use msg::{CommissionRates, CreateValidatorMsg, Description, Msg};
pub use types::{StdFee, StdSignDoc, StdSignature, StdTx};
