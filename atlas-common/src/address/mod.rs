pub mod address;
pub mod errors;

pub use address::{Address, ConsensusPubKey, ACCOUNT_HRP, CONSPUB_HRP, VALOPER_HRP};
pub use errors::AddressError;
