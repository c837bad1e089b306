//! Types shared by the Atlas genesis tooling: addresses, coins, the genesis
//! document and the standard transaction.

pub mod address;
pub mod coins;
pub mod crypto;
pub mod dec;
pub mod genesis;
pub mod transactions;
pub mod utils;
