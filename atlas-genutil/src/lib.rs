//! Genesis transaction generation for Atlas validators.
//!
//! [`run_gentx`] resolves the node identity, checks that the operator's
//! account is funded in genesis, builds a create-validator message and signs
//! it with a key from the local keyring. The result is written to
//! `<home>/config/gentx/gentx-<node_id>.json`.

pub mod cli;
pub mod config;
pub mod error;
pub mod genesis;
pub mod gentx;
pub mod identity;
pub mod msg_builder;
pub mod output;
pub mod signer;

pub use config::GenTxConfig;
pub use error::{ErrorKind, GenTxError, Stage};
pub use gentx::{report, run_gentx, Collaborators, GenTxOutput};
pub use identity::NodeIdentity;
pub use msg_builder::{CreateValidatorMsgBuilder, MsgContext, StakingMsgBuilder, ValidatorFlags};
pub use signer::SignOutcome;
