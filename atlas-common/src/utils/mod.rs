//! Common types and helpers shared across the Atlas crates.

pub mod node_id;
pub use node_id::NodeId;

pub mod security;
