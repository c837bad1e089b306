//! Node identity: the node ID and the validator's consensus public key.
//!
//! Keys live in the node home as
//!
//! - `config/priv_validator_key.json`: consensus key pair,
//! - `config/node_key.json`: the p2p key the node ID derives from,
//! - `data/priv_validator_state.json`: last signed height/round/step.
//!
//! Missing files are generated; existing ones are reused as is.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use ed25519_dalek::{SigningKey, VerifyingKey};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use atlas_common::{
    address::{AddressError, ConsensusPubKey},
    crypto::hash::sha256,
    utils::{node_id::NODE_ID_BYTES, security::generate_seed, NodeId},
};

use crate::{
    config::{CONFIG_DIR, DATA_DIR},
    error::ErrorKind,
    output::{create_private_dir, write_new_file},
};

pub const PRIV_VALIDATOR_KEY_FILE: &str = "priv_validator_key.json";
pub const NODE_KEY_FILE: &str = "node_key.json";
pub const PRIV_VALIDATOR_STATE_FILE: &str = "priv_validator_state.json";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed key file {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("invalid node ID {0:?}: must not contain a path separator")]
    InvalidNodeId(String),

    #[error("invalid consensus public key {value:?}: {source}")]
    InvalidPubKey {
        value: String,
        #[source]
        source: AddressError,
    },
}

impl IdentityError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IdentityError::Io { .. } => ErrorKind::Io,
            IdentityError::Malformed { .. } => ErrorKind::Validation,
            IdentityError::InvalidNodeId(_) | IdentityError::InvalidPubKey { .. } => {
                ErrorKind::Input
            }
        }
    }
}

/// The node's ID and consensus key, fixed once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    node_id: NodeId,
    consensus_pubkey: ConsensusPubKey,
}

impl NodeIdentity {
    pub fn new(node_id: NodeId, consensus_pubkey: ConsensusPubKey) -> Self {
        Self { node_id, consensus_pubkey }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn consensus_pubkey(&self) -> &ConsensusPubKey {
        &self.consensus_pubkey
    }

    /// Replaces either part with an operator supplied value.
    pub fn with_overrides(
        self,
        node_id: Option<NodeId>,
        consensus_pubkey: Option<ConsensusPubKey>,
    ) -> Self {
        Self {
            node_id: node_id.unwrap_or(self.node_id),
            consensus_pubkey: consensus_pubkey.unwrap_or(self.consensus_pubkey),
        }
    }
}

/// Parses a `--pubkey` value. Empty means no override.
pub fn parse_pubkey_override(
    value: Option<&str>,
) -> Result<Option<ConsensusPubKey>, IdentityError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => ConsensusPubKey::from_bech32(v)
            .map(Some)
            .map_err(|source| IdentityError::InvalidPubKey { value: v.to_string(), source }),
    }
}

/// Parses a `--node-id` value. Empty means no override.
///
/// The ID becomes part of the output file name, so path separators are
/// rejected.
pub fn parse_node_id_override(value: Option<&str>) -> Result<Option<NodeId>, IdentityError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) if v.chars().any(|c| c == '/' || std::path::is_separator(c)) => {
            Err(IdentityError::InvalidNodeId(v.to_string()))
        }
        Some(v) => Ok(Some(NodeId::from(v))),
    }
}

/// Produces the node identity from the files under a node home.
pub trait ValidatorFiles {
    fn init_files(&self, home: &Path) -> Result<NodeIdentity, IdentityError>;
}

/// Default [`ValidatorFiles`]: hex encoded JSON key files, owner-only.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileValidatorFiles;

#[derive(Debug, Serialize, Deserialize)]
struct PrivValidatorKey {
    address: String,
    pub_key: String,
    priv_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeKey {
    priv_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct PrivValidatorState {
    height: String,
    round: u32,
    step: u8,
}

impl PrivValidatorKey {
    fn generate() -> Self {
        let sk = SigningKey::from_bytes(&generate_seed());
        let pk = sk.verifying_key();
        Self {
            address: validator_address(&pk),
            pub_key: hex::encode(pk.as_bytes()),
            priv_key: hex::encode(sk.to_bytes()),
        }
    }

    fn verifying_key(&self, path: &Path) -> Result<VerifyingKey, IdentityError> {
        let sk = decode_secret(&self.priv_key, path)?;
        let pk = sk.verifying_key();
        if hex::encode(pk.as_bytes()) != self.pub_key.to_lowercase() {
            return Err(malformed(path, "pub_key does not match priv_key"));
        }
        Ok(pk)
    }
}

impl NodeKey {
    fn generate() -> Self {
        Self { priv_key: hex::encode(generate_seed()) }
    }
}

impl ValidatorFiles for FileValidatorFiles {
    fn init_files(&self, home: &Path) -> Result<NodeIdentity, IdentityError> {
        let config_dir = home.join(CONFIG_DIR);
        let data_dir = home.join(DATA_DIR);

        let key_path = config_dir.join(PRIV_VALIDATOR_KEY_FILE);
        let validator_key: PrivValidatorKey =
            load_or_generate(&key_path, PrivValidatorKey::generate)?;
        let consensus_key = validator_key.verifying_key(&key_path)?;

        let node_key_path = config_dir.join(NODE_KEY_FILE);
        let node_key: NodeKey = load_or_generate(&node_key_path, NodeKey::generate)?;
        let node_pk = decode_secret(&node_key.priv_key, &node_key_path)?.verifying_key();

        let _: PrivValidatorState = load_or_generate(&data_dir.join(PRIV_VALIDATOR_STATE_FILE), || {
            PrivValidatorState { height: "0".into(), round: 0, step: 0 }
        })?;

        let identity = NodeIdentity::new(
            NodeId::from_public_key(&node_pk),
            ConsensusPubKey::new(consensus_key),
        );
        debug!(node_id = %identity.node_id(), "resolved node identity");
        Ok(identity)
    }
}

/// Consensus address: hex of the first 20 bytes of `sha256(pubkey)`.
fn validator_address(pk: &VerifyingKey) -> String {
    hex::encode_upper(&sha256(pk.as_bytes())[..NODE_ID_BYTES])
}

fn decode_secret(encoded: &str, path: &Path) -> Result<SigningKey, IdentityError> {
    let bytes = hex::decode(encoded).map_err(|e| malformed(path, &format!("priv_key: {}", e)))?;
    let seed: [u8; 32] = bytes
        .try_into()
        .map_err(|_| malformed(path, "priv_key must be 32 bytes"))?;
    Ok(SigningKey::from_bytes(&seed))
}

fn malformed(path: &Path, reason: &str) -> IdentityError {
    IdentityError::Malformed { path: path.to_path_buf(), reason: reason.to_string() }
}

fn load_or_generate<T, F>(path: &Path, generate: F) -> Result<T, IdentityError>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> T,
{
    let io_err = |source: io::Error| IdentityError::Io { path: path.to_path_buf(), source };

    match fs::read_to_string(path) {
        Ok(content) => {
            debug!(path = %path.display(), "reusing existing file");
            serde_json::from_str(&content).map_err(|e| malformed(path, &e.to_string()))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if let Some(parent) = path.parent() {
                create_private_dir(parent).map_err(io_err)?;
            }
            let value = generate();
            let mut json =
                serde_json::to_vec_pretty(&value).map_err(|e| malformed(path, &e.to_string()))?;
            json.push(b'\n');
            write_new_file(path, 0o600, &json).map_err(io_err)?;

            info!(path = %path.display(), "generated file");
            Ok(value)
        }
        Err(e) => Err(io_err(e)),
    }
}
