use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Longest chain ID a genesis document may declare.
pub const MAX_CHAIN_ID_LEN: usize = 50;

/// Per-module application state, keyed by module name.
///
/// Payloads are kept as raw JSON; only the owning module knows their schema.
pub type AppState = BTreeMap<String, Box<RawValue>>;

#[derive(Debug, Error)]
pub enum GenesisDocError {
    #[error("couldn't read genesis file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed genesis document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("genesis doc must include non-empty chain_id")]
    MissingChainId,

    #[error("chain_id in genesis doc is too long (max: {max}): {chain_id}")]
    ChainIdTooLong { chain_id: String, max: usize },

    #[error("malformed app_state: {0}")]
    MalformedAppState(serde_json::Error),
}

impl GenesisDocError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            GenesisDocError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}

/// The network's genesis file as far as this workspace needs it.
///
/// Fields owned by the consensus engine (validators, consensus params, …)
/// are ignored on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genesis_time: Option<String>,
    pub chain_id: String,
    pub app_state: Box<RawValue>,
}

impl GenesisDocument {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, GenesisDocError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| GenesisDocError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, GenesisDocError> {
        let doc: GenesisDocument = serde_json::from_str(content)?;
        doc.validate()?;
        Ok(doc)
    }

    pub fn validate(&self) -> Result<(), GenesisDocError> {
        if self.chain_id.trim().is_empty() {
            return Err(GenesisDocError::MissingChainId);
        }
        if self.chain_id.len() > MAX_CHAIN_ID_LEN {
            return Err(GenesisDocError::ChainIdTooLong {
                chain_id: self.chain_id.clone(),
                max: MAX_CHAIN_ID_LEN,
            });
        }
        Ok(())
    }

    /// Splits `app_state` into its per-module payloads.
    pub fn app_state(&self) -> Result<AppState, GenesisDocError> {
        serde_json::from_str(self.app_state.get()).map_err(GenesisDocError::MalformedAppState)
    }
}
