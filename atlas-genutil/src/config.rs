use std::path::{Path, PathBuf};

use atlas_common::coins::Coins;

use crate::msg_builder::ValidatorFlags;

pub const DEFAULT_NODE_HOME_DIR: &str = ".atlasd";
pub const DEFAULT_CLIENT_HOME_DIR: &str = ".atlascli";

pub const CONFIG_DIR: &str = "config";
pub const DATA_DIR: &str = "data";
pub const GENESIS_FILE: &str = "genesis.json";
pub const KEYRING_DIR: &str = "keyring";

/// Everything one `gentx` run needs, resolved up front.
#[derive(Debug, Clone)]
pub struct GenTxConfig {
    /// Node home: identity files and genesis live below it.
    pub home: PathBuf,
    /// Client home holding the key store.
    pub client_home: PathBuf,
    pub key_name: String,
    pub node_id_override: Option<String>,
    /// Bech32 consensus public key, used instead of the node's own.
    pub pubkey_override: Option<String>,
    pub output_document: Option<PathBuf>,
    pub keyring_passphrase: String,
    /// Coins the account must already hold in genesis.
    pub required_balance: Coins,
    pub validator_flags: ValidatorFlags,
}

impl GenTxConfig {
    pub fn new(
        home: impl Into<PathBuf>,
        client_home: impl Into<PathBuf>,
        key_name: impl Into<String>,
    ) -> Self {
        Self {
            home: home.into(),
            client_home: client_home.into(),
            key_name: key_name.into(),
            node_id_override: None,
            pubkey_override: None,
            output_document: None,
            keyring_passphrase: String::new(),
            required_balance: Coins::default(),
            validator_flags: ValidatorFlags::default(),
        }
    }

    pub fn genesis_file(&self) -> PathBuf {
        self.home.join(CONFIG_DIR).join(GENESIS_FILE)
    }

    pub fn keyring_dir(&self) -> PathBuf {
        self.client_home.join(KEYRING_DIR)
    }

    pub fn home(&self) -> &Path {
        &self.home
    }
}

/// `$HOME/<dir_name>`, or `./<dir_name>` when `HOME` is unset.
pub fn default_home(dir_name: &str) -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(dir_name)
}
