use std::{collections::BTreeSet, path::PathBuf};

use clap::{parser::MatchesError, ArgMatches, Args, Command, FromArgMatches};
use thiserror::Error;

use atlas_common::coins::{Coin, CoinError, Coins};

use crate::{
    config::{default_home, GenTxConfig, DEFAULT_CLIENT_HOME_DIR, DEFAULT_NODE_HOME_DIR},
    msg_builder::{CreateValidatorMsgBuilder, ValidatorFlags, DEFAULT_AMOUNT},
};

pub const BIN_NAME: &str = "atlas-genutil";
pub const GENTX_COMMAND: &str = "gentx";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("flag --{0} is defined more than once")]
    DuplicateFlag(String),

    #[error("invalid self delegation amount {value:?}: {source}")]
    InvalidAmount {
        value: String,
        #[source]
        source: CoinError,
    },

    /// Contributed flags must carry string values.
    #[error("flag --{flag} cannot be read as a string: {source}")]
    FlagType {
        flag: String,
        #[source]
        source: MatchesError,
    },

    #[error(transparent)]
    Clap(#[from] clap::Error),
}

/// Flags owned by `gentx` itself.
#[derive(Debug, Clone, Args)]
pub struct GenTxArgs {
    /// Node home directory
    #[arg(long, value_name = "DIR", default_value_os_t = default_home(DEFAULT_NODE_HOME_DIR))]
    pub home: PathBuf,

    /// Client home directory holding the keyring
    #[arg(
        long = "home-client",
        value_name = "DIR",
        default_value_os_t = default_home(DEFAULT_CLIENT_HOME_DIR)
    )]
    pub home_client: PathBuf,

    /// Name of the key that signs the transaction
    #[arg(long, value_name = "KEY")]
    pub name: String,

    /// Node ID to use instead of the one derived from node_key.json
    #[arg(long = "node-id", value_name = "ID")]
    pub node_id: Option<String>,

    /// Bech32 consensus public key to use instead of priv_validator_key.json
    #[arg(long, value_name = "PUBKEY")]
    pub pubkey: Option<String>,

    /// Write the transaction here instead of <home>/config/gentx/
    #[arg(long = "output-document", value_name = "FILE")]
    pub output_document: Option<PathBuf>,

    /// Passphrase unlocking the key
    #[arg(
        long = "keyring-passphrase",
        value_name = "PASSPHRASE",
        env = "ATLAS_KEYRING_PASSPHRASE",
        hide_env_values = true,
        default_value = ""
    )]
    pub keyring_passphrase: String,

    /// Log filter, e.g. "debug" or "atlas_genutil=trace" [default: $RUST_LOG or warn]
    #[arg(long = "log-level", value_name = "FILTER")]
    pub log_level: Option<String>,
}

/// Builds the `atlas-genutil` command with the message builder's flags
/// merged into `gentx`.
///
/// Fails before any parsing if a contributed flag reuses a name already in
/// use.
pub fn build_command(
    builder: &dyn CreateValidatorMsgBuilder,
    ip_default: &str,
) -> Result<Command, ConfigError> {
    let mut gentx = GenTxArgs::augment_args(
        Command::new(GENTX_COMMAND)
            .about("Generate a genesis tx carrying a self delegation")
            .long_about(format!(
                "Generate a genesis transaction that creates a validator with a self-delegation,\n\
                 signed by the key in the keyring referenced by --name.\n\n\
                 Defaults:\n{}",
                builder.defaults_description()
            )),
    );

    let mut taken: BTreeSet<String> = ["help", "version"].iter().map(|s| s.to_string()).collect();
    for arg in gentx.get_arguments() {
        taken.insert(arg.get_id().to_string());
        if let Some(long) = arg.get_long() {
            taken.insert(long.to_string());
        }
    }

    for arg in builder.flags(ip_default) {
        let id = arg.get_id().to_string();
        if !taken.insert(id.clone()) {
            return Err(ConfigError::DuplicateFlag(id));
        }
        if let Some(long) = arg.get_long() {
            if long != id && !taken.insert(long.to_string()) {
                return Err(ConfigError::DuplicateFlag(long.to_string()));
            }
        }
        gentx = gentx.arg(arg);
    }

    Ok(Command::new(BIN_NAME)
        .about("Atlas genesis utilities")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(gentx))
}

/// Turns parsed `gentx` matches into a run configuration and the requested
/// log filter.
pub fn config_from_matches(
    matches: &ArgMatches,
    builder: &dyn CreateValidatorMsgBuilder,
) -> Result<(GenTxConfig, Option<String>), ConfigError> {
    let args = GenTxArgs::from_arg_matches(matches)?;

    let mut validator_flags = ValidatorFlags::new();
    for arg in builder.flags("") {
        let id = arg.get_id().as_str();
        match matches.try_get_one::<String>(id) {
            Ok(Some(value)) => validator_flags.set(id, value.clone()),
            Ok(None) => {}
            Err(source) => {
                return Err(ConfigError::FlagType { flag: id.to_string(), source });
            }
        }
    }

    let amount = validator_flags.get(builder.amount_flag()).unwrap_or(DEFAULT_AMOUNT).to_string();
    let required_balance = Coin::parse(&amount)
        .map(Coins::from)
        .map_err(|source| ConfigError::InvalidAmount { value: amount.clone(), source })?;

    let config = GenTxConfig {
        node_id_override: args.node_id,
        pubkey_override: args.pubkey,
        output_document: args.output_document,
        keyring_passphrase: args.keyring_passphrase,
        required_balance,
        validator_flags,
        ..GenTxConfig::new(args.home, args.home_client, args.name)
    };
    Ok((config, args.log_level))
}
