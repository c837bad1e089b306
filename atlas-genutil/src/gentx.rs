//! The `gentx` workflow: identity, genesis checks, message, signature, file.

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use atlas_common::{
    genesis::{GenesisDocError, GenesisDocument},
    transactions::{JsonTxCodec, TxBuilder, TxCodec},
};
use atlas_wallet::{FileKeybase, Keybase};

use crate::{
    config::GenTxConfig,
    error::{ErrorKind, GenTxError, Stage},
    genesis::{validate_account_in_genesis, AccountsModule, BasicManager, GenesisAccountsIterator},
    identity::{parse_node_id_override, parse_pubkey_override, FileValidatorFiles, ValidatorFiles},
    msg_builder::{CreateValidatorMsgBuilder, MsgContext, StakingMsgBuilder},
    output::{ensure_parent_dir, make_output_filepath, write_signed_gentx},
    signer::{sign_gentx, SignOutcome},
};

/// The pluggable parts of the workflow.
pub struct Collaborators {
    pub module_manager: BasicManager,
    pub accounts: Box<dyn GenesisAccountsIterator>,
    pub validator_files: Box<dyn ValidatorFiles>,
    pub msg_builder: Box<dyn CreateValidatorMsgBuilder>,
    pub codec: Box<dyn TxCodec>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            module_manager: BasicManager::default(),
            accounts: Box::new(AccountsModule),
            validator_files: Box::new(FileValidatorFiles),
            msg_builder: Box::new(StakingMsgBuilder),
            codec: Box::new(JsonTxCodec),
        }
    }
}

/// Where the transaction was written, and whether it still needs signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenTxOutput {
    Signed { path: PathBuf },
    Unsigned { path: PathBuf },
}

impl GenTxOutput {
    pub fn path(&self) -> &Path {
        match self {
            GenTxOutput::Signed { path } | GenTxOutput::Unsigned { path } => path,
        }
    }
}

/// Runs the whole workflow for one validator.
///
/// Nothing is written to the output location unless every earlier step
/// succeeded, and an existing output file is never replaced.
pub fn run_gentx(
    config: &GenTxConfig,
    collaborators: &Collaborators,
) -> Result<GenTxOutput, GenTxError> {
    let pubkey_override = parse_pubkey_override(config.pubkey_override.as_deref())
        .map_err(|e| GenTxError::new(Stage::ConsensusPubKey, e.kind(), e))?;
    let node_id_override = parse_node_id_override(config.node_id_override.as_deref())
        .map_err(|e| GenTxError::new(Stage::InitValidatorFiles, e.kind(), e))?;

    debug!(home = %config.home.display(), "initializing validator files");
    let identity = collaborators
        .validator_files
        .init_files(&config.home)
        .map_err(|e| GenTxError::new(Stage::InitValidatorFiles, e.kind(), e))?
        .with_overrides(node_id_override, pubkey_override);
    debug!(node_id = %identity.node_id(), pubkey = %identity.consensus_pubkey(), "node identity");

    let genesis_path = config.genesis_file();
    let genesis = GenesisDocument::from_file(&genesis_path).map_err(|e| {
        let kind = if e.is_not_found() {
            ErrorKind::NotFound
        } else if matches!(e, GenesisDocError::Io { .. }) {
            ErrorKind::Io
        } else {
            ErrorKind::Validation
        };
        GenTxError::new(Stage::ReadGenesis(genesis_path.clone()), kind, e)
    })?;

    let app_state = genesis
        .app_state()
        .map_err(|e| GenTxError::new(Stage::UnmarshalGenesisState, ErrorKind::Validation, e))?;

    collaborators
        .module_manager
        .validate_genesis(&app_state)
        .map_err(|e| GenTxError::new(Stage::ValidateGenesisState, e.kind(), e))?;
    debug!(chain_id = %genesis.chain_id, "genesis state valid");

    let keybase = FileKeybase::open(config.keyring_dir())
        .map_err(|e| GenTxError::keyring(Stage::InitKeybase, e))?;
    let key = keybase
        .get(&config.key_name)
        .map_err(|e| GenTxError::keyring(Stage::ReadKeybase, e))?;
    debug!(key = %key.name, address = %key.address, key_type = %key.key_type, "found key");

    validate_account_in_genesis(
        &app_state,
        collaborators.accounts.as_ref(),
        &key.address,
        &config.required_balance,
    )
    .map_err(|e| GenTxError::new(Stage::ValidateAccount, e.kind(), e))?;

    let ctx = MsgContext::new(identity, genesis.chain_id.clone(), config.home.clone());
    let (tx_builder, msg) = collaborators
        .msg_builder
        .build_create_validator_msg(
            &ctx,
            &config.validator_flags,
            &key,
            TxBuilder::new(genesis.chain_id.clone()),
        )
        .map_err(|e| GenTxError::new(Stage::BuildMsg, ErrorKind::Input, e))?;

    let outcome = sign_gentx(
        &keybase,
        &key,
        &config.keyring_passphrase,
        collaborators.codec.as_ref(),
        &tx_builder,
        msg,
    )?;

    let path = match &config.output_document {
        Some(path) => {
            ensure_parent_dir(path).map_err(|e| GenTxError::io(Stage::CreateOutputPath, e))?;
            path.clone()
        }
        None => make_output_filepath(&config.home, ctx.identity().node_id())
            .map_err(|e| GenTxError::io(Stage::CreateOutputPath, e))?,
    };

    write_signed_gentx(&path, outcome.tx(), collaborators.codec.as_ref())
        .map_err(|e| GenTxError::io(Stage::WriteSignedTx, e))?;

    match outcome {
        SignOutcome::Signed(_) => {
            info!(path = %path.display(), "genesis transaction written");
            Ok(GenTxOutput::Signed { path })
        }
        SignOutcome::Unsigned(_) => {
            info!(path = %path.display(), "unsigned genesis transaction written");
            Ok(GenTxOutput::Unsigned { path })
        }
    }
}

/// Prints the one-line status for `output`.
pub fn report(output: &GenTxOutput, out: &mut impl Write) -> io::Result<()> {
    match output {
        GenTxOutput::Signed { path } => {
            writeln!(out, "Genesis transaction written to \"{}\"", path.display())
        }
        GenTxOutput::Unsigned { path } => {
            writeln!(
                out,
                "Offline key passed in. Use `tx sign` command to sign: \"{}\"",
                path.display()
            )
        }
    }
}
