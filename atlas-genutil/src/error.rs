use std::{fmt, io, path::PathBuf};

use thiserror::Error;

use atlas_wallet::KeyringError;

/// The workflow step an error was raised in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    InitValidatorFiles,
    ConsensusPubKey,
    ReadGenesis(PathBuf),
    UnmarshalGenesisState,
    ValidateGenesisState,
    InitKeybase,
    ReadKeybase,
    ValidateAccount,
    BuildMsg,
    PrintUnsignedTx,
    ReadUnsignedTx,
    SignTx,
    CreateOutputPath,
    WriteSignedTx,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::InitValidatorFiles => write!(f, "failed to initialize node validator files"),
            Stage::ConsensusPubKey => write!(f, "failed to get consensus node public key"),
            Stage::ReadGenesis(path) => {
                write!(f, "failed to read genesis doc file {}", path.display())
            }
            Stage::UnmarshalGenesisState => write!(f, "failed to unmarshal genesis state"),
            Stage::ValidateGenesisState => write!(f, "failed to validate genesis state"),
            Stage::InitKeybase => write!(f, "failed to initialize keybase"),
            Stage::ReadKeybase => write!(f, "failed to read from keybase"),
            Stage::ValidateAccount => write!(f, "failed to validate account in genesis"),
            Stage::BuildMsg => write!(f, "failed to build create-validator message"),
            Stage::PrintUnsignedTx => write!(f, "failed to print unsigned std tx"),
            Stage::ReadUnsignedTx => write!(f, "failed to read unsigned gen tx file"),
            Stage::SignTx => write!(f, "failed to sign std tx"),
            Stage::CreateOutputPath => write!(f, "failed to create output file path"),
            Stage::WriteSignedTx => write!(f, "failed to write signed gen tx"),
        }
    }
}

/// Coarse classification of a failure, independent of its stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A flag or override value is malformed.
    Input,
    NotFound,
    /// Data was read but fails its checks.
    Validation,
    Signing,
    Io,
}

/// A workflow failure: the stage it happened in, its kind and the cause.
#[derive(Debug, Error)]
#[error("{stage}: {source}")]
pub struct GenTxError {
    stage: Stage,
    kind: ErrorKind,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl GenTxError {
    pub fn new(
        stage: Stage,
        kind: ErrorKind,
        source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    ) -> Self {
        Self {
            stage,
            kind,
            source: source.into(),
        }
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// True when the output file was already present.
    pub fn is_already_exists(&self) -> bool {
        self.source
            .downcast_ref::<io::Error>()
            .is_some_and(|e| e.kind() == io::ErrorKind::AlreadyExists)
    }

    pub(crate) fn io(stage: Stage, source: io::Error) -> Self {
        Self::new(stage, ErrorKind::Io, source)
    }

    pub(crate) fn keyring(stage: Stage, source: KeyringError) -> Self {
        let kind = keyring_error_kind(&source);
        Self::new(stage, kind, source)
    }
}

/// Maps a key store failure onto the workflow's error kinds.
pub fn keyring_error_kind(e: &KeyringError) -> ErrorKind {
    match e {
        KeyringError::KeyNotFound(_) => ErrorKind::NotFound,
        KeyringError::InvalidName(_)
        | KeyringError::KeyExists(_)
        | KeyringError::InvalidMultisig(_) => ErrorKind::Input,
        KeyringError::Corrupt { .. }
        | KeyringError::Serialization(_)
        | KeyringError::Address(_)
        | KeyringError::FromBase58(_) => ErrorKind::Validation,
        KeyringError::Io(_) => ErrorKind::Io,
        KeyringError::Unavailable { .. }
        | KeyringError::InvalidKdfParams(_)
        | KeyringError::EncryptionFailed(_)
        | KeyringError::DecryptionFailed(_)
        | KeyringError::CannotSign { .. }
        | KeyringError::LedgerUnsupported(_) => ErrorKind::Signing,
    }
}
