use bech32::Error as Bech32Error;
use ed25519_dalek::SignatureError;
use thiserror::Error;

/// Errors related specifically to address and consensus key encoding.
#[derive(Debug, Error)]
pub enum AddressError {
    /// The string is not valid bech32 at all.
    ///
    /// Usually a typo or a truncated copy/paste; the checksum will not match.
    #[error("Invalid bech32 string: {0}")]
    Bech32(#[from] Bech32Error),

    /// Failed to encode the address as Bech32m.
    #[error("Failed to encode address to bech32m")]
    EncodingFailed,

    /// The human readable part does not match what the caller asked for.
    #[error("Invalid address prefix: expected {expected}, got {actual}")]
    InvalidPrefix { expected: String, actual: String },

    /// Only the Bech32m variant is accepted.
    #[error("Invalid bech32 variant for {0}: expected bech32m")]
    InvalidVariant(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Payload length is not 32 bytes.
    #[error("Invalid payload length: {0}")]
    InvalidLength(usize),
}

impl From<SignatureError> for AddressError {
    fn from(err: SignatureError) -> Self {
        AddressError::InvalidPublicKey(err.to_string())
    }
}
