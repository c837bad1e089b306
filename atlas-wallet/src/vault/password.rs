use argon2::{Argon2, Params};
use serde::{Deserialize, Serialize};
use sha2::Digest;
use zeroize::{Zeroize, ZeroizeOnDrop};

use atlas_common::utils::security::generate_salt;

use crate::errors::KeyringError;

/// Argon2id cost parameters, stored next to every armored key so a key
/// stays readable if the defaults change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    #[serde(with = "hex::serde")]
    pub salt: [u8; 16],
    pub iterations: u32,
    /// Memory cost in KiB.
    pub memory: u32,
    pub parallelism: u32,
}

impl KdfParams {
    pub const DEFAULT_ITERATIONS: u32 = 3;
    pub const DEFAULT_MEMORY: u32 = 65536; // 64 MiB
    pub const DEFAULT_PARALLELISM: u32 = 1;

    pub fn new(iterations: u32, memory: u32, parallelism: u32) -> Self {
        Self {
            salt: generate_salt(),
            iterations,
            memory,
            parallelism,
        }
    }

    /// Same costs, fresh salt.
    pub fn resalted(&self) -> Self {
        Self::new(self.iterations, self.memory, self.parallelism)
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ITERATIONS, Self::DEFAULT_MEMORY, Self::DEFAULT_PARALLELISM)
    }
}

#[derive(Zeroize, ZeroizeOnDrop, Clone)]
pub struct Password {
    password: Vec<u8>,
    salt: [u8; 16],
    iterations: u32,
    memory: u32,
    parallelism: u32,
}

impl Password {
    pub fn new(password: Vec<u8>, params: &KdfParams) -> Self {
        Self {
            password,
            salt: params.salt,
            iterations: params.iterations,
            memory: params.memory,
            parallelism: params.parallelism,
        }
    }

    /// Derives a 32 byte secret bound to `context`.
    ///
    /// The Argon2 salt is `sha256(salt || context)[..16]`, so one passphrase
    /// yields unrelated secrets for different contexts.
    pub fn derive_secret(&self, context: &str) -> Result<[u8; 32], KeyringError> {
        let mut hasher = sha2::Sha256::new();
        hasher.update(self.salt);
        hasher.update(context.as_bytes());
        let derived_salt = hasher.finalize();

        let params = Params::new(self.memory, self.iterations, self.parallelism, Some(32))
            .map_err(|e| KeyringError::InvalidKdfParams(e.to_string()))?;

        let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

        let mut secret = [0u8; 32];
        argon2
            .hash_password_into(&self.password, &derived_salt[..16], &mut secret)
            .map_err(|e| KeyringError::EncryptionFailed(format!("Argon2 hashing failed: {}", e)))?;

        Ok(secret)
    }
}
