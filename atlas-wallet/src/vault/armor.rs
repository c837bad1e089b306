use aes_gcm::{
    Aes256Gcm,
    aead::{Aead, KeyInit, generic_array::GenericArray}
};
use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use atlas_common::utils::security::generate_nonce;

use super::password::{KdfParams, Password};
use crate::errors::KeyringError;

const ARMOR_CONTEXT: &str = "keyring:sk";

/// A passphrase-encrypted ed25519 secret key.
///
/// `ciphertext` is base58 of `nonce (12 bytes) || AES-256-GCM ciphertext`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Armor {
    pub kdf: KdfParams,
    pub ciphertext: String,
}

pub fn encrypt_secret_key(
    sk: &SigningKey,
    passphrase: &str,
    kdf: KdfParams,
) -> Result<Armor, KeyringError> {
    let mut key =
        Password::new(passphrase.as_bytes().to_vec(), &kdf).derive_secret(ARMOR_CONTEXT)?;
    let mut secret = sk.to_bytes();
    let encrypted = encrypt_data(&secret, &key);
    key.zeroize();
    secret.zeroize();

    Ok(Armor {
        kdf,
        ciphertext: bs58::encode(encrypted?).into_string(),
    })
}

pub fn decrypt_secret_key(armor: &Armor, passphrase: &str) -> Result<SigningKey, KeyringError> {
    let mut key =
        Password::new(passphrase.as_bytes().to_vec(), &armor.kdf).derive_secret(ARMOR_CONTEXT)?;
    let decoded = bs58::decode(&armor.ciphertext).into_vec()?;

    let decrypted = decrypt_data(&decoded, &key);
    key.zeroize();

    let mut secret = decrypted?;
    let signing_key = SigningKey::from_bytes(&secret);
    secret.zeroize();
    Ok(signing_key)
}

fn encrypt_data(data: &[u8], key: &[u8; 32]) -> Result<Vec<u8>, KeyringError> {
    let cipher = Aes256Gcm::new(GenericArray::from_slice(key));
    let nonce = generate_nonce();

    let ciphertext = cipher
        .encrypt(GenericArray::from_slice(&nonce), data)
        .map_err(|e| KeyringError::EncryptionFailed(e.to_string()))?;

    let mut output = nonce.to_vec();
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

fn decrypt_data(encrypted: &[u8], key: &[u8; 32]) -> Result<[u8; 32], KeyringError> {
    if encrypted.len() < 12 {
        return Err(KeyringError::DecryptionFailed("Invalid encrypted data: too short".to_string()));
    }

    let (nonce, ciphertext) = encrypted.split_at(12);
    let cipher = Aes256Gcm::new(GenericArray::from_slice(key));
    let decrypted = cipher
        .decrypt(GenericArray::from_slice(nonce), ciphertext)
        .map_err(|_| {
            KeyringError::DecryptionFailed("invalid passphrase or corrupt key".to_string())
        })?;

    decrypted
        .try_into()
        .map_err(|_| KeyringError::DecryptionFailed("Decrypted data is not 32 bytes".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_common::utils::security::{generate_salt, generate_seed};

    fn light() -> KdfParams {
        KdfParams { salt: generate_salt(), iterations: 1, memory: 1024, parallelism: 1 }
    }

    #[test]
    fn test_encrypt_and_decrypt_secret_key() -> Result<(), KeyringError> {
        let sk = SigningKey::from_bytes(&generate_seed());

        let armor = encrypt_secret_key(&sk, "my-secure-password", light())?;
        let decrypted = decrypt_secret_key(&armor, "my-secure-password")?;

        assert_eq!(sk.to_bytes(), decrypted.to_bytes());
        Ok(())
    }

    #[test]
    fn test_decrypt_with_wrong_password_fails() {
        let sk = SigningKey::from_bytes(&generate_seed());
        let armor = encrypt_secret_key(&sk, "correct-password", light()).unwrap();

        let result = decrypt_secret_key(&armor, "wrong-password");
        assert!(matches!(result, Err(KeyringError::DecryptionFailed(_))));
    }

    #[test]
    fn test_decrypt_invalid_data_fails() {
        let armor = Armor { kdf: light(), ciphertext: "invalid_base58_string!".into() };
        assert!(decrypt_secret_key(&armor, "any-password").is_err());

        let armor = Armor { kdf: light(), ciphertext: bs58::encode([1u8; 4]).into_string() };
        assert!(matches!(
            decrypt_secret_key(&armor, "any"),
            Err(KeyringError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_decrypt_with_wrong_salt_fails() {
        let sk = SigningKey::from_bytes(&generate_seed());
        let mut armor = encrypt_secret_key(&sk, "my-password", light()).unwrap();
        armor.kdf = armor.kdf.resalted();

        assert!(
            decrypt_secret_key(&armor, "my-password").is_err(),
            "Decryption should fail with wrong salt"
        );
    }
}
