use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use atlas_common::{
    address::{Address, ACCOUNT_HRP},
    crypto::hash::sha256,
    utils::security::generate_seed,
};

use super::{
    types::{KeyRecord, KeyType, PublicKeyInfo},
    Keybase,
};
use crate::{
    errors::KeyringError,
    vault::{decrypt_secret_key, encrypt_secret_key, Armor, KdfParams},
};

/// On-disk form of a key, one JSON file per name.
#[derive(Debug, Serialize, Deserialize)]
struct KeyFile {
    name: String,
    #[serde(rename = "type")]
    key_type: KeyType,
    address: Address,
    public_key: PublicKeyInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    armor: Option<Armor>,
}

impl KeyFile {
    fn record(&self) -> KeyRecord {
        KeyRecord {
            name: self.name.clone(),
            key_type: self.key_type,
            address: self.address.clone(),
            public_key: self.public_key.clone(),
        }
    }
}

/// A directory of `<name>.json` key files.
///
/// Local keys are stored encrypted with Argon2id + AES-256-GCM. Existing
/// keys are never overwritten.
#[derive(Debug, Clone)]
pub struct FileKeybase {
    dir: PathBuf,
    kdf: KdfParams,
}

impl FileKeybase {
    /// Opens an existing key store. A missing directory is an error.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, KeyringError> {
        let dir = dir.into();
        if let Err(source) = fs::read_dir(&dir) {
            return Err(KeyringError::Unavailable { path: dir, source });
        }
        debug!(path = %dir.display(), "opened key store");
        Ok(Self { dir, kdf: KdfParams::default() })
    }

    /// Creates the key store directory (owner-only) if needed and opens it.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, KeyringError> {
        let dir = dir.into();
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder.create(&dir)?;
        Self::open(dir)
    }

    /// Cost parameters for keys added from now on.
    pub fn with_kdf_params(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Generates and stores a new local key.
    pub fn add_local(&self, name: &str, passphrase: &str) -> Result<KeyRecord, KeyringError> {
        let sk = SigningKey::from_bytes(&generate_seed());
        self.import_local(name, &sk, passphrase)
    }

    /// Stores an existing secret key as a local key.
    pub fn import_local(
        &self,
        name: &str,
        sk: &SigningKey,
        passphrase: &str,
    ) -> Result<KeyRecord, KeyringError> {
        let pk = sk.verifying_key();
        let armor = encrypt_secret_key(sk, passphrase, self.kdf.resalted())?;
        self.store(KeyFile {
            name: name.to_string(),
            key_type: KeyType::Local,
            address: Address::address_from_pk(&pk, ACCOUNT_HRP)?,
            public_key: PublicKeyInfo::Single { key: pk },
            armor: Some(armor),
        })
    }

    /// Stores a public key whose secret lives elsewhere.
    pub fn add_offline(&self, name: &str, pk: VerifyingKey) -> Result<KeyRecord, KeyringError> {
        self.add_public(name, KeyType::Offline, pk)
    }

    pub fn add_ledger(&self, name: &str, pk: VerifyingKey) -> Result<KeyRecord, KeyringError> {
        self.add_public(name, KeyType::Ledger, pk)
    }

    /// Stores a `threshold`-of-`keys.len()` multisig.
    ///
    /// Keys are sorted; the address is `sha256(threshold_be || keys...)`.
    pub fn add_multisig(
        &self,
        name: &str,
        threshold: u32,
        mut keys: Vec<VerifyingKey>,
    ) -> Result<KeyRecord, KeyringError> {
        if keys.is_empty() {
            return Err(KeyringError::InvalidMultisig("no keys".into()));
        }
        if threshold == 0 || threshold as usize > keys.len() {
            return Err(KeyringError::InvalidMultisig(format!(
                "threshold {} out of range for {} keys",
                threshold,
                keys.len()
            )));
        }

        keys.sort_by_key(|k| k.to_bytes());
        if keys.windows(2).any(|w| w[0] == w[1]) {
            return Err(KeyringError::InvalidMultisig("duplicate key".into()));
        }

        let mut preimage = threshold.to_be_bytes().to_vec();
        for key in &keys {
            preimage.extend_from_slice(key.as_bytes());
        }
        let address = Address::from_bytes(ACCOUNT_HRP, &sha256(&preimage))?;

        self.store(KeyFile {
            name: name.to_string(),
            key_type: KeyType::Multisig,
            address,
            public_key: PublicKeyInfo::Multisig { threshold, keys },
            armor: None,
        })
    }

    fn add_public(
        &self,
        name: &str,
        key_type: KeyType,
        pk: VerifyingKey,
    ) -> Result<KeyRecord, KeyringError> {
        self.store(KeyFile {
            name: name.to_string(),
            key_type,
            address: Address::address_from_pk(&pk, ACCOUNT_HRP)?,
            public_key: PublicKeyInfo::Single { key: pk },
            armor: None,
        })
    }

    fn key_path(&self, name: &str) -> Result<PathBuf, KeyringError> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{}.json", name)))
    }

    fn store(&self, file: KeyFile) -> Result<KeyRecord, KeyringError> {
        let path = self.key_path(&file.name)?;
        let mut json = serde_json::to_vec_pretty(&file)?;
        json.push(b'\n');

        // Written aside and linked into place, so a name is either absent or
        // holds a complete key file.
        let mut builder = tempfile::Builder::new();
        builder.prefix(".tmp-");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(fs::Permissions::from_mode(0o600));
        }
        let mut tmp = builder.tempfile_in(&self.dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        match tmp.persist_noclobber(&path) {
            Ok(_) => {}
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                return Err(KeyringError::KeyExists(file.name));
            }
            Err(e) => return Err(e.error.into()),
        }

        info!(name = %file.name, key_type = %file.key_type, address = %file.address, "stored key");
        Ok(file.record())
    }

    fn load(&self, name: &str) -> Result<KeyFile, KeyringError> {
        let path = self.key_path(name)?;
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(KeyringError::KeyNotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let corrupt = |reason: String| KeyringError::Corrupt { name: name.to_string(), reason };

        let file: KeyFile = serde_json::from_str(&data).map_err(|e| corrupt(e.to_string()))?;
        if file.name != name {
            return Err(corrupt(format!("file holds key {}", file.name)));
        }
        if let PublicKeyInfo::Single { key } = &file.public_key {
            if Address::address_from_pk(key, ACCOUNT_HRP)? != file.address {
                return Err(corrupt("address does not match public key".into()));
            }
        }
        Ok(file)
    }
}

impl Keybase for FileKeybase {
    fn get(&self, name: &str) -> Result<KeyRecord, KeyringError> {
        self.load(name).map(|file| file.record())
    }

    fn list(&self) -> Result<Vec<KeyRecord>, KeyringError> {
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if validate_name(name).is_err() {
                continue;
            }
            records.push(self.get(name)?);
        }
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }

    fn sign(
        &self,
        name: &str,
        passphrase: &str,
        msg: &[u8],
    ) -> Result<([u8; 64], VerifyingKey), KeyringError> {
        let file = self.load(name)?;

        match file.key_type {
            KeyType::Local => {}
            KeyType::Ledger => return Err(KeyringError::LedgerUnsupported(file.name)),
            key_type @ (KeyType::Offline | KeyType::Multisig) => {
                return Err(KeyringError::CannotSign { name: file.name, key_type });
            }
        }

        let corrupt = |reason: &str| KeyringError::Corrupt {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        let armor = file.armor.as_ref().ok_or_else(|| corrupt("local key without secret"))?;
        let expected = file
            .public_key
            .single()
            .ok_or_else(|| corrupt("local key with multisig public key"))?;

        let sk = decrypt_secret_key(armor, passphrase)?;
        let pk = sk.verifying_key();
        if &pk != expected {
            return Err(corrupt("secret does not match public key"));
        }

        debug!(name, "signing with local key");
        Ok((sk.sign(msg).to_bytes(), pk))
    }
}

fn validate_name(name: &str) -> Result<(), KeyringError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(KeyringError::InvalidName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier};
    use tempfile::tempdir;

    fn cheap_kdf() -> KdfParams {
        KdfParams::new(1, 1024, 1)
    }

    fn keybase(dir: &Path) -> FileKeybase {
        FileKeybase::create(dir.join("keyring")).unwrap().with_kdf_params(cheap_kdf())
    }

    fn random_pk() -> VerifyingKey {
        SigningKey::from_bytes(&generate_seed()).verifying_key()
    }

    #[test]
    fn test_open_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let result = FileKeybase::open(dir.path().join("nope"));
        assert!(matches!(result, Err(KeyringError::Unavailable { .. })));
    }

    #[test]
    fn test_add_local_then_sign() {
        let dir = tempdir().unwrap();
        let kb = keybase(dir.path());

        let record = kb.add_local("validator", "passphrase123").unwrap();
        assert_eq!(record.key_type, KeyType::Local);
        assert!(record.address.starts_with("nbex1"));
        assert_eq!(kb.get("validator").unwrap(), record);

        let (sig, pk) = kb.sign("validator", "passphrase123", b"hello").unwrap();
        assert_eq!(Some(&pk), record.public_key.single());
        pk.verify(b"hello", &Signature::from_bytes(&sig)).unwrap();
    }

    #[test]
    fn test_sign_with_wrong_passphrase_fails() {
        let dir = tempdir().unwrap();
        let kb = keybase(dir.path());
        kb.add_local("validator", "right").unwrap();

        let result = kb.sign("validator", "wrong", b"hello");
        assert!(matches!(result, Err(KeyringError::DecryptionFailed(_))));
    }

    #[test]
    fn test_existing_key_is_not_overwritten() {
        let dir = tempdir().unwrap();
        let kb = keybase(dir.path());
        let first = kb.add_local("validator", "pw").unwrap();

        let result = kb.add_offline("validator", random_pk());
        assert!(matches!(result, Err(KeyringError::KeyExists(_))));
        assert_eq!(kb.get("validator").unwrap(), first);

        let names: Vec<_> = fs::read_dir(kb.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("validator.json")]);
    }

    #[test]
    fn test_missing_key_and_bad_names() {
        let dir = tempdir().unwrap();
        let kb = keybase(dir.path());

        assert!(matches!(kb.get("ghost"), Err(KeyringError::KeyNotFound(_))));
        assert!(matches!(kb.get("../escape"), Err(KeyringError::InvalidName(_))));
        assert!(matches!(kb.add_offline("", random_pk()), Err(KeyringError::InvalidName(_))));
        assert!(matches!(
            kb.add_offline(".hidden", random_pk()),
            Err(KeyringError::InvalidName(_))
        ));
    }

    #[test]
    fn test_offline_multisig_and_ledger_cannot_sign() {
        let dir = tempdir().unwrap();
        let kb = keybase(dir.path());

        kb.add_offline("cold", random_pk()).unwrap();
        kb.add_multisig("council", 2, vec![random_pk(), random_pk(), random_pk()]).unwrap();
        kb.add_ledger("device", random_pk()).unwrap();

        assert!(matches!(
            kb.sign("cold", "", b"m"),
            Err(KeyringError::CannotSign { key_type: KeyType::Offline, .. })
        ));
        assert!(matches!(
            kb.sign("council", "", b"m"),
            Err(KeyringError::CannotSign { key_type: KeyType::Multisig, .. })
        ));
        assert!(matches!(kb.sign("device", "", b"m"), Err(KeyringError::LedgerUnsupported(_))));
    }

    #[test]
    fn test_multisig_address_ignores_key_order() {
        let dir = tempdir().unwrap();
        let kb = keybase(dir.path());
        let (a, b) = (random_pk(), random_pk());

        let first = kb.add_multisig("ms1", 1, vec![a, b]).unwrap();
        let second = kb.add_multisig("ms2", 1, vec![b, a]).unwrap();
        let other_threshold = kb.add_multisig("ms3", 2, vec![a, b]).unwrap();

        assert_eq!(first.address, second.address);
        assert_ne!(first.address, other_threshold.address);
    }

    #[test]
    fn test_multisig_rejects_bad_threshold_and_duplicates() {
        let dir = tempdir().unwrap();
        let kb = keybase(dir.path());
        let a = random_pk();

        assert!(matches!(kb.add_multisig("m", 0, vec![a]), Err(KeyringError::InvalidMultisig(_))));
        assert!(matches!(kb.add_multisig("m", 2, vec![a]), Err(KeyringError::InvalidMultisig(_))));
        assert!(matches!(kb.add_multisig("m", 1, vec![]), Err(KeyringError::InvalidMultisig(_))));
        assert!(matches!(
            kb.add_multisig("m", 1, vec![a, a]),
            Err(KeyringError::InvalidMultisig(_))
        ));
    }

    #[test]
    fn test_list_is_sorted_and_skips_foreign_files() {
        let dir = tempdir().unwrap();
        let kb = keybase(dir.path());
        kb.add_offline("zeta", random_pk()).unwrap();
        kb.add_offline("alpha", random_pk()).unwrap();
        fs::write(kb.dir().join("notes.txt"), "ignore me").unwrap();

        let names: Vec<_> = kb.list().unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_tampered_file_is_reported_corrupt() {
        let dir = tempdir().unwrap();
        let kb = keybase(dir.path());
        kb.add_offline("cold", random_pk()).unwrap();

        let path = kb.dir().join("cold.json");
        let mut value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        value["address"] = serde_json::Value::String(
            Address::address_from_pk(&random_pk(), ACCOUNT_HRP).unwrap().to_string(),
        );
        fs::write(&path, value.to_string()).unwrap();

        assert!(matches!(kb.get("cold"), Err(KeyringError::Corrupt { .. })));

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(kb.get("cold"), Err(KeyringError::Corrupt { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_key_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let kb = keybase(dir.path());
        kb.add_local("validator", "pw").unwrap();

        let mode = fs::metadata(kb.dir().join("validator.json")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        let dir_mode = fs::metadata(kb.dir()).unwrap().permissions().mode();
        assert_eq!(dir_mode & 0o777, 0o700);
    }
}
