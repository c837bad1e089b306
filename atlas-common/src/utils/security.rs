use rand::{rngs::OsRng, RngCore};

/// `N` bytes from the operating system RNG.
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// AES-GCM nonce.
pub fn generate_nonce() -> [u8; 12] {
    random_bytes()
}

/// Argon2 salt.
pub fn generate_salt() -> [u8; 16] {
    random_bytes()
}

/// An ed25519 secret key seed.
pub fn generate_seed() -> [u8; 32] {
    random_bytes()
}
