pub mod armor;
pub mod password;

pub use armor::{decrypt_secret_key, encrypt_secret_key, Armor};
pub use password::{KdfParams, Password};
