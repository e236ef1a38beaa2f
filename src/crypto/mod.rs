/// Cryptography module for the middleware's symmetric scheme
///
/// Handles AES-256-CBC parameter encryption, envelope decryption and the
/// rotating key pair shared by every request

pub mod cipher;
pub mod keys;

pub use cipher::{decrypt_json, encrypt, CryptoError};
pub use keys::{CryptoKeyPair, EncodedKeyPair, InvalidKeyError, KeyStore};
