/// AES-256-CBC cipher used by the Mahakim middleware
///
/// Query parameters are encrypted and base64-encoded before they go on the
/// wire; response envelopes carry a base64 ciphertext under `data`. The
/// counterpart reuses one fixed IV per key pair, so encryption here is
/// deterministic: the same plaintext always yields the same ciphertext.

use super::keys::CryptoKeyPair;
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose, Engine as _};
use thiserror::Error;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// AES block size in bytes
pub const BLOCK_SIZE: usize = 16;

/// Cipher errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid base64 ciphertext: {0}")]
    Base64(String),

    #[error("Empty ciphertext")]
    EmptyCiphertext,

    #[error("Ciphertext length {len} is not a multiple of the block size")]
    CiphertextLength { len: usize },

    #[error("Invalid padding")]
    Padding,

    #[error("Decrypted payload is not valid UTF-8")]
    Utf8,

    #[error("Decrypted payload is not valid JSON: {0}")]
    Json(String),

    #[error("Key material rejected by the cipher")]
    InvalidKeyMaterial,
}

/// Encrypt UTF-8 text and return the base64 ciphertext
pub fn encrypt(plaintext: &str, keys: &CryptoKeyPair) -> Result<String, CryptoError> {
    let cipher = Aes256CbcEnc::new_from_slices(keys.key(), keys.iv())
        .map_err(|_| CryptoError::InvalidKeyMaterial)?;
    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
    Ok(general_purpose::STANDARD.encode(ciphertext))
}

/// Decrypt a base64 ciphertext into raw bytes
pub fn decrypt(ciphertext_b64: &str, keys: &CryptoKeyPair) -> Result<Vec<u8>, CryptoError> {
    let ciphertext = general_purpose::STANDARD
        .decode(ciphertext_b64.trim())
        .map_err(|e| CryptoError::Base64(e.to_string()))?;

    if ciphertext.is_empty() {
        return Err(CryptoError::EmptyCiphertext);
    }
    if ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::CiphertextLength {
            len: ciphertext.len(),
        });
    }

    let cipher = Aes256CbcDec::new_from_slices(keys.key(), keys.iv())
        .map_err(|_| CryptoError::InvalidKeyMaterial)?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|_| CryptoError::Padding)
}

/// Decrypt a base64 ciphertext into UTF-8 text
pub fn decrypt_text(ciphertext_b64: &str, keys: &CryptoKeyPair) -> Result<String, CryptoError> {
    let bytes = decrypt(ciphertext_b64, keys)?;
    String::from_utf8(bytes).map_err(|_| CryptoError::Utf8)
}

/// Decrypt a base64 ciphertext holding a JSON document
pub fn decrypt_json(
    ciphertext_b64: &str,
    keys: &CryptoKeyPair,
) -> Result<serde_json::Value, CryptoError> {
    let text = decrypt_text(ciphertext_b64, keys)?;
    serde_json::from_str(&text).map_err(|e| CryptoError::Json(e.to_string()))
}
