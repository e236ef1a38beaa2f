/// Key pair and process-wide key store
use crate::cache::ResultCache;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::info;

/// Key length for AES-256
pub const KEY_LEN: usize = 32;
/// IV length for AES-CBC
pub const IV_LEN: usize = 16;

/// Fallback key used when `CRYPTO_KEY` is not set
pub const DEFAULT_KEY_B64: &str = "qKG6nnv7VXVSA4pDotDyWNx8ca5mKxWkn0eL784GxKQ=";
/// Fallback IV used when `CRYPTO_IV` is not set
pub const DEFAULT_IV_B64: &str = "k3vi7ZFUB8/XSID2AXEwug==";

/// Key validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidKeyError {
    #[error("{field} is not valid base64: {reason}")]
    Encoding { field: &'static str, reason: String },

    #[error("{field} must be {expected} bytes, got {actual}")]
    Length {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// AES key and IV, always exactly 32 and 16 bytes
#[derive(Clone, PartialEq, Eq)]
pub struct CryptoKeyPair {
    key: [u8; KEY_LEN],
    iv: [u8; IV_LEN],
}

/// Base64 form of a key pair, as exchanged over `/keys`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EncodedKeyPair {
    pub key: String,
    pub iv: String,
}

impl CryptoKeyPair {
    pub fn new(key: [u8; KEY_LEN], iv: [u8; IV_LEN]) -> Self {
        Self { key, iv }
    }

    /// Decode and validate a base64 key/IV pair
    pub fn from_base64(key_b64: &str, iv_b64: &str) -> Result<Self, InvalidKeyError> {
        let key = decode_exact::<KEY_LEN>("key", key_b64)?;
        let iv = decode_exact::<IV_LEN>("iv", iv_b64)?;
        Ok(Self { key, iv })
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    pub fn to_encoded(&self) -> EncodedKeyPair {
        EncodedKeyPair {
            key: general_purpose::STANDARD.encode(self.key),
            iv: general_purpose::STANDARD.encode(self.iv),
        }
    }
}

impl Default for CryptoKeyPair {
    fn default() -> Self {
        // Both constants are checked by test_default_pair_is_valid
        Self::from_base64(DEFAULT_KEY_B64, DEFAULT_IV_B64)
            .unwrap_or_else(|_| Self::new([0u8; KEY_LEN], [0u8; IV_LEN]))
    }
}

impl std::fmt::Debug for CryptoKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoKeyPair")
            .field("key", &"<redacted>")
            .field("iv", &"<redacted>")
            .finish()
    }
}

impl TryFrom<&EncodedKeyPair> for CryptoKeyPair {
    type Error = InvalidKeyError;

    fn try_from(encoded: &EncodedKeyPair) -> Result<Self, Self::Error> {
        Self::from_base64(&encoded.key, &encoded.iv)
    }
}

fn decode_exact<const N: usize>(field: &'static str, value: &str) -> Result<[u8; N], InvalidKeyError> {
    let bytes = general_purpose::STANDARD
        .decode(value.trim())
        .map_err(|e| InvalidKeyError::Encoding {
            field,
            reason: e.to_string(),
        })?;
    let actual = bytes.len();
    bytes.try_into().map_err(|_| InvalidKeyError::Length {
        field,
        expected: N,
        actual,
    })
}

/// Holds the active key pair; rotation flushes the result cache
pub struct KeyStore {
    current: RwLock<CryptoKeyPair>,
    cache: Arc<ResultCache>,
}

impl KeyStore {
    pub fn new(initial: CryptoKeyPair, cache: Arc<ResultCache>) -> Self {
        Self {
            current: RwLock::new(initial),
            cache,
        }
    }

    /// Snapshot of the active key pair
    pub fn get(&self) -> CryptoKeyPair {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace the active pair and drop every cached dossier.
    ///
    /// The swap happens while the cache lock is held, so no reader sees the
    /// new key alongside entries fetched under the old one.
    pub fn set(&self, pair: CryptoKeyPair) -> usize {
        let removed = self.cache.clear_with(|| {
            *self
                .current
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner()) = pair;
        });
        crate::metrics::KEY_ROTATIONS_TOTAL.inc();
        info!(flushed = removed, "Encryption keys rotated");
        removed
    }

    /// Validate a base64 pair, then rotate. Nothing changes on failure.
    pub fn set_encoded(&self, encoded: &EncodedKeyPair) -> Result<usize, InvalidKeyError> {
        let pair = CryptoKeyPair::try_from(encoded)?;
        Ok(self.set(pair))
    }
}
