/// Probe-and-replace handling of encrypted response envelopes
///
/// The middleware wraps most payloads as `{"data": "<base64 ciphertext>", ...}`.
/// A response either decrypts into the domain object, or comes back as-is
/// with a `decrypt_error` annotation. Decryption failures never abort the
/// caller.

use crate::crypto::{decrypt_json, CryptoError, CryptoKeyPair};
use serde_json::Value;

/// Field holding the ciphertext
pub const DATA_FIELD: &str = "data";
/// Field attached when the ciphertext could not be opened
pub const DECRYPT_ERROR_FIELD: &str = "decrypt_error";

/// Outcome of probing a response body
#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopeOrRaw {
    /// `data` decrypted to this JSON document
    Decrypted(Value),
    /// `data` looked like ciphertext but could not be opened
    RawWithDiagnostic(Value, CryptoError),
    /// No ciphertext to open
    Raw(Value),
}

impl EnvelopeOrRaw {
    /// Collapse into the value handed to callers
    pub fn into_value(self) -> Value {
        match self {
            EnvelopeOrRaw::Decrypted(value) | EnvelopeOrRaw::Raw(value) => value,
            EnvelopeOrRaw::RawWithDiagnostic(mut value, reason) => {
                if let Some(object) = value.as_object_mut() {
                    object.insert(
                        DECRYPT_ERROR_FIELD.to_string(),
                        Value::String(reason.to_string()),
                    );
                }
                value
            }
        }
    }
}

/// Inspect a parsed body for a non-empty string `data` field and try to decrypt it
pub fn open_envelope(body: Value, keys: &CryptoKeyPair) -> EnvelopeOrRaw {
    let ciphertext = match body.get(DATA_FIELD).and_then(Value::as_str) {
        Some(data) if !data.is_empty() => data,
        _ => return EnvelopeOrRaw::Raw(body),
    };

    match decrypt_json(ciphertext, keys) {
        Ok(decrypted) => EnvelopeOrRaw::Decrypted(decrypted),
        Err(e) => EnvelopeOrRaw::RawWithDiagnostic(body, e),
    }
}
