//! Field-level codec for at-rest confidentiality of sensitive columns.
//!
//! The codec is applied at the storage-adapter boundary only: entities hold
//! the opaque ciphertext strings and carry no crypto themselves. Currently
//! encoded fields are bank-account balances and provider access tokens.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;
use thiserror::Error;

/// Length of the AES-GCM nonce prepended to every ciphertext.
const NONCE_LEN: usize = 12;

/// Error types for field encoding and decoding.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The configured key is not 32 bytes of valid base64.
    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),

    /// Encryption failed.
    #[error("Failed to encode field")]
    Encrypt,

    /// Decryption failed: wrong key, truncated or tampered ciphertext.
    #[error("Failed to decode field")]
    Decrypt,

    /// The stored value is not valid base64.
    #[error("Ciphertext encoding error: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// The decrypted bytes are not valid UTF-8.
    #[error("Decoded field is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Reversible string codec applied when sensitive fields cross the
/// persistence boundary.
pub trait FieldCodec: Send + Sync + std::fmt::Debug {
    /// Encode a plaintext field value into its stored representation.
    fn encode(&self, plaintext: &str) -> Result<String, CodecError>;

    /// Decode a stored representation back into the plaintext value.
    fn decode(&self, ciphertext: &str) -> Result<String, CodecError>;
}

/// AES-256-GCM implementation of [`FieldCodec`].
///
/// Wire format: `base64(nonce || ciphertext)` with a random 96-bit nonce per
/// encode call, so equal plaintexts never produce equal stored values.
#[derive(Clone)]
pub struct AesGcmCodec {
    key: [u8; 32],
}

impl std::fmt::Debug for AesGcmCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose key material through Debug output.
        f.debug_struct("AesGcmCodec").finish_non_exhaustive()
    }
}

impl AesGcmCodec {
    /// Create a codec from raw key bytes.
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Create a codec from a base64-encoded 32-byte key, as loaded from the
    /// environment at startup.
    pub fn from_base64(encoded: &str) -> Result<Self, CodecError> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| CodecError::InvalidKey(e.to_string()))?;
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CodecError::InvalidKey("key must be 32 bytes".to_string()))?;
        Ok(Self::new(key))
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key))
    }
}

impl FieldCodec for AesGcmCodec {
    fn encode(&self, plaintext: &str) -> Result<String, CodecError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher()
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CodecError::Encrypt)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(out))
    }

    fn decode(&self, ciphertext: &str) -> Result<String, CodecError> {
        let raw = BASE64.decode(ciphertext)?;
        if raw.len() < NONCE_LEN {
            return Err(CodecError::Decrypt);
        }
        let (nonce_bytes, payload) = raw.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher()
            .decrypt(nonce, payload)
            .map_err(|_| CodecError::Decrypt)?;
        Ok(String::from_utf8(plaintext)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> AesGcmCodec {
        AesGcmCodec::new([7u8; 32])
    }

    #[test]
    fn round_trip() {
        let codec = codec();
        let stored = codec.encode("1042.55").unwrap();
        assert_ne!(stored, "1042.55");
        assert_eq!(codec.decode(&stored).unwrap(), "1042.55");
    }

    #[test]
    fn equal_plaintexts_produce_distinct_ciphertexts() {
        let codec = codec();
        let a = codec.encode("secret").unwrap();
        let b = codec.encode("secret").unwrap();
        assert_ne!(a, b);
        assert_eq!(codec.decode(&a).unwrap(), codec.decode(&b).unwrap());
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let codec = codec();
        let stored = codec.encode("0.00").unwrap();
        let mut raw = BASE64.decode(&stored).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xff;
        let tampered = BASE64.encode(raw);
        assert!(matches!(codec.decode(&tampered), Err(CodecError::Decrypt)));
    }

    #[test]
    fn wrong_key_fails_to_decode() {
        let stored = codec().encode("token-abc").unwrap();
        let other = AesGcmCodec::new([9u8; 32]);
        assert!(other.decode(&stored).is_err());
    }

    #[test]
    fn from_base64_validates_key_length() {
        let short = BASE64.encode([1u8; 16]);
        assert!(matches!(
            AesGcmCodec::from_base64(&short),
            Err(CodecError::InvalidKey(_))
        ));

        let good = BASE64.encode([1u8; 32]);
        assert!(AesGcmCodec::from_base64(&good).is_ok());
    }

    #[test]
    fn non_base64_input_is_an_encoding_error() {
        assert!(matches!(
            codec().decode("not base64 !!"),
            Err(CodecError::Encoding(_))
        ));
    }
}
