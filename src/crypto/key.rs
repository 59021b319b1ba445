use crate::base::policyerror::PolicyError;
use aes_gcm::aead::{KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::fmt;
use zeroize::Zeroize;

pub const KEY_LEN: usize = 32;

/// The process-wide AES-256 key. Wiped from memory on drop.
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    /// Fresh random key from the OS generator.
    pub fn generate() -> Self {
        let mut generated = Aes256Gcm::generate_key(OsRng);
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(generated.as_slice());
        generated.as_mut_slice().zeroize();
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Decode the persisted form.
    pub fn from_base64(encoded: &str) -> Result<Self, PolicyError> {
        let mut decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|e| PolicyError::InvalidKey(format!("not base64: {}", e)))?;
        if decoded.len() != KEY_LEN {
            let len = decoded.len();
            decoded.zeroize();
            return Err(PolicyError::InvalidKey(format!(
                "expected {} bytes, got {}",
                KEY_LEN, len
            )));
        }
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self(bytes))
    }

    /// Persisted form.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    pub(crate) fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0))
    }
}

impl Drop for EncryptionKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_random() {
        let a = EncryptionKey::generate();
        let b = EncryptionKey::generate();
        assert_ne!(a.to_base64(), b.to_base64());
    }

    #[test]
    fn test_base64_roundtrip() {
        let key = EncryptionKey::from_bytes([7u8; KEY_LEN]);
        let restored = EncryptionKey::from_base64(&key.to_base64()).unwrap();
        assert_eq!(restored.0, [7u8; KEY_LEN]);
    }

    #[test]
    fn test_rejects_wrong_length_and_garbage() {
        assert!(matches!(
            EncryptionKey::from_base64("AAAA"),
            Err(PolicyError::InvalidKey(_))
        ));
        assert!(matches!(
            EncryptionKey::from_base64("!!not base64!!"),
            Err(PolicyError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = EncryptionKey::from_bytes([1u8; KEY_LEN]);
        assert_eq!(format!("{:?}", key), "EncryptionKey([REDACTED])");
    }
}
