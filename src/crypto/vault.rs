//! Encryption-at-rest.
//!
//! The vault owns the single AES-256-GCM key and the envelope side table.
//! The key is generated on first use and persisted under `encryptionKey`; it
//! changes only through [`EncryptionVault::rotate_key`], which orphans every
//! envelope sealed under the previous key.
//!
//! ## Envelope format
//! - Nonce: 12 random bytes per call
//! - Ciphertext: AES-256-GCM output including the 16-byte tag
//! - Associated data: the cookie domain

use crate::base::policyerror::PolicyError;
use crate::cookies::canonicalcookie::Cookie;
use crate::crypto::envelope::EncryptedEnvelope;
use crate::crypto::key::EncryptionKey;
use crate::crypto::sentinel;
use crate::storage::{self, keys, KeyValueStore};
use aes_gcm::aead::{Aead, AeadCore, OsRng, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::RwLock;

const NONCE_LEN: usize = 12;

pub struct EncryptionVault {
    storage: Arc<dyn KeyValueStore>,
    key: RwLock<Option<EncryptionKey>>,
}

impl EncryptionVault {
    /// Open the vault, loading a persisted key if there is one.
    ///
    /// A persisted key that cannot be decoded is an error: silently replacing
    /// it would orphan every existing envelope.
    pub async fn open(storage: Arc<dyn KeyValueStore>) -> Result<Self, PolicyError> {
        let key = match storage::get_typed::<String>(storage.as_ref(), keys::ENCRYPTION_KEY).await {
            Ok(Some(encoded)) => Some(EncryptionKey::from_base64(&encoded)?),
            Ok(None) => None,
            Err(PolicyError::Serialization(e)) => return Err(PolicyError::InvalidKey(e)),
            Err(e) => return Err(e),
        };
        Ok(Self {
            storage,
            key: RwLock::new(key),
        })
    }

    pub async fn has_key(&self) -> bool {
        self.key.read().await.is_some()
    }

    /// Seal `plaintext` for `domain`. Generates the key on first use.
    pub async fn encrypt(&self, plaintext: &str, domain: &str) -> Result<EncryptedEnvelope, PolicyError> {
        self.ensure_key().await?;
        let guard = self.key.read().await;
        let key = guard
            .as_ref()
            .ok_or_else(|| PolicyError::Encryption("no encryption key".into()))?;

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = key
            .cipher()
            .encrypt(
                &nonce,
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: domain.as_bytes(),
                },
            )
            .map_err(|_| PolicyError::Encryption("AES-GCM encryption failed".into()))?;

        Ok(EncryptedEnvelope {
            ciphertext: STANDARD.encode(ciphertext),
            nonce: STANDARD.encode(nonce),
            domain: domain.to_string(),
            created_at: OffsetDateTime::now_utc(),
        })
    }

    /// Open an envelope with the active key.
    pub async fn decrypt(&self, envelope: &EncryptedEnvelope) -> Result<String, PolicyError> {
        let ciphertext = STANDARD
            .decode(&envelope.ciphertext)
            .map_err(|_| PolicyError::Decryption("ciphertext is not base64".into()))?;
        let nonce = STANDARD
            .decode(&envelope.nonce)
            .map_err(|_| PolicyError::Decryption("nonce is not base64".into()))?;
        if nonce.len() != NONCE_LEN {
            return Err(PolicyError::Decryption(format!(
                "nonce must be {} bytes, got {}",
                NONCE_LEN,
                nonce.len()
            )));
        }

        let guard = self.key.read().await;
        let key = guard
            .as_ref()
            .ok_or_else(|| PolicyError::Decryption("no encryption key".into()))?;

        let plaintext = key
            .cipher()
            .decrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: &ciphertext,
                    aad: envelope.domain.as_bytes(),
                },
            )
            .map_err(|_| {
                PolicyError::Decryption("authentication failed (tampered or wrong key)".into())
            })?;

        String::from_utf8(plaintext)
            .map_err(|_| PolicyError::Decryption("plaintext is not UTF-8".into()))
    }

    /// Replace the key. Persisted before it takes effect, so a failed write
    /// leaves the old key active.
    pub async fn rotate_key(&self) -> Result<(), PolicyError> {
        let fresh = EncryptionKey::generate();
        storage::set_typed(self.storage.as_ref(), keys::ENCRYPTION_KEY, &fresh.to_base64()).await?;
        *self.key.write().await = Some(fresh);
        tracing::info!("encryption key rotated");
        Ok(())
    }

    async fn ensure_key(&self) -> Result<(), PolicyError> {
        if self.key.read().await.is_some() {
            return Ok(());
        }
        let mut guard = self.key.write().await;
        if guard.is_none() {
            let fresh = EncryptionKey::generate();
            storage::set_typed(self.storage.as_ref(), keys::ENCRYPTION_KEY, &fresh.to_base64())
                .await?;
            *guard = Some(fresh);
            tracing::info!("generated encryption key");
        }
        Ok(())
    }

    pub async fn store_envelope(&self, name: &str, envelope: &EncryptedEnvelope) -> Result<(), PolicyError> {
        let key = keys::envelope(&envelope.domain, name);
        storage::set_typed(self.storage.as_ref(), &key, envelope).await
    }

    pub async fn load_envelope(&self, domain: &str, name: &str) -> Result<EncryptedEnvelope, PolicyError> {
        let key = keys::envelope(domain, name);
        storage::get_typed(self.storage.as_ref(), &key)
            .await?
            .ok_or(PolicyError::NotFound(key))
    }

    pub async fn remove_envelope(&self, domain: &str, name: &str) -> Result<(), PolicyError> {
        self.storage.remove(&[keys::envelope(domain, name).as_str()]).await
    }

    /// Decrypt the stored envelope for a cookie.
    pub async fn decrypt_stored(&self, domain: &str, name: &str) -> Result<String, PolicyError> {
        let envelope = self.load_envelope(domain, name).await?;
        self.decrypt(&envelope).await
    }

    /// Encrypt a cookie's value and store the envelope. Returns the copy of
    /// the cookie carrying the sentinel, or `None` when the value already is
    /// one. The caller writes the copy back and calls
    /// [`remove_envelope`](Self::remove_envelope) if that write fails.
    pub async fn seal_cookie(&self, cookie: &Cookie) -> Result<Option<Cookie>, PolicyError> {
        if sentinel::is_sentinel(&cookie.value) {
            return Ok(None);
        }
        let envelope = self.encrypt(&cookie.value, &cookie.domain).await?;
        self.store_envelope(&cookie.name, &envelope).await?;

        let mut sealed = cookie.clone();
        sealed.value = sentinel::encode(&cookie.domain, &cookie.name);
        Ok(Some(sealed))
    }
}
