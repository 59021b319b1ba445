use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Ciphertext of one cookie value plus what is needed to open it.
///
/// `ciphertext` and `nonce` are standard base64. The domain is bound into
/// the authentication tag, so an envelope moved to another domain fails to
/// decrypt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedEnvelope {
    pub ciphertext: String,
    pub nonce: String,
    pub domain: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
