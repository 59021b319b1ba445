//! Encryption-at-rest for cookie values.
//!
//! A protected cookie keeps only a [`sentinel`] in the host jar; the real
//! value lives in an [`envelope::EncryptedEnvelope`] stored beside it and is
//! only decrypted on explicit request.

pub mod envelope;
pub mod key;
pub mod sentinel;
pub mod vault;

pub use envelope::EncryptedEnvelope;
pub use key::EncryptionKey;
pub use vault::EncryptionVault;
