use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PolicyError {
    // Host collaborator failures
    #[error("Host {op} failed for {target}: {detail}")]
    HostIo {
        op: &'static str,
        target: String,
        detail: String,
    },

    // Policy configuration errors
    #[error("Malformed pattern '{pattern}': {reason}")]
    MalformedPattern { pattern: String, reason: String },
    #[error("Invalid rule: {0}")]
    InvalidRule(String),
    #[error("The default rule cannot be removed")]
    DefaultRuleRequired,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Crypto errors
    #[error("Decryption failed: {0}")]
    Decryption(String),
    #[error("Encryption failed: {0}")]
    Encryption(String),
    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),

    // Data errors
    #[error("Invalid backup payload: {0}")]
    InvalidBackup(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Subsystem unavailable: {0}")]
    SubsystemUnavailable(&'static str),
}

impl PolicyError {
    /// Stable numeric code, reported to UI surfaces alongside the message.
    pub fn as_i32(&self) -> i32 {
        match self {
            PolicyError::HostIo { .. } => -100,
            PolicyError::MalformedPattern { .. } => -200,
            PolicyError::InvalidRule(_) => -201,
            PolicyError::DefaultRuleRequired => -202,
            PolicyError::InvalidConfig(_) => -203,
            PolicyError::Decryption(_) => -300,
            PolicyError::Encryption(_) => -301,
            PolicyError::InvalidKey(_) => -302,
            PolicyError::InvalidBackup(_) => -400,
            PolicyError::Serialization(_) => -401,
            PolicyError::NotFound(_) => -402,
            PolicyError::SubsystemUnavailable(_) => -500,
        }
    }

    pub fn host_io(op: &'static str, target: impl Into<String>, detail: impl ToString) -> Self {
        PolicyError::HostIo {
            op,
            target: target.into(),
            detail: detail.to_string(),
        }
    }

    pub fn malformed_pattern(pattern: impl Into<String>, reason: impl ToString) -> Self {
        PolicyError::MalformedPattern {
            pattern: pattern.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error came from a host collaborator rather than policy logic.
    pub fn is_host_failure(&self) -> bool {
        matches!(self, PolicyError::HostIo { .. })
    }
}

impl From<serde_json::Error> for PolicyError {
    fn from(err: serde_json::Error) -> Self {
        PolicyError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for PolicyError {
    fn from(err: std::io::Error) -> Self {
        PolicyError::host_io("io", "filesystem", err)
    }
}
