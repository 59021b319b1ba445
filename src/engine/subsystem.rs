use crate::base::policyerror::PolicyError;

/// An optional part of the engine that may have failed to start.
///
/// Call sites match on availability instead of holding a nullable handle.
#[derive(Debug)]
pub enum Subsystem<T> {
    Ready(T),
    Unavailable { reason: String },
}

impl<T> Subsystem<T> {
    /// Wrap a construction result, logging the failure.
    pub fn from_result(name: &'static str, result: Result<T, PolicyError>) -> Self {
        match result {
            Ok(value) => Subsystem::Ready(value),
            Err(e) => {
                tracing::error!(subsystem = name, error = %e, "subsystem unavailable");
                Subsystem::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Subsystem::Ready(_))
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Subsystem::Ready(value) => Some(value),
            Subsystem::Unavailable { .. } => None,
        }
    }

    /// The subsystem, or `SubsystemUnavailable(name)`.
    pub fn require(&self, name: &'static str) -> Result<&T, PolicyError> {
        self.get().ok_or(PolicyError::SubsystemUnavailable(name))
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Subsystem::Ready(_) => None,
            Subsystem::Unavailable { reason } => Some(reason),
        }
    }
}
