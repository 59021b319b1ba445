//! Ergonomic error context helpers.
//!
//! Provides extension traits for adding host-operation context to `Result`
//! types, converting collaborator failures into context-rich `PolicyError`
//! variants.

use crate::base::policyerror::PolicyError;
use std::fmt::Display;
use time::OffsetDateTime;

/// Current time as epoch seconds.
pub fn unix_now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Extension trait for attaching host context to fallible results.
pub trait HostResultExt<T> {
    /// Wrap the error as a failed host operation on `target`.
    ///
    /// # Example
    /// ```ignore
    /// use cookieguard::base::context::HostResultExt;
    ///
    /// let text = std::fs::read_to_string(&path).host_context("read", path.display())?;
    /// // Error: "Host read failed for /tmp/store.json: No such file or directory"
    /// ```
    fn host_context(self, op: &'static str, target: impl Display) -> Result<T, PolicyError>;
}

impl<T, E: Display> HostResultExt<T> for Result<T, E> {
    fn host_context(self, op: &'static str, target: impl Display) -> Result<T, PolicyError> {
        self.map_err(|e| PolicyError::host_io(op, target.to_string(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_host_context() {
        let result: Result<(), Error> = Err(Error::new(ErrorKind::PermissionDenied, "denied"));
        let err = result.host_context("write", "store.json").unwrap_err();

        match err {
            PolicyError::HostIo { op, target, detail } => {
                assert_eq!(op, "write");
                assert_eq!(target, "store.json");
                assert_eq!(detail, "denied");
            }
            _ => panic!("Expected HostIo"),
        }
    }

    #[test]
    fn test_unix_now_is_recent() {
        // 2024-01-01T00:00:00Z
        assert!(unix_now() > 1_704_067_200);
    }
}
