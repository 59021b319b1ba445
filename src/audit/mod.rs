//! Audit trail of policy decisions.

pub mod auditlog;
pub mod entry;

pub use auditlog::{AuditLog, DEFAULT_CAPACITY};
pub use entry::{AuditAction, AuditEntry};
