//! Base types and error handling.
//!
//! Provides foundational types shared by every policy component:
//! - [`PolicyError`](policyerror::PolicyError): error taxonomy for host, policy and crypto failures
//! - [`context`]: host-operation context helpers and the engine clock

pub mod context;
pub mod policyerror;
