//! Periodic expiration sweeps.

pub mod sweeper;

pub use sweeper::Sweeper;
