//! Foundational utilities for netdata collector drivers.
//!
//! This crate provides the timing primitives the drivers in `rt` build upon:
//! per-cycle deadlines shared between producer tasks, and the exponential
//! backoff applied between failed collection cycles.

// Deadline management
pub mod deadline;
pub use deadline::Deadline;

// Retry backoff
pub mod backoff;
pub use backoff::Backoff;
