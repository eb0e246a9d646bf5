//! # Lanewar Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Determinism test harness
//! - Fixture catalogs, setups and spawn scripts
//! - A delegate that records every notification
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;
pub mod recorder;

/// Re-export proptest for convenience.
pub use proptest;
