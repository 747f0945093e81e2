//! Shared test utilities for integration tests.

pub mod executors;
pub mod harness;

pub use executors::*;
pub use harness::*;
