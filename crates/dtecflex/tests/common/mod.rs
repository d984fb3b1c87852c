//! Shared utilities for dtecflex integration tests.
//!
//! - `TestHarness` owns temp media/remote roots and an in-memory database
//! - builders create records, entities and configs without boilerplate

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
