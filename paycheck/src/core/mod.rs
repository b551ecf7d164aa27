//! Deterministic, pure logic shared by the intake wizard and the check pipeline.
//!
//! Core modules must be free of I/O side effects and timers. They operate on
//! in-memory data structures and return deterministic outputs suitable for tests.

pub mod invariants;
pub mod pipeline;
pub mod types;
pub mod wizard;
pub mod wizard_data;
