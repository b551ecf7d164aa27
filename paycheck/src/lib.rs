//! Pay-check intake wizard with a simulated agent pipeline.
//!
//! A five-step wizard collects employment details and documents, runs a
//! timer-driven simulation of nine analysis agents, and shows the result. The
//! architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (wizard navigation, stage state
//!   machine, invariants). No I/O, no clocks.
//! - **[`io`]**: Side-effecting operations (config, seed, report files).
//! - **[`simulator`]**: The tokio task that drives the pipeline on timers.
//!
//! [`session`] ties the wizard to the simulator; [`views`] is the CLI front end.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod session;
pub mod simulator;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod views;
