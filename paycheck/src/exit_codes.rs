//! Stable exit codes for paycheck CLI commands.

/// Command succeeded (for `run`: the wizard reached the results step).
pub const OK: i32 = 0;
/// Command failed due to invalid layout/config/seed or other errors.
pub const INVALID: i32 = 1;
/// `paycheck run` was closed before the results step.
pub const CANCELLED: i32 = 2;
/// `paycheck run` halted because a pipeline stage failed.
pub const CHECK_FAILED: i32 = 3;
