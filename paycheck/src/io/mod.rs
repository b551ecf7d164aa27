//! I/O helpers for paycheck commands.

pub mod config;
pub mod init;
pub mod report;
pub mod seed;
