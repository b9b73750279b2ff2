//! Mock implementations for testing.
//!
//! This module provides `MockFs`, `MockCommands` and pre-built scenarios for
//! testing collectors without a real Linux `/proc` or external binaries.

mod commands;
mod filesystem;
mod scenarios;

pub use commands::MockCommands;
pub use filesystem::MockFs;
