//! Core client components.
//!
//! This module contains:
//! - Controller: one call session from submission to termination
//! - Harness: the manual voice pipeline test cycle

pub mod controller;
pub mod harness;

// Re-export commonly used types
pub use controller::{format_elapsed, CallSessionController, SubmitError};
pub use harness::{LogLevel, OperatorLogEntry, StageError, VoicePipelineHarness};
