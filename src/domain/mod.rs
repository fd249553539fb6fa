//! Domain types for the call client.
//!
//! This module contains the core data structures:
//! - Call: session state machine, transcript, request validation
//! - Events: typed messages pushed over the per-call channel
//! - Run: one voice-pipeline test cycle

pub mod call;
pub mod events;
pub mod run;

// Re-export commonly used types
pub use call::{
    normalize_phone_number, CallRequest, CallSession, CallStatus, Speaker, TranscriptEntry,
    ValidationError,
};
pub use events::{decode_message, ChannelEvent};
pub use run::{PipelineRun, PipelineStage};
