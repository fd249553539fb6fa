//! outcall - client-side controller for an outbound voice-call agent
//!
//! Initiates calls through a backend API, tracks each call's lifecycle,
//! and renders a live transcript fed over a per-call push channel. A
//! secondary harness exercises the voice pipeline (speech-to-text ->
//! language-model reply -> text-to-speech) for manual testing.
//!
//! # Architecture
//!
//! Session state is a pure function of the ordered event sequence:
//! - Channel events are typed variants applied by a pure transition
//! - Replaying the same events always yields the same session
//! - Transport delivery is isolated from the transition logic
//!
//! # Modules
//!
//! - `adapters`: External integrations (HTTP API, message channel, audio)
//! - `core`: The call session controller and the pipeline test harness
//! - `domain`: Data structures (CallSession, ChannelEvent, PipelineRun)
//! - `config`: Client settings

pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{ApiClient, ChannelClient, ChannelHandle, ChannelMessage};
pub use config::ClientConfig;
pub use crate::core::{CallSessionController, SubmitError, VoicePipelineHarness};
pub use domain::{
    normalize_phone_number, CallRequest, CallSession, CallStatus, ChannelEvent, PipelineRun,
    PipelineStage, Speaker, TranscriptEntry,
};
