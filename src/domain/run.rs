//! Pipeline run state for the manual voice test harness.
//!
//! A PipelineRun is one capture-through-playback cycle: raw audio, then
//! the transcript, then the reply, then synthesized audio. It is
//! ephemeral and never retained across runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The three sequential stages of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Audio payload -> transcript text
    Transcribe,

    /// Transcript text -> reply text
    Reply,

    /// Reply text -> synthesized audio
    Synthesize,
}

impl PipelineStage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Transcribe => "transcribe",
            Self::Reply => "reply",
            Self::Synthesize => "synthesize",
        }
    }
}

/// One capture-through-playback cycle.
///
/// Each stage's output is the next stage's input; the run is abandoned,
/// never retried, on any stage failure.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// Unique identifier for this run
    pub id: Uuid,

    /// When capture was finalized
    pub captured_at: DateTime<Utc>,

    /// Raw captured audio, passed to the server as an opaque blob
    pub audio: Vec<u8>,

    /// File name reported alongside the audio payload
    pub file_name: String,

    /// Transcript produced by the transcribe stage
    pub transcript: Option<String>,

    /// Reply produced by the reply stage
    pub reply: Option<String>,
}

impl PipelineRun {
    /// Create a run from finalized capture output
    pub fn new(audio: Vec<u8>, file_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            captured_at: Utc::now(),
            audio,
            file_name: file_name.into(),
            transcript: None,
            reply: None,
        }
    }

    /// Whether capture produced any data at all
    pub fn is_empty(&self) -> bool {
        self.audio.is_empty()
    }
}
