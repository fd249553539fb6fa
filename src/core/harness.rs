//! Manual voice pipeline test harness.
//!
//! Runs one capture -> transcribe -> reply -> synthesize -> play cycle
//! against the backend test endpoints. Stages execute strictly in
//! sequence, each gated on the previous stage's success; a failure
//! halts the run and is reported with the stage that produced it.
//! Nothing is retried.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{error, info};

use crate::adapters::api::{ApiClient, RequestError};
use crate::adapters::audio::{AudioSink, CaptureDevice, DeviceError};
use crate::config::ClientConfig;
use crate::domain::run::{PipelineRun, PipelineStage};

/// A pipeline stage failure, tagged with the stage that produced it
#[derive(Debug, Error)]
pub enum StageError {
    #[error("{} stage returned an empty result", .stage.name())]
    Empty { stage: PipelineStage },

    #[error("{} stage failed: {source}", .stage.name())]
    Request {
        stage: PipelineStage,
        source: RequestError,
    },

    #[error("Playback failed: {0}")]
    Playback(#[from] DeviceError),
}

impl StageError {
    /// Which stage failed, when the failure belongs to one
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            Self::Empty { stage } | Self::Request { stage, .. } => Some(*stage),
            Self::Playback(_) => Some(PipelineStage::Synthesize),
        }
    }
}

/// Severity of an operator log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Error,
}

/// One timestamped line in the operator log, the harness's
/// user-visible notification surface
#[derive(Debug, Clone)]
pub struct OperatorLogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

/// Runs one manual test cycle of the voice pipeline.
///
/// Owns the capture device exclusively for the duration of a capture;
/// a second capture cannot start while one is active.
pub struct VoicePipelineHarness {
    api: ApiClient,
    config: ClientConfig,
    device: Box<dyn CaptureDevice>,
    sink: Box<dyn AudioSink>,
    capturing: bool,
    log: Vec<OperatorLogEntry>,
}

impl VoicePipelineHarness {
    pub fn new(
        config: ClientConfig,
        device: Box<dyn CaptureDevice>,
        sink: Box<dyn AudioSink>,
    ) -> Self {
        Self {
            api: ApiClient::new(config.clone()),
            config,
            device,
            sink,
            capturing: false,
            log: Vec::new(),
        }
    }

    /// Everything reported to the operator so far, in order
    pub fn log(&self) -> &[OperatorLogEntry] {
        &self.log
    }

    fn report(&mut self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Error => error!("{message}"),
            _ => info!("{message}"),
        }
        self.log.push(OperatorLogEntry {
            timestamp: Utc::now(),
            level,
            message,
        });
    }

    /// Begin buffering audio from the input device
    pub async fn start_capture(&mut self) -> Result<(), DeviceError> {
        if self.capturing {
            let err = DeviceError::CaptureInProgress;
            self.report(LogLevel::Error, format!("Error: {err}"));
            return Err(err);
        }

        if let Err(e) = self.device.begin().await {
            self.report(LogLevel::Error, format!("Error: {e}"));
            return Err(e);
        }

        self.capturing = true;
        self.report(LogLevel::Success, "Recording started...");
        Ok(())
    }

    /// Finalize the capture into a pipeline run
    pub async fn stop_capture(&mut self) -> Result<PipelineRun, DeviceError> {
        if !self.capturing {
            return Err(DeviceError::NotCapturing);
        }
        self.capturing = false;

        let captured = match self.device.finish().await {
            Ok(captured) => captured,
            Err(e) => {
                self.report(LogLevel::Error, format!("Error: {e}"));
                return Err(e);
            }
        };

        self.report(LogLevel::Success, "Recording stopped...");
        Ok(PipelineRun::new(captured.data, captured.file_name))
    }

    /// Run the three-stage pipeline for a captured run.
    ///
    /// An empty capture skips every stage with an explanatory entry.
    /// Each stage failure is reported with its stage name and aborts
    /// the rest of the run.
    pub async fn run_pipeline(&mut self, run: &mut PipelineRun) -> Result<(), StageError> {
        if run.is_empty() {
            self.report(
                LogLevel::Info,
                "No audio captured, nothing to transcribe",
            );
            return Ok(());
        }

        // Stage 1: transcribe
        self.report(LogLevel::Info, "Sending audio for transcription...");
        let transcript = match self.api.transcribe(&run.audio, &run.file_name).await {
            Ok(text) => text,
            Err(source) => {
                return Err(self.fail(StageError::Request {
                    stage: PipelineStage::Transcribe,
                    source,
                }))
            }
        };
        if transcript.is_empty() {
            return Err(self.fail(StageError::Empty {
                stage: PipelineStage::Transcribe,
            }));
        }
        self.report(LogLevel::Success, format!("Transcription: {transcript}"));
        run.transcript = Some(transcript.clone());

        // Stage 2: reply
        self.report(LogLevel::Info, "Getting AI response...");
        let reply = match self.api.generate_reply(&transcript).await {
            Ok(text) => text,
            Err(source) => {
                return Err(self.fail(StageError::Request {
                    stage: PipelineStage::Reply,
                    source,
                }))
            }
        };
        if reply.is_empty() {
            return Err(self.fail(StageError::Empty {
                stage: PipelineStage::Reply,
            }));
        }
        self.report(LogLevel::Success, format!("AI Response: {reply}"));
        run.reply = Some(reply.clone());

        // Stage 3: synthesize and play
        self.report(LogLevel::Info, "Converting response to speech...");
        let audio = match self.api.synthesize(&reply).await {
            Ok(audio) => audio,
            Err(source) => {
                return Err(self.fail(StageError::Request {
                    stage: PipelineStage::Synthesize,
                    source,
                }))
            }
        };
        if let Err(e) = self.sink.play(&audio).await {
            return Err(self.fail(StageError::Playback(e)));
        }
        self.report(LogLevel::Success, "Playing AI response...");

        Ok(())
    }

    /// Synthesize and play the fixed greeting line, independent of the
    /// three-stage pipeline
    pub async fn play_greeting(&mut self) -> Result<(), StageError> {
        self.report(LogLevel::Info, "Playing greeting...");

        let greeting = self.config.greeting.clone();
        let audio = match self.api.synthesize(&greeting).await {
            Ok(audio) => audio,
            Err(source) => {
                return Err(self.fail(StageError::Request {
                    stage: PipelineStage::Synthesize,
                    source,
                }))
            }
        };
        if let Err(e) = self.sink.play(&audio).await {
            return Err(self.fail(StageError::Playback(e)));
        }

        self.report(LogLevel::Success, "Playing greeting...");
        Ok(())
    }

    fn fail(&mut self, err: StageError) -> StageError {
        self.report(LogLevel::Error, format!("Error: {err}"));
        err
    }
}
