//! Audio capture and playback seams for the test harness.
//!
//! The harness talks to the input device and the speaker through these
//! traits so the pipeline logic stays independent of where audio
//! actually comes from. The file-backed implementations cover manual
//! testing with pre-recorded clips.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

/// Audio device failures
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("No audio input available: {0}")]
    Unavailable(String),

    #[error("A capture is already active")]
    CaptureInProgress,

    #[error("No capture is active")]
    NotCapturing,

    #[error("Audio device IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Playback failed: {0}")]
    Playback(String),
}

/// Finalized capture output
#[derive(Debug, Clone)]
pub struct CapturedAudio {
    /// Raw audio bytes, opaque to the client
    pub data: Vec<u8>,

    /// Name reported to the transcription endpoint
    pub file_name: String,
}

/// An audio input device. Exclusively owned by the harness for the
/// duration of one capture.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Start buffering audio
    async fn begin(&mut self) -> Result<(), DeviceError>;

    /// Stop buffering and hand over everything captured
    async fn finish(&mut self) -> Result<CapturedAudio, DeviceError>;
}

/// Plays back synthesized audio
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn play(&mut self, audio: &[u8]) -> Result<(), DeviceError>;
}

/// Capture device backed by a pre-recorded file.
///
/// `begin` verifies the clip exists, `finish` reads it whole. Useful
/// for exercising the pipeline without a live microphone.
#[derive(Debug)]
pub struct WavFileCapture {
    path: PathBuf,
}

impl WavFileCapture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CaptureDevice for WavFileCapture {
    async fn begin(&mut self) -> Result<(), DeviceError> {
        if !self.path.exists() {
            return Err(DeviceError::Unavailable(format!(
                "audio file not found: {}",
                self.path.display()
            )));
        }
        info!(path = %self.path.display(), "Capture started");
        Ok(())
    }

    async fn finish(&mut self) -> Result<CapturedAudio, DeviceError> {
        let data = tokio::fs::read(&self.path).await?;
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "recording.wav".to_string());

        info!(bytes = data.len(), "Capture finished");
        Ok(CapturedAudio { data, file_name })
    }
}

/// Sink that writes synthesized audio to a file for later listening
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AudioSink for FileSink {
    async fn play(&mut self, audio: &[u8]) -> Result<(), DeviceError> {
        tokio::fs::write(&self.path, audio).await?;
        info!(path = %self.path.display(), bytes = audio.len(), "Wrote playback audio");
        Ok(())
    }
}
