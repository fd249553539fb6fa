//! Adapter interfaces for external systems.
//!
//! Adapters isolate the backend API, the per-call message stream, and
//! the audio devices behind small surfaces the core components own.

pub mod api;
pub mod audio;
pub mod channel;

// Re-export the adapter entry points
pub use api::{ApiClient, RequestError};
pub use audio::{AudioSink, CaptureDevice, CapturedAudio, DeviceError, FileSink, WavFileCapture};
pub use channel::{ChannelClient, ChannelHandle, ChannelMessage, StreamError};
