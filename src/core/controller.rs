//! Call session controller.
//!
//! Drives one call from submission to termination: issues the
//! initiation request, holds the single channel subscription for the
//! returned call identifier, applies incoming events to the session,
//! and keeps the derived elapsed-time display ticking while the call
//! is live.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::adapters::api::{ApiClient, RequestError};
use crate::adapters::channel::{ChannelClient, ChannelHandle, ChannelMessage};
use crate::config::ClientConfig;
use crate::domain::call::{CallRequest, CallSession, CallStatus, TranscriptEntry, ValidationError};
use crate::domain::events::ChannelEvent;

/// Why a submission was rejected or failed
#[derive(Debug, Error)]
pub enum SubmitError {
    /// A session is already initiating or in progress; concurrent
    /// submissions are a contract violation
    #[error("A call is already active (status: {0:?})")]
    CallActive(CallStatus),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Request(#[from] RequestError),
}

/// Owns one live call session and its channel subscription.
///
/// Exactly one session and at most one open channel exist per
/// controller instance. The session snapshot exposed by [`session`]
/// is the read-only state a presentation layer renders from.
///
/// [`session`]: CallSessionController::session
pub struct CallSessionController {
    api: ApiClient,
    config: ClientConfig,
    session: CallSession,
    channel: Option<ChannelHandle>,
    ticker: Option<JoinHandle<()>>,
    elapsed_secs: Arc<AtomicU64>,
}

impl CallSessionController {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            api: ApiClient::new(config.clone()),
            config,
            session: CallSession::new(),
            channel: None,
            ticker: None,
            elapsed_secs: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Read-only snapshot of the live session
    pub fn session(&self) -> &CallSession {
        &self.session
    }

    /// Seconds the call has been live, 1-second granularity. Purely
    /// derived display state.
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_secs.load(Ordering::Relaxed)
    }

    /// Submit a call request.
    ///
    /// Rejected while a session is initiating or in progress.
    /// Submitting after `Ended`/`Failed` starts a brand-new session and
    /// discards the prior transcript. On success the session is
    /// `InProgress` with exactly one channel subscription open; on
    /// request failure it is `Failed` with the server detail recorded
    /// and no channel is opened.
    pub async fn submit(&mut self, request: CallRequest) -> Result<&CallSession, SubmitError> {
        if !self.session.can_submit() {
            return Err(SubmitError::CallActive(self.session.status));
        }
        request.validate()?;

        // Discard the previous session before going live again
        self.stop_ticker();
        if let Some(mut channel) = self.channel.take() {
            channel.close().await;
        }
        self.session = CallSession::new();
        self.session.begin();

        let call_id = match self.api.initiate_call(&request).await {
            Ok(call_id) => call_id,
            Err(e) => {
                let message = e.user_message("Failed to initiate call");
                warn!(%message, "Call initiation failed");
                self.session.fail(message);
                return Err(SubmitError::Request(e));
            }
        };

        info!(%call_id, "Call in progress");
        self.session.connect(call_id.clone(), Utc::now());
        self.start_ticker();

        match ChannelClient::open(&self.config.ws_url(&call_id)).await {
            Ok(handle) => self.channel = Some(handle),
            Err(e) => {
                // The call itself is live; only the update stream is
                // gone. Surface it and carry on without updates.
                warn!("Channel connection failed: {e}");
                self.session
                    .transcript
                    .push(TranscriptEntry::system("Connection error occurred"));
            }
        }

        Ok(&self.session)
    }

    /// Apply one channel event to the live session.
    ///
    /// Idempotent against duplicate `call_ended` events. Stops the
    /// elapsed ticker the moment the session leaves `InProgress`.
    pub fn handle_event(&mut self, event: &ChannelEvent) {
        self.session.apply_event(event);
        if !self.session.is_in_progress() {
            self.stop_ticker();
        }
    }

    /// Wait for and process the next channel message.
    ///
    /// Returns `false` once there is nothing further to process: the
    /// stream closed, faulted, or the session reached a terminal state.
    /// Transport errors end the session's updates but leave the
    /// transcript rendered so far intact.
    pub async fn process_next(&mut self) -> bool {
        let Some(channel) = self.channel.as_mut() else {
            return false;
        };

        match channel.recv().await {
            Some(ChannelMessage::Event(event)) => {
                self.handle_event(&event);
                if !self.session.is_in_progress() {
                    if let Some(mut channel) = self.channel.take() {
                        channel.close().await;
                    }
                    return false;
                }
                true
            }
            Some(ChannelMessage::TransportError(e)) => {
                warn!("Channel transport error: {e}");
                self.session
                    .transcript
                    .push(TranscriptEntry::system("Connection error occurred"));
                self.channel = None;
                false
            }
            Some(ChannelMessage::Closed) | None => {
                info!("Channel closed");
                self.channel = None;
                false
            }
        }
    }

    /// Process channel messages until the stream or the call ends
    pub async fn run_until_ended(&mut self) {
        while self.process_next().await {}
    }

    /// Close the channel subscription and stop the ticker. The
    /// transcript stays intact for display.
    pub async fn terminate(&mut self) {
        self.stop_ticker();
        if let Some(mut channel) = self.channel.take() {
            channel.close().await;
        }
    }

    fn start_ticker(&mut self) {
        self.elapsed_secs.store(0, Ordering::Relaxed);
        let elapsed = Arc::clone(&self.elapsed_secs);
        let started = self.session.started_at.unwrap_or_else(Utc::now);

        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            // The first tick of a tokio interval fires immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let secs = (Utc::now() - started).num_seconds().max(0) as u64;
                elapsed.store(secs, Ordering::Relaxed);
            }
        }));
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    /// Whether the elapsed ticker is currently running
    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }
}

impl Drop for CallSessionController {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

/// MM:SS display form of an elapsed-seconds value
pub fn format_elapsed(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
