//! Call session state and reconstruction from channel events.
//!
//! A CallSession represents one outbound call tracked from initiation
//! to termination. State transitions are a pure function of the ordered
//! event sequence, so replaying the same events always yields the same
//! session.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::events::ChannelEvent;

/// Errors detected before a call request is submitted
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Phone number must be '+' followed by digits, got '{0}'")]
    InvalidPhoneNumber(String),

    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(f64),
}

/// Who produced a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// The AI agent on the call
    Agent,

    /// The called party
    Customer,

    /// Client-side status messages (call initiated, errors, call ended)
    System,
}

/// One line of the live transcript. Append-only; never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
}

impl TranscriptEntry {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }

    /// System entry helper (status messages surfaced inline)
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Speaker::System, text)
    }
}

/// Lifecycle state of a call session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    /// No call submitted yet
    Idle,

    /// Initiation request in flight
    Initiating,

    /// Call connected; channel events are being applied
    InProgress,

    /// Server reported the call ended
    Ended,

    /// Initiation failed
    Failed,
}

impl Default for CallStatus {
    fn default() -> Self {
        Self::Idle
    }
}

/// One logical outbound call tracked by the client.
///
/// Mutated only by the controller, either through request outcomes
/// (`begin`, `connect`, `fail`) or through [`apply_event`], which is
/// the pure (state, event) -> state transition for channel events.
///
/// [`apply_event`]: CallSession::apply_event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallSession {
    /// Opaque identifier issued by the backend
    pub call_id: Option<String>,

    /// Current lifecycle state
    pub status: CallStatus,

    /// Set when the session enters `InProgress`
    pub started_at: Option<DateTime<Utc>>,

    /// Ordered transcript, arrival order. Append-only.
    pub transcript: Vec<TranscriptEntry>,

    /// Error recorded when the session failed
    pub failure: Option<String>,
}

impl CallSession {
    /// Fresh session with no history
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the initiation request as in flight
    pub fn begin(&mut self) {
        self.status = CallStatus::Initiating;
    }

    /// Record a successful initiation: the call is live
    pub fn connect(&mut self, call_id: String, started_at: DateTime<Utc>) {
        self.call_id = Some(call_id);
        self.status = CallStatus::InProgress;
        self.started_at = Some(started_at);
        self.transcript
            .push(TranscriptEntry::system("Call initiated successfully"));
    }

    /// Record a failed initiation
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.status = CallStatus::Failed;
        self.transcript.push(TranscriptEntry::system(format!(
            "Failed to initiate call: {message}"
        )));
        self.failure = Some(message);
    }

    /// Apply a single channel event.
    ///
    /// Events only advance a live session; anything arriving outside
    /// `InProgress` is discarded, except that a duplicate `call_ended`
    /// on an already-ended session is an explicit no-op.
    pub fn apply_event(&mut self, event: &ChannelEvent) {
        match (self.status, event) {
            (CallStatus::InProgress, ChannelEvent::Transcript { text, speaker }) => {
                let speaker = if speaker == "agent" {
                    Speaker::Agent
                } else {
                    Speaker::Customer
                };
                self.transcript.push(TranscriptEntry::new(speaker, text.clone()));
            }
            (CallStatus::InProgress, ChannelEvent::CallEnded) => {
                self.status = CallStatus::Ended;
                self.transcript.push(TranscriptEntry::system("Call ended"));
            }
            (CallStatus::Ended, ChannelEvent::CallEnded) => {
                // Idempotent: the server may repeat the terminal event.
            }
            (CallStatus::InProgress, ChannelEvent::Error { message }) => {
                // Non-terminal by contract: the server may still send
                // further events after a mid-call error.
                self.transcript
                    .push(TranscriptEntry::system(format!("Error: {message}")));
            }
            (status, event) => {
                tracing::debug!(?status, ?event, "Discarding channel event for inactive session");
            }
        }
    }

    /// Whether the call is currently live
    pub fn is_in_progress(&self) -> bool {
        self.status == CallStatus::InProgress
    }

    /// Whether a submission may start (no call in flight)
    pub fn can_submit(&self) -> bool {
        !matches!(self.status, CallStatus::Initiating | CallStatus::InProgress)
    }
}

/// Strip everything but digits and prefix `+`, the same massaging the
/// call form applies continuously as the user types.
pub fn normalize_phone_number(input: &str) -> String {
    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        String::new()
    } else {
        format!("+{digits}")
    }
}

/// Parameters for one call initiation. Constructed once per submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRequest {
    /// Must already be normalized: leading `+` then digits only
    pub phone_number: String,

    /// Outstanding amount, must be positive
    pub amount: f64,

    /// Payment due date
    pub due_date: NaiveDate,

    /// Optional account reference, serialized as null when absent
    pub account_number: Option<String>,
}

impl CallRequest {
    /// Check the request is submittable.
    ///
    /// The phone number is expected to have been normalized already
    /// (see [`normalize_phone_number`]); this rejects anything that
    /// slipped past that.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut chars = self.phone_number.chars();
        let well_formed = chars.next() == Some('+')
            && self.phone_number.len() > 1
            && chars.all(|c| c.is_ascii_digit());

        if !well_formed {
            return Err(ValidationError::InvalidPhoneNumber(
                self.phone_number.clone(),
            ));
        }

        if !(self.amount > 0.0) {
            return Err(ValidationError::NonPositiveAmount(self.amount));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CallRequest {
        CallRequest {
            phone_number: "+15551234567".to_string(),
            amount: 100.0,
            due_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            account_number: None,
        }
    }

    #[test]
    fn test_normalize_phone_number() {
        assert_eq!(normalize_phone_number("(555) 123-4567"), "+5551234567");
        assert_eq!(normalize_phone_number("+1 555 123 4567"), "+15551234567");
        assert_eq!(normalize_phone_number("abc"), "");
        // Idempotent: normalizing an already-normalized number is a no-op
        assert_eq!(normalize_phone_number("+15551234567"), "+15551234567");
    }

    #[test]
    fn test_request_validation() {
        assert!(request().validate().is_ok());

        let mut bad_phone = request();
        bad_phone.phone_number = "555-1234".to_string();
        assert!(matches!(
            bad_phone.validate(),
            Err(ValidationError::InvalidPhoneNumber(_))
        ));

        let mut empty_phone = request();
        empty_phone.phone_number = "+".to_string();
        assert!(empty_phone.validate().is_err());

        let mut bad_amount = request();
        bad_amount.amount = 0.0;
        assert!(matches!(
            bad_amount.validate(),
            Err(ValidationError::NonPositiveAmount(_))
        ));
    }

    #[test]
    fn test_request_serialization() {
        let json = serde_json::to_value(request()).unwrap();
        assert_eq!(json["phone_number"], "+15551234567");
        assert_eq!(json["amount"], 100.0);
        assert_eq!(json["due_date"], "2024-01-01");
        assert!(json["account_number"].is_null());
    }

    #[test]
    fn test_transcript_event_appends_entry() {
        let mut session = CallSession::new();
        session.connect("abc123".to_string(), Utc::now());

        session.apply_event(&ChannelEvent::Transcript {
            text: "Hello".to_string(),
            speaker: "agent".to_string(),
        });

        let last = session.transcript.last().unwrap();
        assert_eq!(last.speaker, Speaker::Agent);
        assert_eq!(last.text, "Hello");
        assert!(session.is_in_progress());
    }

    #[test]
    fn test_non_agent_speaker_maps_to_customer() {
        let mut session = CallSession::new();
        session.connect("abc123".to_string(), Utc::now());

        session.apply_event(&ChannelEvent::Transcript {
            text: "Hi".to_string(),
            speaker: "caller".to_string(),
        });

        assert_eq!(session.transcript.last().unwrap().speaker, Speaker::Customer);
    }

    #[test]
    fn test_call_ended_is_idempotent() {
        let mut session = CallSession::new();
        session.connect("abc123".to_string(), Utc::now());

        session.apply_event(&ChannelEvent::CallEnded);
        let after_first = session.clone();

        session.apply_event(&ChannelEvent::CallEnded);

        assert_eq!(session.status, CallStatus::Ended);
        assert_eq!(session.transcript, after_first.transcript);
    }

    #[test]
    fn test_error_event_is_non_terminal() {
        let mut session = CallSession::new();
        session.connect("abc123".to_string(), Utc::now());

        session.apply_event(&ChannelEvent::Error {
            message: "transient glitch".to_string(),
        });

        assert!(session.is_in_progress());
        assert_eq!(
            session.transcript.last().unwrap().text,
            "Error: transient glitch"
        );
    }

    #[test]
    fn test_events_outside_in_progress_are_discarded() {
        let mut session = CallSession::new();
        session.apply_event(&ChannelEvent::Transcript {
            text: "stale".to_string(),
            speaker: "agent".to_string(),
        });

        assert_eq!(session.status, CallStatus::Idle);
        assert!(session.transcript.is_empty());
    }

    #[test]
    fn test_replay_determinism() {
        let events = vec![
            ChannelEvent::Transcript {
                text: "Hello".to_string(),
                speaker: "agent".to_string(),
            },
            ChannelEvent::Error {
                message: "noise".to_string(),
            },
            ChannelEvent::Transcript {
                text: "Yes?".to_string(),
                speaker: "customer".to_string(),
            },
            ChannelEvent::CallEnded,
        ];

        let started = Utc::now();
        let replay = || {
            let mut session = CallSession::new();
            session.connect("abc123".to_string(), started);
            for event in &events {
                session.apply_event(event);
            }
            session
        };

        let a = replay();
        let b = replay();
        assert_eq!(a.status, b.status);
        assert_eq!(a.transcript, b.transcript);
        assert_eq!(a.status, CallStatus::Ended);
    }

    #[test]
    fn test_failed_session_records_error() {
        let mut session = CallSession::new();
        session.begin();
        session.fail("Invalid phone number");

        assert_eq!(session.status, CallStatus::Failed);
        assert_eq!(session.failure.as_deref(), Some("Invalid phone number"));
        assert!(session.can_submit());
    }
}
