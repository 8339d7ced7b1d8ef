//! JSON envelopes exchanged with the runtime.
//!
//! Requests carry a `messageId`; the runtime answers each with an `ack`
//! whose `correlationId` points back at it. Events arrive unsolicited as
//! `process-desktop-event`.

use super::events::DesktopEvent;
use crate::base::error::RuntimeError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Action names on the wire.
pub mod actions {
    pub const ACK: &str = "ack";
    pub const PROCESS_DESKTOP_EVENT: &str = "process-desktop-event";
    pub const REQUEST_AUTHORIZATION: &str = "request-external-authorization";
    pub const CREATE_APPLICATION: &str = "create-application";
    pub const SUBSCRIBE: &str = "subscribe-to-desktop-event";
    pub const RUN_APPLICATION: &str = "run-application";
    pub const WINDOW_AUTHENTICATE: &str = "window-authenticate";
    pub const EXIT_DESKTOP: &str = "exit-desktop";
}

/// Outgoing request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Request<'a> {
    pub action: &'a str,
    pub message_id: u64,
    pub payload: Value,
}

impl<'a> Request<'a> {
    pub fn new(action: &'a str, message_id: u64, payload: Value) -> Self {
        Self {
            action,
            message_id,
            payload,
        }
    }

    /// Serialize to the text frame that goes on the socket.
    pub fn to_json(&self) -> Result<String, RuntimeError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// The runtime's answer to one request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl Ack {
    /// A successful ack with no data.
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    /// Turn a negative ack into `RuntimeError::AckFailed`.
    pub fn into_result(self, action: &str) -> Result<Ack, RuntimeError> {
        if self.success {
            Ok(self)
        } else {
            Err(RuntimeError::ack_failed(action, self.reason.as_deref()))
        }
    }
}

/// Raw shape shared by every incoming frame.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    action: String,
    #[serde(default)]
    correlation_id: Option<u64>,
    #[serde(default)]
    payload: Value,
}

/// A decoded incoming frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Ack { correlation_id: u64, ack: Ack },
    Event(DesktopEvent),
    /// Any other action; logged and dropped.
    Other(String),
}

/// Decode one text frame.
pub fn decode(text: &str) -> Result<Inbound, RuntimeError> {
    let envelope: Envelope = serde_json::from_str(text)?;
    match envelope.action.as_str() {
        actions::ACK => {
            let correlation_id = envelope
                .correlation_id
                .ok_or_else(|| RuntimeError::Protocol("ack without correlationId".into()))?;
            let ack = serde_json::from_value(envelope.payload)?;
            Ok(Inbound::Ack { correlation_id, ack })
        }
        actions::PROCESS_DESKTOP_EVENT => {
            Ok(Inbound::Event(DesktopEvent::from_value(envelope.payload)?))
        }
        _ => Ok(Inbound::Other(envelope.action)),
    }
}
