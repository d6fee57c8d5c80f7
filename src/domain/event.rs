use super::state::ProtocolViolation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Names of the push events a finalization scope can carry.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum EventName {
    GeneratingReceipt,
    ReceiptGenerated,
    ReceiptFailed,
    GeneratingPid,
    PidGenerated,
    PaymentFailed,
}

impl EventName {
    /// Every event the subscription manager registers a handler for.
    pub const ALL: [EventName; 6] = [
        EventName::GeneratingReceipt,
        EventName::ReceiptGenerated,
        EventName::ReceiptFailed,
        EventName::GeneratingPid,
        EventName::PidGenerated,
        EventName::PaymentFailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::GeneratingReceipt => "generating_receipt",
            EventName::ReceiptGenerated => "receipt_generated",
            EventName::ReceiptFailed => "receipt_failed",
            EventName::GeneratingPid => "generating_pid",
            EventName::PidGenerated => "pid_generated",
            EventName::PaymentFailed => "payment_failed",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| format!("unknown event name '{s}'"))
    }
}

/// A named message as it arrives from the push transport, before decoding.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct RawMessage {
    pub event: String,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

impl RawMessage {
    pub fn new(event: impl Into<String>, payload: Option<serde_json::Value>) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PidPayload {
    pid: Option<String>,
}

/// A decoded push event.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ChannelEvent {
    GeneratingReceipt,
    ReceiptGenerated,
    ReceiptFailed,
    GeneratingPid,
    PidGenerated { pid: String },
    PaymentFailed,
}

impl ChannelEvent {
    pub fn pid_generated(pid: impl Into<String>) -> Self {
        ChannelEvent::PidGenerated { pid: pid.into() }
    }

    pub fn name(&self) -> EventName {
        match self {
            ChannelEvent::GeneratingReceipt => EventName::GeneratingReceipt,
            ChannelEvent::ReceiptGenerated => EventName::ReceiptGenerated,
            ChannelEvent::ReceiptFailed => EventName::ReceiptFailed,
            ChannelEvent::GeneratingPid => EventName::GeneratingPid,
            ChannelEvent::PidGenerated { .. } => EventName::PidGenerated,
            ChannelEvent::PaymentFailed => EventName::PaymentFailed,
        }
    }

    /// Builds an event from its name and optional payload.
    ///
    /// Only `pid_generated` reads its payload; a missing or blank `pid` is a
    /// protocol violation rather than an event with an empty identifier.
    pub fn from_parts(
        name: EventName,
        payload: Option<&serde_json::Value>,
    ) -> Result<Self, ProtocolViolation> {
        let event = match name {
            EventName::GeneratingReceipt => ChannelEvent::GeneratingReceipt,
            EventName::ReceiptGenerated => ChannelEvent::ReceiptGenerated,
            EventName::ReceiptFailed => ChannelEvent::ReceiptFailed,
            EventName::GeneratingPid => ChannelEvent::GeneratingPid,
            EventName::PaymentFailed => ChannelEvent::PaymentFailed,
            EventName::PidGenerated => {
                let pid = payload
                    .cloned()
                    .and_then(|value| serde_json::from_value::<PidPayload>(value).ok())
                    .and_then(|payload| payload.pid)
                    .map(|pid| pid.trim().to_string())
                    .filter(|pid| !pid.is_empty())
                    .ok_or(ProtocolViolation::MissingParticipantId)?;
                ChannelEvent::PidGenerated { pid }
            }
        };
        Ok(event)
    }

    /// Decodes a transport message. Unknown event names yield `Ok(None)`.
    pub fn decode(message: &RawMessage) -> Result<Option<Self>, ProtocolViolation> {
        match message.event.parse::<EventName>() {
            Ok(name) => Self::from_parts(name, message.payload.as_ref()).map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Wire form of this event.
    pub fn to_message(&self) -> RawMessage {
        let payload = match self {
            ChannelEvent::PidGenerated { pid } => Some(serde_json::json!({ "pid": pid })),
            _ => None,
        };
        RawMessage::new(self.name().as_str(), payload)
    }
}
