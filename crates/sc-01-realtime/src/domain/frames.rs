//! # Wire Frames
//!
//! Outbound control frames carry the subscription identifier as a JSON
//! string nested inside the JSON frame:
//!
//! ```json
//! {"command":"subscribe","identifier":"{\"channel\":\"message\",\"token\":\"...\"}"}
//! ```
//!
//! Inbound frames are `{"type"?, "channel", "action", "data"}`.

use std::fmt;

use serde_json::{json, Map, Value};

use crate::error::FrameError;

/// Control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Subscribe,
    Unsubscribe,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
        }
    }

    fn parse(raw: &str) -> Result<Self, FrameError> {
        match raw {
            "subscribe" => Ok(Self::Subscribe),
            "unsubscribe" => Ok(Self::Unsubscribe),
            other => Err(FrameError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscribe/unsubscribe request for one channel.
#[derive(Clone, PartialEq, Eq)]
pub struct ControlFrame {
    pub command: Command,
    pub channel: String,
    token: String,
}

impl ControlFrame {
    pub fn new(command: Command, channel: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            command,
            channel: channel.into(),
            token: token.into(),
        }
    }

    pub fn subscribe(channel: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(Command::Subscribe, channel, token)
    }

    pub fn unsubscribe(channel: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(Command::Unsubscribe, channel, token)
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Wire text.
    pub fn encode(&self) -> String {
        let identifier = json!({ "channel": self.channel, "token": self.token }).to_string();
        json!({ "command": self.command.as_str(), "identifier": identifier }).to_string()
    }

    /// Parse wire text produced by [`encode`](Self::encode).
    pub fn decode(text: &str) -> Result<Self, FrameError> {
        let outer = parse_object(text)?;
        let command = Command::parse(str_field(&outer, "command")?)?;
        let identifier = parse_object(str_field(&outer, "identifier")?)?;

        Ok(Self {
            command,
            channel: str_field(&identifier, "channel")?.to_string(),
            token: str_field(&identifier, "token")?.to_string(),
        })
    }
}

impl fmt::Debug for ControlFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlFrame")
            .field("command", &self.command)
            .field("channel", &self.channel)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Application event routed to handlers.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelEvent {
    pub channel: String,
    pub action: String,
    /// Handler payload; `null` when the frame carried no `data`.
    pub data: Value,
}

/// Server-originated protocol notice with no channel/action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Welcome,
    ConfirmSubscription { identifier: Option<String> },
    RejectSubscription { identifier: Option<String> },
    Disconnect { reason: Option<String> },
    Other(String),
}

/// Classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Keep-alive; never dispatched.
    Ping,
    Notice(Notice),
    Event(ChannelEvent),
}

impl InboundFrame {
    /// Classify a raw inbound frame.
    ///
    /// `type == "ping"` wins over everything else. Any frame with string
    /// `channel` and `action` is an event, whatever its `type`. A frame with
    /// only a `type` is a notice.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let mut object = parse_object(text)?;
        let kind = object.get("type").and_then(Value::as_str).map(str::to_string);

        if kind.as_deref() == Some("ping") {
            return Ok(Self::Ping);
        }

        let channel = object.get("channel").and_then(Value::as_str).map(str::to_string);
        let action = object.get("action").and_then(Value::as_str).map(str::to_string);

        match (channel, action, kind) {
            (Some(channel), Some(action), _) => Ok(Self::Event(ChannelEvent {
                channel,
                action,
                data: object.remove("data").unwrap_or(Value::Null),
            })),
            (None, None, Some(kind)) => Ok(Self::Notice(Notice::classify(&kind, &object))),
            (None, _, _) => Err(FrameError::MissingField("channel")),
            (Some(_), None, _) => Err(FrameError::MissingField("action")),
        }
    }
}

impl Notice {
    fn classify(kind: &str, object: &Map<String, Value>) -> Self {
        let text = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_string);
        match kind {
            "welcome" => Self::Welcome,
            "confirm_subscription" => Self::ConfirmSubscription {
                identifier: text("identifier"),
            },
            "reject_subscription" => Self::RejectSubscription {
                identifier: text("identifier"),
            },
            "disconnect" => Self::Disconnect { reason: text("reason") },
            other => Self::Other(other.to_string()),
        }
    }
}

fn parse_object(text: &str) -> Result<Map<String, Value>, FrameError> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(FrameError::NotAnObject),
        Err(e) => Err(FrameError::InvalidJson(e.to_string())),
    }
}

fn str_field<'a>(object: &'a Map<String, Value>, key: &'static str) -> Result<&'a str, FrameError> {
    object
        .get(key)
        .and_then(Value::as_str)
        .ok_or(FrameError::MissingField(key))
}
