//! Command envelopes exchanged between a port and its host.
//!
//! Every message is an object `{"sentinel", "cmd", "payload"}`. Events
//! without the sentinel belong to someone else and are ignored.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use portwire_codec::Message;
use portwire_transport::{MessageEvent, MessageTarget, ANY_ORIGIN};

use crate::error::{PortError, Result};

/// Marks messages that belong to the activity protocol.
pub const SENTINEL: &str = "__ACTIVITIES__";

/// Key of a request array inside a `msg` payload.
pub const REQUEST_KEY: &str = "REQUEST";
/// Key of a response array inside a `msg` payload.
pub const RESPONSE_KEY: &str = "RESPONSE";

/// Protocol commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Host to port: the hosted document is listening.
    Connect,
    /// Port to host: handshake reply carrying the activity arguments.
    Start,
    /// Host to port: the hosted document finished rendering.
    Ready,
    /// Host to port: requested height.
    Resize,
    /// Port to host: height actually granted.
    Resized,
    /// Host to port: the activity outcome.
    Result,
    /// Port to host: result received, shut down.
    Close,
    /// Either way: application payload.
    Msg,
}

impl Command {
    pub const ALL: &'static [Command] = &[
        Command::Connect,
        Command::Start,
        Command::Ready,
        Command::Resize,
        Command::Resized,
        Command::Result,
        Command::Close,
        Command::Msg,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Command::Connect => "connect",
            Command::Start => "start",
            Command::Ready => "ready",
            Command::Resize => "resize",
            Command::Resized => "resized",
            Command::Result => "result",
            Command::Close => "close",
            Command::Msg => "msg",
        }
    }

    pub fn parse(cmd: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == cmd)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire form of a command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    pub sentinel: String,
    pub cmd: String,
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    pub fn new(cmd: Command, payload: Option<Value>) -> Self {
        Self {
            sentinel: SENTINEL.to_string(),
            cmd: cmd.as_str().to_string(),
            payload: payload.filter(is_truthy).unwrap_or(Value::Null),
        }
    }

    /// `msg` envelope carrying `{"REQUEST": message}`.
    pub fn request(message: &dyn Message) -> Self {
        Self::new(Command::Msg, Some(json!({ REQUEST_KEY: message.to_value() })))
    }

    /// `msg` envelope carrying `{"RESPONSE": message}`.
    pub fn response(message: &dyn Message) -> Self {
        Self::new(Command::Msg, Some(json!({ RESPONSE_KEY: message.to_value() })))
    }

    /// Parse a raw event payload. `None` unless it carries the sentinel.
    pub fn from_value(data: &Value) -> Option<Self> {
        if data.get("sentinel").and_then(Value::as_str) != Some(SENTINEL) {
            return None;
        }
        serde_json::from_value(data.clone()).ok()
    }

    pub fn to_value(&self) -> Value {
        json!({
            "sentinel": self.sentinel,
            "cmd": self.cmd,
            "payload": self.payload,
        })
    }

    pub fn command(&self) -> Option<Command> {
        Command::parse(&self.cmd)
    }

    /// Payload, with falsy values read as absent.
    pub fn payload(&self) -> Option<&Value> {
        Some(&self.payload).filter(|p| is_truthy(p))
    }
}

/// Whether a browser would treat `value` as true.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// A command accepted from the peer.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub cmd: Command,
    pub payload: Option<Value>,
}

/// Sends commands to one peer and filters the events coming back.
///
/// The target origin may start unknown; the first `start` command pins it
/// to the sender's origin. Until then only `connect` can be sent, addressed
/// to any origin.
pub struct Messenger {
    target: Arc<dyn MessageTarget>,
    target_origin: Mutex<Option<String>>,
}

impl fmt::Debug for Messenger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Messenger")
            .field("target_origin", &*self.target_origin.lock())
            .finish_non_exhaustive()
    }
}

impl Messenger {
    pub fn new(target: Arc<dyn MessageTarget>, target_origin: Option<String>) -> Self {
        Self {
            target,
            target_origin: Mutex::new(target_origin),
        }
    }

    pub fn target_origin(&self) -> Option<String> {
        self.target_origin.lock().clone()
    }

    pub fn send(&self, cmd: Command, payload: Option<Value>) -> Result<()> {
        self.post(Envelope::new(cmd, payload))
    }

    pub fn post(&self, envelope: Envelope) -> Result<()> {
        let origin = match (self.target_origin(), envelope.command()) {
            (Some(origin), _) => origin,
            (None, Some(Command::Connect)) => ANY_ORIGIN.to_string(),
            (None, _) => return Err(PortError::NotConnected),
        };
        tracing::trace!(cmd = %envelope.cmd, target_origin = %origin, "posting command");
        self.target.post_message(envelope.to_value(), &origin)?;
        Ok(())
    }

    /// Filter an incoming event down to a command from the peer.
    pub fn accept(&self, event: &MessageEvent) -> Option<Inbound> {
        let envelope = Envelope::from_value(&event.data)?;
        let Some(cmd) = envelope.command() else {
            tracing::debug!(cmd = %envelope.cmd, "ignoring unknown command");
            return None;
        };

        let mut target_origin = self.target_origin.lock();
        if target_origin.is_none() && cmd == Command::Start {
            *target_origin = Some(event.origin.clone());
        }
        if target_origin.as_deref() != Some(event.origin.as_str()) {
            tracing::warn!(
                %cmd,
                origin = %event.origin,
                expected = ?*target_origin,
                "ignoring command from unexpected origin"
            );
            return None;
        }
        drop(target_origin);

        Some(Inbound {
            cmd,
            payload: envelope.payload().cloned(),
        })
    }
}
