use std::time::Duration;

/// Errors that can occur in activity port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// Message encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(#[from] portwire_codec::CodecError),

    /// Window transport error.
    #[error("transport error: {0}")]
    Transport(#[from] portwire_transport::TransportError),

    /// Event manager rejected an event.
    #[error("event error: {0}")]
    Events(#[from] portwire_events::EventError),

    /// A callback is already registered for this message label.
    #[error("Invalid type or duplicate callback for {label}")]
    DuplicateCallback { label: &'static str },

    /// The iframe is not part of a document.
    #[error("iframe is not attached to a document")]
    NotAttached,

    /// The operation needs an established connection.
    #[error("not connected")]
    NotConnected,

    /// The window target cannot host an activity.
    #[error("target '{0}' is not allowed")]
    DisallowedTarget(String),

    /// A URL could not be parsed or extended.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The peer sent something the protocol does not allow.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The port closed before the awaited step happened.
    #[error("port closed")]
    Closed,

    /// A wrapped operation did not finish in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Ports spawn tasks and need a tokio runtime.
    #[error("no tokio runtime available")]
    NoRuntime,

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PortError>;
