/// Errors that can occur in window transport operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The target window has been closed.
    #[error("target window closed")]
    Closed,

    /// A URL could not be resolved to an origin.
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Top-level navigation was refused.
    #[error("navigation failed: {0}")]
    Navigation(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;
