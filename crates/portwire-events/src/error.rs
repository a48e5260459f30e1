/// Errors returned by the client event manager.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    /// The raw event is not a JSON object.
    #[error("Event must be a valid object")]
    NotAnObject,

    /// A field of the event holds a value outside its domain.
    #[error("Event has an invalid {field}({value})")]
    Validation { field: &'static str, value: String },

    /// The manager was disposed.
    #[error("event manager has been disposed")]
    Disposed,

    /// The readiness signal was dropped without firing.
    #[error("event manager never became ready")]
    NeverReady,
}

pub type Result<T> = std::result::Result<T, EventError>;
