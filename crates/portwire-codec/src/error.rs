use serde_json::Value;

/// Errors that can occur while encoding or decoding messages.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    /// The input has no resolvable label, or the label is not registered.
    #[error("Deserialization failed for {input}")]
    Deserialization { input: String },

    /// A positional slot holds a value of the wrong shape.
    #[error("{label} field {index}: expected {expected}, found {found}")]
    Field {
        label: &'static str,
        index: usize,
        expected: &'static str,
        found: String,
    },

    /// A value does not have the expected wire shape.
    ///
    /// Raised by [`WireValue`](crate::wire::WireValue) decoders; message
    /// decoders attach the owning label and slot index by converting it to
    /// [`CodecError::Field`].
    #[error("expected {expected}, found {found}")]
    Mismatch { expected: &'static str, found: String },
}

impl CodecError {
    pub(crate) fn deserialization(input: &Value) -> Self {
        Self::Deserialization {
            input: input.to_string(),
        }
    }

    pub(crate) fn mismatch(expected: &'static str, found: &Value) -> Self {
        Self::Mismatch {
            expected,
            found: found.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
