//! Label registry.
//!
//! The set of message types is closed: [`MessageKind`] enumerates every
//! registered type and [`AnyMessage`] carries a decoded value of any of them.

use serde_json::Value;

use crate::error::{CodecError, Result};
use crate::message::{Message, MessageType};
use crate::messages::*;

macro_rules! registry {
    ( $( $name:ident ),* $(,)? ) => {
        /// Discriminant of every registered message type.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum MessageKind {
            $( $name, )*
        }

        impl MessageKind {
            /// All registered kinds.
            pub const ALL: &'static [MessageKind] = &[ $( MessageKind::$name, )* ];

            /// The wire label of this kind.
            pub fn label(self) -> &'static str {
                match self {
                    $( MessageKind::$name => <$name as MessageType>::LABEL, )*
                }
            }

            /// Resolve a wire label.
            pub fn from_label(label: &str) -> Option<Self> {
                match label {
                    $( l if l == <$name as MessageType>::LABEL => Some(MessageKind::$name), )*
                    _ => None,
                }
            }

            /// Number of fields declared by this kind.
            pub fn field_count(self) -> usize {
                match self {
                    $( MessageKind::$name => $name::default().to_array(false).len(), )*
                }
            }

            fn decode(self, data: &[Value]) -> Result<AnyMessage> {
                match self {
                    $( MessageKind::$name => $name::from_array(data, true).map(AnyMessage::$name), )*
                }
            }
        }

        /// A decoded message of any registered type.
        #[derive(Debug, Clone, PartialEq)]
        pub enum AnyMessage {
            $( $name($name), )*
        }

        impl AnyMessage {
            pub fn kind(&self) -> MessageKind {
                match self {
                    $( AnyMessage::$name(_) => MessageKind::$name, )*
                }
            }

            fn inner(&self) -> &dyn Message {
                match self {
                    $( AnyMessage::$name(inner) => inner as &dyn Message, )*
                }
            }
        }
    };
}

registry! {
    AccountCreationRequest,
    ActionRequest,
    AlreadySubscribedResponse,
    AnalyticsContext,
    AnalyticsEventMeta,
    AnalyticsRequest,
    AudienceActivityClientLogsRequest,
    CompleteAudienceActionResponse,
    Duration,
    EntitlementJwt,
    EntitlementsRequest,
    EntitlementsResponse,
    EventParams,
    FinishedLoggingResponse,
    LinkSaveTokenRequest,
    LinkingInfoResponse,
    OpenDialogRequest,
    SkuSelectedResponse,
    SmartBoxMessage,
    SubscribeResponse,
    SubscriptionLinkingCompleteResponse,
    SubscriptionLinkingResponse,
    SurveyAnswer,
    SurveyDataTransferRequest,
    SurveyDataTransferResponse,
    SurveyQuestion,
    Timestamp,
    ToastCloseRequest,
    ViewSubscriptionsResponse,
}

impl Message for AnyMessage {
    fn label(&self) -> &'static str {
        self.inner().label()
    }

    fn to_array(&self, include_label: bool) -> Vec<Value> {
        self.inner().to_array(include_label)
    }
}

impl AnyMessage {
    /// Narrow to a concrete type.
    pub fn downcast<T: MessageType>(self) -> Option<T> {
        T::from_any(self)
    }
}

/// Decode a labelled message array.
///
/// `data[0]` selects the type. Fails with
/// [`CodecError::Deserialization`] when `data` is not a non-empty array, the
/// label is missing or empty, or no type is registered under it. The error
/// carries the offending input.
pub fn deserialize(data: &Value) -> Result<AnyMessage> {
    match data {
        Value::Array(items) => deserialize_slice(items).map_err(|err| match err {
            CodecError::Deserialization { .. } => CodecError::deserialization(data),
            other => other,
        }),
        other => Err(CodecError::deserialization(other)),
    }
}

/// Decode a labelled message array given as a slice.
pub fn deserialize_slice(data: &[Value]) -> Result<AnyMessage> {
    let kind = data
        .first()
        .and_then(Value::as_str)
        .filter(|label| !label.is_empty())
        .and_then(MessageKind::from_label);

    match kind {
        Some(kind) => {
            tracing::trace!(label = kind.label(), "deserializing message");
            kind.decode(data)
        }
        None => Err(CodecError::deserialization(&Value::Array(data.to_vec()))),
    }
}
