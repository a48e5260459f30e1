use std::fmt;

use serde_json::Value;

use crate::error::Result;
use crate::registry::{AnyMessage, MessageKind};

/// A value that can be written as a positional message array.
pub trait Message: fmt::Debug + Send + Sync + 'static {
    /// The label identifying the concrete type on the wire.
    fn label(&self) -> &'static str;

    /// Field values in declared order, prefixed with the label when
    /// `include_label` is set.
    fn to_array(&self, include_label: bool) -> Vec<Value>;

    /// Labelled array as a single JSON value.
    fn to_value(&self) -> Value {
        Value::Array(self.to_array(true))
    }
}

/// A concrete, registered message type.
pub trait MessageType: Message + Clone + Default + PartialEq + Sized {
    /// Label constant, identical to `Message::label` of every instance.
    const LABEL: &'static str;
    /// Registry entry for this type.
    const KIND: MessageKind;

    /// Rebuild a message from its array form.
    ///
    /// Reading starts at index 1 when `includes_label` is set. Missing and
    /// `null` slots become unset fields; repeated fields default to empty.
    fn from_array(data: &[Value], includes_label: bool) -> Result<Self>;

    /// Narrow a decoded message to this type.
    fn from_any(message: AnyMessage) -> Option<Self>;
}

/// Label of a message type, without building an instance.
pub fn label_of<T: MessageType>() -> &'static str {
    T::LABEL
}

/// Declares a message struct together with its codec impls.
///
/// Field order in the declaration is the wire order.
macro_rules! message {
    (
        $(#[$meta:meta])*
        $name:ident {
            $(
                $(#[$fmeta:meta])*
                $field:ident : $slot:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $name {
            $(
                $(#[$fmeta])*
                pub $field: $slot,
            )*
        }

        impl $crate::message::Message for $name {
            fn label(&self) -> &'static str {
                stringify!($name)
            }

            fn to_array(&self, include_label: bool) -> Vec<serde_json::Value> {
                let mut arr = Vec::new();
                if include_label {
                    arr.push(serde_json::Value::from(stringify!($name)));
                }
                $(
                    arr.push($crate::wire::Slot::encode(&self.$field, include_label));
                )*
                arr
            }
        }

        impl $crate::message::MessageType for $name {
            const LABEL: &'static str = stringify!($name);
            const KIND: $crate::registry::MessageKind = $crate::registry::MessageKind::$name;

            #[allow(unused_mut, unused_variables)]
            fn from_array(
                data: &[serde_json::Value],
                includes_label: bool,
            ) -> $crate::error::Result<Self> {
                let mut reader = $crate::wire::SlotReader::new(stringify!($name), data, includes_label);
                Ok(Self {
                    $( $field: reader.next()?, )*
                })
            }

            fn from_any(message: $crate::registry::AnyMessage) -> Option<Self> {
                match message {
                    $crate::registry::AnyMessage::$name(inner) => Some(inner),
                    _ => None,
                }
            }
        }

        impl $crate::wire::WireValue for $name {
            fn to_wire(&self, include_label: bool) -> serde_json::Value {
                serde_json::Value::Array($crate::message::Message::to_array(self, include_label))
            }

            fn from_wire(
                value: &serde_json::Value,
                includes_label: bool,
            ) -> $crate::error::Result<Self> {
                match value {
                    serde_json::Value::Array(items) => {
                        <Self as $crate::message::MessageType>::from_array(items, includes_label)
                    }
                    other => Err($crate::error::CodecError::Mismatch {
                        expected: "message array",
                        found: other.to_string(),
                    }),
                }
            }

            fn unset_wire() -> serde_json::Value {
                serde_json::Value::Array(Vec::new())
            }

            fn is_unset(value: &serde_json::Value) -> bool {
                // `[]` is what `unset_wire` writes, so it reads back as unset.
                match value {
                    serde_json::Value::Null => true,
                    serde_json::Value::Array(items) => items.is_empty(),
                    _ => false,
                }
            }
        }

        impl From<$name> for $crate::registry::AnyMessage {
            fn from(message: $name) -> Self {
                $crate::registry::AnyMessage::$name(message)
            }
        }
    };
}

pub(crate) use message;
