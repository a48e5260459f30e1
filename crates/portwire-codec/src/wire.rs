//! Slot-level encoding.
//!
//! Every field of a message occupies exactly one position of the message
//! array. [`WireValue`] describes how a single value maps to JSON, [`Slot`]
//! adds the optional/repeated wrapping, and [`SlotReader`] walks a message
//! array in declared field order.

use serde_json::Value;

use crate::error::{CodecError, Result};

/// A value that can occupy a positional slot.
pub trait WireValue: Sized {
    /// Encode the value. Nested messages honour `include_label`.
    fn to_wire(&self, include_label: bool) -> Value;

    /// Decode the value from a non-null slot.
    fn from_wire(value: &Value, includes_label: bool) -> Result<Self>;

    /// Encoding used when an optional slot is unset.
    fn unset_wire() -> Value {
        Value::Null
    }

    /// Whether a slot value means "unset" for this type.
    fn is_unset(value: &Value) -> bool {
        value.is_null()
    }
}

/// Storage for one message field: `Option<T>` or repeated `Vec<T>`.
pub trait Slot: Sized {
    fn encode(&self, include_label: bool) -> Value;
    fn decode(value: Option<&Value>, includes_label: bool) -> Result<Self>;
}

impl<T: WireValue> Slot for Option<T> {
    fn encode(&self, include_label: bool) -> Value {
        match self {
            Some(value) => value.to_wire(include_label),
            None => T::unset_wire(),
        }
    }

    fn decode(value: Option<&Value>, includes_label: bool) -> Result<Self> {
        match value {
            None => Ok(None),
            Some(value) if T::is_unset(value) => Ok(None),
            Some(value) => T::from_wire(value, includes_label).map(Some),
        }
    }
}

impl<T: WireValue> Slot for Vec<T> {
    fn encode(&self, include_label: bool) -> Value {
        Value::Array(
            self.iter()
                .map(|item| item.to_wire(include_label))
                .collect(),
        )
    }

    fn decode(value: Option<&Value>, includes_label: bool) -> Result<Self> {
        match value {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| T::from_wire(item, includes_label))
                .collect(),
            Some(other) => Err(CodecError::mismatch("array", other)),
        }
    }
}

impl WireValue for String {
    fn to_wire(&self, _include_label: bool) -> Value {
        Value::String(self.clone())
    }

    fn from_wire(value: &Value, _includes_label: bool) -> Result<Self> {
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| CodecError::mismatch("string", value))
    }
}

impl WireValue for bool {
    fn to_wire(&self, _include_label: bool) -> Value {
        Value::Bool(*self)
    }

    fn from_wire(value: &Value, _includes_label: bool) -> Result<Self> {
        value
            .as_bool()
            .ok_or_else(|| CodecError::mismatch("boolean", value))
    }
}

impl WireValue for i64 {
    fn to_wire(&self, _include_label: bool) -> Value {
        Value::from(*self)
    }

    fn from_wire(value: &Value, _includes_label: bool) -> Result<Self> {
        decode_integer(value).ok_or_else(|| CodecError::mismatch("number", value))
    }
}

/// Integral JSON number, accepting floats without a fractional part.
pub(crate) fn decode_integer(value: &Value) -> Option<i64> {
    if let Some(int) = value.as_i64() {
        return Some(int);
    }
    let float = value.as_f64()?;
    if float.fract() == 0.0 && float >= i64::MIN as f64 && float <= i64::MAX as f64 {
        Some(float as i64)
    } else {
        None
    }
}

/// Sequential reader over a message array.
///
/// Starts at index 1 when the array carries a label, 0 otherwise.
pub struct SlotReader<'a> {
    label: &'static str,
    data: &'a [Value],
    includes_label: bool,
    index: usize,
}

impl<'a> SlotReader<'a> {
    pub fn new(label: &'static str, data: &'a [Value], includes_label: bool) -> Self {
        Self {
            label,
            data,
            includes_label,
            index: usize::from(includes_label),
        }
    }

    /// Decode the next slot, attaching label and index to shape errors.
    pub fn next<S: Slot>(&mut self) -> Result<S> {
        let index = self.index;
        self.index += 1;
        S::decode(self.data.get(index), self.includes_label).map_err(|err| match err {
            CodecError::Mismatch { expected, found } => CodecError::Field {
                label: self.label,
                index,
                expected,
                found,
            },
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn optional_slot_reads_null_and_missing_as_unset() {
        assert_eq!(<Option<String>>::decode(None, true).unwrap(), None);
        assert_eq!(
            <Option<String>>::decode(Some(&Value::Null), true).unwrap(),
            None
        );
        assert_eq!(
            <Option<bool>>::decode(Some(&json!(false)), true).unwrap(),
            Some(false)
        );
    }

    #[test]
    fn repeated_slot_defaults_to_empty() {
        assert!(<Vec<String>>::decode(None, true).unwrap().is_empty());
        assert_eq!(
            <Vec<String>>::decode(Some(&json!(["a", "b"])), true).unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn integer_slot_accepts_integral_floats_only() {
        assert_eq!(i64::from_wire(&json!(12), true).unwrap(), 12);
        assert_eq!(i64::from_wire(&json!(12.0), true).unwrap(), 12);
        assert!(matches!(
            i64::from_wire(&json!(1.5), true),
            Err(CodecError::Mismatch { expected: "number", .. })
        ));
    }

    #[test]
    fn reader_reports_label_and_index() {
        let data = vec![json!("Thing"), json!("ok"), json!(7)];
        let mut reader = SlotReader::new("Thing", &data, true);
        let first: Option<String> = reader.next().unwrap();
        assert_eq!(first.as_deref(), Some("ok"));

        let err = reader.next::<Option<bool>>().unwrap_err();
        assert_eq!(
            err,
            CodecError::Field {
                label: "Thing",
                index: 2,
                expected: "boolean",
                found: "7".to_string(),
            }
        );
    }
}
