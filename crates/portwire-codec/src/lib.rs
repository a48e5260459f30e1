//! Positional-array message codec for cross-frame messaging.
//!
//! Every message is a flat JSON array:
//! - an optional leading label naming the concrete type
//! - one slot per field, in declared order
//! - `null` for unset scalars, `[]` for unset nested messages
//!
//! The slot order is the wire contract. There are no field names on the wire,
//! so fields may only ever be appended.

pub mod enums;
pub mod error;
pub mod message;
pub mod messages;
pub mod registry;
pub mod wire;

pub use enums::{
    ActionType, AnalyticsEvent, EntitlementResult, EntitlementSource, EventOriginator,
    ReaderSurfaceType,
};
pub use error::{CodecError, Result};
pub use message::{label_of, Message, MessageType};
pub use messages::*;
pub use registry::{deserialize, deserialize_slice, AnyMessage, MessageKind};
