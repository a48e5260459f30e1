//! Cross-frame messaging for embedded activities.
//!
//! A publisher page and the activities it embeds (iframes, popups) exchange
//! positional-array messages over `postMessage`. This crate bundles the
//! layers that make that work.
//!
//! # Crate Structure
//!
//! - [`codec`]: message types, wire enums and the label registry
//! - [`transport`]: the window messaging abstraction and in-memory frames
//! - [`events`]: client event validation and dispatch
//! - [`activity`]: activity ports, hosts and result routing

/// Re-export codec types.
pub mod codec {
    pub use portwire_codec::*;
}

/// Re-export transport types.
pub mod transport {
    pub use portwire_transport::*;
}

/// Re-export event types.
pub mod events {
    pub use portwire_events::*;
}

/// Re-export activity port types.
pub mod activity {
    pub use portwire_activity::*;
}
