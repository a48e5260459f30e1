//! Client event dispatch.
//!
//! A [`ClientEventManager`] validates events, timestamps them, waits for its
//! readiness gate, then runs registered filterers and listeners in
//! registration order. Any filterer may cancel an event.

pub mod error;
pub mod event;
pub mod manager;

pub use error::{EventError, Result};
pub use event::{
    AdditionalParameters, ClientEvent, ClientEventParams, FilterResult, GoogleAnalyticsParameters,
};
pub use manager::{ClientEventManager, ReadySignal};
