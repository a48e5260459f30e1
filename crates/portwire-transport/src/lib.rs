//! Window messaging abstraction.
//!
//! Models the browser surfaces the activity layer sits on:
//! - [`MessageTarget`]: something that accepts `postMessage`
//! - [`Window`]: a browsing context that receives message events
//! - [`IframeElement`]: a frame element in the host document
//! - [`Navigator`]: popup opening and top-level navigation
//!
//! The [`memory`] module implements all of them in-process.

pub mod error;
pub mod memory;
pub mod origin;
pub mod traits;

pub use error::{Result, TransportError};
pub use memory::{MemoryIframe, MemoryNavigator, MemoryWindow};
pub use origin::origin_of;
pub use traits::{IframeElement, MessageEvent, MessageTarget, Navigator, Window, ANY_ORIGIN};
