use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::Result;

/// Target origin that matches every receiver.
pub const ANY_ORIGIN: &str = "*";

/// A message delivered to a window, stamped with the sender's origin.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    pub origin: String,
    pub data: Value,
}

impl MessageEvent {
    pub fn new(origin: impl Into<String>, data: Value) -> Self {
        Self {
            origin: origin.into(),
            data,
        }
    }
}

/// Something that accepts `postMessage`.
///
/// A message whose `target_origin` does not match the receiver's origin is
/// dropped silently, as browsers do. [`ANY_ORIGIN`] matches every receiver.
pub trait MessageTarget: Send + Sync + fmt::Debug {
    fn post_message(&self, data: Value, target_origin: &str) -> Result<()>;
}

/// A browsing context that receives message events.
pub trait Window: Send + Sync + fmt::Debug {
    /// Origin of the document loaded in this window.
    fn origin(&self) -> String;

    /// Start listening for message events.
    ///
    /// Every subscriber sees every event delivered after it subscribed.
    /// Dropping the receiver unsubscribes.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<MessageEvent>;
}

/// A frame element in the embedding document.
pub trait IframeElement: Send + Sync + fmt::Debug {
    /// Whether the element is attached to a document.
    fn is_attached(&self) -> bool;

    fn set_src(&self, url: &str);

    fn src(&self) -> Option<String>;

    /// The frame's window, available once the element is attached.
    fn content_window(&self) -> Option<Arc<dyn MessageTarget>>;

    /// Rendered height in pixels.
    fn offset_height(&self) -> u32;
}

/// Popup opening and top-level navigation.
pub trait Navigator: Send + Sync + fmt::Debug {
    /// Open `url` in a new browsing context named `target`.
    ///
    /// Returns `None` when the popup is blocked.
    fn open_popup(&self, url: &str, target: &str, features: &str)
        -> Option<Arc<dyn MessageTarget>>;

    /// Replace the top-level document with `url`.
    fn navigate_top(&self, url: &str) -> Result<()>;
}
