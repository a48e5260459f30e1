//! In-process windows, frames and navigation.
//!
//! Every [`MemoryWindow`] has an origin and a set of subscribers. Handles
//! obtained with [`MemoryWindow::handle_for`] post into it on behalf of a
//! sender origin, which is what the receiver sees as `event.origin`.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{Result, TransportError};
use crate::origin::origin_of;
use crate::traits::{IframeElement, MessageEvent, MessageTarget, Navigator, Window, ANY_ORIGIN};

/// An in-process browsing context.
#[derive(Debug)]
pub struct MemoryWindow {
    origin: String,
    listeners: Mutex<Vec<mpsc::UnboundedSender<MessageEvent>>>,
    closed: AtomicBool,
}

impl MemoryWindow {
    pub fn new(origin: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            origin: origin.into(),
            listeners: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }

    /// A `postMessage` handle into this window, sending as `sender_origin`.
    pub fn handle_for(self: &Arc<Self>, sender_origin: impl Into<String>) -> Arc<dyn MessageTarget> {
        Arc::new(MemoryTarget {
            sender_origin: sender_origin.into(),
            receiver: Arc::clone(self),
        })
    }

    /// Close the window. Later posts fail with [`TransportError::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.listeners.lock().clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of live subscribers.
    pub fn listener_count(&self) -> usize {
        let mut listeners = self.listeners.lock();
        listeners.retain(|tx| !tx.is_closed());
        listeners.len()
    }

    fn dispatch(&self, event: MessageEvent) {
        let mut listeners = self.listeners.lock();
        listeners.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl Window for MemoryWindow {
    fn origin(&self) -> String {
        self.origin.clone()
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<MessageEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        if !self.is_closed() {
            self.listeners.lock().push(tx);
        }
        rx
    }
}

#[derive(Debug)]
struct MemoryTarget {
    sender_origin: String,
    receiver: Arc<MemoryWindow>,
}

impl MessageTarget for MemoryTarget {
    fn post_message(&self, data: Value, target_origin: &str) -> Result<()> {
        if self.receiver.is_closed() {
            return Err(TransportError::Closed);
        }
        if target_origin != ANY_ORIGIN && target_origin != self.receiver.origin {
            tracing::debug!(
                target_origin,
                receiver = %self.receiver.origin,
                "dropping message for mismatched target origin"
            );
            return Ok(());
        }
        self.receiver
            .dispatch(MessageEvent::new(self.sender_origin.clone(), data));
        Ok(())
    }
}

/// An in-process iframe element.
///
/// Starts detached; call [`MemoryIframe::attach`] to insert it.
#[derive(Debug)]
pub struct MemoryIframe {
    parent_origin: String,
    frame: Arc<MemoryWindow>,
    attached: AtomicBool,
    src: Mutex<Option<String>>,
    height: AtomicU32,
}

impl MemoryIframe {
    /// A frame whose document runs at `frame_origin`, embedded by a page at
    /// `parent_origin`.
    pub fn new(parent_origin: impl Into<String>, frame_origin: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            parent_origin: parent_origin.into(),
            frame: MemoryWindow::new(frame_origin),
            attached: AtomicBool::new(false),
            src: Mutex::new(None),
            height: AtomicU32::new(0),
        })
    }

    pub fn attach(&self) {
        self.attached.store(true, Ordering::SeqCst);
    }

    pub fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
    }

    pub fn set_offset_height(&self, height: u32) {
        self.height.store(height, Ordering::SeqCst);
    }

    /// The window inside the frame.
    pub fn frame(&self) -> Arc<MemoryWindow> {
        Arc::clone(&self.frame)
    }
}

impl IframeElement for MemoryIframe {
    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    fn set_src(&self, url: &str) {
        *self.src.lock() = Some(url.to_string());
    }

    fn src(&self) -> Option<String> {
        self.src.lock().clone()
    }

    fn content_window(&self) -> Option<Arc<dyn MessageTarget>> {
        if self.is_attached() {
            Some(self.frame.handle_for(self.parent_origin.clone()))
        } else {
            None
        }
    }

    fn offset_height(&self) -> u32 {
        self.height.load(Ordering::SeqCst)
    }
}

/// A popup opened through [`MemoryNavigator`].
#[derive(Debug, Clone)]
pub struct OpenedPopup {
    pub url: String,
    pub target: String,
    pub features: String,
    pub window: Arc<MemoryWindow>,
}

/// Records popups and redirects instead of performing them.
#[derive(Debug)]
pub struct MemoryNavigator {
    opener_origin: String,
    block_popups: AtomicBool,
    popups: Mutex<Vec<OpenedPopup>>,
    redirects: Mutex<Vec<String>>,
}

impl MemoryNavigator {
    pub fn new(opener_origin: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            opener_origin: opener_origin.into(),
            block_popups: AtomicBool::new(false),
            popups: Mutex::new(Vec::new()),
            redirects: Mutex::new(Vec::new()),
        })
    }

    /// Make every later `open_popup` call fail as if blocked.
    pub fn set_block_popups(&self, block: bool) {
        self.block_popups.store(block, Ordering::SeqCst);
    }

    pub fn popups(&self) -> Vec<OpenedPopup> {
        self.popups.lock().clone()
    }

    pub fn last_popup(&self) -> Option<OpenedPopup> {
        self.popups.lock().last().cloned()
    }

    /// URLs passed to `navigate_top`, oldest first.
    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().clone()
    }
}

impl Navigator for MemoryNavigator {
    fn open_popup(
        &self,
        url: &str,
        target: &str,
        features: &str,
    ) -> Option<Arc<dyn MessageTarget>> {
        if self.block_popups.load(Ordering::SeqCst) {
            tracing::debug!(url, "popup blocked");
            return None;
        }

        let origin = origin_of(url).unwrap_or_else(|_| "null".to_string());
        let window = MemoryWindow::new(origin);
        self.popups.lock().push(OpenedPopup {
            url: url.to_string(),
            target: target.to_string(),
            features: features.to_string(),
            window: Arc::clone(&window),
        });
        Some(window.handle_for(self.opener_origin.clone()))
    }

    fn navigate_top(&self, url: &str) -> Result<()> {
        if url.is_empty() {
            return Err(TransportError::Navigation("empty url".to_string()));
        }
        self.redirects.lock().push(url.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn delivers_to_every_subscriber_with_sender_origin() {
        let window = MemoryWindow::new("https://pub.example");
        let mut first = window.subscribe();
        let mut second = window.subscribe();

        let handle = window.handle_for("https://frame.example");
        handle
            .post_message(json!({"hello": 1}), "https://pub.example")
            .unwrap();

        for rx in [&mut first, &mut second] {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.origin, "https://frame.example");
            assert_eq!(event.data, json!({"hello": 1}));
        }
    }

    #[tokio::test]
    async fn mismatched_target_origin_is_dropped() {
        let window = MemoryWindow::new("https://pub.example");
        let mut rx = window.subscribe();
        let handle = window.handle_for("https://frame.example");

        handle.post_message(json!(1), "https://other.example").unwrap();
        handle.post_message(json!(2), ANY_ORIGIN).unwrap();

        assert_eq!(rx.recv().await.unwrap().data, json!(2));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn closed_window_rejects_posts() {
        let window = MemoryWindow::new("https://pub.example");
        let handle = window.handle_for("https://frame.example");
        window.close();
        assert_eq!(
            handle.post_message(json!(null), ANY_ORIGIN),
            Err(TransportError::Closed)
        );
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let window = MemoryWindow::new("https://pub.example");
        let rx = window.subscribe();
        let _kept = window.subscribe();
        assert_eq!(window.listener_count(), 2);
        drop(rx);
        assert_eq!(window.listener_count(), 1);
    }

    #[test]
    fn detached_iframe_has_no_content_window() {
        let iframe = MemoryIframe::new("https://pub.example", "https://frame.example");
        assert!(!iframe.is_attached());
        assert!(iframe.content_window().is_none());

        iframe.attach();
        iframe.set_src("https://frame.example/offers");
        iframe.set_offset_height(320);
        assert!(iframe.content_window().is_some());
        assert_eq!(iframe.src().as_deref(), Some("https://frame.example/offers"));
        assert_eq!(iframe.offset_height(), 320);
    }

    #[test]
    fn navigator_records_popups_and_redirects() {
        let nav = MemoryNavigator::new("https://pub.example");
        assert!(nav
            .open_popup("https://pay.example/buy", "_blank", "width=600")
            .is_some());

        let popup = nav.last_popup().unwrap();
        assert_eq!(popup.target, "_blank");
        assert_eq!(popup.window.origin(), "https://pay.example");

        nav.set_block_popups(true);
        assert!(nav.open_popup("https://pay.example/buy", "_blank", "").is_none());
        assert_eq!(nav.popups().len(), 1);

        nav.navigate_top("https://pay.example/buy#x").unwrap();
        assert_eq!(nav.redirects(), vec!["https://pay.example/buy#x".to_string()]);
        assert!(nav.navigate_top("").is_err());
    }
}
