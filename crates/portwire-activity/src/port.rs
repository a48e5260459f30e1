//! Port side of an activity channel.
//!
//! An [`ActivityIframePort`] drives a hosted document inside an iframe; an
//! [`ActivityWindowPort`] drives one in a popup. Both run the same
//! handshake: the host announces `connect`, the port replies `start` with the
//! activity arguments, the host later reports `ready` and finally `result`,
//! which the port acknowledges with `close`.

use std::collections::HashMap;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use portwire_codec::{deserialize_slice, AnalyticsRequest, AnyMessage, Message, MessageType};
use portwire_events::{ClientEvent, ClientEventManager};
use portwire_transport::{origin_of, IframeElement, MessageEvent, MessageTarget, Window};

use crate::error::{PortError, Result};
use crate::messenger::{Command, Envelope, Inbound, Messenger, RESPONSE_KEY};
use crate::result::{ActivityMode, ActivityResult, ActivityResultCode};

/// Lifecycle of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PortState {
    /// Built, not yet wired to its frame.
    #[default]
    Created,
    /// Listening, waiting for the host's `connect`.
    Connecting,
    /// Handshake complete.
    Ready,
    /// Disconnected without a result.
    Closed,
    /// The host's result was received and acknowledged.
    ResultDelivered,
}

impl PortState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PortState::Closed | PortState::ResultDelivered)
    }
}

/// Operations shared by every kind of port.
pub trait ActivityPortDef: Send + Sync {
    fn mode(&self) -> ActivityMode;

    /// Resolves with the activity's result.
    fn accept_result(&self) -> impl Future<Output = Result<ActivityResult>> + Send;

    /// Stop listening. Safe to call more than once.
    fn disconnect(&self);
}

type Callback = Arc<dyn Fn(AnyMessage) + Send + Sync>;
type ResizeCallback = Arc<dyn Fn(u32) + Send + Sync>;

#[derive(Debug, Clone, Copy, Default)]
struct Status {
    state: PortState,
    host_ready: bool,
}

#[derive(Default)]
struct ResizeSlot {
    callback: Option<ResizeCallback>,
    pending: Option<u32>,
}

/// State shared between a port handle and its pump task.
pub(crate) struct PortCore {
    mode: ActivityMode,
    target_origin: String,
    args: Value,
    iframe: Option<Arc<dyn IframeElement>>,
    messenger: Mutex<Option<Arc<Messenger>>>,
    status: watch::Sender<Status>,
    result: Mutex<Option<ActivityResult>>,
    callbacks: Mutex<HashMap<&'static str, Callback>>,
    resize: Mutex<ResizeSlot>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl PortCore {
    fn new(
        mode: ActivityMode,
        target_origin: String,
        args: Value,
        iframe: Option<Arc<dyn IframeElement>>,
    ) -> Arc<Self> {
        let (status, _) = watch::channel(Status::default());
        Arc::new(Self {
            mode,
            target_origin,
            args,
            iframe,
            messenger: Mutex::new(None),
            status,
            result: Mutex::new(None),
            callbacks: Mutex::new(HashMap::new()),
            resize: Mutex::new(ResizeSlot::default()),
            pump: Mutex::new(None),
        })
    }

    pub(crate) fn state(&self) -> PortState {
        self.status.borrow().state
    }

    fn set_state(&self, state: PortState) {
        self.status.send_modify(|status| status.state = state);
    }

    fn messenger(&self) -> Result<Arc<Messenger>> {
        self.messenger.lock().clone().ok_or(PortError::NotConnected)
    }

    /// Subscribe to `window`, wire the messenger to `target` and start the
    /// pump. Moves the port to `Connecting`.
    fn start(
        self: &Arc<Self>,
        window: &dyn Window,
        target: Arc<dyn MessageTarget>,
    ) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| PortError::NoRuntime)?;
        if self.state() != PortState::Created {
            return Err(PortError::Protocol("port already connected".to_string()));
        }

        let messenger = Arc::new(Messenger::new(target, Some(self.target_origin.clone())));
        *self.messenger.lock() = Some(Arc::clone(&messenger));
        self.set_state(PortState::Connecting);

        let mut inbox = window.subscribe();
        let core = Arc::clone(self);
        let handle = runtime.spawn(async move {
            while let Some(event) = inbox.recv().await {
                core.handle_event(&messenger, &event);
            }
        });
        *self.pump.lock() = Some(handle);

        tracing::debug!(mode = %self.mode, origin = %self.target_origin, "port connecting");
        Ok(())
    }

    fn handle_event(&self, messenger: &Messenger, event: &MessageEvent) {
        if self.state().is_terminal() {
            return;
        }
        let Some(Inbound { cmd, payload }) = messenger.accept(event) else {
            return;
        };
        tracing::trace!(%cmd, "port received command");

        let outcome = match cmd {
            Command::Connect => self.on_connect(messenger),
            Command::Ready => {
                self.status.send_modify(|status| status.host_ready = true);
                Ok(())
            }
            Command::Resize => {
                self.on_resize(payload.as_ref());
                Ok(())
            }
            Command::Result => self.on_result(messenger, payload.unwrap_or(Value::Null)),
            Command::Msg => {
                if let Some(payload) = payload {
                    self.route_response(&payload);
                }
                Ok(())
            }
            Command::Start | Command::Resized | Command::Close => {
                tracing::debug!(%cmd, "ignoring host-bound command");
                Ok(())
            }
        };

        if let Err(err) = outcome {
            tracing::warn!(%cmd, error = %err, "failed to handle command");
        }
    }

    fn on_connect(&self, messenger: &Messenger) -> Result<()> {
        messenger.send(Command::Start, Some(self.args.clone()))?;
        if self.state() == PortState::Connecting {
            self.set_state(PortState::Ready);
            tracing::debug!(mode = %self.mode, "port connected");
        }
        Ok(())
    }

    fn on_resize(&self, payload: Option<&Value>) {
        let Some(height) = payload
            .and_then(|p| p.get("height"))
            .and_then(Value::as_u64)
            .and_then(|h| u32::try_from(h).ok())
        else {
            tracing::warn!(?payload, "resize request without a usable height");
            return;
        };

        let callback = {
            let mut slot = self.resize.lock();
            let callback = slot.callback.clone();
            if callback.is_none() {
                slot.pending = Some(height);
            }
            callback
        };
        if let Some(callback) = callback {
            invoke("resize", || callback(height));
        }
    }

    fn on_result(&self, messenger: &Messenger, payload: Value) -> Result<()> {
        let code = payload
            .get("code")
            .and_then(Value::as_str)
            .and_then(ActivityResultCode::parse)
            .ok_or_else(|| PortError::Protocol(format!("invalid result payload: {payload}")))?;
        let data = payload.get("data").cloned().unwrap_or(Value::Null);

        let result = ActivityResult::new(
            code,
            data,
            self.mode,
            self.target_origin.clone(),
            true,
            true,
        );
        if let Err(err) = messenger.send(Command::Close, None) {
            tracing::debug!(error = %err, "could not acknowledge result");
        }

        *self.result.lock() = Some(result);
        self.shutdown(PortState::ResultDelivered);
        tracing::debug!(mode = %self.mode, %code, "result delivered");
        Ok(())
    }

    fn route_response(&self, payload: &Value) {
        let Some(response) = payload.get(RESPONSE_KEY).and_then(Value::as_array) else {
            return;
        };
        let Some(label) = response.first().and_then(Value::as_str) else {
            return;
        };
        let callback = self.callbacks.lock().get(label).cloned();
        let Some(callback) = callback else {
            tracing::debug!(label, "no callback for response");
            return;
        };
        match deserialize_slice(response) {
            Ok(message) => invoke(label, || callback(message)),
            Err(err) => tracing::warn!(label, error = %err, "undecodable response"),
        }
    }

    fn register(&self, label: &'static str, callback: Callback) -> Result<()> {
        let mut callbacks = self.callbacks.lock();
        if callbacks.contains_key(label) {
            return Err(PortError::DuplicateCallback { label });
        }
        callbacks.insert(label, callback);
        Ok(())
    }

    fn shutdown(&self, state: PortState) {
        self.status.send_modify(|status| {
            if !status.state.is_terminal() {
                status.state = state;
            }
        });
        self.callbacks.lock().clear();
        self.resize.lock().callback = None;
        if let Some(pump) = self.pump.lock().take() {
            pump.abort();
        }
    }

    async fn wait_connected(&self) -> Result<()> {
        let mut status = self.status.subscribe();
        let status = status
            .wait_for(|s| !matches!(s.state, PortState::Created | PortState::Connecting))
            .await
            .map_err(|_| PortError::Closed)?;
        match status.state {
            PortState::Closed => Err(PortError::Closed),
            _ => Ok(()),
        }
    }

    async fn wait_host_ready(&self) -> Result<()> {
        let mut status = self.status.subscribe();
        let status = status
            .wait_for(|s| s.host_ready || s.state.is_terminal())
            .await
            .map_err(|_| PortError::Closed)?;
        if status.host_ready {
            Ok(())
        } else {
            Err(PortError::Closed)
        }
    }

    async fn wait_result(&self) -> Result<ActivityResult> {
        let mut status = self.status.subscribe();
        status
            .wait_for(|s| s.state.is_terminal())
            .await
            .map_err(|_| PortError::Closed)?;
        self.result.lock().clone().ok_or(PortError::Closed)
    }
}

/// Run a user callback, logging a panic instead of unwinding into the pump.
fn invoke(what: &str, f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        tracing::error!(callback = what, "port callback panicked");
    }
}

/// A port talking to a document hosted in an iframe.
pub struct ActivityIframePort {
    core: Arc<PortCore>,
    window: Arc<dyn Window>,
    url: String,
    event_manager: Option<Arc<ClientEventManager>>,
}

impl std::fmt::Debug for ActivityIframePort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityIframePort")
            .field("url", &self.url)
            .field("state", &self.core.state())
            .finish_non_exhaustive()
    }
}

impl ActivityIframePort {
    /// A port for `url`, to be loaded into `iframe`. `window` is the
    /// embedding page, where the hosted document's messages arrive.
    pub fn new(
        window: Arc<dyn Window>,
        iframe: Arc<dyn IframeElement>,
        url: &str,
        args: Option<Value>,
    ) -> Result<Self> {
        let target_origin = origin_of(url).map_err(|err| PortError::InvalidUrl(err.to_string()))?;
        Ok(Self {
            core: PortCore::new(
                ActivityMode::Iframe,
                target_origin,
                args.unwrap_or(Value::Null),
                Some(iframe),
            ),
            window,
            url: url.to_string(),
            event_manager: None,
        })
    }

    /// Forward `AnalyticsRequest` messages from the hosted document to
    /// `manager` once connected.
    pub fn with_event_manager(mut self, manager: Arc<ClientEventManager>) -> Self {
        self.event_manager = Some(manager);
        self
    }

    pub fn state(&self) -> PortState {
        self.core.state()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn target_origin(&self) -> &str {
        &self.core.target_origin
    }

    /// Load the iframe and start listening, without waiting for the host.
    pub(crate) fn begin_connect(&self) -> Result<()> {
        if self.state() != PortState::Created {
            return Err(PortError::Protocol("port already connected".to_string()));
        }
        let iframe = self.core.iframe.as_ref().ok_or(PortError::NotAttached)?;
        if !iframe.is_attached() {
            return Err(PortError::NotAttached);
        }

        if let Some(manager) = &self.event_manager {
            let manager = Arc::clone(manager);
            self.on::<AnalyticsRequest, _>(move |request| forward_analytics(&manager, &request))?;
        }

        iframe.set_src(&self.url);
        let target = iframe.content_window().ok_or(PortError::NotAttached)?;
        self.core.start(self.window.as_ref(), target)
    }

    /// Connect to the hosted document and wait for its handshake.
    pub async fn connect(&self) -> Result<()> {
        self.begin_connect()?;
        self.core.wait_connected().await
    }

    /// Resolves when the hosted document reports `ready`.
    pub async fn when_ready(&self) -> Result<()> {
        self.core.wait_host_ready().await
    }

    /// Send a request message to the hosted document.
    pub fn execute(&self, message: &dyn Message) -> Result<()> {
        if self.state() != PortState::Ready {
            return Err(PortError::NotConnected);
        }
        self.core.messenger()?.post(Envelope::request(message))
    }

    /// Handle responses of type `T`. One callback per type.
    pub fn on<T, F>(&self, callback: F) -> Result<()>
    where
        T: MessageType,
        F: Fn(T) + Send + Sync + 'static,
    {
        self.core.register(
            T::LABEL,
            Arc::new(move |message: AnyMessage| {
                if let Some(message) = message.downcast::<T>() {
                    callback(message);
                }
            }),
        )
    }

    /// Handle resize requests from the hosted document.
    ///
    /// A request that arrived before registration is replayed immediately.
    pub fn on_resize_request<F>(&self, callback: F)
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        let callback: ResizeCallback = Arc::new(callback);
        let pending = {
            let mut slot = self.core.resize.lock();
            slot.callback = Some(Arc::clone(&callback));
            slot.pending.take()
        };
        if let Some(height) = pending {
            invoke("resize", || callback(height));
        }
    }

    /// Report the iframe's current height to the hosted document.
    ///
    /// Does nothing until the handshake completed.
    pub fn resized(&self) -> Result<()> {
        if self.state() != PortState::Ready {
            tracing::debug!("resized before connection, ignoring");
            return Ok(());
        }
        let height = self
            .core
            .iframe
            .as_ref()
            .map_or(0, |iframe| iframe.offset_height());
        self.core
            .messenger()?
            .send(Command::Resized, Some(json!({ "height": height })))
    }
}

impl ActivityPortDef for ActivityIframePort {
    fn mode(&self) -> ActivityMode {
        ActivityMode::Iframe
    }

    async fn accept_result(&self) -> Result<ActivityResult> {
        self.core.wait_result().await
    }

    fn disconnect(&self) {
        self.core.shutdown(PortState::Closed);
    }
}

impl Drop for ActivityIframePort {
    fn drop(&mut self) {
        self.core.shutdown(PortState::Closed);
    }
}

fn forward_analytics(manager: &Arc<ClientEventManager>, request: &AnalyticsRequest) {
    let Some(event) = ClientEvent::from_analytics_request(request) else {
        tracing::debug!(event = ?request.event, "analytics request without a known event type");
        return;
    };
    let manager = Arc::clone(manager);
    tokio::spawn(async move {
        if let Err(err) = manager.log_event(event, None).await {
            tracing::warn!(error = %err, "dropping analytics event from activity");
        }
    });
}

/// A port whose connection is under way.
///
/// Callbacks can be registered before the handshake completes.
#[derive(Debug)]
pub struct PendingIframePort {
    port: ActivityIframePort,
}

impl PendingIframePort {
    pub(crate) fn new(port: ActivityIframePort) -> Self {
        Self { port }
    }

    pub fn port(&self) -> &ActivityIframePort {
        &self.port
    }

    /// Wait for the hosted document's handshake.
    pub async fn ready(self) -> Result<ActivityIframePort> {
        self.port.core.wait_connected().await?;
        Ok(self.port)
    }
}

/// A port talking to a document in a popup window.
pub struct ActivityWindowPort {
    core: Arc<PortCore>,
}

impl std::fmt::Debug for ActivityWindowPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityWindowPort")
            .field("target_origin", &self.core.target_origin)
            .field("state", &self.core.state())
            .finish_non_exhaustive()
    }
}

impl ActivityWindowPort {
    /// Start talking to `popup`, a window showing a document from
    /// `target_origin`. Replies arrive at `opener`.
    pub(crate) fn open(
        opener: &dyn Window,
        popup: Arc<dyn MessageTarget>,
        target_origin: String,
        args: Value,
    ) -> Result<Self> {
        let core = PortCore::new(ActivityMode::Popup, target_origin, args, None);
        core.start(opener, popup)?;
        Ok(Self { core })
    }

    pub fn state(&self) -> PortState {
        self.core.state()
    }

    pub async fn when_ready(&self) -> Result<()> {
        self.core.wait_host_ready().await
    }
}

impl ActivityPortDef for ActivityWindowPort {
    fn mode(&self) -> ActivityMode {
        ActivityMode::Popup
    }

    async fn accept_result(&self) -> Result<ActivityResult> {
        self.core.wait_result().await
    }

    fn disconnect(&self) {
        self.core.shutdown(PortState::Closed);
    }
}

impl Drop for ActivityWindowPort {
    fn drop(&mut self) {
        self.core.shutdown(PortState::Closed);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use portwire_codec::{
        AnalyticsEvent, AnalyticsEventMeta, EventOriginator, EventParams, SkuSelectedResponse,
        ToastCloseRequest,
    };
    use portwire_transport::{MemoryIframe, MemoryWindow};
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use super::*;
    use crate::host::ActivityHost;

    const PUB: &str = "https://pub.example";
    const PAY: &str = "https://pay.example";
    const WAIT: Duration = Duration::from_secs(1);

    struct Pair {
        page: Arc<MemoryWindow>,
        iframe: Arc<MemoryIframe>,
        port: ActivityIframePort,
        host: ActivityHost,
    }

    fn pair() -> Pair {
        let page = MemoryWindow::new(PUB);
        let iframe = MemoryIframe::new(PUB, PAY);
        iframe.attach();
        let port = ActivityIframePort::new(
            page.clone(),
            iframe.clone(),
            &format!("{PAY}/offers"),
            Some(json!({"skus": ["basic"]})),
        )
        .unwrap();
        let host = ActivityHost::new(iframe.frame(), page.handle_for(PAY));
        Pair {
            page,
            iframe,
            port,
            host,
        }
    }

    async fn connect(pair: &Pair) {
        pair.port.begin_connect().unwrap();
        let (connected, args) = tokio::join!(pair.port.core.wait_connected(), pair.host.connect());
        connected.unwrap();
        assert_eq!(args.unwrap(), json!({"skus": ["basic"]}));
    }

    #[tokio::test]
    async fn handshake_sets_src_and_ready_state() {
        let pair = pair();
        assert_eq!(pair.port.state(), PortState::Created);
        connect(&pair).await;

        assert_eq!(pair.port.state(), PortState::Ready);
        assert_eq!(pair.iframe.src().as_deref(), Some("https://pay.example/offers"));
        assert_eq!(pair.host.target_origin().as_deref(), Some(PUB));

        pair.host.ready().unwrap();
        timeout(WAIT, pair.port.when_ready()).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn detached_iframe_cannot_connect() {
        let pair = pair();
        pair.iframe.detach();
        assert!(matches!(
            pair.port.connect().await,
            Err(PortError::NotAttached)
        ));
        assert_eq!(pair.port.state(), PortState::Created);
    }

    #[tokio::test]
    async fn resize_is_negotiated_once() {
        let pair = pair();
        connect(&pair).await;

        let (requested_tx, mut requested_rx) = mpsc::unbounded_channel();
        pair.port.on_resize_request(move |height| {
            let _ = requested_tx.send(height);
        });
        let (complete_tx, mut complete_rx) = mpsc::unbounded_channel();
        pair.host.on_resize_complete(move |allowed, requested, overflow| {
            let _ = complete_tx.send((allowed, requested, overflow));
        });

        pair.host.request_resize(240).unwrap();
        let height = timeout(WAIT, requested_rx.recv()).await.unwrap().unwrap();
        assert_eq!(height, 240);

        pair.iframe.set_offset_height(height);
        pair.port.resized().unwrap();
        let ack = timeout(WAIT, complete_rx.recv()).await.unwrap().unwrap();
        assert_eq!(ack, (240, 240, false));

        pair.host.request_resize(240).unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(requested_rx.try_recv().is_err());
        assert!(complete_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn smaller_grant_reports_overflow() {
        let pair = pair();
        connect(&pair).await;

        let (complete_tx, mut complete_rx) = mpsc::unbounded_channel();
        pair.host.on_resize_complete(move |allowed, requested, overflow| {
            let _ = complete_tx.send((allowed, requested, overflow));
        });
        pair.host.request_resize(900).unwrap();
        pair.iframe.set_offset_height(600);
        pair.port.resized().unwrap();

        let ack = timeout(WAIT, complete_rx.recv()).await.unwrap().unwrap();
        assert_eq!(ack, (600, 900, true));
    }

    #[tokio::test]
    async fn early_resize_request_is_replayed() {
        let pair = pair();
        connect(&pair).await;

        pair.host.request_resize(120).unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        pair.port.on_resize_request(move |height| {
            let _ = tx.send(height);
        });
        assert_eq!(rx.try_recv().unwrap(), 120);
    }

    #[tokio::test]
    async fn resized_before_connect_posts_nothing() {
        let pair = pair();
        let mut frame_inbox = pair.iframe.frame().subscribe();
        pair.iframe.set_offset_height(50);

        pair.port.resized().unwrap();
        assert!(frame_inbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn duplicate_callback_is_rejected() {
        let pair = pair();
        pair.port.on::<SkuSelectedResponse, _>(|_| {}).unwrap();
        let err = pair.port.on::<SkuSelectedResponse, _>(|_| {}).unwrap_err();
        assert!(matches!(
            err,
            PortError::DuplicateCallback {
                label: "SkuSelectedResponse"
            }
        ));
        assert_eq!(
            err.to_string(),
            "Invalid type or duplicate callback for SkuSelectedResponse"
        );
        pair.port.on::<ToastCloseRequest, _>(|_| {}).unwrap();
    }

    #[tokio::test]
    async fn requests_and_responses_are_routed_by_label() {
        let pair = pair();
        let (tx, mut rx) = mpsc::unbounded_channel();
        pair.port
            .on::<SkuSelectedResponse, _>(move |response| {
                let _ = tx.send(response);
            })
            .unwrap();

        let (req_tx, mut req_rx) = mpsc::unbounded_channel();
        pair.host.on_request(move |request| {
            let _ = req_tx.send(request);
        });
        connect(&pair).await;

        assert!(matches!(
            ActivityIframePort::new(
                pair.page.clone(),
                pair.iframe.clone(),
                PAY,
                None
            )
            .unwrap()
            .execute(&ToastCloseRequest::default()),
            Err(PortError::NotConnected)
        ));

        pair.port
            .execute(&ToastCloseRequest { close: Some(true) })
            .unwrap();
        let request = timeout(WAIT, req_rx.recv()).await.unwrap().unwrap();
        assert_eq!(
            request.downcast::<ToastCloseRequest>(),
            Some(ToastCloseRequest { close: Some(true) })
        );

        pair.host.respond(&ToastCloseRequest::default()).unwrap();
        let selected = SkuSelectedResponse {
            sku: Some("basic".to_string()),
            ..Default::default()
        };
        pair.host.respond(&selected).unwrap();
        let received = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(received, selected);
    }

    #[tokio::test]
    async fn result_is_acknowledged_and_port_closes() {
        let pair = pair();
        connect(&pair).await;

        pair.host.result(json!({"sku": "basic"})).unwrap();
        let result = timeout(WAIT, pair.port.accept_result())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.code, ActivityResultCode::Ok);
        assert_eq!(result.data, Some(json!({"sku": "basic"})));
        assert_eq!(result.mode, ActivityMode::Iframe);
        assert_eq!(result.origin, PAY);
        assert!(result.origin_verified && result.secure_channel);
        assert_eq!(pair.port.state(), PortState::ResultDelivered);

        timeout(WAIT, pair.host.when_closed()).await.unwrap();
        assert!(!pair.host.is_connected());
    }

    #[tokio::test]
    async fn failed_result_keeps_reason_only() {
        let pair = pair();
        connect(&pair).await;

        pair.host.failed("card declined").unwrap();
        let result = timeout(WAIT, pair.port.accept_result())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.code, ActivityResultCode::Failed);
        assert_eq!(result.data, None);
        assert_eq!(result.error.as_deref(), Some("card declined"));
    }

    #[tokio::test]
    async fn disconnect_is_idempotent_and_fails_waiters() {
        let pair = pair();
        connect(&pair).await;

        pair.port.disconnect();
        pair.port.disconnect();
        assert_eq!(pair.port.state(), PortState::Closed);
        assert!(matches!(
            pair.port.accept_result().await,
            Err(PortError::Closed)
        ));
        assert!(matches!(pair.port.when_ready().await, Err(PortError::Closed)));

        pair.host.result(json!(1)).unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(pair.port.state(), PortState::Closed);
    }

    #[tokio::test]
    async fn analytics_requests_reach_the_event_manager() {
        let Pair {
            page, iframe, host, ..
        } = pair();
        let manager = Arc::new(ClientEventManager::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        manager
            .register_event_listener(move |event, _| {
                let _ = tx.send(event.clone());
            })
            .unwrap();

        let port = ActivityIframePort::new(page, iframe, &format!("{PAY}/offers"), None)
            .unwrap()
            .with_event_manager(Arc::clone(&manager));
        port.begin_connect().unwrap();
        let (connected, _) = tokio::join!(port.core.wait_connected(), host.connect());
        connected.unwrap();

        assert!(matches!(
            port.on::<AnalyticsRequest, _>(|_| {}),
            Err(PortError::DuplicateCallback { .. })
        ));

        host.respond(&AnalyticsRequest {
            event: Some(AnalyticsEvent::ImpressionOffers),
            meta: Some(AnalyticsEventMeta {
                event_originator: Some(EventOriginator::SwgClient),
                is_from_user_action: Some(true),
                configuration_id: Some("cfg".to_string()),
            }),
            params: Some(EventParams {
                sku: Some("basic".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        })
        .unwrap();

        let event = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(event.event_type, AnalyticsEvent::ImpressionOffers);
        assert_eq!(event.event_originator, EventOriginator::SwgServer);
        assert_eq!(event.is_from_user_action, Some(true));
        assert_eq!(event.configuration_id.as_deref(), Some("cfg"));
        assert!(event.timestamp.is_some());
    }
}
