//! Host side of an activity channel, running inside the hosted document.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use portwire_codec::{deserialize, AnyMessage, Message};
use portwire_transport::{MessageTarget, Window};

use crate::error::{PortError, Result};
use crate::messenger::{Command, Envelope, Inbound, Messenger, REQUEST_KEY};
use crate::result::ActivityResultCode;

type ResizeCompleteCallback = Arc<dyn Fn(u32, u32, bool) + Send + Sync>;
type RequestCallback = Arc<dyn Fn(AnyMessage) + Send + Sync>;

#[derive(Debug, Clone, Default)]
struct HostStatus {
    connected: bool,
    closed: bool,
    args: Value,
}

struct HostCore {
    messenger: Messenger,
    status: watch::Sender<HostStatus>,
    last_requested_height: Mutex<u32>,
    on_resize_complete: Mutex<Option<ResizeCompleteCallback>>,
    on_request: Mutex<Option<RequestCallback>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl HostCore {
    fn handle(&self, Inbound { cmd, payload }: Inbound) {
        match cmd {
            Command::Start => {
                self.status.send_modify(|status| {
                    status.connected = true;
                    status.args = payload.unwrap_or(Value::Null);
                });
                tracing::debug!("host connected");
            }
            Command::Close => self.shutdown(),
            Command::Resized => {
                let allowed = payload
                    .as_ref()
                    .and_then(|p| p.get("height"))
                    .and_then(Value::as_u64)
                    .and_then(|h| u32::try_from(h).ok())
                    .unwrap_or(0);
                let requested = *self.last_requested_height.lock();
                let callback = self.on_resize_complete.lock().clone();
                if let Some(callback) = callback {
                    guarded("resize complete", || {
                        callback(allowed, requested, allowed < requested)
                    });
                }
            }
            Command::Msg => {
                let Some(request) = payload.as_ref().and_then(|p| p.get(REQUEST_KEY)) else {
                    return;
                };
                let callback = self.on_request.lock().clone();
                let Some(callback) = callback else {
                    tracing::debug!("no request handler registered");
                    return;
                };
                match deserialize(request) {
                    Ok(message) => guarded("request", || callback(message)),
                    Err(err) => tracing::warn!(error = %err, "undecodable request"),
                }
            }
            other => tracing::debug!(cmd = %other, "ignoring port-bound command"),
        }
    }

    fn shutdown(&self) {
        self.status.send_modify(|status| {
            status.connected = false;
            status.closed = true;
        });
        if let Some(pump) = self.pump.lock().take() {
            pump.abort();
        }
    }
}

fn guarded(what: &str, f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        tracing::error!(callback = what, "host callback panicked");
    }
}

/// The hosted document's end of an iframe or popup channel.
pub struct ActivityHost {
    core: Arc<HostCore>,
    window: Arc<dyn Window>,
}

impl fmt::Debug for ActivityHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.core.status.borrow();
        f.debug_struct("ActivityHost")
            .field("connected", &status.connected)
            .field("closed", &status.closed)
            .field("target_origin", &self.core.messenger.target_origin())
            .finish()
    }
}

impl ActivityHost {
    /// A host living in `window` that talks to `parent` (the embedding page
    /// or the popup's opener). The parent's origin is learned on `start`.
    pub fn new(window: Arc<dyn Window>, parent: Arc<dyn MessageTarget>) -> Self {
        let (status, _) = watch::channel(HostStatus::default());
        Self {
            core: Arc::new(HostCore {
                messenger: Messenger::new(parent, None),
                status,
                last_requested_height: Mutex::new(0),
                on_resize_complete: Mutex::new(None),
                on_request: Mutex::new(None),
                pump: Mutex::new(None),
            }),
            window,
        }
    }

    /// Announce the host and wait for `start`. Resolves with the activity
    /// arguments.
    pub async fn connect(&self) -> Result<Value> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| PortError::NoRuntime)?;
        {
            let mut pump = self.core.pump.lock();
            if pump.is_some() {
                return Err(PortError::Protocol("host already connecting".to_string()));
            }
            let mut inbox = self.window.subscribe();
            let core = Arc::clone(&self.core);
            *pump = Some(runtime.spawn(async move {
                while let Some(event) = inbox.recv().await {
                    if let Some(inbound) = core.messenger.accept(&event) {
                        core.handle(inbound);
                    }
                }
            }));
        }
        self.core.messenger.send(Command::Connect, None)?;

        let mut status = self.core.status.subscribe();
        let status = status
            .wait_for(|s| s.connected || s.closed)
            .await
            .map_err(|_| PortError::Closed)?;
        if status.connected {
            Ok(status.args.clone())
        } else {
            Err(PortError::Closed)
        }
    }

    pub fn is_connected(&self) -> bool {
        self.core.status.borrow().connected
    }

    /// Arguments received with `start`.
    pub fn args(&self) -> Result<Value> {
        let status = self.core.status.borrow();
        if status.connected {
            Ok(status.args.clone())
        } else {
            Err(PortError::NotConnected)
        }
    }

    pub fn target_origin(&self) -> Option<String> {
        self.core.messenger.target_origin()
    }

    /// Tell the port the document is rendered.
    pub fn ready(&self) -> Result<()> {
        self.core.messenger.send(Command::Ready, None)
    }

    /// Ask the port for `height` pixels. Repeated requests for the same
    /// height are not sent again.
    pub fn request_resize(&self, height: u32) -> Result<()> {
        {
            let mut last = self.core.last_requested_height.lock();
            if *last == height {
                return Ok(());
            }
            *last = height;
        }
        self.core
            .messenger
            .send(Command::Resize, Some(json!({ "height": height })))
    }

    /// Called with `(allowed, requested, overflow)` when the port reports the
    /// height it granted.
    pub fn on_resize_complete<F>(&self, callback: F)
    where
        F: Fn(u32, u32, bool) + Send + Sync + 'static,
    {
        *self.core.on_resize_complete.lock() = Some(Arc::new(callback));
    }

    /// Handle requests sent with the port's `execute`.
    pub fn on_request<F>(&self, callback: F)
    where
        F: Fn(AnyMessage) + Send + Sync + 'static,
    {
        *self.core.on_request.lock() = Some(Arc::new(callback));
    }

    /// Send a response message to the port.
    pub fn respond(&self, message: &dyn Message) -> Result<()> {
        self.core.messenger.post(Envelope::response(message))
    }

    pub fn result(&self, data: Value) -> Result<()> {
        self.send_result(ActivityResultCode::Ok, data)
    }

    pub fn cancel(&self) -> Result<()> {
        self.send_result(ActivityResultCode::Canceled, Value::Null)
    }

    pub fn failed(&self, reason: impl fmt::Display) -> Result<()> {
        self.send_result(ActivityResultCode::Failed, Value::String(reason.to_string()))
    }

    // The host stays connected until the port acknowledges with `close`.
    fn send_result(&self, code: ActivityResultCode, data: Value) -> Result<()> {
        self.core.messenger.send(
            Command::Result,
            Some(json!({ "code": code.as_str(), "data": data })),
        )
    }

    /// Resolves once the port closed the channel.
    pub async fn when_closed(&self) {
        let mut status = self.core.status.subscribe();
        // The sender lives as long as `self`.
        let _ = status.wait_for(|s| s.closed).await;
    }

    pub fn disconnect(&self) {
        self.core.shutdown();
    }
}

impl Drop for ActivityHost {
    fn drop(&mut self) {
        self.core.shutdown();
    }
}
