//! Entry point for opening activities from the publisher page.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use url::Url;

use portwire_codec::Message;
use portwire_events::ClientEventManager;
use portwire_transport::{origin_of, IframeElement, Navigator, Window};

use crate::config::{OpenOptions, PortsConfig, Storage, USER_TOKEN_KEY};
use crate::error::{PortError, Result};
use crate::port::{ActivityIframePort, ActivityPortDef, ActivityWindowPort, PendingIframePort};
use crate::redirect::{
    remove_fragment, request_url, response_from_url, RedirectRequest, RedirectResponse,
};
use crate::result::{ActivityMode, ActivityResult, ActivityResultCode};

type ResultHandler = Arc<dyn Fn(ActivityResult) + Send + Sync>;
type RedirectErrorHandler = Arc<dyn Fn(&PortError) + Send + Sync>;

/// Redirect errors kept for handlers that have not registered yet.
const MAX_UNCLAIMED_REDIRECT_ERRORS: usize = 8;

/// Handlers for one request id, plus a result that arrived before any
/// handler did. A result is held only until the first handler takes it.
#[derive(Default)]
struct RequestSlot {
    handlers: Vec<ResultHandler>,
    unclaimed: Option<ActivityResult>,
}

#[derive(Default)]
struct RedirectErrors {
    handlers: Vec<RedirectErrorHandler>,
    unclaimed: VecDeque<String>,
}

/// How a window activity was opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedWindow {
    pub mode: ActivityMode,
    /// The URL that was loaded, request fragment included.
    pub url: String,
    /// The popup was blocked and no fallback was allowed.
    pub blocked: bool,
}

/// Opens iframe and window activities and collects their results.
pub struct ActivityPorts {
    config: PortsConfig,
    window: Arc<dyn Window>,
    navigator: Arc<dyn Navigator>,
    storage: Option<Arc<dyn Storage>>,
    event_manager: Option<Arc<ClientEventManager>>,
    requests: Arc<Mutex<HashMap<String, RequestSlot>>>,
    redirect_errors: Mutex<RedirectErrors>,
}

impl fmt::Debug for ActivityPorts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityPorts")
            .field("config", &self.config)
            .field("window", &self.window.origin())
            .field("storage", &self.storage.is_some())
            .field("event_manager", &self.event_manager.is_some())
            .finish_non_exhaustive()
    }
}

impl ActivityPorts {
    /// Ports for the page shown in `window`.
    pub fn new(window: Arc<dyn Window>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            config: PortsConfig::default(),
            window,
            navigator,
            storage: None,
            event_manager: None,
            requests: Arc::new(Mutex::new(HashMap::new())),
            redirect_errors: Mutex::new(RedirectErrors::default()),
        }
    }

    pub fn with_config(mut self, config: PortsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Iframe ports forward hosted analytics events to `manager`.
    pub fn with_event_manager(mut self, manager: Arc<ClientEventManager>) -> Self {
        self.event_manager = Some(manager);
        self
    }

    pub fn config(&self) -> &PortsConfig {
        &self.config
    }

    /// Merge the page defaults under `args`. Keys in `args` win.
    pub fn add_default_arguments(&self, args: Option<Value>) -> Value {
        let mut merged = Map::new();
        merged.insert(
            "analyticsContext".into(),
            Value::Array(self.config.analytics_context.to_array(true)),
        );
        merged.insert(
            "publicationId".into(),
            self.config.publication_id.clone().map_or(Value::Null, Value::String),
        );
        merged.insert(
            "productId".into(),
            self.config.product_id.clone().map_or(Value::Null, Value::String),
        );
        merged.insert(
            "_client".into(),
            Value::String(format!("SwG {}", self.config.client_version)),
        );
        merged.insert("supportsEventManager".into(), Value::Bool(true));

        match args {
            Some(Value::Object(args)) => merged.extend(args),
            None | Some(Value::Null) => {}
            Some(other) => tracing::debug!(args = %other, "ignoring non-object activity arguments"),
        }
        Value::Object(merged)
    }

    /// `url` with the user token and publication id added to the query,
    /// unless already present.
    pub fn iframe_url(&self, url: &str) -> Result<String> {
        let mut parsed = Url::parse(url).map_err(|err| PortError::InvalidUrl(format!("{url}: {err}")))?;
        let present = |parsed: &Url, key: &str| parsed.query_pairs().any(|(k, _)| k == key);

        let token = self.storage.as_ref().and_then(|s| s.get(USER_TOKEN_KEY));
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            if !present(&parsed, "sut") {
                parsed.query_pairs_mut().append_pair("sut", &token);
            }
        }
        if let Some(publication_id) = self.config.publication_id.as_deref().filter(|p| !p.is_empty()) {
            if !present(&parsed, "publicationId") {
                parsed
                    .query_pairs_mut()
                    .append_pair("publicationId", publication_id);
            }
        }
        Ok(parsed.into())
    }

    /// Load `url` into `iframe` and start the handshake.
    ///
    /// Fails immediately if the iframe is not attached. Await
    /// [`PendingIframePort::ready`] for the connected port.
    pub fn attach_iframe(
        &self,
        iframe: Arc<dyn IframeElement>,
        url: &str,
        args: Option<Value>,
        add_default_arguments: bool,
    ) -> Result<PendingIframePort> {
        let args = if add_default_arguments {
            Some(self.add_default_arguments(args))
        } else {
            args
        };
        let url = self.iframe_url(url)?;

        let mut port = ActivityIframePort::new(Arc::clone(&self.window), iframe, &url, args)?;
        if let Some(manager) = &self.event_manager {
            port = port.with_event_manager(Arc::clone(manager));
        }
        port.begin_connect()?;
        tracing::debug!(url = %url, "iframe activity attached");
        Ok(PendingIframePort::new(port))
    }

    /// Open an iframe activity and wait until it is connected.
    pub async fn open_iframe(
        &self,
        iframe: Arc<dyn IframeElement>,
        url: &str,
        args: Option<Value>,
        add_default_arguments: bool,
    ) -> Result<ActivityIframePort> {
        self.attach_iframe(iframe, url, args, add_default_arguments)?
            .ready()
            .await
    }

    /// Open a window activity.
    ///
    /// `_top` navigates the page; `_blank` and named targets open a popup,
    /// falling back to navigation when the popup is blocked. Other
    /// `_`-prefixed targets are rejected. The result is delivered through
    /// [`ActivityPorts::on_result`].
    pub fn open(
        &self,
        request_id: &str,
        url: &str,
        target: &str,
        args: Option<Value>,
        options: &OpenOptions,
        add_default_arguments: bool,
    ) -> Result<OpenedWindow> {
        let target = if target.is_empty() { "_blank" } else { target };
        if target.starts_with('_') && target != "_blank" && target != "_top" {
            return Err(PortError::DisallowedTarget(target.to_string()));
        }
        let target_origin =
            origin_of(url).map_err(|err| PortError::InvalidUrl(err.to_string()))?;

        let args = if add_default_arguments {
            self.add_default_arguments(args)
        } else {
            args.unwrap_or(Value::Null)
        };
        let return_url = options
            .return_url
            .clone()
            .or_else(|| self.config.return_url.clone())
            .unwrap_or_default();
        let open_url = if options.skip_request_in_url {
            url.to_string()
        } else {
            request_url(
                url,
                &RedirectRequest {
                    request_id: request_id.to_string(),
                    return_url: remove_fragment(&return_url).to_string(),
                    args: args.clone(),
                },
            )?
        };

        if target != "_top" {
            if let Some(popup) = self.navigator.open_popup(&open_url, target, &options.features()) {
                let port = ActivityWindowPort::open(self.window.as_ref(), popup, target_origin, args)?;
                self.await_popup_result(request_id, port)?;
                tracing::debug!(request_id, url = %open_url, "popup activity opened");
                return Ok(OpenedWindow {
                    mode: ActivityMode::Popup,
                    url: open_url,
                    blocked: false,
                });
            }

            if options.disable_redirect_fallback {
                tracing::warn!(request_id, "popup blocked and redirect fallback disabled");
                self.deliver(
                    request_id,
                    ActivityResult::new(
                        ActivityResultCode::Failed,
                        Value::String("Popup blocked".to_string()),
                        ActivityMode::Popup,
                        target_origin,
                        false,
                        false,
                    ),
                );
                return Ok(OpenedWindow {
                    mode: ActivityMode::Popup,
                    url: open_url,
                    blocked: true,
                });
            }
            tracing::debug!(request_id, "popup blocked, falling back to redirect");
        }

        self.navigator.navigate_top(&open_url)?;
        Ok(OpenedWindow {
            mode: ActivityMode::Redirect,
            url: open_url,
            blocked: false,
        })
    }

    fn await_popup_result(&self, request_id: &str, port: ActivityWindowPort) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| PortError::NoRuntime)?;
        let requests = Arc::clone(&self.requests);
        let request_id = request_id.to_string();
        runtime.spawn(async move {
            match port.accept_result().await {
                Ok(result) => deliver_to(&requests, &request_id, result),
                Err(err) => tracing::debug!(%request_id, error = %err, "popup closed without result"),
            }
        });
        Ok(())
    }

    /// Receive the result of request `request_id`, whether it already
    /// arrived or arrives later.
    ///
    /// A result that arrived before any registration goes to the first
    /// handler only.
    pub fn on_result<F>(&self, request_id: &str, callback: F)
    where
        F: Fn(ActivityResult) + Send + Sync + 'static,
    {
        let callback: ResultHandler = Arc::new(callback);
        let buffered = {
            let mut requests = self.requests.lock();
            let slot = requests.entry(request_id.to_string()).or_default();
            slot.handlers.push(Arc::clone(&callback));
            slot.unclaimed.take()
        };
        if let Some(result) = buffered {
            callback(result);
        }
    }

    /// Receive errors found while reading a redirect result, including the
    /// most recent ones reported before any handler registered.
    pub fn on_redirect_error<F>(&self, handler: F)
    where
        F: Fn(&PortError) + Send + Sync + 'static,
    {
        let handler: RedirectErrorHandler = Arc::new(handler);
        let buffered = {
            let mut errors = self.redirect_errors.lock();
            errors.handlers.push(Arc::clone(&handler));
            std::mem::take(&mut errors.unclaimed)
        };
        for message in buffered {
            handler(&PortError::Protocol(message));
        }
    }

    /// Look for a redirect result in the page URL.
    ///
    /// `referrer` is the URL of the page that navigated here; the result's
    /// origin is verified against it. A malformed result is reported to the
    /// redirect error handlers.
    pub fn discover_redirect_result(
        &self,
        url: &str,
        referrer: Option<&str>,
    ) -> Option<ActivityResult> {
        let response: RedirectResponse = match response_from_url(url) {
            Ok(Some(response)) => response,
            Ok(None) => return None,
            Err(err) => {
                self.report_redirect_error(format!("malformed redirect result: {err}"));
                return None;
            }
        };

        let referrer_origin = referrer.and_then(|r| origin_of(r).ok());
        let result = ActivityResult::new(
            response.code,
            response.data,
            ActivityMode::Redirect,
            response.origin.clone(),
            referrer_origin.as_deref() == Some(response.origin.as_str()),
            false,
        );
        tracing::debug!(
            request_id = %response.request_id,
            verified = result.origin_verified,
            "redirect result discovered"
        );
        self.deliver(&response.request_id, result.clone());
        Some(result)
    }

    fn deliver(&self, request_id: &str, result: ActivityResult) {
        deliver_to(&self.requests, request_id, result);
    }

    fn report_redirect_error(&self, message: String) {
        tracing::warn!(error = %message, "redirect error");
        let handlers = {
            let mut errors = self.redirect_errors.lock();
            if errors.handlers.is_empty() {
                if errors.unclaimed.len() == MAX_UNCLAIMED_REDIRECT_ERRORS {
                    errors.unclaimed.pop_front();
                }
                errors.unclaimed.push_back(message.clone());
            }
            errors.handlers.clone()
        };
        let error = PortError::Protocol(message);
        for handler in handlers {
            handler(&error);
        }
    }
}

fn deliver_to(
    requests: &Mutex<HashMap<String, RequestSlot>>,
    request_id: &str,
    result: ActivityResult,
) {
    let handlers = {
        let mut requests = requests.lock();
        let slot = requests.entry(request_id.to_string()).or_default();
        if slot.handlers.is_empty() {
            slot.unclaimed = Some(result);
            return;
        }
        slot.handlers.clone()
    };
    for handler in handlers {
        handler(result.clone());
    }
}
