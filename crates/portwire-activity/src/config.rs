use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;

use portwire_codec::AnalyticsContext;

/// Storage key of the signed-in user's token.
pub const USER_TOKEN_KEY: &str = "USER_TOKEN";

/// Read access to the page's persisted values.
pub trait Storage: Send + Sync + fmt::Debug {
    fn get(&self, key: &str) -> Option<String>;
}

/// [`Storage`] backed by a map.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.lock().insert(key.into(), value.into());
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }
}

/// Page-level settings applied to every activity.
#[derive(Debug, Clone)]
pub struct PortsConfig {
    /// Reported to activities as `_client: "SwG <version>"`.
    pub client_version: String,
    pub publication_id: Option<String>,
    pub product_id: Option<String>,
    pub analytics_context: AnalyticsContext,
    /// Where redirect activities return when the caller gives no return URL.
    pub return_url: Option<String>,
}

impl Default for PortsConfig {
    fn default() -> Self {
        Self {
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            publication_id: None,
            product_id: None,
            analytics_context: AnalyticsContext::default(),
            return_url: None,
        }
    }
}

impl PortsConfig {
    pub fn with_client_version(mut self, version: impl Into<String>) -> Self {
        self.client_version = version.into();
        self
    }

    pub fn with_publication_id(mut self, id: impl Into<String>) -> Self {
        self.publication_id = Some(id.into());
        self
    }

    pub fn with_product_id(mut self, id: impl Into<String>) -> Self {
        self.product_id = Some(id.into());
        self
    }

    pub fn with_analytics_context(mut self, context: AnalyticsContext) -> Self {
        self.analytics_context = context;
        self
    }

    pub fn with_return_url(mut self, url: impl Into<String>) -> Self {
        self.return_url = Some(url.into());
        self
    }
}

/// Options for opening a window activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenOptions {
    pub return_url: Option<String>,
    /// Do not put the request into the URL fragment.
    pub skip_request_in_url: bool,
    /// Fail instead of redirecting when the popup is blocked.
    pub disable_redirect_fallback: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl OpenOptions {
    pub fn with_return_url(mut self, url: impl Into<String>) -> Self {
        self.return_url = Some(url.into());
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn skip_request_in_url(mut self) -> Self {
        self.skip_request_in_url = true;
        self
    }

    pub fn disable_redirect_fallback(mut self) -> Self {
        self.disable_redirect_fallback = true;
        self
    }

    /// Window features for the popup.
    pub(crate) fn features(&self) -> String {
        let mut features = Vec::new();
        if let Some(width) = self.width {
            features.push(format!("width={width}"));
        }
        if let Some(height) = self.height {
            features.push(format!("height={height}"));
        }
        features.push("resizable=yes".to_string());
        features.push("scrollbars=yes".to_string());
        features.join(",")
    }
}
