//! Requests and results carried in URL fragments.
//!
//! A window activity receives its request as `#__WA__=<json>` and, when it
//! ends by navigating back, returns its result as `#__WA_RES__=<json>` on the
//! return URL.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::form_urlencoded;

use crate::error::Result;
use crate::result::ActivityResultCode;

/// Fragment parameter holding a serialized [`RedirectRequest`].
pub const REQUEST_PARAM: &str = "__WA__";
/// Fragment parameter holding a serialized [`RedirectResponse`].
pub const RESULT_PARAM: &str = "__WA_RES__";

/// The request an activity window is opened with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectRequest {
    pub request_id: String,
    pub return_url: String,
    #[serde(default)]
    pub args: Value,
}

/// The result an activity sends back through the return URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectResponse {
    pub request_id: String,
    pub origin: String,
    pub code: ActivityResultCode,
    #[serde(default)]
    pub data: Value,
}

/// `url` without its fragment.
pub fn remove_fragment(url: &str) -> &str {
    url.split_once('#').map_or(url, |(base, _)| base)
}

/// Append `key=value` to the fragment of `url`.
pub fn add_fragment_param(url: &str, key: &str, value: &str) -> String {
    let (base, fragment) = url.split_once('#').unwrap_or((url, ""));
    let encoded: String = form_urlencoded::byte_serialize(value.as_bytes()).collect();
    if fragment.is_empty() {
        format!("{base}#{key}={encoded}")
    } else {
        format!("{base}#{fragment}&{key}={encoded}")
    }
}

/// Decoded value of fragment parameter `key`.
pub fn fragment_param(url: &str, key: &str) -> Option<String> {
    let (_, fragment) = url.split_once('#')?;
    form_urlencoded::parse(fragment.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Remove fragment parameter `key`, keeping the others.
pub fn remove_fragment_param(url: &str, key: &str) -> String {
    let Some((base, fragment)) = url.split_once('#') else {
        return url.to_string();
    };
    let kept: Vec<&str> = fragment
        .split('&')
        .filter(|pair| !pair.is_empty() && pair.split('=').next() != Some(key))
        .collect();
    if kept.is_empty() {
        base.to_string()
    } else {
        format!("{base}#{}", kept.join("&"))
    }
}

/// `url` with `request` in its fragment.
pub fn request_url(url: &str, request: &RedirectRequest) -> Result<String> {
    Ok(add_fragment_param(
        url,
        REQUEST_PARAM,
        &serde_json::to_string(request)?,
    ))
}

/// The request an activity window was opened with, if any.
pub fn request_from_url(url: &str) -> Result<Option<RedirectRequest>> {
    fragment_param(url, REQUEST_PARAM)
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(Into::into)
}

/// Return URL carrying `response`.
pub fn result_url(return_url: &str, response: &RedirectResponse) -> Result<String> {
    Ok(add_fragment_param(
        return_url,
        RESULT_PARAM,
        &serde_json::to_string(response)?,
    ))
}

/// The result carried back in `url`, if any.
pub fn response_from_url(url: &str) -> Result<Option<RedirectResponse>> {
    fragment_param(url, RESULT_PARAM)
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(Into::into)
}
