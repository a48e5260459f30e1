use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome reported by an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityResultCode {
    Ok,
    Canceled,
    Failed,
}

impl ActivityResultCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityResultCode::Ok => "ok",
            ActivityResultCode::Canceled => "canceled",
            ActivityResultCode::Failed => "failed",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "ok" => Some(ActivityResultCode::Ok),
            "canceled" => Some(ActivityResultCode::Canceled),
            "failed" => Some(ActivityResultCode::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for ActivityResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an activity is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityMode {
    Iframe,
    Popup,
    Redirect,
}

impl fmt::Display for ActivityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActivityMode::Iframe => "iframe",
            ActivityMode::Popup => "popup",
            ActivityMode::Redirect => "redirect",
        })
    }
}

/// The result of an activity, with the facts a caller needs to judge trust.
///
/// `data` is only kept for [`ActivityResultCode::Ok`]. A failed result
/// carries its reason in `error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityResult {
    pub code: ActivityResultCode,
    pub data: Option<Value>,
    pub error: Option<String>,
    pub mode: ActivityMode,
    /// Origin the result came from.
    pub origin: String,
    /// Whether `origin` was checked against the actual sender.
    pub origin_verified: bool,
    /// Whether the result travelled over a channel no third party can write to.
    pub secure_channel: bool,
}

impl ActivityResult {
    pub fn new(
        code: ActivityResultCode,
        data: Value,
        mode: ActivityMode,
        origin: impl Into<String>,
        origin_verified: bool,
        secure_channel: bool,
    ) -> Self {
        let error = (code == ActivityResultCode::Failed).then(|| reason_text(&data));
        let data = (code == ActivityResultCode::Ok).then_some(data);
        Self {
            code,
            data,
            error,
            mode,
            origin: origin.into(),
            origin_verified,
            secure_channel,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == ActivityResultCode::Ok
    }
}

fn reason_text(data: &Value) -> String {
    match data {
        Value::String(reason) => reason.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
