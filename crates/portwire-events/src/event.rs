use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use portwire_codec::{
    AnalyticsEvent, AnalyticsRequest, EventOriginator, EventParams, Message, MessageType,
};

use crate::error::{EventError, Result};

/// Verdict of an event filterer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum FilterResult {
    /// Let the event through to the next filterer and the listeners.
    #[default]
    ProcessEvent = 0,
    /// Drop the event. Later filterers and all listeners are skipped.
    CancelEvent = 1,
}

/// Free-form data attached to an event.
#[derive(Debug, Clone, PartialEq)]
pub enum AdditionalParameters {
    Object(Map<String, Value>),
    EventParams(EventParams),
}

impl AdditionalParameters {
    fn to_value(&self) -> Value {
        match self {
            AdditionalParameters::Object(map) => Value::Object(map.clone()),
            AdditionalParameters::EventParams(params) => params.to_value(),
        }
    }
}

impl From<EventParams> for AdditionalParameters {
    fn from(params: EventParams) -> Self {
        AdditionalParameters::EventParams(params)
    }
}

impl From<Map<String, Value>> for AdditionalParameters {
    fn from(map: Map<String, Value>) -> Self {
        AdditionalParameters::Object(map)
    }
}

/// Google Analytics fields forwarded alongside an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleAnalyticsParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub survey_question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub survey_answer_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_label: Option<String>,
}

/// Per-dispatch parameters handed to listeners but not filterers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientEventParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_analytics_parameters: Option<GoogleAnalyticsParameters>,
}

/// An analytics event flowing through a [`ClientEventManager`].
///
/// [`ClientEventManager`]: crate::ClientEventManager
#[derive(Debug, Clone, PartialEq)]
pub struct ClientEvent {
    pub event_type: AnalyticsEvent,
    pub event_originator: EventOriginator,
    pub is_from_user_action: Option<bool>,
    pub additional_parameters: Option<AdditionalParameters>,
    /// Milliseconds since the Unix epoch. Stamped on dispatch when unset.
    pub timestamp: Option<u64>,
    pub configuration_id: Option<String>,
}

impl ClientEvent {
    pub fn new(event_type: AnalyticsEvent, event_originator: EventOriginator) -> Self {
        Self {
            event_type,
            event_originator,
            is_from_user_action: None,
            additional_parameters: None,
            timestamp: None,
            configuration_id: None,
        }
    }

    pub fn with_user_action(mut self, is_from_user_action: bool) -> Self {
        self.is_from_user_action = Some(is_from_user_action);
        self
    }

    pub fn with_parameters(mut self, params: impl Into<AdditionalParameters>) -> Self {
        self.additional_parameters = Some(params.into());
        self
    }

    pub fn with_timestamp(mut self, millis: u64) -> Self {
        self.timestamp = Some(millis);
        self
    }

    pub fn with_configuration_id(mut self, id: impl Into<String>) -> Self {
        self.configuration_id = Some(id.into());
        self
    }

    /// Event reported by a hosted activity through an [`AnalyticsRequest`].
    ///
    /// Returns `None` when the request carries no event type, or one this
    /// build does not recognize.
    pub fn from_analytics_request(request: &AnalyticsRequest) -> Option<Self> {
        let event_type = request.event.filter(|event| event.is_known())?;
        let meta = request.meta.as_ref();
        Some(Self {
            event_type,
            event_originator: EventOriginator::SwgServer,
            is_from_user_action: meta.and_then(|m| m.is_from_user_action),
            additional_parameters: request
                .params
                .clone()
                .map(AdditionalParameters::EventParams),
            timestamp: None,
            configuration_id: meta.and_then(|m| m.configuration_id.clone()),
        })
    }

    /// Whether the event was raised by the publisher's own code.
    pub fn is_publisher_event(&self) -> bool {
        matches!(
            self.event_originator,
            EventOriginator::PropensityClient | EventOriginator::PublisherClient
        )
    }

    /// Validate and convert an event given as a JSON object.
    ///
    /// Keys follow the browser API: `eventType`, `eventOriginator`,
    /// `isFromUserAction`, `additionalParameters`, `timestamp` and
    /// `configurationId`.
    pub fn from_value(value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or(EventError::NotAnObject)?;
        let field = |name: &str| object.get(name);

        let event_type = field("eventType")
            .and_then(AnalyticsEvent::from_value)
            .ok_or_else(|| invalid("eventType", field("eventType")))?;

        let event_originator = field("eventOriginator")
            .and_then(EventOriginator::from_value)
            .ok_or_else(|| invalid("eventOriginator", field("eventOriginator")))?;

        let additional_parameters = match field("additionalParameters") {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(AdditionalParameters::Object(map.clone())),
            other => return Err(invalid("additionalParameters", other)),
        };

        let is_from_user_action = match field("isFromUserAction") {
            None | Some(Value::Null) => None,
            Some(Value::Bool(flag)) => Some(*flag),
            other => return Err(invalid("isFromUserAction", other)),
        };

        let timestamp = match field("timestamp") {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                value
                    .as_u64()
                    .ok_or_else(|| invalid("timestamp", Some(value)))?,
            ),
        };

        let configuration_id = match field("configurationId") {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) => Some(id.clone()),
            other => return Err(invalid("configurationId", other)),
        };

        Ok(Self {
            event_type,
            event_originator,
            is_from_user_action,
            additional_parameters,
            timestamp,
            configuration_id,
        })
    }

    /// JSON object in the same shape [`ClientEvent::from_value`] accepts.
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        object.insert("eventType".into(), Value::from(self.event_type.as_i64()));
        object.insert(
            "eventOriginator".into(),
            Value::from(self.event_originator.as_i64()),
        );
        object.insert(
            "isFromUserAction".into(),
            self.is_from_user_action.map_or(Value::Null, Value::Bool),
        );
        object.insert(
            "additionalParameters".into(),
            self.additional_parameters
                .as_ref()
                .map_or(Value::Null, AdditionalParameters::to_value),
        );
        if let Some(timestamp) = self.timestamp {
            object.insert("timestamp".into(), Value::from(timestamp));
        }
        object.insert(
            "configurationId".into(),
            self.configuration_id
                .clone()
                .map_or(Value::Null, Value::String),
        );
        Value::Object(object)
    }
}

fn invalid(field: &'static str, value: Option<&Value>) -> EventError {
    EventError::Validation {
        field,
        value: value.map_or_else(|| "undefined".to_string(), display_value),
    }
}

/// String form a browser would produce when concatenating `value`.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(_) => "[object Object]".to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => display_value(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use portwire_codec::AnalyticsEventMeta;
    use serde_json::json;

    use super::*;

    #[test]
    fn raw_event_with_garbage_type_names_the_field() {
        let err = ClientEvent::from_value(&json!({
            "eventType": "garbage",
            "eventOriginator": 1,
        }))
        .unwrap_err();
        assert_eq!(
            err,
            EventError::Validation {
                field: "eventType",
                value: "garbage".to_string()
            }
        );
        assert_eq!(err.to_string(), "Event has an invalid eventType(garbage)");
    }

    #[test]
    fn raw_event_rejects_each_bad_field() {
        let cases = [
            (json!({"eventType": 1}), "Event has an invalid eventOriginator(undefined)"),
            (
                json!({"eventType": 1, "eventOriginator": 99}),
                "Event has an invalid eventOriginator(99)",
            ),
            (
                json!({"eventType": 1, "eventOriginator": 1, "isFromUserAction": "yes"}),
                "Event has an invalid isFromUserAction(yes)",
            ),
            (
                json!({"eventType": 1, "eventOriginator": 1, "additionalParameters": 5}),
                "Event has an invalid additionalParameters(5)",
            ),
            (
                json!({"eventType": 1, "eventOriginator": 1, "additionalParameters": []}),
                "Event has an invalid additionalParameters()",
            ),
            (
                json!({"eventType": 1, "eventOriginator": 1, "additionalParameters": ["EventParams", "sku"]}),
                "Event has an invalid additionalParameters(EventParams,sku)",
            ),
            (
                json!({"eventType": null, "eventOriginator": 1}),
                "Event has an invalid eventType(null)",
            ),
        ];
        for (input, message) in cases {
            assert_eq!(ClientEvent::from_value(&input).unwrap_err().to_string(), message);
        }
        assert_eq!(
            ClientEvent::from_value(&json!(7)).unwrap_err(),
            EventError::NotAnObject
        );
    }

    #[test]
    fn raw_event_accepts_optional_fields() {
        let event = ClientEvent::from_value(&json!({
            "eventType": 1006,
            "eventOriginator": 5,
            "isFromUserAction": true,
            "additionalParameters": {"sku": "basic"},
            "timestamp": 1_700_000_000_000u64,
            "configurationId": "cfg-1",
        }))
        .unwrap();

        assert_eq!(event.event_type, AnalyticsEvent::ActionOfferSelected);
        assert_eq!(event.event_originator, EventOriginator::PublisherClient);
        assert!(event.is_publisher_event());
        assert_eq!(event.timestamp, Some(1_700_000_000_000));
        assert_eq!(event.configuration_id.as_deref(), Some("cfg-1"));
        assert_eq!(ClientEvent::from_value(&event.to_value()).unwrap(), event);
    }

    #[test]
    fn analytics_request_becomes_server_event() {
        let request = AnalyticsRequest {
            event: Some(AnalyticsEvent::ImpressionOffers),
            meta: Some(AnalyticsEventMeta {
                event_originator: Some(EventOriginator::SwgClient),
                is_from_user_action: Some(true),
                configuration_id: Some("abc".to_string()),
            }),
            params: Some(EventParams {
                sku: Some("premium".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let event = ClientEvent::from_analytics_request(&request).unwrap();
        assert_eq!(event.event_originator, EventOriginator::SwgServer);
        assert_eq!(event.is_from_user_action, Some(true));
        assert_eq!(event.configuration_id.as_deref(), Some("abc"));
        assert!(matches!(
            event.additional_parameters,
            Some(AdditionalParameters::EventParams(ref p)) if p.sku.as_deref() == Some("premium")
        ));
        assert!(!event.is_publisher_event());

        assert!(ClientEvent::from_analytics_request(&AnalyticsRequest::default()).is_none());

        let unrecognized = AnalyticsRequest {
            event: Some(AnalyticsEvent::Unrecognized(99_999)),
            ..Default::default()
        };
        assert!(ClientEvent::from_analytics_request(&unrecognized).is_none());
    }

    #[test]
    fn client_event_params_use_browser_keys() {
        let params: ClientEventParams = serde_json::from_value(json!({
            "googleAnalyticsParameters": {"event_category": "survey", "event_label": "q1"}
        }))
        .unwrap();
        let ga = params.google_analytics_parameters.unwrap();
        assert_eq!(ga.event_category.as_deref(), Some("survey"));
        assert_eq!(ga.event_label.as_deref(), Some("q1"));
        assert!(ga.survey_question.is_none());
    }
}
