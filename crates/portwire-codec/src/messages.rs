//! Concrete message types.
//!
//! Field order is the wire contract: new fields may only be appended.

use crate::enums::{
    ActionType, AnalyticsEvent, EntitlementResult, EntitlementSource, EventOriginator,
    ReaderSurfaceType,
};
use crate::message::message;

message! {
    /// Reports whether the account creation step completed.
    AccountCreationRequest {
        complete: Option<bool>,
    }
}

message! {
    /// Asks the host page to perform an action.
    ActionRequest {
        action: Option<ActionType>,
    }
}

message! {
    AlreadySubscribedResponse {
        subscriber_or_member: Option<bool>,
        link_requested: Option<bool>,
    }
}

message! {
    /// Page and session context attached to analytics traffic.
    AnalyticsContext {
        embedder_origin: Option<String>,
        transaction_id: Option<String>,
        referring_origin: Option<String>,
        utm_source: Option<String>,
        utm_campaign: Option<String>,
        utm_medium: Option<String>,
        sku: Option<String>,
        ready_to_pay: Option<bool>,
        /// Free-form labels; a repeated string field.
        label: Vec<String>,
        client_version: Option<String>,
        url: Option<String>,
        client_timestamp: Option<Timestamp>,
        reader_surface_type: Option<ReaderSurfaceType>,
        integration_version: Option<String>,
        page_load_begin_timestamp: Option<Timestamp>,
        load_event_start_delay: Option<Duration>,
        runtime_creation_timestamp: Option<Timestamp>,
        is_locked_content: Option<bool>,
        url_from_markup: Option<String>,
    }
}

message! {
    AnalyticsEventMeta {
        event_originator: Option<EventOriginator>,
        is_from_user_action: Option<bool>,
        configuration_id: Option<String>,
    }
}

message! {
    /// An analytics event forwarded by a hosted activity.
    AnalyticsRequest {
        context: Option<AnalyticsContext>,
        event: Option<AnalyticsEvent>,
        meta: Option<AnalyticsEventMeta>,
        params: Option<EventParams>,
    }
}

message! {
    AudienceActivityClientLogsRequest {
        event: Option<AnalyticsEvent>,
    }
}

message! {
    /// Result of an audience action (registration, newsletter, survey).
    CompleteAudienceActionResponse {
        swg_user_token: Option<String>,
        action_completed: Option<bool>,
        user_email: Option<String>,
        already_completed: Option<bool>,
        display_name: Option<String>,
        given_name: Option<String>,
        family_name: Option<String>,
    }
}

message! {
    /// Signed span of time.
    Duration {
        seconds: Option<i64>,
        nanos: Option<i64>,
    }
}

message! {
    EntitlementJwt {
        jwt: Option<String>,
        source: Option<String>,
    }
}

message! {
    /// Reports which entitlement was used to unlock a page.
    EntitlementsRequest {
        used_entitlement: Option<EntitlementJwt>,
        client_event_time: Option<Timestamp>,
        entitlement_source: Option<EntitlementSource>,
        entitlement_result: Option<EntitlementResult>,
        token: Option<String>,
        is_user_registered: Option<bool>,
        subscription_timestamp: Option<Timestamp>,
    }
}

message! {
    EntitlementsResponse {
        jwt: Option<String>,
        swg_user_token: Option<String>,
    }
}

message! {
    /// Event-specific details attached to an analytics event.
    EventParams {
        smartbox_message: Option<String>,
        gpay_transaction_id: Option<String>,
        had_logged: Option<bool>,
        sku: Option<String>,
        old_transaction_id: Option<String>,
        is_user_registered: Option<bool>,
        subscription_flow: Option<String>,
        subscription_timestamp: Option<Timestamp>,
    }
}

message! {
    FinishedLoggingResponse {
        complete: Option<bool>,
        error: Option<String>,
    }
}

message! {
    LinkSaveTokenRequest {
        auth_code: Option<String>,
        token: Option<String>,
    }
}

message! {
    LinkingInfoResponse {
        requested: Option<bool>,
    }
}

message! {
    /// Asks the host page to open another dialog at `url_path`.
    OpenDialogRequest {
        url_path: Option<String>,
    }
}

message! {
    /// Offer chosen by the reader in the offers activity.
    SkuSelectedResponse {
        sku: Option<String>,
        old_sku: Option<String>,
        one_time: Option<bool>,
        play_offer: Option<String>,
        old_play_offer: Option<String>,
        custom_message: Option<String>,
        anonymous: Option<bool>,
        sharing_policy_enabled: Option<bool>,
    }
}

message! {
    SmartBoxMessage {
        is_clicked: Option<bool>,
    }
}

message! {
    SubscribeResponse {
        subscribe: Option<bool>,
    }
}

message! {
    SubscriptionLinkingCompleteResponse {
        publisher_provided_id: Option<String>,
        success: Option<bool>,
    }
}

message! {
    SubscriptionLinkingResponse {
        publisher_provided_id: Option<String>,
    }
}

message! {
    SurveyAnswer {
        answer_id: Option<i64>,
        answer_text: Option<String>,
        answer_category: Option<String>,
        pps_value: Option<String>,
    }
}

message! {
    /// Survey answers to hand over to the publisher.
    SurveyDataTransferRequest {
        survey_questions: Vec<SurveyQuestion>,
        store_pps_in_local_storage: Option<bool>,
    }
}

message! {
    SurveyDataTransferResponse {
        success: Option<bool>,
    }
}

message! {
    SurveyQuestion {
        question_id: Option<i64>,
        question_text: Option<String>,
        question_category: Option<String>,
        survey_answers: Vec<SurveyAnswer>,
    }
}

message! {
    /// Point in time as seconds and nanoseconds since the Unix epoch.
    Timestamp {
        seconds: Option<i64>,
        nanos: Option<i64>,
    }
}

message! {
    ToastCloseRequest {
        close: Option<bool>,
    }
}

message! {
    ViewSubscriptionsResponse {
        native: Option<bool>,
    }
}

impl Timestamp {
    /// Timestamp for a millisecond Unix time.
    pub fn from_millis(millis: i64) -> Self {
        Self {
            seconds: Some(millis.div_euclid(1000)),
            nanos: Some(millis.rem_euclid(1000) * 1_000_000),
        }
    }
}

impl Duration {
    /// Duration for a millisecond span.
    pub fn from_millis(millis: i64) -> Self {
        Self {
            seconds: Some(millis / 1000),
            nanos: Some((millis % 1000) * 1_000_000),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::message::{Message, MessageType};

    #[test]
    fn sku_selected_field_order() {
        let msg = SkuSelectedResponse {
            sku: Some("basic".to_string()),
            one_time: Some(false),
            anonymous: Some(true),
            ..Default::default()
        };

        assert_eq!(
            Value::Array(msg.to_array(true)),
            json!(["SkuSelectedResponse", "basic", null, false, null, null, null, true, null])
        );
        assert_eq!(
            Value::Array(msg.to_array(false)),
            json!(["basic", null, false, null, null, null, true, null])
        );
    }

    #[test]
    fn unset_nested_message_encodes_as_empty_array() {
        let request = AnalyticsRequest {
            event: Some(AnalyticsEvent::ImpressionPaywall),
            ..Default::default()
        };
        assert_eq!(
            Value::Array(request.to_array(true)),
            json!(["AnalyticsRequest", [], 1, [], []])
        );
    }

    #[test]
    fn nested_messages_follow_label_flag() {
        let params = EventParams {
            subscription_timestamp: Some(Timestamp {
                seconds: Some(10),
                nanos: Some(0),
            }),
            ..Default::default()
        };

        let labelled = params.to_array(true);
        assert_eq!(labelled[8], json!(["Timestamp", 10, 0]));

        let bare = params.to_array(false);
        assert_eq!(bare[7], json!([10, 0]));

        let decoded = EventParams::from_array(&bare, false).unwrap();
        assert_eq!(decoded, params);
    }

    #[test]
    fn empty_nested_slot_decodes_as_unset() {
        let decoded =
            AnalyticsRequest::from_array(&[json!("AnalyticsRequest"), json!([]), json!(3)], true)
                .unwrap();
        assert!(decoded.context.is_none());
        assert_eq!(decoded.event, Some(AnalyticsEvent::ImpressionOffers));
        assert!(decoded.meta.is_none());
        assert!(decoded.params.is_none());
    }

    #[test]
    fn unset_nested_message_survives_round_trip() {
        let request = AnalyticsRequest {
            event: Some(AnalyticsEvent::ImpressionPaywall),
            ..Default::default()
        };
        for labelled in [true, false] {
            let decoded =
                AnalyticsRequest::from_array(&request.to_array(labelled), labelled).unwrap();
            assert_eq!(decoded, request);
            assert!(decoded.meta.is_none());
        }
    }

    #[test]
    fn repeated_nested_messages() {
        let request = SurveyDataTransferRequest {
            survey_questions: vec![SurveyQuestion {
                question_id: Some(1),
                question_text: Some("How often?".to_string()),
                question_category: None,
                survey_answers: vec![SurveyAnswer {
                    answer_id: Some(2),
                    answer_text: Some("Daily".to_string()),
                    ..Default::default()
                }],
            }],
            store_pps_in_local_storage: Some(true),
        };

        assert_eq!(
            Value::Array(request.to_array(true)),
            json!([
                "SurveyDataTransferRequest",
                [[
                    "SurveyQuestion",
                    1,
                    "How often?",
                    null,
                    [["SurveyAnswer", 2, "Daily", null, null]]
                ]],
                true
            ])
        );
    }

    #[test]
    fn repeated_field_defaults_to_empty_when_absent() {
        let decoded =
            SurveyDataTransferRequest::from_array(&[json!("SurveyDataTransferRequest")], true)
                .unwrap();
        assert!(decoded.survey_questions.is_empty());
        assert!(decoded.store_pps_in_local_storage.is_none());
    }

    #[test]
    fn repeated_string_field() {
        let context = AnalyticsContext {
            label: vec!["a".to_string(), "b".to_string()],
            ..Default::default()
        };
        let arr = context.to_array(true);
        assert_eq!(arr.len(), 20);
        assert_eq!(arr[9], json!(["a", "b"]));
        assert_eq!(AnalyticsContext::from_array(&arr, true).unwrap(), context);
    }

    #[test]
    fn wrong_slot_type_names_field() {
        let err = SkuSelectedResponse::from_array(
            &[json!("SkuSelectedResponse"), json!("basic"), json!(null), json!("yes")],
            true,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "SkuSelectedResponse field 3: expected boolean, found \"yes\""
        );
    }

    #[test]
    fn timestamp_from_millis_handles_negative_values() {
        assert_eq!(
            Timestamp::from_millis(1_500),
            Timestamp {
                seconds: Some(1),
                nanos: Some(500_000_000)
            }
        );
        assert_eq!(
            Timestamp::from_millis(-1),
            Timestamp {
                seconds: Some(-1),
                nanos: Some(999_000_000)
            }
        );
    }

    #[test]
    fn label_matches_type_constant() {
        assert_eq!(Duration::default().label(), Duration::LABEL);
        assert_eq!(ToastCloseRequest::LABEL, "ToastCloseRequest");
    }
}
