//! Enumerations carried as raw integers on the wire.

use serde_json::Value;

use crate::error::{CodecError, Result};
use crate::wire::{decode_integer, WireValue};

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $variant:ident = $value:literal ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        ///
        /// Numbers outside the known set decode to `Unrecognized` so that
        /// newer peers round-trip through this side unchanged.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $variant, )*
            /// A wire number this build does not know.
            Unrecognized(i64),
        }

        impl $name {
            /// Every known member, in declaration order.
            pub const ALL: &'static [$name] = &[ $( $name::$variant, )* ];

            /// Look up a known member by its wire number.
            pub fn from_i64(value: i64) -> Option<Self> {
                match value {
                    $( $value => Some(Self::$variant), )*
                    _ => None,
                }
            }

            /// Like [`Self::from_i64`], keeping unknown numbers as `Unrecognized`.
            pub fn from_i64_lossless(value: i64) -> Self {
                Self::from_i64(value).unwrap_or(Self::Unrecognized(value))
            }

            /// The wire number.
            pub fn as_i64(self) -> i64 {
                match self {
                    $( Self::$variant => $value, )*
                    Self::Unrecognized(value) => value,
                }
            }

            /// Whether this is a member known to this build.
            pub fn is_known(self) -> bool {
                !matches!(self, Self::Unrecognized(_))
            }

            /// Member name, for diagnostics.
            pub fn name(self) -> &'static str {
                match self {
                    $( Self::$variant => stringify!($variant), )*
                    Self::Unrecognized(_) => "Unrecognized",
                }
            }

            /// Resolve a JSON number to a known member.
            pub fn from_value(value: &Value) -> Option<Self> {
                decode_integer(value).and_then(Self::from_i64)
            }
        }

        impl WireValue for $name {
            fn to_wire(&self, _include_label: bool) -> Value {
                Value::from(self.as_i64())
            }

            fn from_wire(value: &Value, _includes_label: bool) -> Result<Self> {
                decode_integer(value)
                    .map(Self::from_i64_lossless)
                    .ok_or_else(|| CodecError::Mismatch {
                        expected: concat!(stringify!($name), " value"),
                        found: value.to_string(),
                    })
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", self.name(), self.as_i64())
            }
        }
    };
}

wire_enum! {
    /// Page-level action requested by a hosted activity.
    ActionType {
        ActionTypeUnknown = 0,
        ActionTypeReloadPage = 1,
        ActionTypeUpdateCounter = 2,
    }
}

wire_enum! {
    /// Impressions, user actions and lifecycle events reported by clients.
    ///
    /// Ranges: impressions from 0, actions from 1000, failures from 2000,
    /// lifecycle events from 3000, state events from 4000.
    AnalyticsEvent {
        Unknown = 0,
        ImpressionPaywall = 1,
        ImpressionAd = 2,
        ImpressionOffers = 3,
        ImpressionSubscribeButton = 4,
        ImpressionSmartbox = 5,
        ImpressionSwgButton = 6,
        ImpressionClickToShowOffers = 7,
        ImpressionClickToShowOffersOrAlreadySubscribed = 8,
        ImpressionSubscriptionComplete = 9,
        ImpressionAccountChanged = 10,
        ImpressionPageLoad = 11,
        ImpressionLink = 12,
        ImpressionSaveSubscrToGoogle = 13,
        ImpressionGoogleUpdated = 14,
        ImpressionShowOffersSmartbox = 15,
        ImpressionShowOffersSwgButton = 16,
        ImpressionSelectOfferSmartbox = 17,
        ImpressionSelectOfferSwgButton = 18,
        ImpressionShowContributionsSwgButton = 19,
        ImpressionSelectContributionSwgButton = 20,
        ImpressionMeterToast = 21,
        ImpressionRegwall = 22,
        ImpressionShowcaseRegwall = 23,
        ImpressionSwgSubscriptionMiniPrompt = 24,
        ImpressionSwgContributionMiniPrompt = 25,
        ImpressionContributionOffers = 26,
        ImpressionTwgCounter = 27,
        ImpressionTwgSiteSupporterWall = 28,
        ImpressionTwgPublication = 29,
        ImpressionTwgStaticButton = 30,
        ImpressionTwgDynamicButton = 31,
        ImpressionTwgStickerSelectionScreen = 32,
        ImpressionTwgPublicationNotSetUp = 33,
        ImpressionRegwallOptIn = 34,
        ImpressionNewsletterOptIn = 35,
        ImpressionSubscriptionOffersError = 36,
        ImpressionContributionOffersError = 37,
        ImpressionTwgShortenedStickerFlow = 38,
        ImpressionSubscriptionLinkingLoading = 39,
        ImpressionSubscriptionLinkingComplete = 40,
        ImpressionSubscriptionLinkingError = 41,
        ImpressionSurvey = 42,
        ImpressionRegwallError = 43,
        ImpressionNewsletterError = 44,
        ImpressionSurveyError = 45,
        ImpressionMeterToastError = 46,
        ImpressionMiniPrompt = 47,
        ImpressionMiniPromptError = 48,
        ImpressionRewardedAd = 49,
        ImpressionByopNewsletterOptIn = 50,
        ImpressionRewardedAdError = 51,
        ImpressionHostedPageSubscriptionOffers = 52,
        ImpressionHostedPageContributionOffers = 53,
        ImpressionHostedPageSubscriptionOffersError = 54,
        ImpressionHostedPageContributionOffersError = 55,
        ImpressionByoCta = 56,
        ImpressionByoCtaError = 57,
        ActionSubscribe = 1000,
        ActionPaymentComplete = 1001,
        ActionAccountCreated = 1002,
        ActionAccountAcknowledged = 1003,
        ActionSubscriptionsLandingPage = 1004,
        ActionPaymentFlowStarted = 1005,
        ActionOfferSelected = 1006,
        ActionSwgButtonClick = 1007,
        ActionViewOffers = 1008,
        ActionAlreadySubscribed = 1009,
        ActionNewDeferredAccount = 1010,
        ActionLinkContinue = 1011,
        ActionLinkCancel = 1012,
        ActionGoogleUpdatedClose = 1013,
        ActionUserCanceledPayflow = 1014,
        ActionSaveSubscrToGoogleContinue = 1015,
        ActionSaveSubscrToGoogleCancel = 1016,
        ActionSwgButtonShowOffersClick = 1017,
        ActionSwgButtonSelectOfferClick = 1018,
        ActionSwgButtonShowContributionsClick = 1019,
        ActionSwgButtonSelectContributionClick = 1020,
        ActionUserConsentDeferredAccount = 1021,
        ActionUserDenyDeferredAccount = 1022,
        ActionDeferredAccountRedirect = 1023,
        ActionGetEntitlements = 1024,
        ActionMeterToastSubscribeClick = 1025,
        ActionMeterToastExpanded = 1026,
        ActionMeterToastClosedByArticleInteraction = 1027,
        ActionMeterToastClosedBySwipeDown = 1028,
        ActionMeterToastClosedByXClicked = 1029,
        ActionSwgSubscriptionMiniPromptClick = 1030,
        ActionSwgContributionMiniPromptClick = 1031,
        ActionSwgSubscriptionMiniPromptClose = 1032,
        ActionSwgContributionMiniPromptClose = 1033,
        ActionContributionOfferSelected = 1034,
        ActionShowcaseRegwallGsiClick = 1035,
        ActionShowcaseRegwallExistingAccountClick = 1036,
        ActionSubscriptionOffersClosed = 1037,
        ActionContributionOffersClosed = 1038,
        ActionTwgStaticCtaClick = 1039,
        ActionTwgDynamicCtaClick = 1040,
        ActionTwgSiteLevelSupporterWallCtaClick = 1041,
        ActionTwgDialogSupporterWallCtaClick = 1042,
        ActionTwgCounterClick = 1043,
        ActionTwgSiteSupporterWallAllThanksClick = 1044,
        ActionTwgPaidStickerSelectedScreenCloseClick = 1045,
        ActionTwgPaidStickerSelectionClick = 1046,
        ActionTwgFreeStickerSelectionClick = 1047,
        ActionTwgMiniSupporterWallClick = 1048,
        ActionTwgCreatorBenefitClick = 1049,
        ActionTwgFreeTransactionStartNextButtonClick = 1050,
        ActionTwgPaidTransactionStartNextButtonClick = 1051,
        ActionTwgStickerSelectionScreenCloseClick = 1052,
        ActionTwgArticleLevelSupporterWallCtaClick = 1053,
        ActionRegwallOptInButtonClick = 1054,
        ActionRegwallAlreadyOptedInClick = 1055,
        ActionNewsletterOptInButtonClick = 1056,
        ActionNewsletterAlreadyOptedInClick = 1057,
        ActionRegwallOptInClose = 1058,
        ActionNewsletterOptInClose = 1059,
        ActionShowcaseRegwallSiwgClick = 1060,
        ActionTwgChromeAppMenuEntryPointClick = 1061,
        ActionTwgDiscoverFeedMenuEntryPointClick = 1062,
        ActionShowcaseRegwall3pButtonClick = 1063,
        ActionSubscriptionOffersRetry = 1064,
        ActionContributionOffersRetry = 1065,
        ActionTwgShortenedStickerFlowStickerSelectionClick = 1066,
        ActionInitiateUpdatedSubscriptionLinking = 1067,
        ActionSurveySubmitClick = 1068,
        ActionSurveyClosed = 1069,
        ActionSurveyDataTransfer = 1070,
        ActionRegwallPageRefresh = 1071,
        ActionNewsletterPageRefresh = 1072,
        ActionSurveyPageRefresh = 1073,
        ActionMeterToastPageRefresh = 1074,
        ActionMiniPromptInteraction = 1075,
        ActionSurveyPreviousButtonClick = 1076,
        ActionSurveyNextButtonClick = 1077,
        ActionRewardedAdView = 1078,
        ActionRewardedAdClose = 1079,
        ActionRewardedAdCloseAd = 1080,
        ActionRewardedAdSignIn = 1081,
        ActionRewardedAdSupport = 1082,
        ActionBackToHomepage = 1083,
        ActionByopNewsletterOptInClose = 1084,
        ActionByopNewsletterOptInSubmit = 1085,
        ActionSubscriptionLinkingClose = 1086,
        ActionByoCtaClose = 1087,
        ActionByoCtaButtonClick = 1088,
        EventPaymentFailed = 2000,
        EventRegwallOptInFailed = 2001,
        EventNewsletterOptInFailed = 2002,
        EventRegwallAlreadyOptIn = 2003,
        EventNewsletterAlreadyOptIn = 2004,
        EventSubscriptionLinkingFailed = 2005,
        EventSurveyAlreadySubmitted = 2006,
        EventSurveyCompletionRecordFailed = 2007,
        EventSurveyDataTransferFailed = 2008,
        EventByoCtaCompletionRecordFailed = 2009,
        EventCustom = 3000,
        EventConfirmTxId = 3001,
        EventChangedTxId = 3002,
        EventGpayNoTxId = 3003,
        EventGpayCannotConfirmTxId = 3004,
        EventGoogleUpdated = 3005,
        EventNewTxId = 3006,
        EventUnlockedBySubscription = 3007,
        EventUnlockedByMeter = 3008,
        EventNoEntitlements = 3009,
        EventHasMeteringEntitlements = 3010,
        EventOfferedMeter = 3011,
        EventUnlockedFreePage = 3012,
        EventIneligiblePaywall = 3013,
        EventUnlockedForCrawler = 3014,
        EventTwgCounterView = 3015,
        EventTwgSiteSupporterWallView = 3016,
        EventTwgStaticButtonView = 3017,
        EventTwgDynamicButtonView = 3018,
        EventTwgPreTransactionPrivacySettingPrivate = 3019,
        EventTwgPostTransactionSettingPrivate = 3020,
        EventTwgPreTransactionPrivacySettingPublic = 3021,
        EventTwgPostTransactionSettingPublic = 3022,
        EventRegwallOptedIn = 3023,
        EventNewsletterOptedIn = 3024,
        EventShowcaseMeteringInit = 3025,
        EventDisableMinipromptDesktop = 3026,
        EventSubscriptionLinkingSuccess = 3027,
        EventSurveySubmitted = 3028,
        EventLinkAccountSuccess = 3029,
        EventSaveSubscriptionSuccess = 3030,
        EventSurveyDataTransferComplete = 3031,
        EventRuntimeIsReady = 3032,
        EventStartApi = 3033,
        EventShowOffersApi = 3034,
        EventShowContributionOptionsApi = 3035,
        EventRewardedAdFlowInit = 3048,
        EventRewardedAdReady = 3036,
        EventRewardedAdGptMissingError = 3037,
        EventRewardedAdConfigError = 3038,
        EventRewardedAdPageError = 3039,
        EventRewardedAdGptError = 3040,
        EventRewardedAdGranted = 3041,
        EventRewardedAdNotFilled = 3049,
        EventGlobalFrequencyCapMet = 3042,
        EventPromptFrequencyCapMet = 3043,
        EventActionImpressionsStorageKeyNotFoundError = 3044,
        EventLocalStorageTimestampsParsingError = 3052,
        EventFrequencyCapConfigNotFoundError = 3045,
        EventPromptFrequencyConfigNotFound = 3053,
        EventByopNewsletterOptInConfigError = 3046,
        EventByopNewsletterOptInCodeSnippetError = 3047,
        EventSubscriptionPaymentComplete = 3050,
        EventContributionPaymentComplete = 3051,
        EventHostedPageSubscriptionPaymentComplete = 3054,
        EventHostedPageContributionPaymentComplete = 3055,
        EventCompletionCountForRepeatableActionMissingError = 3056,
        EventSubscriptionState = 4000,
    }
}

wire_enum! {
    /// Outcome of an entitlement check.
    EntitlementResult {
        UnknownEntitlementResult = 0,
        UnlockedSubscriber = 1001,
        UnlockedFree = 1002,
        UnlockedMeter = 1003,
        LockedRegwall = 2001,
        LockedPaywall = 2002,
        IneligiblePaywall = 2003,
    }
}

wire_enum! {
    /// Service that granted an entitlement.
    EntitlementSource {
        UnknownEntitlementSource = 0,
        GoogleSubscriberEntitlement = 1001,
        GoogleShowcaseMeteringService = 2001,
        SubscribeWithGoogleMeteringService = 2002,
        PublisherEntitlement = 3001,
    }
}

wire_enum! {
    /// Codebase that produced an event.
    EventOriginator {
        UnknownClient = 0,
        SwgClient = 1,
        AmpClient = 2,
        PropensityClient = 3,
        SwgServer = 4,
        PublisherClient = 5,
        ShowcaseClient = 6,
    }
}

wire_enum! {
    /// Surface the reader is using.
    ReaderSurfaceType {
        ReaderSurfaceTypeUnspecified = 0,
        ReaderSurfaceWordpress = 1,
        ReaderSurfaceChrome = 2,
        ReaderSurfaceTenor = 3,
    }
}
