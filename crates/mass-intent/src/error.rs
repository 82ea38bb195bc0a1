use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const INTENT_ERROR_INVALID_SLOTS: &str = "intent_invalid_slots";
pub const INTENT_ERROR_UNKNOWN_INTENT: &str = "intent_unknown_intent";
pub const INTENT_ERROR_DUPLICATE_INTENT: &str = "intent_duplicate_intent";
pub const INTENT_ERROR_SERVICE_FAILED: &str = "intent_service_failed";
pub const INTENT_ERROR_MALFORMED_SERVICE_RESPONSE: &str = "intent_malformed_service_response";
pub const INTENT_ERROR_INVALID_QUERY_PAYLOAD: &str = "intent_invalid_query_payload";
pub const INTENT_ERROR_MEDIA_CONTROL_FAILED: &str = "intent_media_control_failed";
pub const INTENT_ERROR_NO_AREA_NAMED: &str = "intent_no_area_named";
pub const INTENT_ERROR_NO_PLAYER_MATCHING_NAME: &str = "intent_no_player_matching_name";
pub const INTENT_ERROR_NO_PLAYER_IN_AREA: &str = "intent_no_player_in_area";
pub const INTENT_ERROR_NO_TARGET_PLAYER: &str = "intent_no_target_player";

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[error("service call {domain}.{service} failed: {message}")]
/// Failure reported by a `ServiceCaller`.
pub struct ServiceCallError {
    pub domain: String,
    pub service: String,
    pub message: String,
}

impl ServiceCallError {
    pub fn new(
        domain: impl Into<String>,
        service: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            service: service.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
/// Failures reported by a `MediaControlClient`.
pub enum MediaControlError {
    #[error("media control client is not connected")]
    NotConnected,
    #[error("player roster unavailable: {0}")]
    RosterUnavailable(String),
    #[error("player '{player_id}' rejected play_media: {message}")]
    PlaybackRejected { player_id: String, message: String },
}

#[derive(Debug, Error)]
/// Enumerates supported `IntentError` values.
pub enum IntentError {
    #[error("invalid slots: {0}")]
    InvalidSlots(String),
    #[error("no handler registered for intent '{0}'")]
    UnknownIntent(String),
    #[error("intent '{0}' is already registered")]
    DuplicateIntent(String),
    #[error(transparent)]
    Service(#[from] ServiceCallError),
    #[error("malformed conversation response: {0}")]
    MalformedServiceResponse(String),
    #[error("conversation reply is not a valid media query payload: {0}")]
    QueryPayload(#[from] serde_json::Error),
    #[error(transparent)]
    MediaControl(#[from] MediaControlError),
    #[error("No area named {0}")]
    NoAreaNamed(String),
    #[error("No media player found matching name: {0}")]
    NoPlayerMatchingName(String),
    #[error("No media player found matching area: {0}")]
    NoPlayerInArea(String),
    #[error("no media player name or area was given")]
    NoTargetPlayer,
}

impl IntentError {
    /// Stable snake_case code for fixtures and structured logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidSlots(_) => INTENT_ERROR_INVALID_SLOTS,
            Self::UnknownIntent(_) => INTENT_ERROR_UNKNOWN_INTENT,
            Self::DuplicateIntent(_) => INTENT_ERROR_DUPLICATE_INTENT,
            Self::Service(_) => INTENT_ERROR_SERVICE_FAILED,
            Self::MalformedServiceResponse(_) => INTENT_ERROR_MALFORMED_SERVICE_RESPONSE,
            Self::QueryPayload(_) => INTENT_ERROR_INVALID_QUERY_PAYLOAD,
            Self::MediaControl(_) => INTENT_ERROR_MEDIA_CONTROL_FAILED,
            Self::NoAreaNamed(_) => INTENT_ERROR_NO_AREA_NAMED,
            Self::NoPlayerMatchingName(_) => INTENT_ERROR_NO_PLAYER_MATCHING_NAME,
            Self::NoPlayerInArea(_) => INTENT_ERROR_NO_PLAYER_IN_AREA,
            Self::NoTargetPlayer => INTENT_ERROR_NO_TARGET_PLAYER,
        }
    }
}

pub type IntentResult<T> = Result<T, IntentError>;
