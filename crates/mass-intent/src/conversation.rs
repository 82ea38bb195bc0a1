use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{IntentError, IntentResult, ServiceCallError};
use crate::intent::IntentContext;

pub const CONVERSATION_DOMAIN: &str = "conversation";
pub const CONVERSATION_SERVICE_PROCESS: &str = "process";
pub const ATTR_AGENT_ID: &str = "agent_id";
pub const ATTR_TEXT: &str = "text";
pub const ATTR_MEDIA_ID: &str = "media_id";
pub const ATTR_MEDIA_TYPE: &str = "media_type";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// A service invocation routed through the host's dispatcher.
pub struct ServiceCall {
    pub domain: String,
    pub service: String,
    pub data: Map<String, Value>,
    pub blocking: bool,
    pub return_response: bool,
    pub context: IntentContext,
}

#[async_trait]
/// Trait contract for `ServiceCaller` behavior.
pub trait ServiceCaller: Send + Sync {
    async fn call(&self, call: ServiceCall) -> Result<Value, ServiceCallError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
/// Media reference resolved by the conversation agent.
pub struct MediaQueryResult {
    pub media_id: Option<String>,
    pub media_type: Option<String>,
}

/// `agent_id` is always present (null when unresolved); `text` only with a query.
pub fn build_conversation_payload(
    agent_id: Option<&str>,
    query: Option<&str>,
) -> Map<String, Value> {
    let mut data = Map::new();
    data.insert(
        ATTR_AGENT_ID.to_string(),
        agent_id.map_or(Value::Null, |id| Value::String(id.to_string())),
    );
    if let Some(query) = query {
        data.insert(ATTR_TEXT.to_string(), Value::String(query.to_string()));
    }
    data
}

pub fn conversation_process_call(data: Map<String, Value>, context: &IntentContext) -> ServiceCall {
    ServiceCall {
        domain: CONVERSATION_DOMAIN.to_string(),
        service: CONVERSATION_SERVICE_PROCESS.to_string(),
        data,
        blocking: true,
        return_response: true,
        context: context.clone(),
    }
}

/// Pulls `response.speech.plain.speech` out of a conversation reply.
pub fn extract_plain_speech(reply: &Value) -> IntentResult<&str> {
    reply
        .pointer("/response/speech/plain/speech")
        .ok_or_else(|| {
            IntentError::MalformedServiceResponse(
                "missing response.speech.plain.speech".to_string(),
            )
        })?
        .as_str()
        .ok_or_else(|| {
            IntentError::MalformedServiceResponse(
                "response.speech.plain.speech is not a string".to_string(),
            )
        })
}

/// Decodes the JSON document the agent embeds in its spoken reply.
pub fn decode_media_query(speech: &str) -> IntentResult<MediaQueryResult> {
    let payload: Map<String, Value> = serde_json::from_str(speech)?;
    let field = |key: &str| payload.get(key).and_then(Value::as_str).map(str::to_string);
    Ok(MediaQueryResult {
        media_id: field(ATTR_MEDIA_ID),
        media_type: field(ATTR_MEDIA_TYPE),
    })
}

pub async fn query_media(
    caller: &dyn ServiceCaller,
    agent_id: Option<&str>,
    query: Option<&str>,
    context: &IntentContext,
) -> IntentResult<MediaQueryResult> {
    let data = build_conversation_payload(agent_id, query);
    tracing::debug!(
        context_id = %context.id,
        agent_id = agent_id.unwrap_or("<none>"),
        has_text = query.is_some(),
        "calling conversation.process"
    );
    let reply = caller.call(conversation_process_call(data, context)).await?;
    let result = decode_media_query(extract_plain_speech(&reply)?)?;
    tracing::debug!(
        context_id = %context.id,
        media_id = result.media_id.as_deref().unwrap_or("<none>"),
        media_type = result.media_type.as_deref().unwrap_or("<none>"),
        "decoded media query result"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        build_conversation_payload, decode_media_query, extract_plain_speech, query_media,
        MediaQueryResult,
    };
    use crate::intent::IntentContext;
    use crate::memory::{conversation_reply, ScriptedConversation};

    #[test]
    fn unit_payload_omits_text_without_query() {
        let data = build_conversation_payload(Some("agent-1"), None);
        assert_eq!(serde_json::Value::Object(data), json!({"agent_id": "agent-1"}));
    }

    #[test]
    fn unit_payload_sends_null_agent_id_when_unresolved() {
        let data = build_conversation_payload(None, Some("play jazz"));
        assert_eq!(
            serde_json::Value::Object(data),
            json!({"agent_id": null, "text": "play jazz"})
        );
    }

    #[test]
    fn unit_decode_extracts_media_fields() {
        let result =
            decode_media_query(r#"{"media_id": "abc", "media_type": "track"}"#).expect("decode");
        assert_eq!(
            result,
            MediaQueryResult {
                media_id: Some("abc".to_string()),
                media_type: Some("track".to_string()),
            }
        );
    }

    #[test]
    fn unit_decode_treats_missing_fields_as_none() {
        let result = decode_media_query(r#"{"media_id": "abc"}"#).expect("decode");
        assert_eq!(result.media_id.as_deref(), Some("abc"));
        assert_eq!(result.media_type, None);
    }

    #[test]
    fn regression_decode_fails_on_non_json_speech() {
        let error = decode_media_query("Sorry, I could not find that.").expect_err("must fail");
        assert_eq!(error.code(), "intent_invalid_query_payload");
    }

    #[test]
    fn regression_extract_rejects_reply_without_plain_speech() {
        let error = extract_plain_speech(&json!({"response": {"speech": {}}}))
            .expect_err("missing speech");
        assert_eq!(error.code(), "intent_malformed_service_response");
    }

    #[tokio::test]
    async fn functional_query_media_forwards_context_and_blocking_flags() {
        let conversation = ScriptedConversation::with_default_reply(conversation_reply(
            r#"{"media_id": "library://track/1", "media_type": "track"}"#,
        ));
        let context = IntentContext::new("ctx-42");
        let result = query_media(&conversation, Some("agent-1"), Some("play it"), &context)
            .await
            .expect("query");
        assert_eq!(result.media_id.as_deref(), Some("library://track/1"));

        let calls = conversation.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].domain, "conversation");
        assert_eq!(calls[0].service, "process");
        assert!(calls[0].blocking);
        assert!(calls[0].return_response);
        assert_eq!(calls[0].context.id, "ctx-42");
        assert_eq!(calls[0].data["text"], "play it");
    }
}
