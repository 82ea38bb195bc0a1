use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{IntentError, IntentResult};

pub const DEFAULT_INTENT_LANGUAGE: &str = "en";

fn default_intent_language() -> String {
    DEFAULT_INTENT_LANGUAGE.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Raw slot value as recognized by the front-end, before validation.
pub struct SlotValue {
    pub value: Value,
}

impl SlotValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            value: Value::String(value.into()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
/// Correlation token forwarded to downstream service calls.
pub struct IntentContext {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl IntentContext {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// One recognized utterance addressed to a named intent type.
pub struct Intent {
    pub intent_type: String,
    #[serde(default)]
    pub slots: BTreeMap<String, SlotValue>,
    #[serde(default)]
    pub context: IntentContext,
    #[serde(default = "default_intent_language")]
    pub language: String,
}

impl Intent {
    pub fn new(intent_type: impl Into<String>, context: IntentContext) -> Self {
        Self {
            intent_type: intent_type.into(),
            slots: BTreeMap::new(),
            context,
            language: default_intent_language(),
        }
    }

    pub fn with_slot(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.slots.insert(name.into(), SlotValue::text(value));
        self
    }

    pub fn create_response(&self) -> IntentResponse {
        IntentResponse {
            response_type: IntentResponseType::ActionDone,
            speech: None,
            language: self.language.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `IntentResponseType` values.
pub enum IntentResponseType {
    ActionDone,
    Error,
}

impl IntentResponseType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ActionDone => "action_done",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntentResponse {
    pub response_type: IntentResponseType,
    pub speech: Option<String>,
    pub language: String,
}

impl IntentResponse {
    pub fn set_speech(&mut self, speech: impl Into<String>) {
        self.speech = Some(speech.into());
    }
}

#[async_trait]
/// Trait contract for `IntentHandler` behavior.
pub trait IntentHandler: Send + Sync {
    fn intent_type(&self) -> &str;

    /// Slot names accepted by this handler; every slot is optional.
    fn slot_schema(&self) -> &'static [&'static str];

    async fn handle(&self, intent: &Intent) -> IntentResult<IntentResponse>;
}

#[derive(Default, Clone)]
/// Maps intent types to their handlers.
pub struct IntentRegistry {
    handlers: BTreeMap<String, Arc<dyn IntentHandler>>,
}

impl IntentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn IntentHandler>) -> IntentResult<()> {
        let intent_type = handler.intent_type().to_string();
        if self.handlers.contains_key(&intent_type) {
            return Err(IntentError::DuplicateIntent(intent_type));
        }
        tracing::debug!(
            intent_type = %intent_type,
            slots = ?handler.slot_schema(),
            "registered intent handler"
        );
        self.handlers.insert(intent_type, handler);
        Ok(())
    }

    pub fn intent_types(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    pub async fn handle(&self, intent: &Intent) -> IntentResult<IntentResponse> {
        let handler = self
            .handlers
            .get(&intent.intent_type)
            .ok_or_else(|| IntentError::UnknownIntent(intent.intent_type.clone()))?;
        handler.handle(intent).await
    }
}
