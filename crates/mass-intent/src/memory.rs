//! In-memory collaborators for replay fixtures and tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::areas::{Area, AreaRegistry};
use crate::config_entry::{ConfigEntry, ConfigEntryState, ConfigLookup, MASS_DOMAIN};
use crate::conversation::{ServiceCall, ServiceCaller, ATTR_TEXT};
use crate::error::{MediaControlError, ServiceCallError};
use crate::handler::IntentDeps;
use crate::players::{MediaControlClient, PlayMediaOptions, Player};

/// Builds a `mass` config entry; non-object `data` is treated as empty.
pub fn config_entry(entry_id: &str, state: ConfigEntryState, data: Value) -> ConfigEntry {
    ConfigEntry {
        entry_id: entry_id.to_string(),
        domain: MASS_DOMAIN.to_string(),
        state,
        data: match data {
            Value::Object(map) => map,
            _ => Default::default(),
        },
    }
}

/// Wraps `speech` in the reply shape returned by `conversation.process`.
pub fn conversation_reply(speech: &str) -> Value {
    json!({
        "response": {
            "response_type": "action_done",
            "speech": {"plain": {"speech": speech, "extra_data": null}}
        },
        "conversation_id": null
    })
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryConfigEntries {
    entries: Vec<ConfigEntry>,
}

impl InMemoryConfigEntries {
    pub fn new(entries: Vec<ConfigEntry>) -> Self {
        Self { entries }
    }
}

#[async_trait]
impl ConfigLookup for InMemoryConfigEntries {
    async fn entries_for_domain(&self, domain: &str) -> Vec<ConfigEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.domain == domain)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
/// Answers `conversation.process` from canned replies keyed by query text.
pub struct ScriptedConversation {
    replies: BTreeMap<String, Value>,
    default_reply: Option<Value>,
    failure: Option<String>,
    calls: Arc<Mutex<Vec<ServiceCall>>>,
}

impl ScriptedConversation {
    pub fn with_default_reply(reply: Value) -> Self {
        Self {
            default_reply: Some(reply),
            ..Self::default()
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_reply(mut self, text: impl Into<String>, reply: Value) -> Self {
        self.replies.insert(text.into(), reply);
        self
    }

    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ServiceCaller for ScriptedConversation {
    async fn call(&self, call: ServiceCall) -> Result<Value, ServiceCallError> {
        let domain = call.domain.clone();
        let service = call.service.clone();
        let text = call
            .data
            .get(ATTR_TEXT)
            .and_then(Value::as_str)
            .map(str::to_string);
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);

        if let Some(message) = &self.failure {
            return Err(ServiceCallError::new(domain, service, message.clone()));
        }
        text.and_then(|text| self.replies.get(&text).cloned())
            .or_else(|| self.default_reply.clone())
            .ok_or_else(|| ServiceCallError::new(domain, service, "no scripted reply"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// A `play_media` command observed by `InMemoryMediaControl`.
pub struct PlayedMedia {
    pub player_id: String,
    pub media_id: Option<String>,
    pub media_type: Option<String>,
    #[serde(default)]
    pub radio_mode: bool,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryMediaControl {
    players: Vec<Player>,
    connected: bool,
    rejected_players: Vec<String>,
    roster_fetches: Arc<AtomicUsize>,
    played: Arc<Mutex<Vec<PlayedMedia>>>,
}

impl InMemoryMediaControl {
    pub fn new(players: Vec<Player>) -> Self {
        Self {
            players,
            connected: true,
            ..Self::default()
        }
    }

    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn rejecting(mut self, player_id: impl Into<String>) -> Self {
        self.rejected_players.push(player_id.into());
        self
    }

    pub fn roster_fetches(&self) -> usize {
        self.roster_fetches.load(Ordering::SeqCst)
    }

    pub fn played(&self) -> Vec<PlayedMedia> {
        self.played
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl MediaControlClient for InMemoryMediaControl {
    async fn get_players(&self) -> Result<Vec<Player>, MediaControlError> {
        self.roster_fetches.fetch_add(1, Ordering::SeqCst);
        if !self.connected {
            return Err(MediaControlError::NotConnected);
        }
        Ok(self.players.clone())
    }

    async fn play_media(
        &self,
        player_id: &str,
        media_id: Option<&str>,
        media_type: Option<&str>,
        options: PlayMediaOptions,
    ) -> Result<(), MediaControlError> {
        if !self.connected {
            return Err(MediaControlError::NotConnected);
        }
        if self.rejected_players.iter().any(|id| id == player_id) {
            return Err(MediaControlError::PlaybackRejected {
                player_id: player_id.to_string(),
                message: "player unavailable".to_string(),
            });
        }
        self.played
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(PlayedMedia {
                player_id: player_id.to_string(),
                media_id: media_id.map(str::to_string),
                media_type: media_type.map(str::to_string),
                radio_mode: options.radio_mode,
            });
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryAreas {
    areas: Vec<Area>,
}

impl InMemoryAreas {
    pub fn new(areas: Vec<Area>) -> Self {
        Self { areas }
    }
}

#[async_trait]
impl AreaRegistry for InMemoryAreas {
    async fn areas(&self) -> Vec<Area> {
        self.areas.clone()
    }
}

#[derive(Debug, Clone, Default)]
/// One set of in-memory collaborators whose recorded calls stay inspectable.
pub struct InMemoryWorld {
    pub config_entries: InMemoryConfigEntries,
    pub conversation: ScriptedConversation,
    pub media: InMemoryMediaControl,
    pub areas: InMemoryAreas,
}

impl InMemoryWorld {
    pub fn deps(&self) -> IntentDeps {
        IntentDeps {
            config_entries: Arc::new(self.config_entries.clone()),
            services: Arc::new(self.conversation.clone()),
            media: Arc::new(self.media.clone()),
            areas: Arc::new(self.areas.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{conversation_reply, InMemoryMediaControl, ScriptedConversation};
    use crate::conversation::{build_conversation_payload, conversation_process_call, ServiceCaller};
    use crate::intent::IntentContext;
    use crate::players::{MediaControlClient, PlayMediaOptions, Player};

    #[tokio::test]
    async fn unit_scripted_conversation_prefers_reply_keyed_by_text() {
        let conversation = ScriptedConversation::with_default_reply(conversation_reply("{}"))
            .with_reply("jazz", conversation_reply(r#"{"media_id": "jazz"}"#));
        let call = conversation_process_call(
            build_conversation_payload(None, Some("jazz")),
            &IntentContext::default(),
        );
        let reply = conversation.call(call).await.expect("reply");
        assert_eq!(
            reply.pointer("/response/speech/plain/speech"),
            Some(&json!(r#"{"media_id": "jazz"}"#))
        );
        assert_eq!(conversation.calls().len(), 1);
    }

    #[tokio::test]
    async fn unit_disconnected_media_control_fails_roster_fetch() {
        let media = InMemoryMediaControl::disconnected();
        assert!(media.get_players().await.is_err());
        assert_eq!(media.roster_fetches(), 1);
    }

    #[tokio::test]
    async fn unit_clones_share_recorded_playback() {
        let media = InMemoryMediaControl::new(vec![Player::new("p1", "One")]);
        let handle = media.clone();
        handle
            .play_media("p1", Some("id"), None, PlayMediaOptions::default())
            .await
            .expect("play");
        assert_eq!(media.played().len(), 1);
    }
}
