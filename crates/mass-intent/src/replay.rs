use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::areas::Area;
use crate::config::{validate_handler_config, HandlerConfig};
use crate::config_entry::ConfigEntry;
use crate::handler::{async_setup_intents, INTENT_PLAY_MEDIA_ON_MEDIA_PLAYER};
use crate::intent::{Intent, IntentContext, IntentRegistry, IntentResponseType, SlotValue};
use crate::memory::{
    conversation_reply, InMemoryAreas, InMemoryConfigEntries, InMemoryMediaControl,
    InMemoryWorld, PlayedMedia, ScriptedConversation,
};
use crate::players::Player;

pub const REPLAY_FIXTURE_SCHEMA_VERSION: u32 = 1;

fn default_intent_type() -> String {
    INTENT_PLAY_MEDIA_ON_MEDIA_PLAYER.to_string()
}

fn default_connected() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReplayOutcome {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplayExpectation {
    pub outcome: ReplayOutcome,
    #[serde(default)]
    pub error_code: String,
    #[serde(default)]
    pub response_type: Option<IntentResponseType>,
    #[serde(default)]
    pub speech: Option<String>,
    #[serde(default)]
    pub played: Vec<PlayedMedia>,
    #[serde(default)]
    pub roster_fetched: Option<bool>,
    /// Exact `conversation.process` data, checked when present.
    #[serde(default)]
    pub sent_payload: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplayCase {
    pub case_id: String,
    #[serde(default = "default_intent_type")]
    pub intent_type: String,
    #[serde(default)]
    pub slots: BTreeMap<String, Value>,
    #[serde(default)]
    pub handler_config: Option<HandlerConfig>,
    pub expected: ReplayExpectation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Collaborator state plus the cases replayed against it.
pub struct ReplayFixture {
    pub schema_version: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config_entries: Vec<ConfigEntry>,
    #[serde(default)]
    pub areas: Vec<Area>,
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default = "default_connected")]
    pub media_connected: bool,
    /// Agent speech strings keyed by query text.
    #[serde(default)]
    pub agent_replies: BTreeMap<String, String>,
    #[serde(default)]
    pub default_reply: Option<String>,
    #[serde(default)]
    pub conversation_failure: Option<String>,
    pub cases: Vec<ReplayCase>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ReplaySummary {
    pub fixture: String,
    pub discovered_cases: usize,
    pub success_cases: usize,
    pub error_cases: usize,
    pub played_commands: usize,
}

#[derive(Debug, Clone, PartialEq)]
struct ReplayCaseResult {
    outcome: ReplayOutcome,
    error_code: Option<String>,
    response_type: Option<IntentResponseType>,
    speech: Option<String>,
    played: Vec<PlayedMedia>,
    roster_fetches: usize,
    sent_payload: Option<Value>,
}

pub fn parse_replay_fixture(raw: &str) -> Result<ReplayFixture> {
    let fixture =
        serde_json::from_str::<ReplayFixture>(raw).context("failed to parse replay fixture")?;
    validate_replay_fixture(&fixture)?;
    Ok(fixture)
}

pub fn load_replay_fixture(path: &Path) -> Result<ReplayFixture> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read fixture {}", path.display()))?;
    parse_replay_fixture(&raw).with_context(|| format!("invalid fixture {}", path.display()))
}

pub fn validate_replay_fixture(fixture: &ReplayFixture) -> Result<()> {
    if fixture.schema_version != REPLAY_FIXTURE_SCHEMA_VERSION {
        bail!(
            "unsupported replay fixture schema version {} (expected {})",
            fixture.schema_version,
            REPLAY_FIXTURE_SCHEMA_VERSION
        );
    }
    if fixture.name.trim().is_empty() {
        bail!("fixture name cannot be empty");
    }
    if fixture.cases.is_empty() {
        bail!("fixture must include at least one case");
    }

    let mut case_ids = HashSet::new();
    for (index, case) in fixture.cases.iter().enumerate() {
        let case_id = case.case_id.trim();
        if case_id.is_empty() {
            bail!("fixture case index {} has empty case_id", index);
        }
        if !case_ids.insert(case_id.to_string()) {
            bail!("fixture contains duplicate case_id '{}'", case_id);
        }
        if let Some(config) = &case.handler_config {
            validate_handler_config(config)
                .with_context(|| format!("fixture case '{}' has invalid handler_config", case_id))?;
        }
        match case.expected.outcome {
            ReplayOutcome::Success => {
                if !case.expected.error_code.trim().is_empty() {
                    bail!(
                        "fixture case '{}' expects success but sets error_code",
                        case_id
                    );
                }
            }
            ReplayOutcome::Error => {
                if case.expected.error_code.trim().is_empty() {
                    bail!("fixture case '{}' expects error without error_code", case_id);
                }
                if !case.expected.played.is_empty() {
                    bail!(
                        "fixture case '{}' expects error but lists played media",
                        case_id
                    );
                }
            }
        }
    }
    Ok(())
}

fn build_world(fixture: &ReplayFixture) -> InMemoryWorld {
    let mut conversation = match (&fixture.conversation_failure, &fixture.default_reply) {
        (Some(message), _) => ScriptedConversation::failing(message.clone()),
        (None, Some(speech)) => ScriptedConversation::with_default_reply(conversation_reply(speech)),
        (None, None) => ScriptedConversation::default(),
    };
    for (text, speech) in &fixture.agent_replies {
        conversation = conversation.with_reply(text.clone(), conversation_reply(speech));
    }

    InMemoryWorld {
        config_entries: InMemoryConfigEntries::new(fixture.config_entries.clone()),
        conversation,
        media: if fixture.media_connected {
            InMemoryMediaControl::new(fixture.players.clone())
        } else {
            InMemoryMediaControl::disconnected()
        },
        areas: InMemoryAreas::new(fixture.areas.clone()),
    }
}

async fn run_replay_case(
    fixture: &ReplayFixture,
    case: &ReplayCase,
    base_config: &HandlerConfig,
) -> Result<ReplayCaseResult> {
    let world = build_world(fixture);
    let config = case
        .handler_config
        .clone()
        .unwrap_or_else(|| base_config.clone());
    let mut registry = IntentRegistry::new();
    async_setup_intents(&mut registry, world.deps(), config)
        .context("failed to register intent handlers")?;

    let mut intent = Intent::new(
        case.intent_type.clone(),
        IntentContext::new(format!("replay-{}", case.case_id.trim())),
    );
    intent.slots = case
        .slots
        .iter()
        .map(|(name, value)| {
            (
                name.clone(),
                SlotValue {
                    value: value.clone(),
                },
            )
        })
        .collect();

    let handled = registry.handle(&intent).await;
    let sent_payload = world
        .conversation
        .calls()
        .first()
        .map(|call| Value::Object(call.data.clone()));
    let (outcome, error_code, response_type, speech) = match handled {
        Ok(response) => (
            ReplayOutcome::Success,
            None,
            Some(response.response_type),
            response.speech,
        ),
        Err(error) => {
            tracing::debug!(
                case_id = %case.case_id,
                reason_code = error.code(),
                error = %error,
                "replay case failed"
            );
            (
                ReplayOutcome::Error,
                Some(error.code().to_string()),
                None,
                None,
            )
        }
    };

    Ok(ReplayCaseResult {
        outcome,
        error_code,
        response_type,
        speech,
        played: world.media.played(),
        roster_fetches: world.media.roster_fetches(),
        sent_payload,
    })
}

fn validate_replay_case_result(case: &ReplayCase, result: &ReplayCaseResult) -> Result<()> {
    let expected = &case.expected;
    if result.outcome != expected.outcome {
        bail!(
            "case '{}' expected outcome {:?} but observed {:?} (error_code={:?})",
            case.case_id,
            expected.outcome,
            result.outcome,
            result.error_code
        );
    }
    if expected.outcome == ReplayOutcome::Error
        && result.error_code.as_deref() != Some(expected.error_code.trim())
    {
        bail!(
            "case '{}' expected error_code '{}' but observed {:?}",
            case.case_id,
            expected.error_code,
            result.error_code
        );
    }
    if let Some(response_type) = expected.response_type {
        if result.response_type != Some(response_type) {
            bail!(
                "case '{}' expected response_type '{}' but observed {:?}",
                case.case_id,
                response_type.as_str(),
                result.response_type
            );
        }
    }
    if expected.speech.is_some() && result.speech != expected.speech {
        bail!(
            "case '{}' expected speech {:?} but observed {:?}",
            case.case_id,
            expected.speech,
            result.speech
        );
    }
    if result.played != expected.played {
        bail!(
            "case '{}' expected played {:?} but observed {:?}",
            case.case_id,
            expected.played,
            result.played
        );
    }
    if let Some(roster_fetched) = expected.roster_fetched {
        if (result.roster_fetches > 0) != roster_fetched {
            bail!(
                "case '{}' expected roster_fetched={} but observed {} fetches",
                case.case_id,
                roster_fetched,
                result.roster_fetches
            );
        }
    }
    if let Some(payload) = &expected.sent_payload {
        if result.sent_payload.as_ref() != Some(payload) {
            bail!(
                "case '{}' expected sent_payload {} but observed {:?}",
                case.case_id,
                payload,
                result.sent_payload
            );
        }
    }
    Ok(())
}

/// Replays every case against fresh collaborators; stops at the first mismatch.
pub async fn run_replay_fixture(
    fixture: &ReplayFixture,
    base_config: &HandlerConfig,
) -> Result<ReplaySummary> {
    validate_replay_fixture(fixture)?;
    let mut summary = ReplaySummary {
        fixture: fixture.name.clone(),
        discovered_cases: fixture.cases.len(),
        ..ReplaySummary::default()
    };

    for case in &fixture.cases {
        let result = run_replay_case(fixture, case, base_config).await?;
        validate_replay_case_result(case, &result)?;
        match result.outcome {
            ReplayOutcome::Success => summary.success_cases = summary.success_cases.saturating_add(1),
            ReplayOutcome::Error => summary.error_cases = summary.error_cases.saturating_add(1),
        }
        summary.played_commands = summary.played_commands.saturating_add(result.played.len());
    }

    tracing::debug!(
        fixture = %summary.fixture,
        discovered_cases = summary.discovered_cases,
        success_cases = summary.success_cases,
        error_cases = summary.error_cases,
        played_commands = summary.played_commands,
        "completed replay fixture"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use serde_json::json;

    use super::{load_replay_fixture, parse_replay_fixture, run_replay_fixture};
    use crate::config::HandlerConfig;

    fn fixture_path(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("testdata")
            .join("replay")
            .join(name)
    }

    fn minimal_fixture(cases: serde_json::Value) -> String {
        json!({
            "schema_version": 1,
            "name": "minimal",
            "players": [{"player_id": "p1", "name": "Den"}],
            "default_reply": "{\"media_id\": \"m1\", \"media_type\": \"album\"}",
            "cases": cases
        })
        .to_string()
    }

    #[tokio::test]
    async fn functional_bundled_fixture_replays_cleanly() {
        let fixture = load_replay_fixture(&fixture_path("play-media.json")).expect("fixture");
        let summary = run_replay_fixture(&fixture, &HandlerConfig::default())
            .await
            .expect("replay");
        assert_eq!(summary.discovered_cases, fixture.cases.len());
        assert_eq!(
            summary.success_cases + summary.error_cases,
            summary.discovered_cases
        );
        assert!(summary.played_commands >= 1);
    }

    #[test]
    fn regression_fixture_rejects_duplicate_case_ids() {
        let raw = minimal_fixture(json!([
            {"case_id": "a", "expected": {"outcome": "error", "error_code": "intent_no_target_player"}},
            {"case_id": "a", "expected": {"outcome": "error", "error_code": "intent_no_target_player"}}
        ]));
        let error = parse_replay_fixture(&raw).expect_err("duplicate");
        assert!(error.to_string().contains("duplicate case_id 'a'"));
    }

    #[test]
    fn regression_fixture_rejects_error_case_without_code() {
        let raw = minimal_fixture(json!([
            {"case_id": "a", "expected": {"outcome": "error"}}
        ]));
        assert!(parse_replay_fixture(&raw).is_err());
    }

    #[test]
    fn regression_fixture_rejects_unknown_schema_version() {
        let raw = json!({"schema_version": 9, "name": "x", "cases": []}).to_string();
        let error = parse_replay_fixture(&raw).expect_err("schema");
        assert!(error.to_string().contains("unsupported replay fixture schema version 9"));
    }

    #[tokio::test]
    async fn regression_replay_reports_contract_drift() {
        let raw = minimal_fixture(json!([
            {
                "case_id": "drift",
                "slots": {"name": "den"},
                "expected": {"outcome": "success", "speech": "Playing selection on Attic"}
            }
        ]));
        let fixture = parse_replay_fixture(&raw).expect("fixture");
        let error = run_replay_fixture(&fixture, &HandlerConfig::default())
            .await
            .expect_err("speech drift");
        assert!(error.to_string().contains("expected speech"));
    }

    #[tokio::test]
    async fn integration_replay_counts_played_commands() {
        let raw = minimal_fixture(json!([
            {
                "case_id": "den",
                "slots": {"query": "anything", "name": "DEN"},
                "expected": {
                    "outcome": "success",
                    "response_type": "action_done",
                    "speech": "Playing selection on Den",
                    "played": [{"player_id": "p1", "media_id": "m1", "media_type": "album"}],
                    "roster_fetched": true
                }
            }
        ]));
        let fixture = parse_replay_fixture(&raw).expect("fixture");
        let summary = run_replay_fixture(&fixture, &HandlerConfig::default())
            .await
            .expect("replay");
        assert_eq!(summary.success_cases, 1);
        assert_eq!(summary.played_commands, 1);
    }
}
