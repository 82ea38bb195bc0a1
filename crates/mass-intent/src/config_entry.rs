use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const MASS_DOMAIN: &str = "mass";
pub const CONF_OPENAI_AGENT_ID: &str = "openai_agent_id";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Lifecycle state of a config entry.
pub enum ConfigEntryState {
    NotLoaded,
    SetupInProgress,
    Loaded,
    SetupError,
    SetupRetry,
    FailedUnload,
}

impl ConfigEntryState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotLoaded => "not_loaded",
            Self::SetupInProgress => "setup_in_progress",
            Self::Loaded => "loaded",
            Self::SetupError => "setup_error",
            Self::SetupRetry => "setup_retry",
            Self::FailedUnload => "failed_unload",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigEntry {
    pub entry_id: String,
    pub domain: String,
    pub state: ConfigEntryState,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl ConfigEntry {
    pub fn data_string(&self, key: &str) -> Option<String> {
        self.data
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

#[async_trait]
/// Read access to the host's config-entry store.
pub trait ConfigLookup: Send + Sync {
    async fn entries_for_domain(&self, domain: &str) -> Vec<ConfigEntry>;
}

/// Returns the first `Loaded` entry for `domain`, if any.
pub async fn loaded_config_entry(lookup: &dyn ConfigLookup, domain: &str) -> Option<ConfigEntry> {
    lookup
        .entries_for_domain(domain)
        .await
        .into_iter()
        .find(|entry| entry.state == ConfigEntryState::Loaded)
}

/// Resolves the conversation agent id from the first loaded entry only.
pub async fn resolve_agent_id(
    lookup: &dyn ConfigLookup,
    domain: &str,
    agent_id_key: &str,
) -> Option<String> {
    let entry = loaded_config_entry(lookup, domain).await?;
    let agent_id = entry.data_string(agent_id_key);
    tracing::debug!(
        entry_id = %entry.entry_id,
        agent_id_key = agent_id_key,
        agent_id_present = agent_id.is_some(),
        "resolved loaded config entry"
    );
    agent_id
}
