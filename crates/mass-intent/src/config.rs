use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::config_entry::{CONF_OPENAI_AGENT_ID, MASS_DOMAIN};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// What the handler does when no player can be selected.
pub enum UnmatchedPlayerPolicy {
    /// Fail the invocation with a typed error.
    #[default]
    Fail,
    /// Answer with an error-typed spoken response instead.
    Respond,
}

impl UnmatchedPlayerPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fail => "fail",
            Self::Respond => "respond",
        }
    }
}

fn default_domain() -> String {
    MASS_DOMAIN.to_string()
}

fn default_agent_id_key() -> String {
    CONF_OPENAI_AGENT_ID.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HandlerConfig {
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default = "default_agent_id_key")]
    pub agent_id_key: String,
    #[serde(default)]
    pub radio_mode: bool,
    #[serde(default)]
    pub unmatched_player: UnmatchedPlayerPolicy,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            agent_id_key: default_agent_id_key(),
            radio_mode: false,
            unmatched_player: UnmatchedPlayerPolicy::default(),
        }
    }
}

pub fn parse_handler_config(raw: &str) -> Result<HandlerConfig> {
    let config =
        toml::from_str::<HandlerConfig>(raw).context("failed to parse handler config")?;
    validate_handler_config(&config)?;
    Ok(config)
}

pub fn load_handler_config(path: &Path) -> Result<HandlerConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read handler config {}", path.display()))?;
    parse_handler_config(&raw)
        .with_context(|| format!("invalid handler config {}", path.display()))
}

pub fn validate_handler_config(config: &HandlerConfig) -> Result<()> {
    if config.domain.trim().is_empty() {
        bail!("handler config domain cannot be empty");
    }
    if config.agent_id_key.trim().is_empty() {
        bail!("handler config agent_id_key cannot be empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::{load_handler_config, parse_handler_config, HandlerConfig, UnmatchedPlayerPolicy};

    #[test]
    fn unit_empty_config_uses_defaults() {
        let config = parse_handler_config("").expect("defaults");
        assert_eq!(config, HandlerConfig::default());
        assert_eq!(config.domain, "mass");
        assert_eq!(config.agent_id_key, "openai_agent_id");
        assert!(!config.radio_mode);
        assert_eq!(config.unmatched_player, UnmatchedPlayerPolicy::Fail);
    }

    #[test]
    fn unit_config_overrides_are_applied() {
        let config = parse_handler_config(
            r#"
radio_mode = true
unmatched_player = "respond"
agent_id_key = "agent"
"#,
        )
        .expect("parse");
        assert!(config.radio_mode);
        assert_eq!(config.unmatched_player, UnmatchedPlayerPolicy::Respond);
        assert_eq!(config.agent_id_key, "agent");
    }

    #[test]
    fn regression_config_rejects_blank_domain_and_unknown_keys() {
        let blank = parse_handler_config("domain = \"  \"").expect_err("blank domain");
        assert!(blank.to_string().contains("domain cannot be empty"));
        assert!(parse_handler_config("retries = 3").is_err());
    }

    #[test]
    fn functional_config_loads_from_file() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("handler.toml");
        std::fs::write(&path, "unmatched_player = \"respond\"\n").expect("write config");
        let config = load_handler_config(&path).expect("load");
        assert_eq!(config.unmatched_player, UnmatchedPlayerPolicy::Respond);

        let missing = load_handler_config(&temp.path().join("missing.toml"))
            .expect_err("missing file");
        assert!(format!("{missing:#}").contains("failed to read handler config"));
    }
}
