use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MediaControlError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// A player currently connected to the media-control service.
pub struct Player {
    pub player_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl Player {
    pub fn new(player_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            name: name.into(),
            area_id: None,
            aliases: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayMediaOptions {
    pub radio_mode: bool,
}

#[async_trait]
/// Trait contract for `MediaControlClient` behavior.
pub trait MediaControlClient: Send + Sync {
    async fn get_players(&self) -> Result<Vec<Player>, MediaControlError>;

    async fn play_media(
        &self,
        player_id: &str,
        media_id: Option<&str>,
        media_type: Option<&str>,
        options: PlayMediaOptions,
    ) -> Result<(), MediaControlError>;
}

/// Command wrapper addressing one player through a media-control client.
pub struct MassPlayer<'a> {
    client: &'a dyn MediaControlClient,
    player_id: String,
}

impl<'a> MassPlayer<'a> {
    pub fn new(client: &'a dyn MediaControlClient, player_id: impl Into<String>) -> Self {
        Self {
            client,
            player_id: player_id.into(),
        }
    }

    pub async fn play_media(
        &self,
        media_id: Option<&str>,
        media_type: Option<&str>,
        options: PlayMediaOptions,
    ) -> Result<(), MediaControlError> {
        tracing::debug!(
            player_id = %self.player_id,
            media_id = media_id.unwrap_or("<none>"),
            media_type = media_type.unwrap_or("<none>"),
            radio_mode = options.radio_mode,
            "dispatching play_media"
        );
        self.client
            .play_media(&self.player_id, media_id, media_type, options)
            .await
    }
}

/// Unicode lowercase mapping. Not full case folding: "ß" and "SS" stay distinct.
pub fn casefold(value: &str) -> String {
    value.to_lowercase()
}

/// Exact case-insensitive name match first; aliases only when no name matches.
pub fn find_player_by_name<'p>(players: &'p [Player], name: &str) -> Option<&'p Player> {
    let wanted = casefold(name);
    players
        .iter()
        .find(|player| casefold(&player.name) == wanted)
        .or_else(|| {
            players.iter().find(|player| {
                player
                    .aliases
                    .iter()
                    .any(|alias| casefold(alias) == wanted)
            })
        })
}

pub fn find_player_in_area<'p>(players: &'p [Player], area_id: &str) -> Option<&'p Player> {
    players
        .iter()
        .find(|player| player.area_id.as_deref() == Some(area_id))
}

#[cfg(test)]
mod tests {
    use super::{casefold, find_player_by_name, find_player_in_area, Player};

    fn roster() -> Vec<Player> {
        let mut patio = Player::new("p-patio", "Patio Speaker");
        patio.aliases = vec!["Kitchen".to_string(), "Garden".to_string()];
        patio.area_id = Some("outside".to_string());
        let mut kitchen = Player::new("p-kitchen", "Kitchen");
        kitchen.area_id = Some("kitchen".to_string());
        vec![patio, kitchen, Player::new("p-kitchen-2", "kitchen")]
    }

    #[test]
    fn unit_name_match_is_case_insensitive() {
        let players = roster();
        for requested in ["kitchen", "KITCHEN", "Kitchen"] {
            let player = find_player_by_name(&players, requested).expect("match");
            assert_eq!(player.player_id, "p-kitchen");
        }
    }

    #[test]
    fn regression_name_match_requires_exact_equality_after_lowercasing() {
        let players = roster();
        assert!(find_player_by_name(&players, "  kitchen  ").is_none());
        assert!(find_player_by_name(&players, "kitchen ").is_none());
        assert!(find_player_by_name(&players, "kitch").is_none());
    }

    #[test]
    fn regression_alias_never_beats_exact_name_match() {
        let players = roster();
        let player = find_player_by_name(&players, "kitchen").expect("match");
        assert_eq!(player.player_id, "p-kitchen");
    }

    #[test]
    fn unit_alias_is_used_when_no_name_matches() {
        let players = roster();
        let player = find_player_by_name(&players, "garden").expect("alias match");
        assert_eq!(player.player_id, "p-patio");
    }

    #[test]
    fn unit_unknown_name_matches_nothing() {
        assert!(find_player_by_name(&roster(), "bedroom").is_none());
        assert!(find_player_by_name(&[], "kitchen").is_none());
    }

    #[test]
    fn unit_area_match_returns_first_player_in_area() {
        let players = roster();
        assert_eq!(
            find_player_in_area(&players, "outside").map(|player| player.player_id.as_str()),
            Some("p-patio")
        );
        assert!(find_player_in_area(&players, "attic").is_none());
    }

    #[test]
    fn unit_casefold_lowercases_without_trimming() {
        assert_eq!(casefold("Living ROOM"), "living room");
        assert_eq!(casefold(" Den "), " den ");
    }
}
