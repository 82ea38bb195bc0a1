use std::sync::Arc;

use async_trait::async_trait;

use crate::areas::{find_area, AreaRegistry};
use crate::config::{HandlerConfig, UnmatchedPlayerPolicy};
use crate::config_entry::{resolve_agent_id, ConfigLookup};
use crate::conversation::{query_media, MediaQueryResult, ServiceCaller};
use crate::error::{IntentError, IntentResult};
use crate::intent::{Intent, IntentHandler, IntentRegistry, IntentResponse, IntentResponseType};
use crate::players::{
    find_player_by_name, find_player_in_area, MassPlayer, MediaControlClient, PlayMediaOptions,
    Player,
};
use crate::slots::{PlayMediaSlots, PLAY_MEDIA_SLOT_SCHEMA};

pub const INTENT_PLAY_MEDIA_ON_MEDIA_PLAYER: &str = "MassPlayMediaOnMediaPlayerNameEn";

#[derive(Clone)]
/// Host collaborators the play-media handler talks to.
pub struct IntentDeps {
    pub config_entries: Arc<dyn ConfigLookup>,
    pub services: Arc<dyn ServiceCaller>,
    pub media: Arc<dyn MediaControlClient>,
    pub areas: Arc<dyn AreaRegistry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TargetPlayer {
    ByName(Player),
    InArea { player: Player, area_name: String },
}

impl TargetPlayer {
    fn player(&self) -> &Player {
        match self {
            Self::ByName(player) | Self::InArea { player, .. } => player,
        }
    }

    fn confirmation(&self) -> String {
        match self {
            Self::ByName(player) => format!("Playing selection on {}", player.name),
            Self::InArea { area_name, .. } => format!("Playing selection in {area_name}"),
        }
    }
}

/// Plays the agent-resolved media on a player picked by name or area.
pub struct PlayMediaOnMediaPlayerHandler {
    deps: IntentDeps,
    config: HandlerConfig,
}

impl PlayMediaOnMediaPlayerHandler {
    pub fn new(deps: IntentDeps, config: HandlerConfig) -> Self {
        Self { deps, config }
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    async fn resolve_target(&self, slots: &PlayMediaSlots) -> IntentResult<TargetPlayer> {
        if let Some(name) = slots.name.as_deref() {
            let players = self.deps.media.get_players().await?;
            tracing::debug!(
                roster_size = players.len(),
                requested_name = name,
                "fetched player roster"
            );
            return find_player_by_name(&players, name)
                .cloned()
                .map(TargetPlayer::ByName)
                .ok_or_else(|| IntentError::NoPlayerMatchingName(name.to_string()));
        }

        if let Some(area_name) = slots.area.as_deref() {
            let areas = self.deps.areas.areas().await;
            let area = find_area(&areas, area_name)
                .ok_or_else(|| IntentError::NoAreaNamed(area_name.to_string()))?;
            let players = self.deps.media.get_players().await?;
            tracing::debug!(
                roster_size = players.len(),
                area_id = %area.id,
                "fetched player roster"
            );
            return find_player_in_area(&players, &area.id)
                .cloned()
                .map(|player| TargetPlayer::InArea {
                    player,
                    area_name: area.name.clone(),
                })
                .ok_or_else(|| IntentError::NoPlayerInArea(area_name.to_string()));
        }

        Err(IntentError::NoTargetPlayer)
    }

    fn unmatched_response(
        &self,
        intent: &Intent,
        error: IntentError,
    ) -> IntentResult<IntentResponse> {
        tracing::warn!(
            context_id = %intent.context.id,
            reason_code = error.code(),
            policy = self.config.unmatched_player.as_str(),
            "no media player selected; playback skipped"
        );
        match self.config.unmatched_player {
            UnmatchedPlayerPolicy::Fail => Err(error),
            UnmatchedPlayerPolicy::Respond => {
                let mut response = intent.create_response();
                response.response_type = IntentResponseType::Error;
                response.set_speech(error.to_string());
                Ok(response)
            }
        }
    }

    async fn dispatch(&self, target: &TargetPlayer, media: &MediaQueryResult) -> IntentResult<()> {
        let player = MassPlayer::new(self.deps.media.as_ref(), target.player().player_id.clone());
        player
            .play_media(
                media.media_id.as_deref(),
                media.media_type.as_deref(),
                PlayMediaOptions {
                    radio_mode: self.config.radio_mode,
                },
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl IntentHandler for PlayMediaOnMediaPlayerHandler {
    fn intent_type(&self) -> &str {
        INTENT_PLAY_MEDIA_ON_MEDIA_PLAYER
    }

    fn slot_schema(&self) -> &'static [&'static str] {
        PLAY_MEDIA_SLOT_SCHEMA
    }

    async fn handle(&self, intent: &Intent) -> IntentResult<IntentResponse> {
        let slots = PlayMediaSlots::from_raw(&intent.slots)?;

        let agent_id = resolve_agent_id(
            self.deps.config_entries.as_ref(),
            &self.config.domain,
            &self.config.agent_id_key,
        )
        .await;
        if agent_id.is_none() {
            tracing::warn!(
                domain = %self.config.domain,
                context_id = %intent.context.id,
                "no loaded config entry provides a conversation agent id"
            );
        }

        let media = query_media(
            self.deps.services.as_ref(),
            agent_id.as_deref(),
            slots.query.as_deref(),
            &intent.context,
        )
        .await?;

        let target = match self.resolve_target(&slots).await {
            Ok(target) => target,
            Err(
                error @ (IntentError::NoPlayerMatchingName(_)
                | IntentError::NoAreaNamed(_)
                | IntentError::NoPlayerInArea(_)
                | IntentError::NoTargetPlayer),
            ) => return self.unmatched_response(intent, error),
            Err(error) => return Err(error),
        };

        self.dispatch(&target, &media).await?;
        tracing::debug!(
            context_id = %intent.context.id,
            player_id = %target.player().player_id,
            "play_media dispatched"
        );

        let mut response = intent.create_response();
        response.response_type = IntentResponseType::ActionDone;
        response.set_speech(target.confirmation());
        Ok(response)
    }
}

/// Registers the play-media handler with `registry`.
pub fn async_setup_intents(
    registry: &mut IntentRegistry,
    deps: IntentDeps,
    config: HandlerConfig,
) -> IntentResult<()> {
    registry.register(Arc::new(PlayMediaOnMediaPlayerHandler::new(deps, config)))
}
