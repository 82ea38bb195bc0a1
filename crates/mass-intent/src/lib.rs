//! Voice intent that plays agent-resolved media on a Music Assistant player.
//!
//! The handler asks a conversation agent to turn free text into a media
//! reference, picks a player by spoken name or area, and dispatches playback.
//! Host services are reached through the traits in each module so they can be
//! swapped for the in-memory collaborators in [`memory`].

pub mod areas;
pub mod config;
pub mod config_entry;
pub mod conversation;
pub mod error;
pub mod handler;
pub mod intent;
pub mod memory;
pub mod players;
pub mod replay;
pub mod slots;

pub use config::{load_handler_config, parse_handler_config, HandlerConfig, UnmatchedPlayerPolicy};
pub use error::{IntentError, IntentResult, MediaControlError, ServiceCallError};
pub use handler::{
    async_setup_intents, IntentDeps, PlayMediaOnMediaPlayerHandler,
    INTENT_PLAY_MEDIA_ON_MEDIA_PLAYER,
};
pub use intent::{
    Intent, IntentContext, IntentHandler, IntentRegistry, IntentResponse, IntentResponseType,
    SlotValue,
};
