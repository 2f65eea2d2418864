use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::events::EngineEventSender;

/// Channel profile the engine is created with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelProfile {
    /// Everyone in the channel can talk freely (one-on-one or group calls)
    #[default]
    Communication,
    /// Broadcasters send and receive, audience members only receive
    LiveBroadcasting,
}

/// Options used when the engine instance is created
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub app_id: String,
    pub profile: ChannelProfile,
    /// Route playback to the loudspeaker until told otherwise
    pub default_to_speaker: bool,
}

/// Describes a created engine instance
#[derive(Debug, Clone)]
pub struct EngineHandle {
    pub engine_name: String,
    pub profile: ChannelProfile,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid app ID: {0}")]
    InvalidAppId(String),

    #[error("Engine already created")]
    AlreadyCreated,

    #[error("Engine initialization failed: {0}")]
    Initialization(String),
}

/// Real-time voice engine
///
/// Implementations own all media and network I/O. Calls return as soon as
/// the request is issued; outcomes arrive later on the [`EngineEventSender`]
/// handed to [`EngineFacade::create`].
#[async_trait::async_trait]
pub trait EngineFacade: Send + Sync {
    /// Create the engine instance and start delivering events to `events`
    async fn create(
        &mut self,
        options: EngineOptions,
        events: EngineEventSender,
    ) -> Result<EngineHandle, EngineError>;

    /// Ask to join a channel; 0 on success, a negative status code otherwise
    async fn join_channel(
        &mut self,
        token: Option<&str>,
        channel_id: &str,
        info: &str,
        uid: u32,
    ) -> i32;

    async fn leave_channel(&mut self);

    /// Stop or resume sending local audio
    async fn mute_local_audio(&mut self, muted: bool);

    /// Route playback to the loudspeaker (true) or the earpiece (false)
    async fn set_speaker_enabled(&mut self, enabled: bool);

    /// Release the engine instance
    async fn destroy(&mut self);

    /// Engine name for logging
    fn name(&self) -> &str;
}
