use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::engine::{ChannelProfile, EngineOptions};

/// Configuration for a channel session controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier (e.g., "voice-session-2f1c...")
    pub session_id: String,

    /// Application ID the engine is created with
    pub app_id: String,

    pub channel_profile: ChannelProfile,

    /// Access token passed on join; None for projects without token auth
    pub access_token: Option<String>,

    /// Optional extra information attached to the join request
    pub optional_info: String,

    /// Requested local uid; 0 lets the engine assign one
    pub uid: u32,

    /// Playback route before the user changes it (false = earpiece)
    pub speaker_default: bool,

    /// Capacity of the command queue
    pub command_queue: usize,

    /// Give up on a join the engine has not confirmed within this time.
    /// Off by default: giving up issues a leave while the join is still in
    /// flight, so a slow but healthy join would be abandoned.
    pub join_timeout: Option<Duration>,

    /// Treat a leave as complete if the engine has not confirmed it in time
    pub leave_timeout: Duration,
}

impl SessionConfig {
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            app_id: self.app_id.clone(),
            profile: self.channel_profile,
            default_to_speaker: self.speaker_default,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("voice-session-{}", uuid::Uuid::new_v4()),
            app_id: "loopback".to_string(),
            channel_profile: ChannelProfile::Communication,
            access_token: None,
            optional_info: "Extra Optional Data".to_string(),
            uid: 0,
            speaker_default: false,
            command_queue: 32,
            join_timeout: None,
            leave_timeout: Duration::from_secs(5),
        }
    }
}
