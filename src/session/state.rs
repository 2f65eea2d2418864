use serde::{Deserialize, Serialize};

/// Lifecycle phase of a channel session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    /// Join issued, waiting for the engine to confirm
    Joining,
    Joined,
    /// Leave issued, waiting for the engine to confirm
    Leaving,
}

impl SessionPhase {
    /// Joining or joined: the engine holds (or is acquiring) a channel
    pub fn is_active(self) -> bool {
        matches!(self, Self::Joining | Self::Joined)
    }
}

/// Observable state of a channel session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub phase: SessionPhase,

    /// Channel being joined, joined or left
    pub channel_id: Option<String>,

    /// Uid the engine assigned to the local user once joined
    pub local_uid: Option<u32>,

    /// Last requested microphone mute intent
    pub muted: bool,

    /// Last requested playback route (true = loudspeaker, false = earpiece)
    pub speaker_enabled: bool,
}

impl SessionState {
    pub fn new(speaker_enabled: bool) -> Self {
        Self {
            phase: SessionPhase::Idle,
            channel_id: None,
            local_uid: None,
            muted: false,
            speaker_enabled,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(false)
    }
}
