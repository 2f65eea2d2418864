use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// State of a remote participant's audio stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteAudioState {
    /// Default state, usually because the stream was muted or the user left
    Stopped,
    /// First remote audio packet received
    Starting,
    /// Stream is decoded and plays normally
    Decoding,
    /// Stream is frozen, usually because of network congestion
    Frozen,
    /// Stream failed to start
    Failed,
}

impl RemoteAudioState {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Stopped),
            1 => Some(Self::Starting),
            2 => Some(Self::Decoding),
            3 => Some(Self::Frozen),
            4 => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Stopped => 0,
            Self::Starting => 1,
            Self::Decoding => 2,
            Self::Frozen => 3,
            Self::Failed => 4,
        }
    }
}

/// Why a remote audio stream changed state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteAudioReason {
    Internal,
    NetworkCongestion,
    NetworkRecovery,
    /// Local user stopped receiving the stream
    LocalMuted,
    LocalUnmuted,
    /// Remote user stopped sending the stream
    RemoteMuted,
    RemoteUnmuted,
    RemoteOffline,
    /// A reason code this build does not know about
    Other(i32),
}

impl RemoteAudioReason {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Internal,
            1 => Self::NetworkCongestion,
            2 => Self::NetworkRecovery,
            3 => Self::LocalMuted,
            4 => Self::LocalUnmuted,
            5 => Self::RemoteMuted,
            6 => Self::RemoteUnmuted,
            7 => Self::RemoteOffline,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Internal => 0,
            Self::NetworkCongestion => 1,
            Self::NetworkRecovery => 2,
            Self::LocalMuted => 3,
            Self::LocalUnmuted => 4,
            Self::RemoteMuted => 5,
            Self::RemoteUnmuted => 6,
            Self::RemoteOffline => 7,
            Self::Other(code) => code,
        }
    }
}

/// Why a remote participant went offline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserOfflineReason {
    /// The user left the channel
    Quit,
    /// No packets were received from the user for too long
    Dropped,
    /// Live broadcasting only: the host switched to audience
    BecomeAudience,
    Other(i32),
}

impl UserOfflineReason {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Quit,
            1 => Self::Dropped,
            2 => Self::BecomeAudience,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Quit => 0,
            Self::Dropped => 1,
            Self::BecomeAudience => 2,
            Self::Other(code) => code,
        }
    }
}

/// Asynchronous callback emitted by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Non-fatal warning
    Warning { code: i32 },
    /// Engine error; never changes session state on its own
    Error { code: i32 },
    /// The local user joined `channel` as `uid`
    JoinedChannel {
        channel: String,
        uid: u32,
        elapsed_ms: u32,
    },
    /// The local user left the channel
    LeftChannel,
    RemoteAudioStateChanged {
        uid: u32,
        state: RemoteAudioState,
        reason: RemoteAudioReason,
        elapsed_ms: u32,
    },
    UserJoined { uid: u32, elapsed_ms: u32 },
    UserOffline { uid: u32, reason: UserOfflineReason },
}

impl EngineEvent {
    /// Short event name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::Warning { .. } => "warning",
            Self::Error { .. } => "error",
            Self::JoinedChannel { .. } => "joined_channel",
            Self::LeftChannel => "left_channel",
            Self::RemoteAudioStateChanged { .. } => "remote_audio_state_changed",
            Self::UserJoined { .. } => "user_joined",
            Self::UserOffline { .. } => "user_offline",
        }
    }
}

/// Sending half of the engine event stream
///
/// `emit` never blocks, so engines may call it from any thread, including
/// threads that are not part of the tokio runtime.
#[derive(Debug, Clone)]
pub struct EngineEventSender {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EngineEventSender {
    pub(crate) fn new(tx: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self { tx }
    }

    /// Deliver an event to the session; returns false once the session is gone
    pub fn emit(&self, event: EngineEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
