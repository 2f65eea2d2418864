// In-process engine that answers every request locally

use chrono::Utc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::events::{
    EngineEvent, EngineEventSender, RemoteAudioReason, RemoteAudioState, UserOfflineReason,
};
use super::facade::{EngineError, EngineFacade, EngineHandle, EngineOptions};

const ERR_NOT_INITIALIZED: i32 = -7;
const ERR_JOIN_CHANNEL_REJECTED: i32 = -17;
const ERR_INVALID_CHANNEL_NAME: i32 = -102;

/// First uid handed out when the caller lets the engine pick one
const FIRST_ASSIGNED_UID: u32 = 10_000;

/// Configuration for the loopback engine
#[derive(Debug, Clone)]
pub struct LoopbackConfig {
    /// Delay before a join is confirmed
    pub join_latency: Duration,
    /// Delay before a leave is confirmed
    pub leave_latency: Duration,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            join_latency: Duration::from_millis(50),
            leave_latency: Duration::from_millis(20),
        }
    }
}

type SharedSender = Arc<Mutex<Option<EngineEventSender>>>;

/// Loopback engine
///
/// Confirms joins and leaves after a configurable latency and lets callers
/// simulate remote participants through [`RemotePeers`]. Used by the demo
/// binary and the HTTP server when no real media engine is wired in.
pub struct LoopbackEngine {
    config: LoopbackConfig,
    events: SharedSender,
    created: bool,
    channel: Option<String>,
    next_uid: u32,
    pending: Option<JoinHandle<()>>,
    muted: bool,
    speaker_enabled: bool,
}

impl LoopbackEngine {
    pub fn new(config: LoopbackConfig) -> Self {
        Self {
            config,
            events: Arc::new(Mutex::new(None)),
            created: false,
            channel: None,
            next_uid: FIRST_ASSIGNED_UID,
            pending: None,
            muted: false,
            speaker_enabled: false,
        }
    }

    /// Handle for simulating remote participants in the joined channel
    pub fn remote_peers(&self) -> RemotePeers {
        RemotePeers {
            events: Arc::clone(&self.events),
        }
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_speaker_enabled(&self) -> bool {
        self.speaker_enabled
    }

    fn sender(&self) -> Option<EngineEventSender> {
        self.events.lock().ok().and_then(|slot| slot.clone())
    }

    fn schedule(&mut self, delay: Duration, event: EngineEvent) {
        let Some(sender) = self.sender() else {
            return;
        };

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            sender.emit(event);
        });

        if let Some(previous) = self.pending.replace(task) {
            previous.abort();
        }
    }
}

/// Channel names: at most 64 bytes of ASCII letters, digits, space and
/// `!#$%&()+-:;<=.>?@[]^_{}|~,`
pub fn is_valid_channel_name(name: &str) -> bool {
    const PUNCTUATION: &str = " !#$%&()+-:;<=.>?@[]^_{}|~,";

    !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || PUNCTUATION.contains(c))
}

#[async_trait::async_trait]
impl EngineFacade for LoopbackEngine {
    async fn create(
        &mut self,
        options: EngineOptions,
        events: EngineEventSender,
    ) -> Result<EngineHandle, EngineError> {
        if self.created {
            return Err(EngineError::AlreadyCreated);
        }
        if options.app_id.trim().is_empty() {
            return Err(EngineError::InvalidAppId(options.app_id));
        }

        if let Ok(mut slot) = self.events.lock() {
            *slot = Some(events);
        }
        self.created = true;
        self.speaker_enabled = options.default_to_speaker;

        info!(
            "Loopback engine created ({:?} profile, speaker={})",
            options.profile, options.default_to_speaker
        );

        Ok(EngineHandle {
            engine_name: self.name().to_string(),
            profile: options.profile,
            created_at: Utc::now(),
        })
    }

    async fn join_channel(
        &mut self,
        _token: Option<&str>,
        channel_id: &str,
        _info: &str,
        uid: u32,
    ) -> i32 {
        if !self.created {
            return ERR_NOT_INITIALIZED;
        }
        if !is_valid_channel_name(channel_id) {
            return ERR_INVALID_CHANNEL_NAME;
        }
        if self.channel.is_some() {
            return ERR_JOIN_CHANNEL_REJECTED;
        }

        let uid = if uid == 0 {
            let assigned = self.next_uid;
            self.next_uid += 1;
            assigned
        } else {
            uid
        };

        debug!("Loopback join: channel={} uid={}", channel_id, uid);

        self.channel = Some(channel_id.to_string());
        let latency = self.config.join_latency;
        self.schedule(
            latency,
            EngineEvent::JoinedChannel {
                channel: channel_id.to_string(),
                uid,
                elapsed_ms: latency.as_millis() as u32,
            },
        );

        0
    }

    async fn leave_channel(&mut self) {
        if self.channel.take().is_none() {
            return;
        }

        debug!("Loopback leave");
        let latency = self.config.leave_latency;
        self.schedule(latency, EngineEvent::LeftChannel);
    }

    async fn mute_local_audio(&mut self, muted: bool) {
        self.muted = muted;
    }

    async fn set_speaker_enabled(&mut self, enabled: bool) {
        self.speaker_enabled = enabled;
    }

    async fn destroy(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
        if let Ok(mut slot) = self.events.lock() {
            slot.take();
        }
        self.channel = None;
        self.created = false;

        info!("Loopback engine destroyed");
    }

    fn name(&self) -> &str {
        "loopback"
    }
}

/// Simulates remote participants of a [`LoopbackEngine`]
#[derive(Clone)]
pub struct RemotePeers {
    events: SharedSender,
}

impl RemotePeers {
    fn emit(&self, event: EngineEvent) -> bool {
        match self.events.lock() {
            Ok(slot) => slot.as_ref().is_some_and(|sender| sender.emit(event)),
            Err(_) => false,
        }
    }

    /// A remote user joins and starts sending audio
    pub fn join(&self, uid: u32) -> bool {
        self.emit(EngineEvent::UserJoined { uid, elapsed_ms: 0 })
            && self.emit(EngineEvent::RemoteAudioStateChanged {
                uid,
                state: RemoteAudioState::Starting,
                reason: RemoteAudioReason::RemoteUnmuted,
                elapsed_ms: 0,
            })
            && self.emit(EngineEvent::RemoteAudioStateChanged {
                uid,
                state: RemoteAudioState::Decoding,
                reason: RemoteAudioReason::RemoteUnmuted,
                elapsed_ms: 0,
            })
    }

    pub fn set_muted(&self, uid: u32, muted: bool) -> bool {
        let (state, reason) = if muted {
            (RemoteAudioState::Stopped, RemoteAudioReason::RemoteMuted)
        } else {
            (RemoteAudioState::Decoding, RemoteAudioReason::RemoteUnmuted)
        };

        self.emit(EngineEvent::RemoteAudioStateChanged {
            uid,
            state,
            reason,
            elapsed_ms: 0,
        })
    }

    /// Network congestion freezes the user's stream
    pub fn freeze(&self, uid: u32) -> bool {
        self.emit(EngineEvent::RemoteAudioStateChanged {
            uid,
            state: RemoteAudioState::Frozen,
            reason: RemoteAudioReason::NetworkCongestion,
            elapsed_ms: 0,
        })
    }

    pub fn leave(&self, uid: u32) -> bool {
        self.emit(EngineEvent::UserOffline {
            uid,
            reason: UserOfflineReason::Quit,
        })
    }

    pub fn drop_out(&self, uid: u32) -> bool {
        self.emit(EngineEvent::UserOffline {
            uid,
            reason: UserOfflineReason::Dropped,
        })
    }

    /// Raise an engine warning, as a real engine does for degraded conditions
    pub fn warn(&self, code: i32) -> bool {
        self.emit(EngineEvent::Warning { code })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ChannelProfile;
    use tokio::sync::mpsc;

    fn options() -> EngineOptions {
        EngineOptions {
            app_id: "test-app".to_string(),
            profile: ChannelProfile::Communication,
            default_to_speaker: false,
        }
    }

    #[test]
    fn test_channel_name_rules() {
        assert!(is_valid_channel_name("room1"));
        assert!(is_valid_channel_name("team standup #3"));
        assert!(!is_valid_channel_name(""));
        assert!(!is_valid_channel_name("caf\u{e9}"));
        assert!(!is_valid_channel_name(&"a".repeat(65)));
        assert!(is_valid_channel_name(&"a".repeat(64)));
    }

    #[tokio::test]
    async fn test_join_before_create_is_rejected() {
        let mut engine = LoopbackEngine::new(LoopbackConfig::default());
        assert_eq!(engine.join_channel(None, "room1", "", 0).await, ERR_NOT_INITIALIZED);
    }

    #[tokio::test]
    async fn test_join_confirms_with_assigned_uid() {
        let mut engine = LoopbackEngine::new(LoopbackConfig {
            join_latency: Duration::from_millis(1),
            leave_latency: Duration::from_millis(1),
        });
        let (tx, mut rx) = mpsc::unbounded_channel();
        engine.create(options(), EngineEventSender::new(tx)).await.unwrap();

        assert_eq!(engine.join_channel(None, "room1", "", 0).await, 0);
        assert_eq!(
            engine.join_channel(None, "room2", "", 0).await,
            ERR_JOIN_CHANNEL_REJECTED
        );

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            EngineEvent::JoinedChannel {
                channel: "room1".to_string(),
                uid: FIRST_ASSIGNED_UID,
                elapsed_ms: 1,
            }
        );

        engine.leave_channel().await;
        assert_eq!(rx.recv().await.unwrap(), EngineEvent::LeftChannel);
    }

    #[tokio::test]
    async fn test_invalid_channel_name() {
        let mut engine = LoopbackEngine::new(LoopbackConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        engine.create(options(), EngineEventSender::new(tx)).await.unwrap();

        assert_eq!(
            engine.join_channel(None, "bad/name", "", 0).await,
            ERR_INVALID_CHANNEL_NAME
        );
    }

    #[tokio::test]
    async fn test_audio_route_starts_from_options() {
        let mut engine = LoopbackEngine::new(LoopbackConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let options = EngineOptions {
            default_to_speaker: true,
            ..options()
        };
        engine.create(options, EngineEventSender::new(tx)).await.unwrap();
        assert!(engine.is_speaker_enabled());
        assert!(!engine.is_muted());

        engine.mute_local_audio(true).await;
        engine.set_speaker_enabled(false).await;
        assert!(engine.is_muted());
        assert!(!engine.is_speaker_enabled());
    }

    #[tokio::test]
    async fn test_remote_peer_drop_out_and_warning() {
        let mut engine = LoopbackEngine::new(LoopbackConfig::default());
        let peers = engine.remote_peers();
        let (tx, mut rx) = mpsc::unbounded_channel();
        engine.create(options(), EngineEventSender::new(tx)).await.unwrap();

        assert!(peers.drop_out(9));
        assert!(peers.warn(104));
        assert_eq!(
            rx.recv().await.unwrap(),
            EngineEvent::UserOffline {
                uid: 9,
                reason: UserOfflineReason::Dropped
            }
        );
        assert_eq!(rx.recv().await.unwrap(), EngineEvent::Warning { code: 104 });
    }

    #[tokio::test]
    async fn test_remote_peers_silent_after_destroy() {
        let mut engine = LoopbackEngine::new(LoopbackConfig::default());
        let peers = engine.remote_peers();
        assert!(!peers.join(7), "No sender before create");

        let (tx, mut rx) = mpsc::unbounded_channel();
        engine.create(options(), EngineEventSender::new(tx)).await.unwrap();
        assert!(peers.leave(7));
        assert_eq!(
            rx.recv().await.unwrap(),
            EngineEvent::UserOffline {
                uid: 7,
                reason: UserOfflineReason::Quit
            }
        );

        engine.destroy().await;
        assert!(!peers.join(7));
    }
}
