// Shared helpers for session controller tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use voice_channel::engine::{EngineError, EngineHandle, EngineOptions};
use voice_channel::{
    ChannelObserver, EngineEvent, EngineEventSender, EngineFacade, NotificationStream,
    RemoteParticipant, SessionConfig, SessionController, SessionNotification, SessionState,
};

/// A call the controller made on the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Create,
    Join {
        token: Option<String>,
        channel: String,
        info: String,
        uid: u32,
    },
    Leave,
    Mute(bool),
    Speaker(bool),
    Destroy,
}

/// Test side of a [`MockEngine`]: inspect calls and inject events
#[derive(Clone, Default)]
pub struct MockHandle {
    calls: Arc<Mutex<Vec<EngineCall>>>,
    events: Arc<Mutex<Option<EngineEventSender>>>,
    options: Arc<Mutex<Option<EngineOptions>>>,
}

impl MockHandle {
    /// Options the engine was last created with
    pub fn created_with(&self) -> Option<EngineOptions> {
        self.options.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&EngineCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(*c)).count()
    }

    /// Emit an event as the engine; false if no engine was created yet
    pub fn emit(&self, event: EngineEvent) -> bool {
        match self.events.lock().unwrap().as_ref() {
            Some(sender) => sender.emit(event),
            None => false,
        }
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().unwrap().push(call);
    }
}

/// Engine that records every call and never emits events on its own
pub struct MockEngine {
    handle: MockHandle,
    join_status: i32,
    fail_create: bool,
}

impl MockEngine {
    pub fn new() -> (Self, MockHandle) {
        let handle = MockHandle::default();
        (
            Self {
                handle: handle.clone(),
                join_status: 0,
                fail_create: false,
            },
            handle,
        )
    }

    pub fn with_join_status(mut self, status: i32) -> Self {
        self.join_status = status;
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }
}

#[async_trait::async_trait]
impl EngineFacade for MockEngine {
    async fn create(
        &mut self,
        options: EngineOptions,
        events: EngineEventSender,
    ) -> Result<EngineHandle, EngineError> {
        self.handle.record(EngineCall::Create);
        *self.handle.options.lock().unwrap() = Some(options.clone());
        if self.fail_create {
            return Err(EngineError::Initialization("no audio device".to_string()));
        }

        *self.handle.events.lock().unwrap() = Some(events);
        Ok(EngineHandle {
            engine_name: "mock".to_string(),
            profile: options.profile,
            created_at: Utc::now(),
        })
    }

    async fn join_channel(
        &mut self,
        token: Option<&str>,
        channel_id: &str,
        info: &str,
        uid: u32,
    ) -> i32 {
        self.handle.record(EngineCall::Join {
            token: token.map(str::to_string),
            channel: channel_id.to_string(),
            info: info.to_string(),
            uid,
        });
        self.join_status
    }

    async fn leave_channel(&mut self) {
        self.handle.record(EngineCall::Leave);
    }

    async fn mute_local_audio(&mut self, muted: bool) {
        self.handle.record(EngineCall::Mute(muted));
    }

    async fn set_speaker_enabled(&mut self, enabled: bool) {
        self.handle.record(EngineCall::Speaker(enabled));
    }

    async fn destroy(&mut self) {
        self.handle.record(EngineCall::Destroy);
    }

    fn name(&self) -> &str {
        "mock"
    }
}

pub fn test_config() -> SessionConfig {
    SessionConfig {
        session_id: "test-session".to_string(),
        app_id: "test-app".to_string(),
        ..SessionConfig::default()
    }
}

/// Spawn a controller and subscribe a channel observer to it
///
/// The initial state notification is consumed.
pub async fn spawn_session(
    engine: MockEngine,
    config: SessionConfig,
) -> (SessionController, NotificationStream) {
    let speaker_default = config.speaker_default;
    let controller = SessionController::spawn(Box::new(engine), config);
    let (observer, mut notifications) = ChannelObserver::new();
    controller.subscribe(Arc::new(observer)).await.unwrap();

    let initial = next_state(&mut notifications).await;
    assert_eq!(initial, SessionState::new(speaker_default));

    (controller, notifications)
}

const WAIT: Duration = Duration::from_secs(2);

async fn next_matching<T>(
    notifications: &mut NotificationStream,
    mut pick: impl FnMut(SessionNotification) -> Option<T>,
) -> T {
    let wait = async {
        loop {
            let notification = notifications.recv().await.expect("notification stream closed");
            if let Some(value) = pick(notification) {
                return value;
            }
        }
    };
    tokio::time::timeout(WAIT, wait)
        .await
        .expect("timed out waiting for notification")
}

/// Next state notification, skipping other kinds
pub async fn next_state(notifications: &mut NotificationStream) -> SessionState {
    next_matching(notifications, |n| match n {
        SessionNotification::StateChanged(state) => Some(state),
        _ => None,
    })
    .await
}

/// Next participants notification, skipping other kinds
pub async fn next_participants(notifications: &mut NotificationStream) -> Vec<RemoteParticipant> {
    next_matching(notifications, |n| match n {
        SessionNotification::ParticipantsChanged(participants) => Some(participants),
        _ => None,
    })
    .await
}

pub async fn next_diagnostic(notifications: &mut NotificationStream) -> voice_channel::Diagnostic {
    next_matching(notifications, |n| match n {
        SessionNotification::Diagnostic(diagnostic) => Some(diagnostic),
        _ => None,
    })
    .await
}

/// Join `channel` and confirm it as the engine would, with local uid `uid`
pub async fn join_confirmed(
    controller: &SessionController,
    engine: &MockHandle,
    notifications: &mut NotificationStream,
    channel: &str,
    uid: u32,
) -> SessionState {
    controller.request_join(channel).await.unwrap();
    let joining = next_state(notifications).await;
    assert_eq!(joining.phase, voice_channel::SessionPhase::Joining);

    assert!(engine.emit(EngineEvent::JoinedChannel {
        channel: channel.to_string(),
        uid,
        elapsed_ms: 12,
    }));
    next_state(notifications).await
}
