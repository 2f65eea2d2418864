use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::dispatcher::{EventDispatcher, SequencedEvent};
use super::error::{Result, SessionError};
use super::participants::{ParticipantRegistry, RemoteParticipant};
use super::state::{SessionPhase, SessionState};
use crate::engine::{self, EngineEvent, EngineEventSender, EngineFacade};
use crate::observer::{Diagnostic, DiagnosticLevel, SessionObserver};

/// Outcome of a leave request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveStatus {
    /// Leave issued to the engine
    Leaving,
    /// Join still in flight; the leave is issued once it is confirmed
    Deferred,
}

/// Session state together with the current participants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub state: SessionState,
    pub participants: Vec<RemoteParticipant>,
}

enum Command {
    Join {
        channel_id: String,
        reply: oneshot::Sender<Result<()>>,
    },
    Leave {
        reply: oneshot::Sender<Result<LeaveStatus>>,
    },
    ToggleMute {
        reply: oneshot::Sender<Result<bool>>,
    },
    ToggleSpeaker {
        reply: oneshot::Sender<Result<bool>>,
    },
    Snapshot {
        reply: oneshot::Sender<Result<SessionSnapshot>>,
    },
    Subscribe {
        observer: Arc<dyn SessionObserver>,
        reply: oneshot::Sender<Result<()>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

impl Command {
    /// Answer a command that arrived after teardown
    fn reject_disposed(self) {
        match self {
            Command::Join { reply, .. } => {
                let _ = reply.send(Err(SessionError::ControllerDisposed));
            }
            Command::Leave { reply } => {
                let _ = reply.send(Err(SessionError::ControllerDisposed));
            }
            Command::ToggleMute { reply } | Command::ToggleSpeaker { reply } => {
                let _ = reply.send(Err(SessionError::ControllerDisposed));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(Err(SessionError::ControllerDisposed));
            }
            Command::Subscribe { reply, .. } => {
                let _ = reply.send(Err(SessionError::ControllerDisposed));
            }
            Command::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeadlineKind {
    Join,
    Leave,
}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    kind: DeadlineKind,
}

/// Handle to a channel session
///
/// The session itself runs on its own task, which exclusively owns the
/// engine, the state and the participant registry. Commands from any number
/// of cloned handles and events from the engine are applied there one at a
/// time. Dropping the last handle tears the session down like
/// [`SessionController::shutdown`].
#[derive(Clone)]
pub struct SessionController {
    session_id: Arc<str>,
    commands: mpsc::Sender<Command>,
}

impl SessionController {
    /// Start a session controller on the current tokio runtime
    pub fn spawn(engine: Box<dyn EngineFacade>, config: SessionConfig) -> Self {
        Self::spawn_with_handle(engine, config).0
    }

    /// Like [`SessionController::spawn`], also returning the controller task
    pub fn spawn_with_handle(
        engine: Box<dyn EngineFacade>,
        config: SessionConfig,
    ) -> (Self, JoinHandle<()>) {
        let (commands_tx, commands_rx) = mpsc::channel(config.command_queue.max(1));
        let (event_sender, dispatcher) = EventDispatcher::channel();
        let session_id: Arc<str> = Arc::from(config.session_id.as_str());

        info!("Creating session controller: {} (engine: {})", session_id, engine.name());

        let task = SessionTask {
            state: SessionState::new(config.speaker_default),
            config,
            engine,
            engine_created: false,
            event_sender,
            participants: ParticipantRegistry::new(),
            observers: Vec::new(),
            leave_pending: false,
            deadline: None,
        };
        let handle = tokio::spawn(task.run(commands_rx, dispatcher));

        (
            Self {
                session_id,
                commands: commands_tx,
            },
            handle,
        )
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Join `channel_id`; returns once the engine accepted the request
    ///
    /// The `Joined` state is reported later through observers.
    pub async fn request_join(&self, channel_id: impl Into<String>) -> Result<()> {
        let channel_id = channel_id.into();
        self.request(|reply| Command::Join { channel_id, reply }).await
    }

    pub async fn request_leave(&self) -> Result<LeaveStatus> {
        self.request(|reply| Command::Leave { reply }).await
    }

    /// Flip the microphone mute intent; returns the new value
    pub async fn toggle_mute(&self) -> Result<bool> {
        self.request(|reply| Command::ToggleMute { reply }).await
    }

    /// Flip the loudspeaker routing intent; returns the new value
    pub async fn toggle_speaker(&self) -> Result<bool> {
        self.request(|reply| Command::ToggleSpeaker { reply }).await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn state(&self) -> Result<SessionState> {
        Ok(self.snapshot().await?.state)
    }

    pub async fn participants(&self) -> Result<Vec<RemoteParticipant>> {
        Ok(self.snapshot().await?.participants)
    }

    /// Register an observer; it immediately receives the current state
    pub async fn subscribe(&self, observer: Arc<dyn SessionObserver>) -> Result<()> {
        self.request(|reply| Command::Subscribe { observer, reply }).await
    }

    /// Leave the channel if needed and destroy the engine
    ///
    /// Safe to call more than once and from several handles at the same time.
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::Shutdown { reply }).await.is_err() {
            return Ok(());
        }
        let _ = rx.await;
        Ok(())
    }

    pub fn is_disposed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<Result<T>>) -> Command,
    ) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| SessionError::ControllerDisposed)?;
        rx.await.map_err(|_| SessionError::ControllerDisposed)?
    }
}

/// State owned by the controller task
struct SessionTask {
    config: SessionConfig,
    engine: Box<dyn EngineFacade>,
    engine_created: bool,
    event_sender: EngineEventSender,
    state: SessionState,
    participants: ParticipantRegistry,
    observers: Vec<Arc<dyn SessionObserver>>,
    /// Leave requested while the join was still in flight
    leave_pending: bool,
    deadline: Option<Deadline>,
}

impl SessionTask {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>, mut dispatcher: EventDispatcher) {
        debug!("Session task started: {}", self.config.session_id);

        loop {
            let deadline = self.deadline;

            tokio::select! {
                // Events already delivered are applied before the next command
                biased;

                Some(event) = dispatcher.next() => {
                    self.apply_event(event).await;
                }

                command = commands.recv() => match command {
                    Some(command) => {
                        if self.handle_command(command).await {
                            break;
                        }
                    }
                    None => {
                        info!("All handles dropped, shutting down session {}", self.config.session_id);
                        self.teardown().await;
                        break;
                    }
                },

                _ = sleep_until(deadline.map(|d| d.at).unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some(deadline) = deadline {
                        self.on_deadline(deadline.kind).await;
                    }
                }
            }
        }

        commands.close();
        while let Ok(command) = commands.try_recv() {
            command.reject_disposed();
        }

        debug!(
            "Session task stopped: {} ({} engine events)",
            self.config.session_id,
            dispatcher.received()
        );
    }

    /// Apply one command; returns true once the session is torn down
    async fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Join { channel_id, reply } => {
                let result = self.join(channel_id).await;
                let _ = reply.send(result);
            }
            Command::Leave { reply } => {
                let result = self.leave().await;
                let _ = reply.send(result);
            }
            Command::ToggleMute { reply } => {
                let result = self.toggle_mute().await;
                let _ = reply.send(result);
            }
            Command::ToggleSpeaker { reply } => {
                let result = self.toggle_speaker().await;
                let _ = reply.send(result);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(Ok(SessionSnapshot {
                    session_id: self.config.session_id.clone(),
                    state: self.state.clone(),
                    participants: self.participants.snapshot(),
                }));
            }
            Command::Subscribe { observer, reply } => {
                observer.on_state_changed(&self.state);
                self.observers.push(observer);
                let _ = reply.send(Ok(()));
            }
            Command::Shutdown { reply } => {
                self.teardown().await;
                let _ = reply.send(());
                return true;
            }
        }
        false
    }

    async fn join(&mut self, channel_id: String) -> Result<()> {
        if channel_id.trim().is_empty() {
            return Err(SessionError::InvalidArgument(
                "channel id must not be empty".to_string(),
            ));
        }
        if self.state.phase != SessionPhase::Idle {
            return Err(SessionError::AlreadyActive(format!(
                "session is {:?}",
                self.state.phase
            )));
        }

        if !self.engine_created {
            let handle = self
                .engine
                .create(self.config.engine_options(), self.event_sender.clone())
                .await
                .map_err(|e| {
                    error!("Failed to create engine: {}", e);
                    SessionError::EngineUnavailable(e.to_string())
                })?;
            self.engine_created = true;
            info!(
                "Engine {} created ({:?} profile)",
                handle.engine_name, handle.profile
            );
        }

        let status = self
            .engine
            .join_channel(
                self.config.access_token.as_deref(),
                &channel_id,
                &self.config.optional_info,
                self.config.uid,
            )
            .await;

        if status != 0 {
            let description = engine::describe(status).to_string();
            error!("Engine rejected join of {}: {} ({})", channel_id, description, status);
            return Err(SessionError::EngineRejected {
                code: status,
                description,
            });
        }

        info!("Joining channel {}", channel_id);

        self.state.phase = SessionPhase::Joining;
        self.state.channel_id = Some(channel_id);
        self.state.local_uid = None;
        self.leave_pending = false;
        self.arm(DeadlineKind::Join);
        self.notify_state();

        Ok(())
    }

    async fn leave(&mut self) -> Result<LeaveStatus> {
        match self.state.phase {
            SessionPhase::Joined => {
                self.begin_leave().await;
                Ok(LeaveStatus::Leaving)
            }
            SessionPhase::Joining if !self.leave_pending => {
                info!("Leave requested while joining, deferring until joined");
                self.leave_pending = true;
                Ok(LeaveStatus::Deferred)
            }
            SessionPhase::Joining => Err(SessionError::AlreadyActive(
                "leave already pending".to_string(),
            )),
            phase => Err(SessionError::AlreadyActive(format!("session is {:?}", phase))),
        }
    }

    async fn begin_leave(&mut self) {
        info!(
            "Leaving channel {}",
            self.state.channel_id.as_deref().unwrap_or("-")
        );

        self.leave_pending = false;
        self.engine.leave_channel().await;
        self.state.phase = SessionPhase::Leaving;
        self.arm(DeadlineKind::Leave);
        self.notify_state();
    }

    fn finish_leave(&mut self) {
        self.state.phase = SessionPhase::Idle;
        self.state.channel_id = None;
        self.state.local_uid = None;
        self.deadline = None;
        self.leave_pending = false;

        if self.participants.clear() {
            self.notify_participants();
        }
        self.notify_state();
    }

    async fn toggle_mute(&mut self) -> Result<bool> {
        if self.state.phase != SessionPhase::Joined {
            return Err(SessionError::NotJoined);
        }

        self.state.muted = !self.state.muted;
        self.engine.mute_local_audio(self.state.muted).await;
        self.notify_state();

        Ok(self.state.muted)
    }

    async fn toggle_speaker(&mut self) -> Result<bool> {
        if self.state.phase != SessionPhase::Joined {
            return Err(SessionError::NotJoined);
        }

        self.state.speaker_enabled = !self.state.speaker_enabled;
        self.engine.set_speaker_enabled(self.state.speaker_enabled).await;
        self.notify_state();

        Ok(self.state.speaker_enabled)
    }

    async fn apply_event(&mut self, sequenced: SequencedEvent) {
        let joined = self.state.phase == SessionPhase::Joined;

        match sequenced.event {
            EngineEvent::Warning { code } => {
                let description = engine::describe(code);
                warn!("Engine warning {}: {}", code, description);
                self.diagnostic(DiagnosticLevel::Warning, Some(code), description);
            }
            EngineEvent::Error { code } => {
                let description = engine::describe(code);
                error!("Engine error {}: {}", code, description);
                self.diagnostic(DiagnosticLevel::Error, Some(code), description);
            }
            EngineEvent::JoinedChannel {
                channel,
                uid,
                elapsed_ms,
            } => {
                let expected = self.state.phase == SessionPhase::Joining
                    && self.state.channel_id.as_deref() == Some(channel.as_str());
                if !expected {
                    debug!(
                        "Dropping join confirmation for {} while {:?}",
                        channel, self.state.phase
                    );
                    return;
                }

                info!("Joined channel {} as uid {} ({} ms)", channel, uid, elapsed_ms);

                self.state.phase = SessionPhase::Joined;
                self.state.local_uid = Some(uid);
                self.deadline = None;
                self.notify_state();
                self.diagnostic(
                    DiagnosticLevel::Info,
                    None,
                    format!("joined channel {} uid {}", channel, uid),
                );

                self.restore_intent().await;

                if self.leave_pending {
                    self.begin_leave().await;
                }
            }
            EngineEvent::LeftChannel => {
                if self.state.phase != SessionPhase::Leaving {
                    debug!("Dropping leave confirmation while {:?}", self.state.phase);
                    return;
                }

                info!(
                    "Left channel {}",
                    self.state.channel_id.as_deref().unwrap_or("-")
                );
                self.finish_leave();
            }
            EngineEvent::UserJoined { uid, .. } if joined => {
                if self.participants.insert(uid) {
                    self.notify_participants();
                    self.diagnostic(DiagnosticLevel::Info, None, format!("user {} joined!", uid));
                }
            }
            EngineEvent::UserOffline { uid, reason } if joined => {
                if self.participants.remove(uid).is_some() {
                    self.notify_participants();
                    self.diagnostic(
                        DiagnosticLevel::Info,
                        None,
                        format!("user {} offline! reason: {:?}", uid, reason),
                    );
                }
            }
            EngineEvent::RemoteAudioStateChanged {
                uid, state, reason, ..
            } if joined => {
                if self.participants.update_audio(uid, state, reason) {
                    self.notify_participants();
                }
            }
            other => {
                debug!(
                    "Dropping {} event #{} while {:?}",
                    other.name(),
                    sequenced.sequence,
                    self.state.phase
                );
            }
        }
    }

    /// Re-apply mute and speaker intent that differs from engine defaults
    async fn restore_intent(&mut self) {
        if self.state.muted {
            self.engine.mute_local_audio(true).await;
        }
        if self.state.speaker_enabled != self.config.speaker_default {
            self.engine
                .set_speaker_enabled(self.state.speaker_enabled)
                .await;
        }
    }

    async fn on_deadline(&mut self, kind: DeadlineKind) {
        self.deadline = None;

        match (kind, self.state.phase) {
            (DeadlineKind::Join, SessionPhase::Joining) => {
                let channel = self.state.channel_id.clone().unwrap_or_default();
                error!("Join of {} not confirmed in time, giving up", channel);

                self.engine.leave_channel().await;
                self.state.phase = SessionPhase::Idle;
                self.state.channel_id = None;
                self.state.local_uid = None;
                self.leave_pending = false;
                self.notify_state();
                self.diagnostic(
                    DiagnosticLevel::Error,
                    None,
                    format!("join of channel {} timed out", channel),
                );
            }
            (DeadlineKind::Leave, SessionPhase::Leaving) => {
                warn!("Leave not confirmed in time, assuming left");
                self.finish_leave();
                self.diagnostic(DiagnosticLevel::Warning, None, "leave confirmation timed out");
            }
            _ => {}
        }
    }

    async fn teardown(&mut self) {
        if !self.engine_created {
            debug!("Session {} shut down without an engine", self.config.session_id);
            return;
        }

        info!("Shutting down session {}", self.config.session_id);

        if self.state.phase.is_active() {
            self.engine.leave_channel().await;
        }
        self.engine.destroy().await;
        self.engine_created = false;
        self.deadline = None;
        self.leave_pending = false;

        let was_idle = self.state.phase == SessionPhase::Idle;
        self.state.phase = SessionPhase::Idle;
        self.state.channel_id = None;
        self.state.local_uid = None;
        if self.participants.clear() {
            self.notify_participants();
        }
        if !was_idle {
            self.notify_state();
        }
    }

    fn arm(&mut self, kind: DeadlineKind) {
        let timeout = match kind {
            DeadlineKind::Join => self.config.join_timeout,
            DeadlineKind::Leave => Some(self.config.leave_timeout),
        };
        self.deadline = timeout.map(|timeout| Deadline {
            at: Instant::now() + timeout,
            kind,
        });
    }

    fn notify_state(&self) {
        for observer in &self.observers {
            observer.on_state_changed(&self.state);
        }
    }

    fn notify_participants(&self) {
        let snapshot = self.participants.snapshot();
        for observer in &self.observers {
            observer.on_participants_changed(&snapshot);
        }
    }

    fn diagnostic(&self, level: DiagnosticLevel, code: Option<i32>, message: impl Into<String>) {
        let diagnostic = Diagnostic::new(level, code, message);
        for observer in &self.observers {
            observer.on_diagnostic(&diagnostic);
        }
    }
}
