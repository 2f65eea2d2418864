//! Session notifications
//!
//! Presentation layers (UI, logs, remote subscribers) implement
//! [`SessionObserver`] and register it with the session controller. Observer
//! methods run on the controller task and must return quickly; anything slow
//! belongs on a channel, as [`ChannelObserver`] does.

use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::session::{RemoteParticipant, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

/// Non-fatal observation about the session or the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,

    /// Engine status code, if the diagnostic came from the engine
    pub code: Option<i32>,

    pub message: String,

    pub timestamp: DateTime<Utc>,
}

impl Diagnostic {
    pub fn new(level: DiagnosticLevel, code: Option<i32>, message: impl Into<String>) -> Self {
        Self {
            level,
            code,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Receives session notifications
pub trait SessionObserver: Send + Sync {
    fn on_state_changed(&self, state: &SessionState);

    /// Current participants, ordered by uid
    fn on_participants_changed(&self, participants: &[RemoteParticipant]);

    fn on_diagnostic(&self, diagnostic: &Diagnostic);
}

/// A single notification, as delivered by [`ChannelObserver`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum SessionNotification {
    StateChanged(SessionState),
    ParticipantsChanged(Vec<RemoteParticipant>),
    Diagnostic(Diagnostic),
}

impl SessionNotification {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StateChanged(_) => "state_changed",
            Self::ParticipantsChanged(_) => "participants_changed",
            Self::Diagnostic(_) => "diagnostic",
        }
    }
}

/// Writes notifications to the log
///
/// This is the console counterpart of on-screen toasts.
#[derive(Debug, Default)]
pub struct LoggingObserver;

impl SessionObserver for LoggingObserver {
    fn on_state_changed(&self, state: &SessionState) {
        info!(
            "Session {:?}: channel={} uid={} muted={} speaker={}",
            state.phase,
            state.channel_id.as_deref().unwrap_or("-"),
            state.local_uid.map(|uid| uid.to_string()).unwrap_or_else(|| "-".to_string()),
            state.muted,
            state.speaker_enabled
        );
    }

    fn on_participants_changed(&self, participants: &[RemoteParticipant]) {
        let summary: Vec<String> = participants
            .iter()
            .map(|p| format!("{}:{:?}", p.uid, p.audio_state))
            .collect();
        info!("Participants ({}): [{}]", participants.len(), summary.join(", "));
    }

    fn on_diagnostic(&self, diagnostic: &Diagnostic) {
        let code = diagnostic.code.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string());
        match diagnostic.level {
            DiagnosticLevel::Info => info!("{} (code {})", diagnostic.message, code),
            DiagnosticLevel::Warning => warn!("{} (code {})", diagnostic.message, code),
            DiagnosticLevel::Error => error!("{} (code {})", diagnostic.message, code),
        }
    }
}

/// Forwards notifications into a [`NotificationStream`]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<SessionNotification>,
}

impl ChannelObserver {
    pub fn new() -> (Self, NotificationStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, NotificationStream { rx })
    }

    fn forward(&self, notification: SessionNotification) {
        // Receiver gone means nobody is listening any more
        let _ = self.tx.send(notification);
    }
}

impl SessionObserver for ChannelObserver {
    fn on_state_changed(&self, state: &SessionState) {
        self.forward(SessionNotification::StateChanged(state.clone()));
    }

    fn on_participants_changed(&self, participants: &[RemoteParticipant]) {
        self.forward(SessionNotification::ParticipantsChanged(participants.to_vec()));
    }

    fn on_diagnostic(&self, diagnostic: &Diagnostic) {
        self.forward(SessionNotification::Diagnostic(diagnostic.clone()));
    }
}

/// Stream of notifications produced by a [`ChannelObserver`]
pub struct NotificationStream {
    rx: mpsc::UnboundedReceiver<SessionNotification>,
}

impl NotificationStream {
    pub async fn recv(&mut self) -> Option<SessionNotification> {
        self.rx.recv().await
    }

    /// Notification already queued, if any
    pub fn try_recv(&mut self) -> Option<SessionNotification> {
        self.rx.try_recv().ok()
    }
}

impl Stream for NotificationStream {
    type Item = SessionNotification;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
