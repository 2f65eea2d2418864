use anyhow::{Context, Result};
use async_nats::Client;
use futures::stream::{Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::messages::{notification_subject, session_wildcard, NotificationMessage};
use crate::observer::{Diagnostic, SessionNotification, SessionObserver};
use crate::session::{RemoteParticipant, SessionState};

#[derive(Clone)]
pub struct NatsClient {
    client: Client,
    session_id: String,
}

impl NatsClient {
    /// Connect to NATS server
    pub async fn connect(url: &str, session_id: String) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self { client, session_id })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Publish one session notification
    pub async fn publish_notification(
        &self,
        sequence: u64,
        notification: SessionNotification,
    ) -> Result<()> {
        let subject = notification_subject(&self.session_id, notification.kind());

        let message = NotificationMessage {
            session_id: self.session_id.clone(),
            sequence,
            timestamp: chrono::Utc::now().to_rfc3339(),
            notification,
        };

        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish session notification")?;

        debug!("Published notification to {} (sequence={})", subject, sequence);

        Ok(())
    }

    /// Subscribe to the notifications of a session
    ///
    /// Messages that fail to parse are logged and skipped.
    pub async fn subscribe_notifications(
        &self,
        session_id: &str,
    ) -> Result<impl Stream<Item = NotificationMessage>> {
        let subject = session_wildcard(session_id);

        info!("Subscribing to session notifications on {}", subject);

        let subscriber = self
            .client
            .subscribe(subject.clone())
            .await
            .context("Failed to subscribe to session notifications")?;

        Ok(subscriber.filter_map(|msg| async move {
            match serde_json::from_slice::<NotificationMessage>(&msg.payload) {
                Ok(message) => Some(message),
                Err(e) => {
                    warn!("Failed to parse session notification: {}", e);
                    None
                }
            }
        }))
    }

    /// Flush pending publishes
    pub async fn close(self) -> Result<()> {
        info!("Closing NATS connection");
        self.client
            .flush()
            .await
            .context("Failed to flush NATS connection")?;
        Ok(())
    }
}

/// Publishes session notifications to NATS
///
/// Observer callbacks only enqueue; a background task does the publishing so
/// the session is never held up by the network.
pub struct NatsObserver {
    tx: mpsc::UnboundedSender<SessionNotification>,
}

impl NatsObserver {
    pub fn spawn(client: NatsClient) -> Arc<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<SessionNotification>();

        tokio::spawn(async move {
            info!("Notification publisher started for {}", client.session_id());

            let mut sequence = 0u64;
            while let Some(notification) = rx.recv().await {
                if let Err(e) = client.publish_notification(sequence, notification).await {
                    error!("Failed to publish notification: {}", e);
                }
                sequence += 1;
            }

            if let Err(e) = client.close().await {
                error!("Failed to close NATS connection: {}", e);
            }
            info!("Notification publisher stopped");
        });

        Arc::new(Self { tx })
    }

    fn enqueue(&self, notification: SessionNotification) {
        if self.tx.send(notification).is_err() {
            warn!("Notification publisher is gone, dropping notification");
        }
    }
}

impl SessionObserver for NatsObserver {
    fn on_state_changed(&self, state: &SessionState) {
        self.enqueue(SessionNotification::StateChanged(state.clone()));
    }

    fn on_participants_changed(&self, participants: &[RemoteParticipant]) {
        self.enqueue(SessionNotification::ParticipantsChanged(participants.to_vec()));
    }

    fn on_diagnostic(&self, diagnostic: &Diagnostic) {
        self.enqueue(SessionNotification::Diagnostic(diagnostic.clone()));
    }
}
