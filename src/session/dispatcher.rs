use tokio::sync::mpsc;
use tracing::debug;

use crate::engine::{EngineEvent, EngineEventSender};

/// An engine event tagged with its arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencedEvent {
    pub sequence: u64,
    pub event: EngineEvent,
}

/// Receiving side of the engine event stream
///
/// The engine may emit from any thread; the dispatcher hands events to the
/// controller task one at a time, strictly in arrival order.
pub struct EventDispatcher {
    rx: mpsc::UnboundedReceiver<EngineEvent>,
    received: u64,
}

impl EventDispatcher {
    /// Create the sender given to the engine and the matching dispatcher
    pub fn channel() -> (EngineEventSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EngineEventSender::new(tx), Self { rx, received: 0 })
    }

    /// Next event, or None once every sender is gone
    pub async fn next(&mut self) -> Option<SequencedEvent> {
        let event = self.rx.recv().await?;
        self.received += 1;

        debug!("Engine event #{}: {:?}", self.received, event);

        Some(SequencedEvent {
            sequence: self.received,
            event,
        })
    }

    /// Number of events handed out so far
    pub fn received(&self) -> u64 {
        self.received
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_delivered_in_arrival_order() {
        let (sender, mut dispatcher) = EventDispatcher::channel();

        let emitter = std::thread::spawn(move || {
            for uid in 0..100 {
                sender.emit(EngineEvent::UserJoined { uid, elapsed_ms: 0 });
            }
        });
        emitter.join().unwrap();

        for expected in 0..100u32 {
            let next = dispatcher.next().await.unwrap();
            assert_eq!(next.sequence, u64::from(expected) + 1);
            assert_eq!(next.event, EngineEvent::UserJoined { uid: expected, elapsed_ms: 0 });
        }

        // Sender dropped with the thread
        assert!(dispatcher.next().await.is_none());
        assert_eq!(dispatcher.received(), 100);
    }
}
