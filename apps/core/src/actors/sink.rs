//! Stock [`EventSink`] implementations.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::actors::messages::{ActorError, AppError, SessionEvent};
use crate::actors::traits::EventSink;

/// Discards every event. For callers that only poll snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

#[async_trait]
impl EventSink for NoopSink {
    async fn emit(&self, _event: SessionEvent) -> Result<(), AppError> {
        Ok(())
    }
}

/// Forwards events into a bounded channel.
///
/// Never waits for room: when the receiver falls behind, the event is
/// dropped and `emit` fails.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::Sender<SessionEvent>,
}

impl ChannelSink {
    /// Creates a sink and the receiver its events arrive on.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn emit(&self, event: SessionEvent) -> Result<(), AppError> {
        self.sender.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => {
                AppError::Actor(ActorError::Sink("Event channel is full".to_string()))
            }
            TrySendError::Closed(_) => {
                AppError::Actor(ActorError::Sink("Event channel is closed".to_string()))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_forwards_in_order() {
        let (sink, mut rx) = ChannelSink::new(4);
        sink.emit(SessionEvent::TypingChanged(true)).await.unwrap();
        sink.emit(SessionEvent::TypingChanged(false)).await.unwrap();

        assert_eq!(rx.recv().await, Some(SessionEvent::TypingChanged(true)));
        assert_eq!(rx.recv().await, Some(SessionEvent::TypingChanged(false)));
    }

    #[tokio::test]
    async fn test_channel_sink_fails_fast_when_full() {
        let (sink, mut rx) = ChannelSink::new(1);
        sink.emit(SessionEvent::TypingChanged(true)).await.unwrap();

        let result = sink.emit(SessionEvent::TypingChanged(false)).await;
        assert!(matches!(result, Err(AppError::Actor(ActorError::Sink(ref msg))) if msg.contains("full")));

        // the event that fit is still delivered
        assert_eq!(rx.recv().await, Some(SessionEvent::TypingChanged(true)));
    }

    #[tokio::test]
    async fn test_channel_sink_fails_when_receiver_dropped() {
        let (sink, rx) = ChannelSink::new(1);
        drop(rx);

        let result = sink.emit(SessionEvent::Closed).await;
        assert!(matches!(result, Err(AppError::Actor(ActorError::Sink(_)))));
    }
}
