use crate::actors::messages::{AppError, SessionEvent};
use async_trait::async_trait;

/// Defines the interface through which a session publishes what happens to it.
///
/// This trait abstracts the presentation layer, allowing a terminal, a GUI
/// bridge or a test recorder to be plugged in interchangeably. Events arrive
/// in the order they happened; a failing sink never stops the session.
#[async_trait]
pub trait EventSink: Send + Sync + 'static {
    /// Receives one event.
    async fn emit(&self, event: SessionEvent) -> Result<(), AppError>;
}
