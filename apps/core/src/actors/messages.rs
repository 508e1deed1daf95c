use serde::Serialize;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::brain::Category;
use crate::models::Message;
use crate::session::{JobId, SessionStatus};

/// Defines errors that can occur within the actor system.
#[derive(Debug, thiserror::Error, Serialize, Clone)]
pub enum ActorError {
    /// The actor task is gone (shut down or panicked).
    #[error("Actor channel closed: {0}")]
    ChannelClosed(String),
    /// An event sink failed to accept an event.
    #[error("Event sink failed: {0}")]
    Sink(String),
    /// An event sink did not return in time.
    #[error("Event sink timed out: {0}")]
    Timeout(String),
}

impl From<tokio::time::error::Elapsed> for ActorError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        ActorError::Timeout(err.to_string())
    }
}

// Re-export AppError for convenience
pub use crate::error::AppError;

/// How the session handled a submission, as reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Submission {
    /// Blank input; nothing was appended.
    Ignored,
    /// The response sequence started right away.
    Started { category: Category },
    /// Waiting behind the current sequence; `position` is 1-based.
    Queued { position: usize },
    /// The previous sequence was cut short in favour of this one.
    Preempted { category: Category },
}

/// Point-in-time view of a session for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub messages: Vec<Message>,
    /// The "bot is typing" indicator.
    pub typing: bool,
    pub status: SessionStatus,
    /// Submissions waiting behind the current sequence.
    pub pending: usize,
}

/// Events published to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A message was appended to the log.
    MessageAppended(Message),
    /// The "bot is typing" indicator changed.
    TypingChanged(bool),
    /// A submission was held behind the current sequence.
    SubmissionQueued { position: usize },
    /// A submission was refused because a sequence was still emitting.
    SubmissionRejected { text: String },
    /// The rest of a job was discarded.
    JobCancelled(JobId),
    /// The session was torn down.
    Closed,
}

/// Messages that can be sent to the session actor.
#[derive(Debug)]
pub enum SessionCommand {
    /// Submit user text.
    Submit {
        text: String,
        /// A channel to send how the submission was handled.
        responder: oneshot::Sender<Result<Submission, AppError>>,
    },
    /// Request a copy of the log and indicator state.
    Snapshot {
        responder: oneshot::Sender<SessionSnapshot>,
    },
    /// Resolve once the session is idle with nothing queued.
    WaitIdle { responder: oneshot::Sender<()> },
    /// Cancel pending emission and stop the actor.
    Shutdown { responder: oneshot::Sender<()> },
}

/// Messages from the emission scheduler back to the session actor.
#[derive(Debug)]
pub enum SchedulerEvent {
    /// A step of `job` is due.
    Deliver { job: JobId, message: Message },
    /// Every step of `job` has been delivered.
    Finished { job: JobId },
}
