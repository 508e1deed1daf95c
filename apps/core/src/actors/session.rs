use crate::actors::messages::{
    ActorError, AppError, SchedulerEvent, SessionCommand, SessionEvent, SessionSnapshot,
    Submission,
};
use crate::actors::scheduler::EmissionScheduler;
use crate::actors::traits::EventSink;
use crate::bank::ResponseBank;
use crate::brain::{Classifier, ResponseSelector};
use crate::config::AssistantConfig;
use crate::session::{EmissionJob, FinishOutcome, Session, SessionOptions, SubmitOutcome};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
// upper bound on a single EventSink::emit call
const SINK_TIMEOUT: Duration = Duration::from_secs(1);

/// A handle to the session actor.
///
/// This is the entry point for the presentation layer. The actor owns the
/// [`Session`] and its emission scheduler; every mutation happens on the
/// actor task, in the order commands and scheduler events arrive.
#[derive(Clone)]
pub struct SessionHandle {
    sender: mpsc::Sender<SessionCommand>,
    session_id: Uuid,
}

impl SessionHandle {
    /// Builds the classifier, bank and options described by `config` and
    /// spawns a session on them.
    pub fn from_config(
        config: &AssistantConfig,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, AppError> {
        let classifier = config.build_classifier()?;
        let bank = config.build_bank()?;
        Ok(Self::new_with_parts(
            classifier,
            bank,
            config.session_options(),
            sink,
        ))
    }

    /// Spawns the session actor.
    ///
    /// # Arguments
    ///
    /// * `classifier` - Routes user text to a category.
    /// * `bank` - Shared, immutable response content.
    /// * `options` - Greeting, overlap policy and step delays.
    /// * `sink` - Receives every [`SessionEvent`].
    pub fn new_with_parts(
        classifier: Arc<dyn Classifier>,
        bank: Arc<ResponseBank>,
        options: SessionOptions,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(32);
        let (event_tx, event_rx) = mpsc::channel(32);
        let session = Session::new(classifier, ResponseSelector::new(bank), options);
        let session_id = session.id();

        let runner = SessionRunner {
            receiver,
            events: event_rx,
            scheduler: EmissionScheduler::new(event_tx),
            session,
            sink,
            idle_waiters: Vec::new(),
        };
        tokio::spawn(async move { runner.run().await });

        Self { sender, session_id }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Submits user text.
    ///
    /// # Returns
    ///
    /// How the submission was handled, [`AppError::SessionBusy`] if the
    /// session rejects overlapping input, or [`AppError::SessionClosed`]
    /// once the session has been shut down.
    #[instrument(skip(self, text), fields(session_id = %self.session_id))]
    pub async fn submit(&self, text: impl Into<String> + Send) -> Result<Submission, AppError> {
        let (send, recv) = oneshot::channel();
        let msg = SessionCommand::Submit {
            text: text.into(),
            responder: send,
        };
        self.sender
            .send(msg)
            .await
            .map_err(|_| AppError::SessionClosed)?;
        timeout(REQUEST_TIMEOUT, recv)
            .await?
            .map_err(|_| AppError::SessionClosed)?
    }

    /// Returns the current log and typing indicator.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, AppError> {
        let (send, recv) = oneshot::channel();
        self.sender
            .send(SessionCommand::Snapshot { responder: send })
            .await
            .map_err(|e| AppError::Actor(ActorError::ChannelClosed(e.to_string())))?;
        timeout(REQUEST_TIMEOUT, recv)
            .await?
            .map_err(|e| AppError::Actor(ActorError::ChannelClosed(e.to_string())))
    }

    /// Waits until every submitted and queued message has been answered.
    ///
    /// Also returns when the session is shut down meanwhile.
    pub async fn wait_idle(&self) -> Result<(), AppError> {
        let (send, recv) = oneshot::channel();
        self.sender
            .send(SessionCommand::WaitIdle { responder: send })
            .await
            .map_err(|e| AppError::Actor(ActorError::ChannelClosed(e.to_string())))?;
        recv.await
            .map_err(|e| AppError::Actor(ActorError::ChannelClosed(e.to_string())))
    }

    /// Cancels pending emission and stops the actor.
    ///
    /// Calling it on a session that is already gone is not an error.
    #[instrument(skip(self), fields(session_id = %self.session_id))]
    pub async fn shutdown(&self) -> Result<(), AppError> {
        let (send, recv) = oneshot::channel();
        if self
            .sender
            .send(SessionCommand::Shutdown { responder: send })
            .await
            .is_err()
        {
            return Ok(());
        }
        let _ = timeout(REQUEST_TIMEOUT, recv).await?;
        Ok(())
    }
}

// --- Actor Runner ---
struct SessionRunner {
    receiver: mpsc::Receiver<SessionCommand>,
    events: mpsc::Receiver<SchedulerEvent>,
    scheduler: EmissionScheduler,
    session: Session,
    sink: Arc<dyn EventSink>,
    idle_waiters: Vec<oneshot::Sender<()>>,
}

impl SessionRunner {
    async fn run(mut self) {
        info!(session_id = %self.session.id(), "Session started");

        // the greeting, if any
        let opening: Vec<_> = self.session.log().iter().cloned().collect();
        for message in opening {
            self.publish(SessionEvent::MessageAppended(message)).await;
        }

        loop {
            tokio::select! {
                command = self.receiver.recv() => match command {
                    Some(SessionCommand::Shutdown { responder }) => {
                        self.close().await;
                        let _ = responder.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        // every handle dropped
                        self.close().await;
                        break;
                    }
                },
                Some(event) = self.events.recv() => self.handle_scheduler_event(event).await,
            }
        }

        info!(session_id = %self.session.id(), "Session stopped");
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Submit { text, responder } => {
                let result = self.handle_submit(text).await;
                let _ = responder.send(result);
            }
            SessionCommand::Snapshot { responder } => {
                let _ = responder.send(self.snapshot());
            }
            SessionCommand::WaitIdle { responder } => {
                if self.session.is_typing() {
                    self.idle_waiters.push(responder);
                } else {
                    let _ = responder.send(());
                }
            }
            SessionCommand::Shutdown { responder } => {
                // handled by the run loop; kept for exhaustiveness
                self.close().await;
                let _ = responder.send(());
            }
        }
    }

    async fn handle_submit(&mut self, text: String) -> Result<Submission, AppError> {
        match self.session.submit(&text) {
            Ok(SubmitOutcome::Ignored) => Ok(Submission::Ignored),
            Ok(SubmitOutcome::Started(job)) => {
                let category = job.category();
                self.publish_user_message().await;
                self.publish(SessionEvent::TypingChanged(true)).await;
                self.scheduler.schedule(job);
                Ok(Submission::Started { category })
            }
            Ok(SubmitOutcome::Queued { position }) => {
                self.publish(SessionEvent::SubmissionQueued { position }).await;
                Ok(Submission::Queued { position })
            }
            Ok(SubmitOutcome::Preempted { cancelled, job }) => {
                if let Some(cancelled) = cancelled {
                    self.scheduler.cancel(cancelled);
                    self.publish(SessionEvent::JobCancelled(cancelled)).await;
                }
                let category = job.category();
                self.publish_user_message().await;
                self.scheduler.schedule(job);
                Ok(Submission::Preempted { category })
            }
            Err(AppError::SessionBusy) => {
                self.publish(SessionEvent::SubmissionRejected { text }).await;
                Err(AppError::SessionBusy)
            }
            Err(e) => Err(e),
        }
    }

    async fn handle_scheduler_event(&mut self, event: SchedulerEvent) {
        match event {
            SchedulerEvent::Deliver { job, message } => {
                if self.session.deliver(job, message.clone()) {
                    self.publish(SessionEvent::MessageAppended(message)).await;
                } else {
                    warn!(job = %job, "Discarded message from a cancelled job");
                }
            }
            SchedulerEvent::Finished { job } => match self.session.finish(job) {
                FinishOutcome::Stale => debug!(job = %job, "Ignoring completion of a cancelled job"),
                FinishOutcome::Idle => {
                    self.publish(SessionEvent::TypingChanged(false)).await;
                    self.release_idle_waiters();
                }
                FinishOutcome::Next(next) => self.start_queued(next).await,
            },
        }
    }

    async fn start_queued(&mut self, job: EmissionJob) {
        debug!(job = %job.id(), "Starting queued submission");
        self.publish_user_message().await;
        self.scheduler.schedule(job);
    }

    async fn close(&mut self) {
        let was_typing = self.session.is_typing();
        if let Some(job) = self.session.close() {
            self.scheduler.cancel(job);
            self.publish(SessionEvent::JobCancelled(job)).await;
        }
        self.scheduler.cancel_all();
        if was_typing {
            self.publish(SessionEvent::TypingChanged(false)).await;
        }
        self.publish(SessionEvent::Closed).await;
        self.release_idle_waiters();
    }

    fn release_idle_waiters(&mut self) {
        for waiter in self.idle_waiters.drain(..) {
            let _ = waiter.send(());
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session.id(),
            messages: self.session.log().as_slice().to_vec(),
            typing: self.session.is_typing(),
            status: self.session.status(),
            pending: self.session.pending_len(),
        }
    }

    /// Publishes the user message the session just appended.
    async fn publish_user_message(&self) {
        if let Some(message) = self.session.log().last().cloned() {
            self.publish(SessionEvent::MessageAppended(message)).await;
        }
    }

    async fn publish(&self, event: SessionEvent) {
        let result = match timeout(SINK_TIMEOUT, self.sink.emit(event)).await {
            Ok(result) => result,
            Err(elapsed) => Err(AppError::Actor(ActorError::from(elapsed))),
        };
        if let Err(e) = result {
            error!("Event sink failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::sink::{ChannelSink, NoopSink};
    use crate::brain::{Category, KeywordClassifier};
    use crate::models::MessageKind;

    fn spawn_session(sink: Arc<dyn EventSink>) -> SessionHandle {
        SessionHandle::new_with_parts(
            Arc::new(KeywordClassifier::new()),
            Arc::new(ResponseBank::builtin()),
            SessionOptions::default(),
            sink,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_and_wait_idle() {
        let handle = spawn_session(Arc::new(NoopSink));

        let result = handle
            .submit("How is our marketing campaign performing?")
            .await
            .unwrap();
        assert_eq!(
            result,
            Submission::Started {
                category: Category::Marketing
            }
        );

        let snapshot = handle.snapshot().await.unwrap();
        assert!(snapshot.typing);
        assert_eq!(snapshot.messages.len(), 2);

        handle.wait_idle().await.unwrap();
        let snapshot = handle.snapshot().await.unwrap();
        assert!(!snapshot.typing);
        assert_eq!(snapshot.messages.len(), 5);
        assert_eq!(snapshot.messages[2].kind, Some(MessageKind::Trend));
        assert_eq!(
            snapshot.messages[2].text,
            "Social media engagement has grown 78% month-over-month"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_follow_log_order() {
        let (sink, mut rx) = ChannelSink::new(64);
        let handle = spawn_session(Arc::new(sink));

        handle.submit("sales numbers this quarter").await.unwrap();
        handle.wait_idle().await.unwrap();
        handle.shutdown().await.unwrap();

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        let appended: Vec<String> = events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::MessageAppended(m) => Some(m.text.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(appended.len(), 5);
        assert_eq!(appended[1], "sales numbers this quarter");
        assert_eq!(
            appended[3],
            "Customer retention rate is highest among 25-34 age group"
        );
        assert!(events.contains(&SessionEvent::TypingChanged(true)));
        assert!(events.contains(&SessionEvent::TypingChanged(false)));
        assert_eq!(events.last(), Some(&SessionEvent::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_after_shutdown_is_closed() {
        let handle = spawn_session(Arc::new(NoopSink));
        handle.shutdown().await.unwrap();

        assert!(matches!(
            handle.submit("anything").await,
            Err(AppError::SessionClosed)
        ));
        // second shutdown is a no-op
        handle.shutdown().await.unwrap();
    }
}
