//! Conversation session: the state machine behind one chat.
//!
//! `Session` is synchronous and owns no timers. Submitting text produces an
//! [`EmissionJob`]; whoever drives the session (the session actor in
//! production, tests directly) sleeps through each step and hands the built
//! messages back with [`Session::deliver`], then calls [`Session::finish`].
//! Messages from a job that is no longer active are dropped, so a cancelled
//! job can never write into the log.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bank::RecommendationEntry;
use crate::brain::{Category, Classifier, ResponseSelector};
use crate::conversation::MessageLog;
use crate::error::AppError;
use crate::models::{Link, Message, MessageKind};

/// Greeting used when the configuration does not override it.
pub const DEFAULT_GREETING: &str =
    "Hello! I'm your AI marketing assistant. How can I help you today?";

/// Free-form answer to a help request.
pub const HELP_REPLY: &str = "I can help you with trend analysis, competitor insights, \
    content optimization, and marketing strategy. What specific area would you like to focus on?";

/// Identifies one emission job within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Ready for the next submission
    Idle,
    /// A response sequence is being emitted ("bot is typing")
    AwaitingResponse,
    /// Torn down; accepts nothing
    Closed,
}

/// What to do with a submission that arrives while a sequence is still emitting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Hold the text and process it once the current sequence finishes.
    #[default]
    Queue,
    /// Refuse it with [`AppError::SessionBusy`].
    Reject,
    /// Cancel the rest of the current sequence and answer the new text.
    Preempt,
}

/// Delay before each step of a response sequence, relative to the previous step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepDelays {
    pub trend: Duration,
    pub insight: Duration,
    pub recommendation: Duration,
}

impl Default for StepDelays {
    fn default() -> Self {
        Self {
            trend: Duration::from_millis(1000),
            insight: Duration::from_millis(1000),
            recommendation: Duration::from_millis(1000),
        }
    }
}

/// Behavioural knobs of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// First bot message of the log; `None` starts with an empty log.
    pub greeting: Option<String>,
    pub overlap_policy: OverlapPolicy,
    pub delays: StepDelays,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            greeting: Some(DEFAULT_GREETING.to_string()),
            overlap_policy: OverlapPolicy::default(),
            delays: StepDelays::default(),
        }
    }
}

/// Deferred construction of a scripted bot message.
///
/// The id and timestamp are assigned when [`MessageFactory::build`] runs,
/// i.e. at the moment the message is emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFactory {
    kind: Option<MessageKind>,
    text: String,
    hashtags: Option<Vec<String>>,
    links: Option<Vec<Link>>,
}

impl MessageFactory {
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            text: text.into(),
            hashtags: None,
            links: None,
        }
    }

    /// A bot message outside the trend / insight / recommendation script.
    pub fn free_form(text: impl Into<String>) -> Self {
        Self {
            kind: None,
            text: text.into(),
            hashtags: None,
            links: None,
        }
    }

    pub fn recommendation(entry: &RecommendationEntry) -> Self {
        Self {
            kind: Some(MessageKind::Recommendation),
            text: entry.text.clone(),
            hashtags: (!entry.hashtags.is_empty()).then(|| entry.hashtags.clone()),
            links: (!entry.links.is_empty()).then(|| entry.links.clone()),
        }
    }

    pub fn kind(&self) -> Option<MessageKind> {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn build(self) -> Message {
        let mut message = Message::bot(self.text);
        message.kind = self.kind;
        message.hashtags = self.hashtags;
        message.links = self.links;
        message
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmissionStep {
    pub delay: Duration,
    pub factory: MessageFactory,
}

/// Ordered `(delay, factory)` steps answering one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmissionJob {
    id: JobId,
    category: Category,
    steps: Vec<EmissionStep>,
}

impl EmissionJob {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn steps(&self) -> &[EmissionStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<EmissionStep> {
        self.steps
    }
}

/// Result of [`Session::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input; nothing happened.
    Ignored,
    /// The user message was appended and this job must be scheduled.
    Started(EmissionJob),
    /// Held until the current sequence finishes; `position` is 1-based.
    Queued { position: usize },
    /// `cancelled` must be unscheduled and `job` scheduled in its place.
    Preempted {
        cancelled: Option<JobId>,
        job: EmissionJob,
    },
}

/// Result of [`Session::finish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishOutcome {
    /// The job was not the active one; nothing changed.
    Stale,
    /// The session went back to idle.
    Idle,
    /// A queued submission was started; schedule its job.
    Next(EmissionJob),
}

/// One conversation: log, per-category cursors and status.
pub struct Session {
    id: Uuid,
    log: MessageLog,
    cursors: HashMap<Category, usize>,
    status: SessionStatus,
    pending: VecDeque<String>,
    active_job: Option<JobId>,
    next_job: u64,
    classifier: Arc<dyn Classifier>,
    selector: ResponseSelector,
    options: SessionOptions,
}

impl Session {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        selector: ResponseSelector,
        options: SessionOptions,
    ) -> Self {
        let mut log = MessageLog::new();
        if let Some(greeting) = &options.greeting {
            log.push(Message::bot(greeting.clone()));
        }

        Self {
            id: Uuid::new_v4(),
            log,
            cursors: HashMap::new(),
            status: SessionStatus::Idle,
            pending: VecDeque::new(),
            active_job: None,
            next_job: 0,
            classifier,
            selector,
            options,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// The "bot is typing" flag.
    pub fn is_typing(&self) -> bool {
        self.status == SessionStatus::AwaitingResponse
    }

    pub fn active_job(&self) -> Option<JobId> {
        self.active_job
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Next index the selector will use for `category`.
    pub fn cursor(&self, category: Category) -> usize {
        self.cursors.get(&category).copied().unwrap_or(0)
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Accept user text.
    ///
    /// Blank text is ignored. While a sequence is emitting, the configured
    /// [`OverlapPolicy`] decides between queueing, rejecting and preempting.
    pub fn submit(&mut self, text: &str) -> Result<SubmitOutcome, AppError> {
        if self.status == SessionStatus::Closed {
            return Err(AppError::SessionClosed);
        }
        if text.trim().is_empty() {
            debug!(session_id = %self.id, "Ignoring blank submission");
            return Ok(SubmitOutcome::Ignored);
        }

        if self.status == SessionStatus::AwaitingResponse {
            match self.options.overlap_policy {
                OverlapPolicy::Queue => {
                    self.pending.push_back(text.to_string());
                    let position = self.pending.len();
                    info!(session_id = %self.id, position, "Queued submission");
                    return Ok(SubmitOutcome::Queued { position });
                }
                OverlapPolicy::Reject => {
                    warn!(session_id = %self.id, "Rejected submission while responding");
                    return Err(AppError::SessionBusy);
                }
                OverlapPolicy::Preempt => {
                    let cancelled = self.active_job.take();
                    info!(session_id = %self.id, cancelled = ?cancelled, "Preempting active job");
                    let job = self.start(text);
                    return Ok(SubmitOutcome::Preempted { cancelled, job });
                }
            }
        }

        Ok(SubmitOutcome::Started(self.start(text)))
    }

    /// Append the user message and plan the scripted answer.
    fn start(&mut self, text: &str) -> EmissionJob {
        self.log.push(Message::user(text));

        let category = self.classifier.classify(text);
        let delays = self.options.delays;

        if self.classifier.is_help_request(text) {
            let id = self.activate();
            info!(session_id = %self.id, job = %id, "Answering help request");
            return EmissionJob {
                id,
                category,
                steps: vec![EmissionStep {
                    delay: delays.trend,
                    factory: MessageFactory::free_form(HELP_REPLY),
                }],
            };
        }

        let cursor = self.cursors.entry(category).or_insert(0);
        let index = *cursor;
        *cursor += 1;

        let selected = self.selector.select(category, index);
        let steps = vec![
            EmissionStep {
                delay: delays.trend,
                factory: MessageFactory::new(MessageKind::Trend, selected.trend),
            },
            EmissionStep {
                delay: delays.insight,
                factory: MessageFactory::new(MessageKind::Insight, selected.insight),
            },
            EmissionStep {
                delay: delays.recommendation,
                factory: MessageFactory::recommendation(selected.recommendation),
            },
        ];

        let id = self.activate();
        info!(session_id = %self.id, job = %id, category = %category, index, "Started response sequence");
        EmissionJob {
            id,
            category,
            steps,
        }
    }

    /// Allocate the next job id and mark it active.
    fn activate(&mut self) -> JobId {
        let id = JobId(self.next_job);
        self.next_job += 1;
        self.active_job = Some(id);
        self.status = SessionStatus::AwaitingResponse;
        id
    }

    /// Append a message produced by `job`. Returns false (and drops the
    /// message) when `job` is not the active job.
    pub fn deliver(&mut self, job: JobId, message: Message) -> bool {
        if self.status == SessionStatus::Closed || self.active_job != Some(job) {
            debug!(session_id = %self.id, job = %job, "Dropping message from inactive job");
            return false;
        }
        self.log.push(message);
        true
    }

    /// Mark `job` as fully emitted.
    pub fn finish(&mut self, job: JobId) -> FinishOutcome {
        if self.status == SessionStatus::Closed || self.active_job != Some(job) {
            return FinishOutcome::Stale;
        }

        self.active_job = None;
        self.status = SessionStatus::Idle;

        match self.pending.pop_front() {
            Some(text) => FinishOutcome::Next(self.start(&text)),
            None => FinishOutcome::Idle,
        }
    }

    /// Tear the session down. Returns the job that was still active, which
    /// the caller must cancel.
    pub fn close(&mut self) -> Option<JobId> {
        if self.status == SessionStatus::Closed {
            return None;
        }
        info!(session_id = %self.id, dropped = self.pending.len(), "Closing session");
        self.status = SessionStatus::Closed;
        self.pending.clear();
        self.active_job.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::ResponseBank;
    use crate::brain::KeywordClassifier;

    fn session(policy: OverlapPolicy) -> Session {
        Session::new(
            Arc::new(KeywordClassifier::new()),
            ResponseSelector::new(Arc::new(ResponseBank::builtin())),
            SessionOptions {
                overlap_policy: policy,
                ..SessionOptions::default()
            },
        )
    }

    fn run_to_completion(session: &mut Session, job: EmissionJob) {
        let id = job.id();
        for step in job.into_steps() {
            assert!(session.deliver(id, step.factory.build()));
        }
    }

    #[test]
    fn test_new_session_starts_with_greeting() {
        let session = session(OverlapPolicy::Queue);
        assert_eq!(session.log().len(), 1);
        assert_eq!(session.log().as_slice()[0].text, DEFAULT_GREETING);
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(!session.is_typing());
    }

    #[test]
    fn test_blank_submission_is_ignored() {
        let mut session = session(OverlapPolicy::Queue);
        assert_eq!(session.submit("   \n\t").unwrap(), SubmitOutcome::Ignored);
        assert_eq!(session.log().len(), 1);
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[test]
    fn test_submission_builds_three_steps() {
        let mut session = session(OverlapPolicy::Queue);
        let job = match session.submit("How is our marketing campaign performing?").unwrap() {
            SubmitOutcome::Started(job) => job,
            other => panic!("unexpected outcome: {:?}", other),
        };

        assert_eq!(job.category(), Category::Marketing);
        let kinds: Vec<Option<MessageKind>> =
            job.steps().iter().map(|s| s.factory.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                Some(MessageKind::Trend),
                Some(MessageKind::Insight),
                Some(MessageKind::Recommendation)
            ]
        );
        assert_eq!(
            job.steps()[0].factory.text(),
            "Social media engagement has grown 78% month-over-month"
        );
        assert!(session.is_typing());
        assert!(session.log().last().unwrap().is_from_user());
    }

    #[test]
    fn test_recommendation_carries_hashtags_and_links() {
        let mut session = session(OverlapPolicy::Queue);
        let job = match session.submit("market").unwrap() {
            SubmitOutcome::Started(job) => job,
            other => panic!("unexpected outcome: {:?}", other),
        };

        let message = job.into_steps().pop().unwrap().factory.build();
        assert_eq!(message.kind, Some(MessageKind::Recommendation));
        assert!(message.hashtags.as_ref().is_some_and(|h| !h.is_empty()));
        assert!(message.links.as_ref().is_some_and(|l| !l.is_empty()));
    }

    #[test]
    fn test_finish_returns_to_idle_and_advances_cursor() {
        let mut session = session(OverlapPolicy::Queue);
        let job = match session.submit("sales numbers this quarter").unwrap() {
            SubmitOutcome::Started(job) => job,
            other => panic!("unexpected outcome: {:?}", other),
        };
        let id = job.id();
        run_to_completion(&mut session, job);

        assert_eq!(session.finish(id), FinishOutcome::Idle);
        assert_eq!(session.status(), SessionStatus::Idle);
        assert_eq!(session.cursor(Category::Sales), 1);
        assert_eq!(session.cursor(Category::Marketing), 0);
        assert_eq!(session.log().len(), 5);
    }

    #[test]
    fn test_queue_policy_defers_until_finish() {
        let mut session = session(OverlapPolicy::Queue);
        let first = match session.submit("campaign results").unwrap() {
            SubmitOutcome::Started(job) => job,
            other => panic!("unexpected outcome: {:?}", other),
        };

        assert_eq!(
            session.submit("more campaign results").unwrap(),
            SubmitOutcome::Queued { position: 1 }
        );
        // queued text is not in the log yet
        assert_eq!(session.log().len(), 2);

        let first_id = first.id();
        run_to_completion(&mut session, first);
        let second = match session.finish(first_id) {
            FinishOutcome::Next(job) => job,
            other => panic!("unexpected outcome: {:?}", other),
        };

        assert_eq!(session.log().last().unwrap().text, "more campaign results");
        assert_ne!(second.id(), first_id);
        assert_eq!(session.pending_len(), 0);
        assert!(session.is_typing());
    }

    #[test]
    fn test_reject_policy_returns_busy() {
        let mut session = session(OverlapPolicy::Reject);
        session.submit("campaign").unwrap();

        assert!(matches!(session.submit("website"), Err(AppError::SessionBusy)));
        assert_eq!(session.log().len(), 2);
    }

    #[test]
    fn test_preempt_policy_drops_old_job() {
        let mut session = session(OverlapPolicy::Preempt);
        let old = match session.submit("campaign").unwrap() {
            SubmitOutcome::Started(job) => job,
            other => panic!("unexpected outcome: {:?}", other),
        };

        let (cancelled, new) = match session.submit("website traffic").unwrap() {
            SubmitOutcome::Preempted { cancelled, job } => (cancelled, job),
            other => panic!("unexpected outcome: {:?}", other),
        };
        assert_eq!(cancelled, Some(old.id()));

        let stale = old.steps()[0].factory.clone().build();
        assert!(!session.deliver(old.id(), stale));
        assert_eq!(session.finish(old.id()), FinishOutcome::Stale);
        assert!(session.deliver(new.id(), new.steps()[0].factory.clone().build()));
        assert_eq!(new.category(), Category::Website);
    }

    #[test]
    fn test_close_rejects_everything() {
        let mut session = session(OverlapPolicy::Queue);
        let job = match session.submit("campaign").unwrap() {
            SubmitOutcome::Started(job) => job,
            other => panic!("unexpected outcome: {:?}", other),
        };
        session.submit("queued").unwrap();

        assert_eq!(session.close(), Some(job.id()));
        assert_eq!(session.pending_len(), 0);
        assert!(!session.deliver(job.id(), Message::bot("late")));
        assert_eq!(session.finish(job.id()), FinishOutcome::Stale);
        assert!(matches!(session.submit("hello"), Err(AppError::SessionClosed)));
        assert_eq!(session.close(), None);
    }

    #[test]
    fn test_help_request_gets_single_free_form_reply() {
        let mut session = session(OverlapPolicy::Queue);
        let job = match session.submit("help").unwrap() {
            SubmitOutcome::Started(job) => job,
            other => panic!("unexpected outcome: {:?}", other),
        };

        assert_eq!(job.steps().len(), 1);
        assert_eq!(job.steps()[0].factory.kind(), None);
        assert_eq!(job.steps()[0].factory.text(), HELP_REPLY);

        let id = job.id();
        run_to_completion(&mut session, job);
        assert_eq!(session.finish(id), FinishOutcome::Idle);
        assert_eq!(session.log().len(), 3);
        assert_eq!(session.log().last().unwrap().kind, None);
        // no scripted entry was consumed
        assert_eq!(session.cursor(Category::Sales), 0);
    }

    #[test]
    fn test_no_greeting_option() {
        let session = Session::new(
            Arc::new(KeywordClassifier::new()),
            ResponseSelector::new(Arc::new(ResponseBank::builtin())),
            SessionOptions {
                greeting: None,
                ..SessionOptions::default()
            },
        );
        assert!(session.log().is_empty());
    }
}
