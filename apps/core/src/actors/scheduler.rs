//! Emission scheduler: plays [`EmissionJob`]s back in time.
//!
//! Each job runs on its own task, sleeping before each step and sending the
//! built message to the session actor. Jobs are cancelled by aborting their
//! task; dropping the scheduler cancels everything still running.

use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::actors::messages::SchedulerEvent;
use crate::session::{EmissionJob, JobId};

pub struct EmissionScheduler {
    events: mpsc::Sender<SchedulerEvent>,
    tasks: HashMap<JobId, JoinHandle<()>>,
}

impl EmissionScheduler {
    pub fn new(events: mpsc::Sender<SchedulerEvent>) -> Self {
        Self {
            events,
            tasks: HashMap::new(),
        }
    }

    /// Start playing `job`.
    pub fn schedule(&mut self, job: EmissionJob) {
        self.reap();

        let id = job.id();
        let events = self.events.clone();
        debug!(job = %id, steps = job.steps().len(), "Scheduling emission job");

        let handle = tokio::spawn(async move {
            for step in job.into_steps() {
                sleep(step.delay).await;
                let message = step.factory.build();
                if events
                    .send(SchedulerEvent::Deliver { job: id, message })
                    .await
                    .is_err()
                {
                    // session actor is gone
                    return;
                }
            }
            let _ = events.send(SchedulerEvent::Finished { job: id }).await;
        });

        self.tasks.insert(id, handle);
    }

    /// Abort `job`. Returns false if it was unknown or already done.
    pub fn cancel(&mut self, job: JobId) -> bool {
        match self.tasks.remove(&job) {
            Some(handle) => {
                let running = !handle.is_finished();
                handle.abort();
                if running {
                    info!(job = %job, "Cancelled emission job");
                }
                running
            }
            None => false,
        }
    }

    /// Abort every job.
    pub fn cancel_all(&mut self) {
        for (job, handle) in self.tasks.drain() {
            if !handle.is_finished() {
                info!(job = %job, "Cancelled emission job");
            }
            handle.abort();
        }
    }

    /// Number of jobs whose task is still running.
    pub fn active(&self) -> usize {
        self.tasks.values().filter(|h| !h.is_finished()).count()
    }

    fn reap(&mut self) {
        self.tasks.retain(|_, handle| !handle.is_finished());
    }
}

impl Drop for EmissionScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
