//! Job-status polling
//!
//! [`PollTracker`] is the pure state machine: it folds one query outcome at a
//! time into the job status and the attempt count. [`JobStatusPoller`] drives
//! it from a spawned task on a fixed interval and hands every step to a
//! [`PollObserver`].
//!
//! Polls are strictly serialized. The next query is scheduled only after the
//! previous one returned and its observer finished, so a slow status service
//! delays the schedule instead of piling up requests.

use crate::api::types::JobStatusReport;
use crate::config::MAX_POLL_INTERVAL_MS;
use crate::error::Result;
use crate::import::ports::JobStatusSource;
use async_trait::async_trait;
use pim_common::types::{JobId, JobStatus, ReportedStatus};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

/// What the session should do after one poll attempt
#[derive(Debug, Clone, PartialEq)]
pub enum PollStep {
    /// Still pending or processing, or the query failed; keep polling
    Continue,
    /// The job succeeded; its artifact can be fetched
    Completed {
        status: JobStatus,
        result_url: Option<String>,
    },
    Failed {
        error_details: Option<Value>,
    },
    /// The budget ran out while the job was still running
    TimedOut,
}

impl PollStep {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollStep::Continue)
    }
}

/// Status and attempt count of one job under polling
#[derive(Debug, Clone, PartialEq)]
pub struct PollTracker {
    status: JobStatus,
    poll_count: u32,
    max_polls: u32,
}

impl PollTracker {
    pub fn new(max_polls: u32) -> Self {
        Self {
            status: JobStatus::Pending,
            poll_count: 0,
            max_polls,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn poll_count(&self) -> u32 {
        self.poll_count
    }

    pub fn max_polls(&self) -> u32 {
        self.max_polls
    }

    pub fn budget_exhausted(&self) -> bool {
        self.poll_count >= self.max_polls
    }

    /// Apply the outcome of one status query.
    ///
    /// Every attempt counts against the budget, including failed queries.
    pub fn record(&mut self, outcome: Result<JobStatusReport>) -> PollStep {
        if self.status.is_terminal() {
            return PollStep::Continue;
        }

        self.poll_count += 1;

        match outcome {
            Ok(report) => {
                self.status = report.status.into();
                match report.status {
                    ReportedStatus::Completed | ReportedStatus::CompletedWithIssues => {
                        return PollStep::Completed {
                            status: self.status,
                            result_url: report.result_download_url,
                        };
                    }
                    ReportedStatus::Failed => {
                        return PollStep::Failed {
                            error_details: report.error_details,
                        };
                    }
                    ReportedStatus::Pending | ReportedStatus::Processing => {}
                }
            }
            Err(e) => {
                warn!(poll_count = self.poll_count, error = %e, "Status query failed, will retry");
            }
        }

        if self.budget_exhausted() {
            self.status = JobStatus::TimedOut;
            return PollStep::TimedOut;
        }

        PollStep::Continue
    }
}

/// Receives every poll step from a running poll loop
#[async_trait]
pub trait PollObserver: Send + Sync {
    /// Handle one step. Returning `false` stops the loop.
    async fn on_poll(&self, tracker: &PollTracker, step: PollStep) -> bool;
}

/// Owner of a running poll loop
///
/// Dropping the handle cancels the loop.
#[derive(Debug)]
pub struct PollHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Stop the loop. No status query is started after this returns.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the loop task to exit.
    pub async fn finished(&mut self) {
        if let Err(e) = (&mut self.task).await {
            if e.is_panic() {
                warn!("Poll task panicked");
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Spawns poll loops with a fixed interval and attempt budget
#[derive(Debug, Clone, Copy)]
pub struct JobStatusPoller {
    interval: Duration,
    max_polls: u32,
}

impl JobStatusPoller {
    pub fn new(interval: Duration, max_polls: u32) -> Self {
        Self {
            // tokio intervals panic on a zero period
            interval: interval.clamp(
                Duration::from_millis(1),
                Duration::from_millis(MAX_POLL_INTERVAL_MS),
            ),
            max_polls,
        }
    }

    /// Start polling `job_id`. The first query runs one interval from now.
    pub fn spawn<S, O>(&self, job_id: JobId, source: Arc<S>, observer: O) -> PollHandle
    where
        S: JobStatusSource + ?Sized + 'static,
        O: PollObserver + 'static,
    {
        let cancel = CancellationToken::new();
        let span = tracing::info_span!("poll", job_id = %job_id);
        let task = tokio::spawn(
            poll_loop(
                job_id,
                source,
                observer,
                self.interval,
                self.max_polls,
                cancel.clone(),
            )
            .instrument(span),
        );

        PollHandle { cancel, task }
    }
}

async fn poll_loop<S, O>(
    job_id: JobId,
    source: Arc<S>,
    observer: O,
    interval: Duration,
    max_polls: u32,
    cancel: CancellationToken,
) where
    S: JobStatusSource + ?Sized,
    O: PollObserver,
{
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut tracker = PollTracker::new(max_polls);

    info!(max_polls, interval_ms = interval.as_millis() as u64, "Polling started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            outcome = source.job_status(&job_id) => outcome,
        };

        let step = tracker.record(outcome);
        debug!(poll_count = tracker.poll_count(), status = %tracker.status(), "Poll recorded");

        let terminal = step.is_terminal();
        if !observer.on_poll(&tracker, step).await || terminal {
            break;
        }
    }

    debug!(poll_count = tracker.poll_count(), "Polling stopped");
}
