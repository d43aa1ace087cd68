//! Import session: drives one file through upload, processing, review, and approval
//!
//! An [`ImportSession`] is a cheap cloneable handle. State lives behind a
//! short-lived mutex that is never held across an `.await`; long-running
//! steps record the session generation they started in and drop their
//! outcome when a reset moved the session on in the meantime.
//!
//! Events are emitted after the state lock is released and before the phase
//! watch is updated, so anyone waiting for the session to settle has already
//! seen every event of the transition that settled it.

use crate::error::{ImportError, Result};
use crate::import::approve::{ApprovalConfirmation, ApprovalSubmitter};
use crate::import::events::{ImportEvent, ImportEventSink, Notice, Severity};
use crate::import::ingest::ResultIngester;
use crate::import::initiate::JobInitiator;
use crate::import::poller::{JobStatusPoller, PollHandle, PollObserver, PollStep, PollTracker};
use crate::import::ports::ImportApi;
use crate::import::upload::{ObjectUploadClient, SelectedFile};
use async_trait::async_trait;
use pim_common::types::{JobId, JobStatus, ObjectKey, ProductRow, ResultArtifact};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// File name shown for a failed job whose object key has no usable last segment.
const UNKNOWN_FILE_NAME: &str = "Unknown file";

/// Timing and storage settings of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub upload_bucket: String,
    pub poll_interval: Duration,
    pub max_polls: u32,
    /// Pause between a successful upload and job initiation
    pub propagation_delay: Duration,
}

impl SessionSettings {
    /// Longest time a job is polled before it is considered timed out.
    pub fn poll_budget(&self) -> Duration {
        self.poll_interval.saturating_mul(self.max_polls)
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        crate::config::ImportConfig::default().session_settings()
    }
}

/// Where a session is in the import workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    FileSelected,
    Uploading,
    Initiating,
    Polling,
    Ingesting,
    AwaitingReview,
    Approving,
    /// A step failed or the job timed out; only a reset moves on
    Stopped,
}

impl SessionPhase {
    /// Whether an automated step is running.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            SessionPhase::Uploading
                | SessionPhase::Initiating
                | SessionPhase::Polling
                | SessionPhase::Ingesting
                | SessionPhase::Approving
        )
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::FileSelected => "file selected",
            SessionPhase::Uploading => "uploading",
            SessionPhase::Initiating => "initiating",
            SessionPhase::Polling => "polling",
            SessionPhase::Ingesting => "ingesting",
            SessionPhase::AwaitingReview => "awaiting review",
            SessionPhase::Approving => "approving",
            SessionPhase::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Which part of the result the operator is looking at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReviewTab {
    #[default]
    AcceptedRows,
    Issues,
}

/// Point-in-time copy of a session's state
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub generation: u64,
    pub phase: SessionPhase,
    pub file_name: Option<String>,
    pub object_key: Option<ObjectKey>,
    pub job_id: Option<JobId>,
    pub job_status: Option<JobStatus>,
    pub poll_count: u32,
    pub result: Option<ResultArtifact>,
    pub review_tab: ReviewTab,
    pub last_error: Option<String>,
}

struct SessionState {
    generation: u64,
    selected_file: Option<SelectedFile>,
    file_name: Option<String>,
    object_key: Option<ObjectKey>,
    job_id: Option<JobId>,
    job_status: Option<JobStatus>,
    poll_count: u32,
    result: Option<ResultArtifact>,
    review_tab: ReviewTab,
    phase: SessionPhase,
    poller: Option<PollHandle>,
    last_error: Option<String>,
}

impl SessionState {
    fn new(generation: u64) -> Self {
        Self {
            generation,
            selected_file: None,
            file_name: None,
            object_key: None,
            job_id: None,
            job_status: None,
            poll_count: 0,
            result: None,
            review_tab: ReviewTab::default(),
            phase: SessionPhase::Idle,
            poller: None,
            last_error: None,
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            generation: self.generation,
            phase: self.phase,
            file_name: self.file_name.clone(),
            object_key: self.object_key.clone(),
            job_id: self.job_id.clone(),
            job_status: self.job_status,
            poll_count: self.poll_count,
            result: self.result.clone(),
            review_tab: self.review_tab,
            last_error: self.last_error.clone(),
        }
    }
}

struct SessionInner<A> {
    api: Arc<A>,
    settings: SessionSettings,
    events: Arc<dyn ImportEventSink>,
    state: Mutex<SessionState>,
    phase_tx: watch::Sender<SessionPhase>,
}

/// Controller for one product import
pub struct ImportSession<A: ImportApi> {
    inner: Arc<SessionInner<A>>,
}

impl<A: ImportApi> Clone for ImportSession<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

fn notice(severity: Severity, message: impl Into<String>) -> ImportEvent {
    ImportEvent::Notice(Notice::new(severity, message))
}

impl<A: ImportApi> ImportSession<A> {
    pub fn new(api: Arc<A>, settings: SessionSettings, events: Arc<dyn ImportEventSink>) -> Self {
        let (phase_tx, _) = watch::channel(SessionPhase::Idle);
        Self {
            inner: Arc::new(SessionInner {
                api,
                settings,
                events,
                state: Mutex::new(SessionState::new(0)),
                phase_tx,
            }),
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.inner.settings
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish the current phase to watchers, if it changed.
    fn publish_phase(&self) {
        let phase = self.lock().phase;
        self.inner.phase_tx.send_if_modified(|current| {
            if *current == phase {
                false
            } else {
                *current = phase;
                true
            }
        });
    }

    fn emit_all(&self, events: Vec<ImportEvent>) {
        for event in events {
            self.inner.events.emit(event);
        }
    }

    /// Mutate the state unconditionally, then emit `events` and publish the phase.
    fn update<R>(&self, f: impl FnOnce(&mut SessionState, &mut Vec<ImportEvent>) -> R) -> R {
        let mut events = Vec::new();
        let result = {
            let mut state = self.lock();
            f(&mut *state, &mut events)
        };
        self.emit_all(events);
        self.publish_phase();
        result
    }

    /// Like [`update`](Self::update), but only while `generation` is current.
    fn update_current<R>(
        &self,
        generation: u64,
        f: impl FnOnce(&mut SessionState, &mut Vec<ImportEvent>) -> R,
    ) -> Option<R> {
        let mut events = Vec::new();
        let result = {
            let mut state = self.lock();
            if state.generation != generation {
                debug!(generation, current = state.generation, "Discarding stale outcome");
                return None;
            }
            f(&mut *state, &mut events)
        };
        self.emit_all(events);
        self.publish_phase();
        Some(result)
    }

    fn ensure_current(&self, generation: u64) -> Result<()> {
        if self.lock().generation == generation {
            Ok(())
        } else {
            Err(ImportError::Superseded)
        }
    }

    /// Stop the session after a failed step and hand the error back to the caller.
    fn fail_step(&self, generation: u64, error: ImportError) -> ImportError {
        let message = error.to_string();
        let applied = self.update_current(generation, |state, events| {
            state.phase = SessionPhase::Stopped;
            state.poller = None;
            state.last_error = Some(message.clone());
            events.push(notice(Severity::Error, message.clone()));
        });

        match applied {
            Some(()) => {
                warn!(generation, error = %message, "Import step failed");
                error
            }
            None => ImportError::Superseded,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<SessionPhase> {
        self.inner.phase_tx.subscribe()
    }

    /// Whether a poll loop is currently attached to the session.
    pub fn is_polling(&self) -> bool {
        self.lock()
            .poller
            .as_ref()
            .is_some_and(|poller| !poller.is_cancelled() && !poller.is_finished())
    }

    /// Choose the file to import. Discards everything about a previous file.
    pub fn select_file(&self, file: SelectedFile) {
        let file_name = file.name().to_string();
        let generation = self.update(|state, events| {
            let generation = state.generation + 1;
            *state = SessionState::new(generation);
            state.file_name = Some(file_name.clone());
            state.selected_file = Some(file);
            state.phase = SessionPhase::FileSelected;
            events.push(ImportEvent::FileSelected {
                file_name: file_name.clone(),
            });
            generation
        });
        info!(generation, file = %file_name, "File selected");
    }

    /// Upload the selected file and start processing it.
    ///
    /// Returns once the job exists and polling has begun. Polling, ingestion,
    /// and the switch to review then happen in the background.
    pub async fn start(&self) -> Result<JobId> {
        let (generation, file) = self.update(|state, _| -> Result<(u64, SelectedFile)> {
            match state.phase {
                SessionPhase::FileSelected => {}
                SessionPhase::Idle => return Err(ImportError::NoFileSelected),
                other => {
                    return Err(ImportError::invalid_state(format!(
                        "an import is already {}",
                        other
                    )))
                }
            }
            let file = state.selected_file.take().ok_or(ImportError::NoFileSelected)?;
            state.phase = SessionPhase::Uploading;
            Ok((state.generation, file))
        })?;

        let object_key = self.upload(generation, file).await?;

        tokio::time::sleep(self.inner.settings.propagation_delay).await;
        self.ensure_current(generation)?;

        self.initiate(generation, object_key).await
    }

    async fn upload(&self, generation: u64, file: SelectedFile) -> Result<ObjectKey> {
        let client = ObjectUploadClient::new(self.inner.api.as_ref());

        self.inner
            .events
            .emit(notice(Severity::Info, "Requesting upload URL..."));
        let target = match client.request_target(&file).await {
            Ok(target) => target,
            Err(e) => return Err(self.fail_step(generation, e)),
        };
        self.ensure_current(generation)?;

        self.inner.events.emit(notice(Severity::Info, "Uploading file..."));
        let object_key = match client.upload(&target, file).await {
            Ok(key) => key,
            Err(e) => return Err(self.fail_step(generation, e)),
        };

        self.update_current(generation, |state, events| {
            state.object_key = Some(object_key.clone());
            events.push(ImportEvent::ObjectStored {
                object_key: object_key.clone(),
            });
            events.push(notice(
                Severity::Info,
                "File uploaded. Waiting for storage propagation...",
            ));
        })
        .ok_or(ImportError::Superseded)?;

        info!(generation, object_key = %object_key, "Upload complete");
        Ok(object_key)
    }

    async fn initiate(&self, generation: u64, object_key: ObjectKey) -> Result<JobId> {
        self.update_current(generation, |state, events| {
            state.phase = SessionPhase::Initiating;
            events.push(notice(Severity::Info, "Initiating file processing..."));
        })
        .ok_or(ImportError::Superseded)?;

        let job_id = match JobInitiator::new(self.inner.api.as_ref())
            .initiate(&self.inner.settings.upload_bucket, &object_key)
            .await
        {
            Ok(job_id) => job_id,
            Err(e) => return Err(self.fail_step(generation, e)),
        };

        let poller = JobStatusPoller::new(self.inner.settings.poll_interval, self.inner.settings.max_polls);
        let observer = SessionPollObserver {
            inner: Arc::downgrade(&self.inner),
            generation,
            job_id: job_id.clone(),
        };
        let handle = poller.spawn(job_id.clone(), Arc::clone(&self.inner.api), observer);

        // A stale generation drops the handle here, which cancels the loop.
        self.update_current(generation, |state, events| {
            state.job_id = Some(job_id.clone());
            state.job_status = Some(JobStatus::Pending);
            state.poll_count = 0;
            state.phase = SessionPhase::Polling;
            state.poller = Some(handle);
            events.push(ImportEvent::JobCreated {
                job_id: job_id.clone(),
            });
            events.push(notice(
                Severity::Info,
                format!("Processing initiated (Job ID: {}). Checking status...", job_id),
            ));
        })
        .ok_or(ImportError::Superseded)?;

        info!(generation, job_id = %job_id, "Polling job status");
        Ok(job_id)
    }

    /// Wait until no automated step is running and return the settled state.
    pub async fn wait_until_settled(&self) -> SessionSnapshot {
        let mut phase_rx = self.subscribe_phase();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = phase_rx.wait_for(|phase| !phase.is_busy()).await;
        self.snapshot()
    }

    /// Run the automated part of the import: upload, process, and ingest.
    ///
    /// A timed-out job is not an error; the snapshot carries `TIMED_OUT`.
    pub async fn run(&self) -> Result<SessionSnapshot> {
        self.start().await?;
        let snapshot = self.wait_until_settled().await;

        match (&snapshot.phase, &snapshot.last_error) {
            (SessionPhase::Stopped, Some(message)) => Err(ImportError::Stopped(message.clone())),
            (SessionPhase::Idle | SessionPhase::FileSelected, _) => Err(ImportError::Superseded),
            _ => Ok(snapshot),
        }
    }

    async fn apply_poll(&self, generation: u64, job_id: &JobId, tracker: &PollTracker, step: PollStep) -> bool {
        let status = tracker.status();
        let poll_count = tracker.poll_count();

        let recorded = self.update_current(generation, |state, events| {
            let previous = state.job_status.replace(status);
            state.poll_count = poll_count;
            events.push(ImportEvent::PollRecorded {
                job_id: job_id.clone(),
                status,
                poll_count,
            });
            if !status.is_terminal() && previous != Some(status) {
                events.push(notice(
                    Severity::Info,
                    format!("Job {} status: {}", job_id, status),
                ));
            }
        });
        if recorded.is_none() {
            return false;
        }

        match step {
            PollStep::Continue => true,
            PollStep::Completed { status, result_url } => {
                self.ingest(generation, job_id, status, result_url).await;
                false
            }
            PollStep::Failed { error_details } => {
                self.update_current(generation, |state, events| {
                    let file_name = state
                        .object_key
                        .as_ref()
                        .and_then(|key| key.file_name())
                        .unwrap_or(UNKNOWN_FILE_NAME)
                        .to_string();
                    let artifact = ResultArtifact::failed(
                        file_name,
                        format!("Job {} failed.", job_id),
                        error_details.as_ref(),
                    );

                    events.push(notice(
                        Severity::Error,
                        format!("Job {} FAILED. Check the issues view.", job_id),
                    ));
                    events.push(ImportEvent::ResultReady {
                        job_id: job_id.clone(),
                        accepted_rows: artifact.accepted_count(),
                        issues: artifact.issue_count(),
                    });
                    state.result = Some(artifact);
                    state.review_tab = ReviewTab::Issues;
                    state.phase = SessionPhase::AwaitingReview;
                    state.poller = None;
                });
                warn!(generation, job_id = %job_id, "Job failed");
                false
            }
            PollStep::TimedOut => {
                let budget_secs = self.inner.settings.poll_budget().as_secs();
                self.update_current(generation, |state, events| {
                    state.phase = SessionPhase::Stopped;
                    state.poller = None;
                    events.push(ImportEvent::TimedOut {
                        job_id: job_id.clone(),
                        poll_count,
                    });
                    events.push(notice(
                        Severity::Warning,
                        format!(
                            "Job {} timed out after {}s. It may still finish; check it later by its job id.",
                            job_id, budget_secs
                        ),
                    ));
                });
                warn!(generation, job_id = %job_id, poll_count, "Job timed out");
                false
            }
        }
    }

    async fn ingest(&self, generation: u64, job_id: &JobId, status: JobStatus, result_url: Option<String>) {
        let started = self.update_current(generation, |state, events| {
            state.phase = SessionPhase::Ingesting;
            state.poller = None;
            events.push(notice(
                Severity::Info,
                format!("Job {} {}. Fetching results...", job_id, status),
            ));
        });
        if started.is_none() {
            return;
        }

        let artifact = match ResultIngester::new(self.inner.api.as_ref())
            .ingest(result_url.as_deref())
            .await
        {
            Ok(artifact) => artifact,
            Err(e) => {
                self.fail_step(generation, e);
                return;
            }
        };

        let accepted_rows = artifact.accepted_count();
        let issues = artifact.issue_count();
        self.update_current(generation, |state, events| {
            state.review_tab = if accepted_rows == 0 && issues > 0 {
                ReviewTab::Issues
            } else {
                ReviewTab::AcceptedRows
            };
            state.result = Some(artifact);
            state.phase = SessionPhase::AwaitingReview;
            state.poller = None;
            events.push(ImportEvent::ResultReady {
                job_id: job_id.clone(),
                accepted_rows,
                issues,
            });
            events.push(notice(
                Severity::Success,
                format!(
                    "Results loaded: {} valid product(s), {} issue(s).",
                    accepted_rows, issues
                ),
            ));
        });
    }

    pub fn set_review_tab(&self, tab: ReviewTab) {
        self.lock().review_tab = tab;
    }

    /// Commit `rows` of the reviewed result, then reset the session.
    pub async fn approve(&self, rows: Vec<ProductRow>) -> Result<ApprovalConfirmation> {
        if rows.is_empty() {
            self.inner
                .events
                .emit(notice(Severity::Warning, ImportError::NothingToApprove.to_string()));
            return Err(ImportError::NothingToApprove);
        }

        let (generation, object_key) = self.update(|state, _| -> Result<(u64, ObjectKey)> {
            let object_key = match (state.phase, &state.object_key) {
                (SessionPhase::AwaitingReview, Some(key)) if state.result.is_some() => key.clone(),
                (phase, _) => {
                    return Err(ImportError::invalid_state(format!(
                        "there is no processed result to approve (session is {})",
                        phase
                    )))
                }
            };
            state.phase = SessionPhase::Approving;
            Ok((state.generation, object_key))
        })?;

        let row_count = rows.len();
        let outcome = ApprovalSubmitter::new(self.inner.api.as_ref())
            .submit(&rows, &object_key)
            .await;

        match outcome {
            Ok(confirmation) => {
                let message = confirmation.message.clone();
                let reset = self.update_current(generation, |state, events| {
                    let next = state.generation + 1;
                    *state = SessionState::new(next);
                    events.push(ImportEvent::Approved {
                        object_key: object_key.clone(),
                        rows: row_count,
                    });
                    events.push(notice(Severity::Success, message));
                    events.push(ImportEvent::Reset { generation: next });
                    next
                });
                match reset {
                    Some(next) => info!(generation = next, rows = row_count, "Approval complete, session reset"),
                    None => debug!(rows = row_count, "Approval completed after a reset"),
                }
                Ok(confirmation)
            }
            Err(e) => {
                let message = e.to_string();
                let applied = self.update_current(generation, |state, events| {
                    state.phase = SessionPhase::AwaitingReview;
                    state.last_error = Some(message.clone());
                    events.push(notice(Severity::Error, message.clone()));
                });
                match applied {
                    Some(()) => Err(e),
                    None => Err(ImportError::Superseded),
                }
            }
        }
    }

    /// Approve every accepted row of the current result.
    pub async fn approve_all(&self) -> Result<ApprovalConfirmation> {
        let rows = self
            .lock()
            .result
            .as_ref()
            .map(|result| result.accepted_rows.clone())
            .unwrap_or_default();
        self.approve(rows).await
    }

    /// Discard all state, stop polling, and invalidate in-flight steps.
    pub fn reset(&self) {
        let generation = self.update(|state, events| {
            let next = state.generation + 1;
            *state = SessionState::new(next);
            events.push(ImportEvent::Reset { generation: next });
            next
        });
        info!(generation, "Session reset");
    }
}

/// Applies poll steps to the session that started the loop
///
/// Holds the session weakly so a forgotten loop never keeps it alive.
struct SessionPollObserver<A> {
    inner: Weak<SessionInner<A>>,
    generation: u64,
    job_id: JobId,
}

#[async_trait]
impl<A: ImportApi> PollObserver for SessionPollObserver<A> {
    async fn on_poll(&self, tracker: &PollTracker, step: PollStep) -> bool {
        let Some(inner) = self.inner.upgrade() else {
            return false;
        };
        ImportSession { inner }
            .apply_poll(self.generation, &self.job_id, tracker, step)
            .await
    }
}
