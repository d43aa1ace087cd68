//! Product import workflow
//!
//! Upload → initiate → poll → ingest → review → approve, driven by an
//! [`ImportSession`] over the remote contracts in [`ports`].

pub mod approve;
pub mod events;
pub mod ingest;
pub mod initiate;
pub mod poller;
pub mod ports;
pub mod session;
pub mod upload;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod fake;

pub use approve::{ApprovalConfirmation, ApprovalSubmitter, DEFAULT_APPROVAL_MESSAGE};
pub use events::{
    ChannelSink, ImportEvent, ImportEventSink, MemorySink, Notice, RecordedEvent, Severity,
};
pub use ingest::{parse_artifact, ResultIngester};
pub use initiate::JobInitiator;
pub use poller::{JobStatusPoller, PollHandle, PollObserver, PollStep, PollTracker};
pub use ports::{
    ApprovalService, ImportApi, JobInitiationService, JobStatusSource, ResultSource, UploadService,
};
pub use session::{ImportSession, ReviewTab, SessionPhase, SessionSettings, SessionSnapshot};
pub use upload::{content_type_for, ObjectUploadClient, SelectedFile};
