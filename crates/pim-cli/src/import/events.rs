//! Events emitted by an import session
//!
//! The session never prints or touches global state. Every state change and
//! every operator-facing notice goes through an [`ImportEventSink`].

use chrono::{DateTime, Utc};
use pim_common::types::{JobId, JobStatus, ObjectKey};
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc::UnboundedSender;

/// How prominently a notice should be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// A message meant for the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

/// Something that happened to an import session
#[derive(Debug, Clone, PartialEq)]
pub enum ImportEvent {
    FileSelected {
        file_name: String,
    },
    /// The file is durably stored under `object_key`
    ObjectStored {
        object_key: ObjectKey,
    },
    JobCreated {
        job_id: JobId,
    },
    /// One poll attempt was applied
    PollRecorded {
        job_id: JobId,
        status: JobStatus,
        poll_count: u32,
    },
    ResultReady {
        job_id: JobId,
        accepted_rows: usize,
        issues: usize,
    },
    TimedOut {
        job_id: JobId,
        poll_count: u32,
    },
    Approved {
        object_key: ObjectKey,
        rows: usize,
    },
    /// All session state was discarded; `generation` is the new generation
    Reset {
        generation: u64,
    },
    Notice(Notice),
}

/// Receiver of session events
///
/// Called synchronously from the session, outside of its state lock.
/// Implementations must not block.
pub trait ImportEventSink: Send + Sync {
    fn emit(&self, event: ImportEvent);
}

/// Forwards events into an unbounded channel
///
/// Events emitted after the receiver is gone are dropped.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: UnboundedSender<ImportEvent>,
}

impl ChannelSink {
    pub fn new(sender: UnboundedSender<ImportEvent>) -> Self {
        Self { sender }
    }
}

impl ImportEventSink for ChannelSink {
    fn emit(&self, event: ImportEvent) {
        let _ = self.sender.send(event);
    }
}

/// An event with the time it was recorded
#[derive(Debug, Clone)]
pub struct RecordedEvent {
    pub at: DateTime<Utc>,
    pub event: ImportEvent,
}

/// Keeps every event in memory, in emission order
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<RecordedEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn events(&self) -> Vec<ImportEvent> {
        self.records().into_iter().map(|record| record.event).collect()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ImportEvent::Notice(notice) => Some(notice),
                _ => None,
            })
            .collect()
    }

    /// Index of the first event matching `predicate`.
    pub fn position(&self, predicate: impl Fn(&ImportEvent) -> bool) -> Option<usize> {
        self.events().iter().position(predicate)
    }
}

impl ImportEventSink for MemorySink {
    fn emit(&self, event: ImportEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedEvent {
                at: Utc::now(),
                event,
            });
    }
}
