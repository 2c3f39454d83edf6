use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use super::domain::{DeliveryStatus, Notification, NotificationId, NotificationKind, StudentId};

/// Message handed to a sink. The sink owns delivery bookkeeping, callers only
/// describe what the student should hear.
#[derive(Debug, Clone)]
pub struct NotificationDraft {
    pub student_id: StudentId,
    pub kind: NotificationKind,
    pub subject: String,
    pub body: String,
}

#[derive(Debug)]
pub enum NotifyError {
    Transport(String),
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(reason) => {
                write!(f, "notification transport unavailable: {reason}")
            }
        }
    }
}

impl std::error::Error for NotifyError {}

/// Outbound channel for student-facing messages. Delivery is at-least-once
/// and never blocks the workflow that triggered it.
pub trait NotificationSink: Send + Sync {
    fn enqueue(&self, draft: NotificationDraft) -> Result<Notification, NotifyError>;
}

/// Sink that records every message in memory. Doubles as the delivery log for
/// the demo command and as the assertion surface in tests.
#[derive(Default, Clone)]
pub struct MemoryNotifications {
    inner: Arc<Mutex<Log>>,
}

#[derive(Default)]
struct Log {
    last_id: u64,
    events: Vec<Notification>,
}

impl MemoryNotifications {
    pub fn events(&self) -> Vec<Notification> {
        self.inner.lock().expect("notification mutex poisoned").events.clone()
    }
}

impl NotificationSink for MemoryNotifications {
    fn enqueue(&self, draft: NotificationDraft) -> Result<Notification, NotifyError> {
        let mut log = self.inner.lock().expect("notification mutex poisoned");
        log.last_id += 1;
        let notification = Notification {
            id: NotificationId(log.last_id),
            student_id: draft.student_id,
            kind: draft.kind,
            subject: draft.subject,
            body: draft.body,
            status: DeliveryStatus::Delivered,
            sent_at: Utc::now(),
        };
        log.events.push(notification.clone());
        Ok(notification)
    }
}
