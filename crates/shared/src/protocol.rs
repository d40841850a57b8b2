use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{Celsius, ObserverKind, SessionId},
    error::ApiError,
};

/// One entry in a session's temperature history, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub recorded_at: DateTime<Utc>,
    pub value: Celsius,
}

/// What a single observer did in response to one update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Reaction {
    Display {
        rendered: String,
    },
    Logged {
        recorded_at: DateTime<Utc>,
        value: Celsius,
    },
    AlarmRaised {
        value: Celsius,
        threshold: Celsius,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObserverFailure {
    pub observer: String,
    pub message: String,
}

/// Outcome of one full notify cycle: the stored value, every reaction in
/// attachment order, and any isolated observer failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingReport {
    pub value: Celsius,
    pub reactions: Vec<Reaction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ObserverFailure>,
}

impl ReadingReport {
    pub fn new(value: Celsius) -> Self {
        Self {
            value,
            reactions: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn alarm_raised(&self) -> bool {
        self.reactions
            .iter()
            .any(|reaction| matches!(reaction, Reaction::AlarmRaised { .. }))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub created_at: DateTime<Utc>,
    pub current_value: Celsius,
    pub observers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    SessionCreated {
        session: SessionSummary,
    },
    ReadingRecorded {
        session_id: SessionId,
        report: ReadingReport,
    },
    ObserverAttached {
        session_id: SessionId,
        kind: ObserverKind,
    },
    ObserverDetached {
        session_id: SessionId,
        kind: ObserverKind,
    },
    SessionClosed {
        session_id: SessionId,
    },
    Error(ApiError),
}
