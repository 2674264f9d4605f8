use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder persisted in place of absent or empty descriptive text.
pub const NOT_PROVIDED: &str = "none";

/// Store-assigned identifier for an application row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub u64);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trusted identity of the user an application belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub u64);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status label tracked across the application lifecycle.
///
/// Any status may follow any other. Labels outside the five known values are kept verbatim
/// in `Other` so the store round-trips whatever the caller supplied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ApplicationStatus {
    Submitted,
    Written,
    Interview,
    Accepted,
    Rejected,
    Other(String),
}

impl ApplicationStatus {
    pub const KNOWN: [ApplicationStatus; 5] = [
        ApplicationStatus::Submitted,
        ApplicationStatus::Written,
        ApplicationStatus::Interview,
        ApplicationStatus::Accepted,
        ApplicationStatus::Rejected,
    ];

    pub fn label(&self) -> &str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Written => "written",
            ApplicationStatus::Interview => "interview",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Other(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ApplicationStatus::Other(_))
    }
}

impl From<String> for ApplicationStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "submitted" => ApplicationStatus::Submitted,
            "written" => ApplicationStatus::Written,
            "interview" => ApplicationStatus::Interview,
            "accepted" => ApplicationStatus::Accepted,
            "rejected" => ApplicationStatus::Rejected,
            _ => ApplicationStatus::Other(value),
        }
    }
}

impl From<&str> for ApplicationStatus {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<ApplicationStatus> for String {
    fn from(value: ApplicationStatus) -> Self {
        match value {
            ApplicationStatus::Other(raw) => raw,
            known => known.label().to_string(),
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Soft-delete marker carried by every stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeletionState {
    Active,
    Deleted { at: DateTime<Utc> },
}

impl DeletionState {
    pub const fn is_active(&self) -> bool {
        matches!(self, DeletionState::Active)
    }
}

/// A tracked internship application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub owner_id: OwnerId,
    pub company: String,
    pub position: String,
    pub status: ApplicationStatus,
    pub apply_date: DateTime<Utc>,
    pub next_event: Option<DateTime<Utc>>,
    pub event_type: Option<String>,
    pub event_link: Option<String>,
    pub location: String,
    pub salary: String,
    pub contact_info: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    /// Reduced projection used by listing scans: every column except `notes`.
    pub fn summary(&self) -> ApplicationSummary {
        ApplicationSummary {
            id: self.id,
            owner_id: self.owner_id,
            company: self.company.clone(),
            position: self.position.clone(),
            status: self.status.clone(),
            apply_date: self.apply_date,
            next_event: self.next_event,
            event_type: self.event_type.clone(),
            event_link: self.event_link.clone(),
            location: self.location.clone(),
            salary: self.salary.clone(),
            contact_info: self.contact_info.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Application row without the notes column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSummary {
    pub id: ApplicationId,
    pub owner_id: OwnerId,
    pub company: String,
    pub position: String,
    pub status: ApplicationStatus,
    pub apply_date: DateTime<Utc>,
    pub next_event: Option<DateTime<Utc>>,
    pub event_type: Option<String>,
    pub event_link: Option<String>,
    pub location: String,
    pub salary: String,
    pub contact_info: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApplicationSummary {
    pub fn with_notes(self, notes: String) -> Application {
        Application {
            id: self.id,
            owner_id: self.owner_id,
            company: self.company,
            position: self.position,
            status: self.status,
            apply_date: self.apply_date,
            next_event: self.next_event,
            event_type: self.event_type,
            event_link: self.event_link,
            location: self.location,
            salary: self.salary,
            contact_info: self.contact_info,
            notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Caller-supplied fields for a new application. Everything but company and position is
/// optional; missing keys deserialize to their empty value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationDraft {
    pub company: String,
    pub position: String,
    pub apply_date: Option<DateTime<Utc>>,
    pub next_event: Option<DateTime<Utc>>,
    pub event_type: Option<String>,
    pub event_link: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub contact_info: Option<String>,
    pub notes: Option<String>,
}

/// Overwrite set accepted by a field update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldUpdate {
    pub company: String,
    pub position: String,
    pub event_link: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub contact_info: Option<String>,
    pub notes: Option<String>,
}

/// Next scheduled event. Every call replaces all three values together; a `None` time
/// clears the event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSchedule {
    pub next_event: Option<DateTime<Utc>>,
    pub event_type: Option<String>,
    pub event_link: Option<String>,
}

/// Per-status counts. Every known status is a field, so none can be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationStatistics {
    pub submitted: u64,
    pub written: u64,
    pub interview: u64,
    pub accepted: u64,
    pub rejected: u64,
}

impl ApplicationStatistics {
    pub fn count(&self, status: &ApplicationStatus) -> Option<u64> {
        match status {
            ApplicationStatus::Submitted => Some(self.submitted),
            ApplicationStatus::Written => Some(self.written),
            ApplicationStatus::Interview => Some(self.interview),
            ApplicationStatus::Accepted => Some(self.accepted),
            ApplicationStatus::Rejected => Some(self.rejected),
            ApplicationStatus::Other(_) => None,
        }
    }

    /// Adds `count` to the matching field; unknown statuses are ignored.
    pub fn record(&mut self, status: &ApplicationStatus, count: u64) {
        let slot = match status {
            ApplicationStatus::Submitted => &mut self.submitted,
            ApplicationStatus::Written => &mut self.written,
            ApplicationStatus::Interview => &mut self.interview,
            ApplicationStatus::Accepted => &mut self.accepted,
            ApplicationStatus::Rejected => &mut self.rejected,
            ApplicationStatus::Other(_) => return,
        };
        *slot += count;
    }

    pub fn total(&self) -> u64 {
        self.submitted + self.written + self.interview + self.accepted + self.rejected
    }
}
