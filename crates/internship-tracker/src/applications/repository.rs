use chrono::{DateTime, Utc};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, ApplicationSummary, EventSchedule, OwnerId,
};

/// Normalized row handed to the store on insert; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApplication {
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
    pub recorded_at: DateTime<Utc>,
}

impl NewApplication {
    pub fn into_application(self, id: ApplicationId) -> Application {
        Application {
            id,
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
            notes: self.notes,
            created_at: self.recorded_at,
            updated_at: self.recorded_at,
        }
    }
}

/// Normalized overwrite set for the editable columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationFields {
    pub company: String,
    pub position: String,
    pub event_link: Option<String>,
    pub location: String,
    pub salary: String,
    pub contact_info: String,
    pub notes: String,
}

/// Row predicate for single-row reads and mutations. Both variants only ever match active
/// rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKey {
    Id(ApplicationId),
    Owned { id: ApplicationId, owner: OwnerId },
}

impl RowKey {
    pub fn matches(&self, application: &Application) -> bool {
        match *self {
            RowKey::Id(id) => application.id == id,
            RowKey::Owned { id, owner } => application.id == id && application.owner_id == owner,
        }
    }
}

/// Column change applied by an update. Each variant also bumps `updated_at` to `at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowChange {
    Fields(ApplicationFields),
    Status(ApplicationStatus),
    Event(EventSchedule),
}

/// Owner-scoped predicate for multi-row queries. Soft-deleted rows never match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationFilter {
    pub owner: OwnerId,
    /// Substring match against the company column.
    pub company_contains: Option<String>,
    /// Empty means every status.
    pub statuses: Vec<ApplicationStatus>,
    pub next_event_after: Option<DateTime<Utc>>,
}

impl ApplicationFilter {
    pub fn owned_by(owner: OwnerId) -> Self {
        Self {
            owner,
            company_contains: None,
            statuses: Vec::new(),
            next_event_after: None,
        }
    }

    pub fn with_company_search(mut self, search: impl Into<String>) -> Self {
        self.company_contains = Some(search.into());
        self
    }

    pub fn with_statuses(mut self, statuses: Vec<ApplicationStatus>) -> Self {
        self.statuses = statuses;
        self
    }

    pub fn with_next_event_after(mut self, instant: DateTime<Utc>) -> Self {
        self.next_event_after = Some(instant);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// `updated_at` descending, then id descending.
    RecentlyUpdated,
    /// `next_event` ascending, then id ascending.
    SoonestEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    pub filter: ApplicationFilter,
    pub order: SortOrder,
    pub window: Option<Window>,
}

/// `{id, notes}` projection used to complete a summary page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesRow {
    pub id: ApplicationId,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCount {
    pub status: ApplicationStatus,
    pub count: u64,
}

/// Record store capability. The store owns rows and their lifecycle; callers only issue
/// intents. Mutations report the number of rows they touched so callers can detect a
/// predicate that matched nothing.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, row: NewApplication) -> Result<Application, RepositoryError>;
    fn find(&self, key: RowKey) -> Result<Option<Application>, RepositoryError>;
    fn select_summaries(
        &self,
        query: &SelectQuery,
    ) -> Result<Vec<ApplicationSummary>, RepositoryError>;
    fn select_full(&self, query: &SelectQuery) -> Result<Vec<Application>, RepositoryError>;
    fn select_notes(&self, ids: &[ApplicationId]) -> Result<Vec<NotesRow>, RepositoryError>;
    fn count(&self, filter: &ApplicationFilter) -> Result<u64, RepositoryError>;
    fn count_by_status(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<StatusCount>, RepositoryError>;
    fn update(
        &self,
        key: RowKey,
        change: RowChange,
        at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError>;
    fn soft_delete(&self, key: RowKey, at: DateTime<Utc>) -> Result<u64, RepositoryError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("constraint violated: {0}")]
    Constraint(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
