//! Internship application lifecycle and query engine, its record store capability, and the
//! HTTP routes that expose it.

pub mod domain;
mod lifecycle;
pub mod memory;
pub mod query;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Application, ApplicationDraft, ApplicationId, ApplicationStatistics, ApplicationStatus,
    ApplicationSummary, DeletionState, EventSchedule, FieldUpdate, OwnerId, NOT_PROVIDED,
};
pub use memory::InMemoryApplicationRepository;
pub use query::{ApplicationPage, ListRequest, RECENT_STATUSES};
pub use repository::{ApplicationRepository, RepositoryError};
pub use router::{application_router, TrackerState};
pub use service::{ApplicationError, ApplicationService};
