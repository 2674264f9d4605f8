use std::sync::Arc;

use super::domain::ApplicationId;
use super::repository::{ApplicationRepository, RepositoryError};
use crate::clock::Clock;

/// Stateless engine over an injected record store and clock.
///
/// Lifecycle operations (create, update, status, events, delete) live in `lifecycle.rs`;
/// listings and statistics live in `query.rs`. Every operation is one or more sequential
/// store calls with no transaction around them, so the service is safe to share across
/// concurrent requests behind an `Arc`.
pub struct ApplicationService<R> {
    pub(super) repository: Arc<R>,
    pub(super) clock: Arc<dyn Clock>,
}

impl<R> ApplicationService<R>
where
    R: ApplicationRepository + 'static,
{
    pub fn new(repository: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }
}

/// Error raised by the application service.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
    #[error("{field} is required")]
    Validation { field: &'static str },
    /// The request body, path, or query string could not be decoded.
    #[error("invalid request: {0}")]
    MalformedRequest(String),
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    /// Raised when the id does not exist or belongs to someone else; the two cases are
    /// reported identically.
    #[error("application {0} not found or not owned by the caller")]
    NotFoundOrForbidden(ApplicationId),
    #[error(transparent)]
    Storage(#[from] RepositoryError),
}
