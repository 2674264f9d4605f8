use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use super::domain::{
    Application, ApplicationId, ApplicationStatistics, ApplicationStatus, ApplicationSummary,
    OwnerId,
};
use super::repository::{
    ApplicationFilter, ApplicationRepository, SelectQuery, SortOrder, Window,
};
use super::service::{ApplicationError, ApplicationService};

/// Statuses shown in the recent view. Rejected applications are left out.
pub const RECENT_STATUSES: [ApplicationStatus; 4] = [
    ApplicationStatus::Submitted,
    ApplicationStatus::Written,
    ApplicationStatus::Interview,
    ApplicationStatus::Accepted,
];

/// Paging, search, and status filter for a listing. Values below 1 are clamped to 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub page: u32,
    pub page_size: u32,
    pub search: Option<String>,
    pub statuses: Vec<ApplicationStatus>,
}

impl ListRequest {
    pub fn page(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size,
            search: None,
            statuses: Vec::new(),
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_statuses(mut self, statuses: Vec<ApplicationStatus>) -> Self {
        self.statuses = statuses;
        self
    }
}

/// One page of a listing plus the filtered total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationPage {
    pub applications: Vec<Application>,
    pub total: u64,
    pub current_page: u32,
    pub page_size: u32,
}

impl<R> ApplicationService<R>
where
    R: ApplicationRepository + 'static,
{
    /// Page through the owner's applications, most recently updated first.
    ///
    /// The page is read in two phases: a scan of the summary projection (no notes), then a
    /// fetch of `{id, notes}` for just the ids on the page, merged by id. A page row whose
    /// notes row is missing gets an empty string.
    pub fn list(
        &self,
        owner: OwnerId,
        request: ListRequest,
    ) -> Result<ApplicationPage, ApplicationError> {
        let current_page = request.page.max(1);
        let page_size = request.page_size.max(1);

        let mut filter = ApplicationFilter::owned_by(owner);
        if let Some(search) = request
            .search
            .as_deref()
            .map(str::trim)
            .filter(|search| !search.is_empty())
        {
            filter = filter.with_company_search(search);
        }
        if !request.statuses.is_empty() {
            filter = filter.with_statuses(request.statuses);
        }

        let total = self.repository.count(&filter)?;
        let window = Window {
            offset: u64::from(current_page - 1) * u64::from(page_size),
            limit: u64::from(page_size),
        };
        debug!(owner_id = %owner, ?filter, ?window, total, "listing applications");

        let summaries = self.repository.select_summaries(&SelectQuery {
            filter,
            order: SortOrder::RecentlyUpdated,
            window: Some(window),
        })?;

        let applications = if summaries.is_empty() {
            Vec::new()
        } else {
            self.attach_notes(summaries)?
        };

        Ok(ApplicationPage {
            applications,
            total,
            current_page,
            page_size,
        })
    }

    fn attach_notes(
        &self,
        summaries: Vec<ApplicationSummary>,
    ) -> Result<Vec<Application>, ApplicationError> {
        let ids: Vec<ApplicationId> = summaries.iter().map(|summary| summary.id).collect();
        let mut notes: HashMap<ApplicationId, String> = self
            .repository
            .select_notes(&ids)?
            .into_iter()
            .map(|row| (row.id, row.notes))
            .collect();

        Ok(summaries
            .into_iter()
            .map(|summary| {
                let text = notes.remove(&summary.id).unwrap_or_default();
                summary.with_notes(text)
            })
            .collect())
    }

    /// Most recently updated applications in [`RECENT_STATUSES`], at most `limit` rows.
    pub fn recent(
        &self,
        owner: OwnerId,
        limit: u64,
    ) -> Result<Vec<ApplicationSummary>, ApplicationError> {
        let filter = ApplicationFilter::owned_by(owner).with_statuses(RECENT_STATUSES.to_vec());
        let rows = self.repository.select_summaries(&SelectQuery {
            filter,
            order: SortOrder::RecentlyUpdated,
            window: Some(Window { offset: 0, limit }),
        })?;
        Ok(rows)
    }

    /// Applications whose next event is strictly after now, soonest first.
    pub fn upcoming_events(&self, owner: OwnerId) -> Result<Vec<Application>, ApplicationError> {
        let now = self.clock.now();
        let filter = ApplicationFilter::owned_by(owner).with_next_event_after(now);
        let rows = self.repository.select_full(&SelectQuery {
            filter,
            order: SortOrder::SoonestEvent,
            window: None,
        })?;
        debug!(owner_id = %owner, %now, upcoming = rows.len(), "loaded upcoming events");
        Ok(rows)
    }

    /// Count of the owner's applications per known status.
    pub fn statistics(&self, owner: OwnerId) -> Result<ApplicationStatistics, ApplicationError> {
        let filter =
            ApplicationFilter::owned_by(owner).with_statuses(ApplicationStatus::KNOWN.to_vec());
        let mut statistics = ApplicationStatistics::default();
        for group in self.repository.count_by_status(&filter)? {
            statistics.record(&group.status, group.count);
        }
        Ok(statistics)
    }
}
