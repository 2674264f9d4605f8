use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, ApplicationSummary, DeletionState,
};
use super::repository::{
    ApplicationFilter, ApplicationRepository, NewApplication, NotesRow, RepositoryError, RowChange,
    RowKey, SelectQuery, SortOrder, StatusCount,
};

#[derive(Debug, Clone)]
struct StoredRow {
    application: Application,
    deletion: DeletionState,
}

#[derive(Debug, Default)]
struct Table {
    rows: Vec<StoredRow>,
    last_id: u64,
}

impl Table {
    fn active(&self) -> impl Iterator<Item = &Application> {
        self.rows
            .iter()
            .filter(|row| row.deletion.is_active())
            .map(|row| &row.application)
    }

    fn active_matching(&mut self, key: RowKey) -> impl Iterator<Item = &mut StoredRow> {
        self.rows
            .iter_mut()
            .filter(move |row| row.deletion.is_active() && key.matches(&row.application))
    }

    fn select(&self, query: &SelectQuery) -> Vec<&Application> {
        let mut rows: Vec<&Application> = self
            .active()
            .filter(|application| matches_filter(&query.filter, application))
            .collect();

        match query.order {
            SortOrder::RecentlyUpdated => rows.sort_by(|a, b| {
                b.updated_at
                    .cmp(&a.updated_at)
                    .then_with(|| b.id.cmp(&a.id))
            }),
            SortOrder::SoonestEvent => rows.sort_by(|a, b| {
                a.next_event
                    .cmp(&b.next_event)
                    .then_with(|| a.id.cmp(&b.id))
            }),
        }

        match query.window {
            Some(window) => {
                let offset = usize::try_from(window.offset).unwrap_or(usize::MAX);
                let limit = usize::try_from(window.limit).unwrap_or(usize::MAX);
                rows.into_iter().skip(offset).take(limit).collect()
            }
            None => rows,
        }
    }
}

fn matches_filter(filter: &ApplicationFilter, application: &Application) -> bool {
    application.owner_id == filter.owner
        && filter
            .company_contains
            .as_deref()
            .map_or(true, |needle| contains_ignore_case(&application.company, needle))
        && (filter.statuses.is_empty() || filter.statuses.contains(&application.status))
        && filter.next_event_after.map_or(true, |after| {
            application.next_event.is_some_and(|event| event > after)
        })
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn apply_change(application: &mut Application, change: &RowChange) {
    match change {
        RowChange::Fields(fields) => {
            application.company = fields.company.clone();
            application.position = fields.position.clone();
            application.event_link = fields.event_link.clone();
            application.location = fields.location.clone();
            application.salary = fields.salary.clone();
            application.contact_info = fields.contact_info.clone();
            application.notes = fields.notes.clone();
        }
        RowChange::Status(status) => application.status = status.clone(),
        RowChange::Event(schedule) => {
            application.next_event = schedule.next_event;
            application.event_type = schedule.event_type.clone();
            application.event_link = schedule.event_link.clone();
        }
    }
}

/// Process-local record store. Company search is case-insensitive.
#[derive(Debug, Default, Clone)]
pub struct InMemoryApplicationRepository {
    table: Arc<Mutex<Table>>,
}

impl InMemoryApplicationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Table>, RepositoryError> {
        self.table
            .lock()
            .map_err(|_| RepositoryError::Unavailable("application table lock poisoned".into()))
    }

    /// Direct lookup of a row's deletion marker, soft-deleted rows included.
    pub fn deletion_state(
        &self,
        id: ApplicationId,
    ) -> Result<Option<DeletionState>, RepositoryError> {
        let table = self.lock()?;
        let state = table
            .rows
            .iter()
            .find(|row| row.application.id == id)
            .map(|row| row.deletion);
        Ok(state)
    }
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn insert(&self, row: NewApplication) -> Result<Application, RepositoryError> {
        if row.company.is_empty() || row.position.is_empty() {
            return Err(RepositoryError::Constraint(
                "company and position must not be empty".into(),
            ));
        }

        let mut table = self.lock()?;
        table.last_id += 1;
        let application = row.into_application(ApplicationId(table.last_id));
        table.rows.push(StoredRow {
            application: application.clone(),
            deletion: DeletionState::Active,
        });
        Ok(application)
    }

    fn find(&self, key: RowKey) -> Result<Option<Application>, RepositoryError> {
        let table = self.lock()?;
        let found = table
            .active()
            .find(|application| key.matches(application))
            .cloned();
        Ok(found)
    }

    fn select_summaries(
        &self,
        query: &SelectQuery,
    ) -> Result<Vec<ApplicationSummary>, RepositoryError> {
        let table = self.lock()?;
        let summaries = table
            .select(query)
            .into_iter()
            .map(Application::summary)
            .collect();
        Ok(summaries)
    }

    fn select_full(&self, query: &SelectQuery) -> Result<Vec<Application>, RepositoryError> {
        let table = self.lock()?;
        let rows = table.select(query).into_iter().cloned().collect();
        Ok(rows)
    }

    fn select_notes(&self, ids: &[ApplicationId]) -> Result<Vec<NotesRow>, RepositoryError> {
        let table = self.lock()?;
        let notes = table
            .active()
            .filter(|application| ids.contains(&application.id))
            .map(|application| NotesRow {
                id: application.id,
                notes: application.notes.clone(),
            })
            .collect();
        Ok(notes)
    }

    fn count(&self, filter: &ApplicationFilter) -> Result<u64, RepositoryError> {
        let table = self.lock()?;
        let matching = table
            .active()
            .filter(|application| matches_filter(filter, application))
            .count();
        Ok(matching as u64)
    }

    fn count_by_status(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<StatusCount>, RepositoryError> {
        let table = self.lock()?;
        let mut groups: BTreeMap<ApplicationStatus, u64> = BTreeMap::new();
        for application in table
            .active()
            .filter(|application| matches_filter(filter, application))
        {
            *groups.entry(application.status.clone()).or_default() += 1;
        }

        Ok(groups
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect())
    }

    fn update(
        &self,
        key: RowKey,
        change: RowChange,
        at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let mut table = self.lock()?;
        let mut touched = 0;
        for row in table.active_matching(key) {
            apply_change(&mut row.application, &change);
            row.application.updated_at = at;
            touched += 1;
        }
        Ok(touched)
    }

    fn soft_delete(&self, key: RowKey, at: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut table = self.lock()?;
        let mut touched = 0;
        for row in table.active_matching(key) {
            row.deletion = DeletionState::Deleted { at };
            touched += 1;
        }
        Ok(touched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applications::domain::OwnerId;
    use crate::applications::repository::Window;
    use chrono::{Duration, TimeZone};

    fn instant(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, minute, 0)
            .single()
            .expect("valid instant")
    }

    fn row(owner: u64, company: &str, at: DateTime<Utc>) -> NewApplication {
        NewApplication {
            owner_id: OwnerId(owner),
            company: company.to_string(),
            position: "Intern".to_string(),
            status: ApplicationStatus::Submitted,
            apply_date: at,
            next_event: None,
            event_type: None,
            event_link: None,
            location: "none".to_string(),
            salary: "none".to_string(),
            contact_info: "none".to_string(),
            notes: format!("notes for {company}"),
            recorded_at: at,
        }
    }

    #[test]
    fn insert_assigns_increasing_ids() {
        let store = InMemoryApplicationRepository::new();
        let first = store.insert(row(1, "Acme", instant(0))).expect("insert");
        let second = store.insert(row(1, "Globex", instant(1))).expect("insert");
        assert!(second.id > first.id);
    }

    #[test]
    fn soft_deleted_rows_are_retained_but_invisible() {
        let store = InMemoryApplicationRepository::new();
        let stored = store.insert(row(1, "Acme", instant(0))).expect("insert");

        let deleted = store
            .soft_delete(RowKey::Id(stored.id), instant(5))
            .expect("delete");
        assert_eq!(deleted, 1);

        assert!(store.find(RowKey::Id(stored.id)).expect("find").is_none());
        assert_eq!(
            store
                .count(&ApplicationFilter::owned_by(OwnerId(1)))
                .expect("count"),
            0
        );
        assert_eq!(
            store.deletion_state(stored.id).expect("lookup"),
            Some(DeletionState::Deleted { at: instant(5) })
        );
        let touched = store
            .update(
                RowKey::Id(stored.id),
                RowChange::Status(ApplicationStatus::Accepted),
                instant(6),
            )
            .expect("update");
        assert_eq!(touched, 0);
    }

    #[test]
    fn recently_updated_order_breaks_ties_by_id() {
        let store = InMemoryApplicationRepository::new();
        let same = instant(0);
        let first = store.insert(row(1, "Acme", same)).expect("insert");
        let second = store.insert(row(1, "Globex", same)).expect("insert");

        let rows = store
            .select_summaries(&SelectQuery {
                filter: ApplicationFilter::owned_by(OwnerId(1)),
                order: SortOrder::RecentlyUpdated,
                window: None,
            })
            .expect("select");
        let ids: Vec<_> = rows.iter().map(|row| row.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn company_search_ignores_case_and_window_applies_after_ordering() {
        let store = InMemoryApplicationRepository::new();
        store.insert(row(1, "Acme Robotics", instant(0))).expect("insert");
        store.insert(row(1, "Globex", instant(1))).expect("insert");
        store.insert(row(1, "ACME Foods", instant(2))).expect("insert");

        let filter = ApplicationFilter::owned_by(OwnerId(1)).with_company_search("acme");
        assert_eq!(store.count(&filter).expect("count"), 2);

        let rows = store
            .select_full(&SelectQuery {
                filter,
                order: SortOrder::RecentlyUpdated,
                window: Some(Window {
                    offset: 1,
                    limit: 5,
                }),
            })
            .expect("select");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].company, "Acme Robotics");
    }

    #[test]
    fn next_event_filter_is_strict() {
        let store = InMemoryApplicationRepository::new();
        let now = instant(30);
        let mut at_now = row(1, "Acme", instant(0));
        at_now.next_event = Some(now);
        let mut later = row(1, "Globex", instant(0));
        later.next_event = Some(now + Duration::minutes(1));
        store.insert(at_now).expect("insert");
        store.insert(later).expect("insert");

        let filter = ApplicationFilter::owned_by(OwnerId(1)).with_next_event_after(now);
        let rows = store
            .select_full(&SelectQuery {
                filter,
                order: SortOrder::SoonestEvent,
                window: None,
            })
            .expect("select");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].company, "Globex");
    }

    #[test]
    fn find_respects_the_owner_in_the_key() {
        let store = InMemoryApplicationRepository::new();
        let stored = store.insert(row(1, "Acme", instant(0))).expect("insert");

        let owned = store
            .find(RowKey::Owned {
                id: stored.id,
                owner: OwnerId(1),
            })
            .expect("find");
        assert_eq!(owned.map(|application| application.company), Some("Acme".to_string()));
        let foreign = store
            .find(RowKey::Owned {
                id: stored.id,
                owner: OwnerId(2),
            })
            .expect("find");
        assert!(foreign.is_none());
    }

    #[test]
    fn insert_rejects_empty_required_columns() {
        let store = InMemoryApplicationRepository::new();
        let result = store.insert(row(1, "", instant(0)));
        assert!(matches!(result, Err(RepositoryError::Constraint(_))));
    }
}
