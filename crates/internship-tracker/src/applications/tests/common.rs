use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use axum::Router;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::applications::domain::{
    Application, ApplicationDraft, ApplicationId, ApplicationSummary, OwnerId,
};
use crate::applications::repository::{
    ApplicationFilter, ApplicationRepository, NewApplication, NotesRow, RepositoryError,
    RowChange, RowKey, SelectQuery, StatusCount,
};
use crate::applications::{
    application_router, ApplicationService, InMemoryApplicationRepository, TrackerState,
};
use crate::auth::{
    Authenticator, Credentials, InMemoryAuthenticator, Registration, SharedAuthenticator,
    MIN_PASSWORD_COST,
};
use crate::clock::Clock;
use crate::config::TrackerConfig;

pub(super) const ALICE: OwnerId = OwnerId(1);
pub(super) const BOB: OwnerId = OwnerId(2);

/// Clock the tests move by hand.
pub(super) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(super) fn starting_at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(now),
        })
    }

    pub(super) fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock lock");
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock")
    }
}

pub(super) fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0)
        .single()
        .expect("valid instant")
}

pub(super) fn build_service() -> (
    ApplicationService<InMemoryApplicationRepository>,
    Arc<InMemoryApplicationRepository>,
    Arc<ManualClock>,
) {
    let repository = Arc::new(InMemoryApplicationRepository::new());
    let clock = ManualClock::starting_at(epoch());
    let service = ApplicationService::new(Arc::clone(&repository), clock.clone());
    (service, repository, clock)
}

pub(super) fn draft(company: &str, position: &str) -> ApplicationDraft {
    ApplicationDraft {
        company: company.to_string(),
        position: position.to_string(),
        ..ApplicationDraft::default()
    }
}

/// Store whose every call fails as if the backing database were down.
pub(super) struct UnavailableRepository;

fn unavailable<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".into()))
}

impl ApplicationRepository for UnavailableRepository {
    fn insert(&self, _row: NewApplication) -> Result<Application, RepositoryError> {
        unavailable()
    }

    fn find(&self, _key: RowKey) -> Result<Option<Application>, RepositoryError> {
        unavailable()
    }

    fn select_summaries(
        &self,
        _query: &SelectQuery,
    ) -> Result<Vec<ApplicationSummary>, RepositoryError> {
        unavailable()
    }

    fn select_full(&self, _query: &SelectQuery) -> Result<Vec<Application>, RepositoryError> {
        unavailable()
    }

    fn select_notes(&self, _ids: &[ApplicationId]) -> Result<Vec<NotesRow>, RepositoryError> {
        unavailable()
    }

    fn count(&self, _filter: &ApplicationFilter) -> Result<u64, RepositoryError> {
        unavailable()
    }

    fn count_by_status(
        &self,
        _filter: &ApplicationFilter,
    ) -> Result<Vec<StatusCount>, RepositoryError> {
        unavailable()
    }

    fn update(
        &self,
        _key: RowKey,
        _change: RowChange,
        _at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        unavailable()
    }

    fn soft_delete(&self, _key: RowKey, _at: DateTime<Utc>) -> Result<u64, RepositoryError> {
        unavailable()
    }
}

/// Wraps the in-memory store but drops the notes projection for every id, to exercise
/// the merge of a page with a missing second-phase row.
pub(super) struct NotesDroppingRepository(pub(super) InMemoryApplicationRepository);

impl ApplicationRepository for NotesDroppingRepository {
    fn insert(&self, row: NewApplication) -> Result<Application, RepositoryError> {
        self.0.insert(row)
    }

    fn find(&self, key: RowKey) -> Result<Option<Application>, RepositoryError> {
        self.0.find(key)
    }

    fn select_summaries(
        &self,
        query: &SelectQuery,
    ) -> Result<Vec<ApplicationSummary>, RepositoryError> {
        self.0.select_summaries(query)
    }

    fn select_full(&self, query: &SelectQuery) -> Result<Vec<Application>, RepositoryError> {
        self.0.select_full(query)
    }

    fn select_notes(&self, _ids: &[ApplicationId]) -> Result<Vec<NotesRow>, RepositoryError> {
        Ok(Vec::new())
    }

    fn count(&self, filter: &ApplicationFilter) -> Result<u64, RepositoryError> {
        self.0.count(filter)
    }

    fn count_by_status(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<StatusCount>, RepositoryError> {
        self.0.count_by_status(filter)
    }

    fn update(
        &self,
        key: RowKey,
        change: RowChange,
        at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        self.0.update(key, change, at)
    }

    fn soft_delete(&self, key: RowKey, at: DateTime<Utc>) -> Result<u64, RepositoryError> {
        self.0.soft_delete(key, at)
    }
}

/// Router over a fresh store plus bearer tokens for two registered users.
pub(super) struct RouterHarness {
    pub(super) router: Router,
    pub(super) alice_token: String,
    pub(super) bob_token: String,
}

pub(super) fn router_harness() -> RouterHarness {
    router_harness_with(Arc::new(InMemoryApplicationRepository::new()))
}

pub(super) fn router_harness_with<R>(repository: Arc<R>) -> RouterHarness
where
    R: ApplicationRepository + 'static,
{
    let clock = ManualClock::starting_at(epoch());
    let authenticator: SharedAuthenticator = Arc::new(
        InMemoryAuthenticator::new(clock.clone(), Duration::hours(24))
            .with_password_cost(MIN_PASSWORD_COST),
    );
    let alice_token = sign_up(authenticator.as_ref(), "alice");
    let bob_token = sign_up(authenticator.as_ref(), "bob");

    let state = TrackerState {
        service: Arc::new(ApplicationService::new(repository, clock)),
        authenticator,
        settings: TrackerConfig::default(),
    };

    RouterHarness {
        router: application_router(state),
        alice_token,
        bob_token,
    }
}

fn sign_up(authenticator: &dyn Authenticator, username: &str) -> String {
    let email = format!("{username}@example.com");
    authenticator
        .register(Registration {
            username: username.to_string(),
            email: email.clone(),
            password: "hunter22".to_string(),
            ..Registration::default()
        })
        .expect("user registers");
    authenticator
        .login(Credentials {
            email,
            password: "hunter22".to_string(),
        })
        .expect("user logs in")
        .token
}

pub(super) fn json_request(method: &str, uri: &str, token: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).expect("json body")))
        .expect("request builds")
}

pub(super) fn get_request(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
