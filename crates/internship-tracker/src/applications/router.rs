use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRef, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{ApplicationDraft, ApplicationId, ApplicationStatus, EventSchedule, FieldUpdate};
use super::query::ListRequest;
use super::repository::ApplicationRepository;
use super::service::{ApplicationError, ApplicationService};
use crate::auth::{auth_routes, AuthenticatedUser, SharedAuthenticator};
use crate::config::TrackerConfig;

/// Shared state behind every tracker route.
pub struct TrackerState<R> {
    pub service: Arc<ApplicationService<R>>,
    pub authenticator: SharedAuthenticator,
    pub settings: TrackerConfig,
}

impl<R> Clone for TrackerState<R> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            authenticator: Arc::clone(&self.authenticator),
            settings: self.settings.clone(),
        }
    }
}

impl<R> FromRef<TrackerState<R>> for SharedAuthenticator {
    fn from_ref(state: &TrackerState<R>) -> Self {
        Arc::clone(&state.authenticator)
    }
}

/// Router builder exposing the authentication endpoints and the bearer-protected
/// application endpoints.
pub fn application_router<R>(state: TrackerState<R>) -> Router
where
    R: ApplicationRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/applications",
            get(list_handler::<R>).post(create_handler::<R>),
        )
        .route("/api/v1/applications/recent", get(recent_handler::<R>))
        .route(
            "/api/v1/applications/statistics",
            get(statistics_handler::<R>),
        )
        .route(
            "/api/v1/applications/upcoming-events",
            get(upcoming_events_handler::<R>),
        )
        .route(
            "/api/v1/applications/:application_id",
            put(update_handler::<R>).delete(delete_handler::<R>),
        )
        .route(
            "/api/v1/applications/:application_id/status",
            put(status_handler::<R>),
        )
        .route(
            "/api/v1/applications/:application_id/event",
            put(event_handler::<R>),
        )
        .merge(auth_routes())
        .with_state(state)
}

/// Query string accepted by the listing endpoint. `pageSize` is accepted as an alias and
/// `statuses` is a comma-separated list. Non-numeric page values count as 0 and are then
/// clamped to 1.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ListParams {
    page: Option<String>,
    #[serde(alias = "pageSize")]
    page_size: Option<String>,
    search: Option<String>,
    statuses: Option<String>,
}

impl ListParams {
    fn into_request(self, default_page_size: u32) -> ListRequest {
        let page = self.page.as_deref().map_or(1, lenient_u32);
        let page_size = self
            .page_size
            .as_deref()
            .map_or(default_page_size, lenient_u32);
        let mut request = ListRequest::page(page, page_size);
        if let Some(search) = self.search {
            request = request.with_search(search);
        }
        if let Some(raw) = self.statuses {
            request = request.with_statuses(parse_statuses(&raw));
        }
        request
    }
}

fn lenient_u32(raw: &str) -> u32 {
    let value = raw.trim().parse::<i64>().unwrap_or(0);
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

fn parse_statuses(raw: &str) -> Vec<ApplicationStatus> {
    raw.split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(ApplicationStatus::from)
        .collect()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RecentParams {
    limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusChange {
    status: ApplicationStatus,
}

pub(crate) async fn list_handler<R>(
    State(state): State<TrackerState<R>>,
    AuthenticatedUser(owner): AuthenticatedUser,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Response, ApplicationError>
where
    R: ApplicationRepository + 'static,
{
    let Query(params) = params?;
    let request = params.into_request(state.settings.default_page_size);
    let page = state.service.list(owner, request)?;
    Ok(Json(page).into_response())
}

pub(crate) async fn create_handler<R>(
    State(state): State<TrackerState<R>>,
    AuthenticatedUser(owner): AuthenticatedUser,
    draft: Result<Json<ApplicationDraft>, JsonRejection>,
) -> Result<Response, ApplicationError>
where
    R: ApplicationRepository + 'static,
{
    let Json(draft) = draft?;
    let application = state.service.create(owner, draft)?;
    Ok((StatusCode::CREATED, Json(application)).into_response())
}

pub(crate) async fn recent_handler<R>(
    State(state): State<TrackerState<R>>,
    AuthenticatedUser(owner): AuthenticatedUser,
    params: Result<Query<RecentParams>, QueryRejection>,
) -> Result<Response, ApplicationError>
where
    R: ApplicationRepository + 'static,
{
    let Query(params) = params?;
    let limit = params.limit.unwrap_or(state.settings.recent_limit);
    let applications = state.service.recent(owner, limit)?;
    Ok(Json(json!({ "applications": applications })).into_response())
}

pub(crate) async fn statistics_handler<R>(
    State(state): State<TrackerState<R>>,
    AuthenticatedUser(owner): AuthenticatedUser,
) -> Result<Response, ApplicationError>
where
    R: ApplicationRepository + 'static,
{
    let statistics = state.service.statistics(owner)?;
    Ok(Json(json!({ "statistics": statistics })).into_response())
}

pub(crate) async fn upcoming_events_handler<R>(
    State(state): State<TrackerState<R>>,
    AuthenticatedUser(owner): AuthenticatedUser,
) -> Result<Response, ApplicationError>
where
    R: ApplicationRepository + 'static,
{
    let applications = state.service.upcoming_events(owner)?;
    Ok(Json(json!({ "applications": applications })).into_response())
}

pub(crate) async fn update_handler<R>(
    State(state): State<TrackerState<R>>,
    AuthenticatedUser(owner): AuthenticatedUser,
    application_id: Result<Path<u64>, PathRejection>,
    update: Result<Json<FieldUpdate>, JsonRejection>,
) -> Result<Response, ApplicationError>
where
    R: ApplicationRepository + 'static,
{
    let Path(application_id) = application_id?;
    let Json(update) = update?;
    let id = ApplicationId(application_id);
    state.service.update_fields(id, owner, update)?;
    Ok(Json(json!({ "id": id, "message": "updated" })).into_response())
}

pub(crate) async fn status_handler<R>(
    State(state): State<TrackerState<R>>,
    AuthenticatedUser(_owner): AuthenticatedUser,
    application_id: Result<Path<u64>, PathRejection>,
    change: Result<Json<StatusChange>, JsonRejection>,
) -> Result<Response, ApplicationError>
where
    R: ApplicationRepository + 'static,
{
    let Path(application_id) = application_id?;
    let Json(change) = change?;
    if change.status.label().trim().is_empty() {
        return Err(ApplicationError::Validation { field: "status" });
    }

    let id = ApplicationId(application_id);
    let label = change.status.label().to_string();
    state.service.set_status(id, change.status)?;
    Ok(Json(json!({ "id": id, "status": label })).into_response())
}

pub(crate) async fn event_handler<R>(
    State(state): State<TrackerState<R>>,
    AuthenticatedUser(_owner): AuthenticatedUser,
    application_id: Result<Path<u64>, PathRejection>,
    schedule: Result<Json<EventSchedule>, JsonRejection>,
) -> Result<Response, ApplicationError>
where
    R: ApplicationRepository + 'static,
{
    let Path(application_id) = application_id?;
    let Json(schedule) = schedule?;
    let id = ApplicationId(application_id);
    state.service.schedule_event(id, schedule)?;
    Ok(Json(json!({ "id": id, "message": "event scheduled" })).into_response())
}

pub(crate) async fn delete_handler<R>(
    State(state): State<TrackerState<R>>,
    AuthenticatedUser(owner): AuthenticatedUser,
    application_id: Result<Path<u64>, PathRejection>,
) -> Result<Response, ApplicationError>
where
    R: ApplicationRepository + 'static,
{
    let Path(application_id) = application_id?;
    let id = ApplicationId(application_id);
    state.service.delete(id, owner)?;
    Ok(Json(json!({ "id": id, "message": "deleted" })).into_response())
}

impl IntoResponse for ApplicationError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApplicationError::Validation { .. } | ApplicationError::MalformedRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApplicationError::NotFound(_) | ApplicationError::NotFoundOrForbidden(_) => {
                StatusCode::NOT_FOUND
            }
            ApplicationError::Storage(err) => {
                error!(error = %err, "record store failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<JsonRejection> for ApplicationError {
    fn from(rejection: JsonRejection) -> Self {
        ApplicationError::MalformedRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApplicationError {
    fn from(rejection: QueryRejection) -> Self {
        ApplicationError::MalformedRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApplicationError {
    fn from(rejection: PathRejection) -> Self {
        ApplicationError::MalformedRequest(rejection.body_text())
    }
}
