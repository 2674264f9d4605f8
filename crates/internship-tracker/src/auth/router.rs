use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::{error, warn};

use super::{AuthError, AuthenticatedUser, Credentials, Registration, SharedAuthenticator};

/// Registration, login, and profile endpoints. Mergeable into any router whose state can
/// hand out the shared authenticator.
pub fn auth_routes<S>() -> Router<S>
where
    SharedAuthenticator: FromRef<S>,
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/api/v1/auth/register", post(register_handler))
        .route("/api/v1/auth/login", post(login_handler))
        .route("/api/v1/users/me", get(profile_handler))
}

async fn register_handler(
    State(authenticator): State<SharedAuthenticator>,
    registration: Result<Json<Registration>, JsonRejection>,
) -> Result<Response, AuthError> {
    let Json(registration) = registration?;
    let profile = authenticator.register(registration)?;
    Ok((StatusCode::CREATED, Json(profile)).into_response())
}

async fn login_handler(
    State(authenticator): State<SharedAuthenticator>,
    credentials: Result<Json<Credentials>, JsonRejection>,
) -> Result<Response, AuthError> {
    let Json(credentials) = credentials?;
    let session = authenticator.login(credentials)?;
    Ok(Json(session).into_response())
}

async fn profile_handler(
    State(authenticator): State<SharedAuthenticator>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Response, AuthError> {
    let profile = authenticator.profile(user)?;
    Ok(Json(profile).into_response())
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthError::InvalidRegistration(_) | AuthError::MalformedRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AuthError::UsernameTaken | AuthError::EmailTaken => StatusCode::CONFLICT,
            AuthError::InvalidCredentials
            | AuthError::MissingToken
            | AuthError::InvalidToken
            | AuthError::SessionExpired => {
                warn!(reason = %self, "request rejected by authenticator");
                StatusCode::UNAUTHORIZED
            }
            AuthError::UnknownUser => StatusCode::NOT_FOUND,
            AuthError::Unavailable(reason) => {
                error!(%reason, "authenticator failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        AuthError::MalformedRequest(rejection.body_text())
    }
}
