use internship_tracker::applications::{
    ApplicationService, InMemoryApplicationRepository, TrackerState,
};
use internship_tracker::auth::{InMemoryAuthenticator, SharedAuthenticator};
use internship_tracker::clock::{Clock, SystemClock};
use internship_tracker::config::AppConfig;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Operational state shared by the health, readiness, and metrics endpoints.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Wire the in-memory record store and authenticator behind the tracker routes.
pub(crate) fn tracker_state(
    config: &AppConfig,
    clock: Arc<dyn Clock>,
) -> TrackerState<InMemoryApplicationRepository> {
    let repository = Arc::new(InMemoryApplicationRepository::new());
    let authenticator: SharedAuthenticator = Arc::new(InMemoryAuthenticator::new(
        Arc::clone(&clock),
        config.auth.session_ttl(),
    )
    .with_password_cost(config.auth.password_cost));

    TrackerState {
        service: Arc::new(ApplicationService::new(repository, clock)),
        authenticator,
        settings: config.tracker.clone(),
    }
}

pub(crate) fn system_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}
