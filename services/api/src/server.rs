use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryProfileStore};
use crate::routes::with_matching_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use kindred::config::AppConfig;
use kindred::error::AppError;
use kindred::matching::{load_roster, MatchingService};
use kindred::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) const ROSTER_GROUP_ID: &str = "roster";

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryProfileStore::default());
    if let Some(path) = args.roster.take() {
        let profiles = load_roster(&path)?;
        let group = store
            .seed(ROSTER_GROUP_ID, "Imported roster", profiles)
            .map_err(|err| AppError::Matching(err.into()))?;
        info!(path = %path.display(), group = %group.id, members = group.members.len(), "roster imported");
    }

    let matching_service = Arc::new(MatchingService::new(store, config.matching.clone()));

    let app = with_matching_routes(matching_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "kindred matching service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
