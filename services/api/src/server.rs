use crate::cli::ServeArgs;
use crate::infra::{AppState, LogDispatcher};
use crate::routes::with_portal_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use student_housing::config::AppConfig;
use student_housing::error::AppError;
use student_housing::telemetry;
use student_housing::workflows::{Portal, PortalSettings, SqliteHousingStore};
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(database_url) = args.database_url.take() {
        config.storage.database_url = database_url;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = SqliteHousingStore::connect(&config.storage.database_url)?;
    let portal = Arc::new(Portal::new(
        Arc::new(store),
        Arc::new(LogDispatcher),
        PortalSettings::from_config(&config),
    ));
    if let Some(master) = portal.accounts().ensure_master_admin(&config.seed_admin)? {
        info!(username = %master.username, "master admin account created");
    }

    let app = with_portal_routes(portal)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        app = %config.messaging.app_name,
        "student housing portal ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
