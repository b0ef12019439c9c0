use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, put},
    Json, Router,
};

use super::domain::{
    MaintenanceFilter, MaintenanceId, MaintenanceRequest, MaintenanceSubmission, StatusUpdate,
};
use crate::workflows::error::WorkflowError;
use crate::workflows::extract::{ApiJson, ApiPath, ApiQuery};
use crate::workflows::notifications::MessageDispatcher;
use crate::workflows::portal::Portal;
use crate::workflows::storage::HousingStore;

pub fn routes<S, D>() -> Router<Arc<Portal<S, D>>>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    Router::new()
        .route(
            "/api/v1/maintenance",
            get(list_handler::<S, D>).post(submit_handler::<S, D>),
        )
        .route("/api/v1/maintenance/:request_id", get(detail_handler::<S, D>))
        .route(
            "/api/v1/maintenance/:request_id/status",
            put(status_handler::<S, D>),
        )
}

pub(crate) async fn list_handler<S, D>(
    State(portal): State<Arc<Portal<S, D>>>,
    headers: HeaderMap,
    ApiQuery(filter): ApiQuery<MaintenanceFilter>,
) -> Result<Json<Vec<MaintenanceRequest>>, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    Ok(Json(portal.maintenance().list(actor, &filter)?))
}

pub(crate) async fn submit_handler<S, D>(
    State(portal): State<Arc<Portal<S, D>>>,
    headers: HeaderMap,
    ApiJson(submission): ApiJson<MaintenanceSubmission>,
) -> Result<(StatusCode, Json<MaintenanceRequest>), WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    let request = portal.maintenance().submit(actor, submission)?;
    Ok((StatusCode::CREATED, Json(request)))
}

pub(crate) async fn detail_handler<S, D>(
    State(portal): State<Arc<Portal<S, D>>>,
    headers: HeaderMap,
    ApiPath(request_id): ApiPath<u64>,
) -> Result<Json<MaintenanceRequest>, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    Ok(Json(
        portal.maintenance().get(actor, MaintenanceId(request_id))?,
    ))
}

pub(crate) async fn status_handler<S, D>(
    State(portal): State<Arc<Portal<S, D>>>,
    headers: HeaderMap,
    ApiPath(request_id): ApiPath<u64>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> Result<Json<MaintenanceRequest>, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    let request = portal
        .maintenance()
        .update_status(actor, MaintenanceId(request_id), update)?;
    Ok(Json(request))
}
