use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};

use super::domain::{LeaseId, LeaseRequest, LeaseView, SigningOutcome, Termination};
use crate::workflows::error::WorkflowError;
use crate::workflows::extract::{ApiJson, ApiPath};
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
            "/api/v1/leases",
            get(list_handler::<S, D>).post(create_handler::<S, D>),
        )
        .route("/api/v1/leases/:lease_id", get(detail_handler::<S, D>))
        .route("/api/v1/leases/:lease_id/sign", post(sign_handler::<S, D>))
        .route(
            "/api/v1/leases/:lease_id/terminate",
            post(terminate_handler::<S, D>),
        )
}

pub(crate) async fn list_handler<S, D>(
    State(portal): State<Arc<Portal<S, D>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<LeaseView>>, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    Ok(Json(portal.leases().list(actor)?))
}

pub(crate) async fn create_handler<S, D>(
    State(portal): State<Arc<Portal<S, D>>>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<LeaseRequest>,
) -> Result<(StatusCode, Json<LeaseView>), WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    let lease = portal.leases().create(actor, request)?;
    Ok((StatusCode::CREATED, Json(lease)))
}

pub(crate) async fn detail_handler<S, D>(
    State(portal): State<Arc<Portal<S, D>>>,
    headers: HeaderMap,
    ApiPath(lease_id): ApiPath<u64>,
) -> Result<Json<LeaseView>, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    Ok(Json(portal.leases().get(actor, LeaseId(lease_id))?))
}

pub(crate) async fn sign_handler<S, D>(
    State(portal): State<Arc<Portal<S, D>>>,
    headers: HeaderMap,
    ApiPath(lease_id): ApiPath<u64>,
) -> Result<Json<SigningOutcome>, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    Ok(Json(portal.leases().sign(actor, LeaseId(lease_id))?))
}

pub(crate) async fn terminate_handler<S, D>(
    State(portal): State<Arc<Portal<S, D>>>,
    headers: HeaderMap,
    ApiPath(lease_id): ApiPath<u64>,
    ApiJson(termination): ApiJson<Termination>,
) -> Result<Json<LeaseView>, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    let lease = portal
        .leases()
        .terminate(actor, LeaseId(lease_id), termination)?;
    Ok(Json(lease))
}
