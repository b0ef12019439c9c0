use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};

use super::domain::{
    Application, ApplicationFilter, ApplicationId, ApplicationRequest, ApprovalOutcome,
    ApprovalTerms, Rejection,
};
use crate::workflows::error::WorkflowError;
use crate::workflows::extract::{ApiJson, ApiPath, ApiQuery, OptionalJson};
use crate::workflows::notifications::MessageDispatcher;
use crate::workflows::portal::Portal;
use crate::workflows::storage::HousingStore;

/// Routes for submitting and deciding applications.
pub fn routes<S, D>() -> Router<Arc<Portal<S, D>>>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    Router::new()
        .route(
            "/api/v1/applications",
            get(list_handler::<S, D>).post(submit_handler::<S, D>),
        )
        .route(
            "/api/v1/applications/:application_id",
            get(detail_handler::<S, D>),
        )
        .route(
            "/api/v1/applications/:application_id/approve",
            post(approve_handler::<S, D>),
        )
        .route(
            "/api/v1/applications/:application_id/reject",
            post(reject_handler::<S, D>),
        )
}

pub(crate) async fn submit_handler<S, D>(
    State(portal): State<Arc<Portal<S, D>>>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<ApplicationRequest>,
) -> Result<(StatusCode, Json<Application>), WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    let application = portal.applications().submit(actor, request)?;
    Ok((StatusCode::CREATED, Json(application)))
}

pub(crate) async fn list_handler<S, D>(
    State(portal): State<Arc<Portal<S, D>>>,
    headers: HeaderMap,
    ApiQuery(filter): ApiQuery<ApplicationFilter>,
) -> Result<Json<Vec<Application>>, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    Ok(Json(portal.applications().list(actor, &filter)?))
}

pub(crate) async fn detail_handler<S, D>(
    State(portal): State<Arc<Portal<S, D>>>,
    headers: HeaderMap,
    ApiPath(application_id): ApiPath<u64>,
) -> Result<Json<Application>, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    let application = portal
        .applications()
        .get(actor, ApplicationId(application_id))?;
    Ok(Json(application))
}

pub(crate) async fn approve_handler<S, D>(
    State(portal): State<Arc<Portal<S, D>>>,
    headers: HeaderMap,
    ApiPath(application_id): ApiPath<u64>,
    OptionalJson(terms): OptionalJson<ApprovalTerms>,
) -> Result<Json<ApprovalOutcome>, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    let outcome = portal
        .applications()
        .approve(actor, ApplicationId(application_id), terms)?;
    Ok(Json(outcome))
}

pub(crate) async fn reject_handler<S, D>(
    State(portal): State<Arc<Portal<S, D>>>,
    headers: HeaderMap,
    ApiPath(application_id): ApiPath<u64>,
    OptionalJson(rejection): OptionalJson<Rejection>,
) -> Result<Json<Application>, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    let application = portal
        .applications()
        .reject(actor, ApplicationId(application_id), rejection)?;
    Ok(Json(application))
}
