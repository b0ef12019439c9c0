use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};

use super::domain::{AccommodationDraft, AccommodationId, AccommodationView};
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
            "/api/v1/accommodations",
            get(list_handler::<S, D>).post(create_handler::<S, D>),
        )
        .route(
            "/api/v1/accommodations/:accommodation_id",
            get(detail_handler::<S, D>)
                .put(update_handler::<S, D>)
                .delete(delete_handler::<S, D>),
        )
}

pub(crate) async fn list_handler<S, D>(
    State(portal): State<Arc<Portal<S, D>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<AccommodationView>>, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    Ok(Json(portal.accommodations().list(actor)?))
}

pub(crate) async fn detail_handler<S, D>(
    State(portal): State<Arc<Portal<S, D>>>,
    headers: HeaderMap,
    ApiPath(accommodation_id): ApiPath<u64>,
) -> Result<Json<AccommodationView>, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    let view = portal
        .accommodations()
        .get(actor, AccommodationId(accommodation_id))?;
    Ok(Json(view))
}

pub(crate) async fn create_handler<S, D>(
    State(portal): State<Arc<Portal<S, D>>>,
    headers: HeaderMap,
    ApiJson(draft): ApiJson<AccommodationDraft>,
) -> Result<(StatusCode, Json<AccommodationView>), WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    let view = portal.accommodations().create(actor, draft)?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub(crate) async fn update_handler<S, D>(
    State(portal): State<Arc<Portal<S, D>>>,
    headers: HeaderMap,
    ApiPath(accommodation_id): ApiPath<u64>,
    ApiJson(draft): ApiJson<AccommodationDraft>,
) -> Result<Json<AccommodationView>, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    let view = portal
        .accommodations()
        .update(actor, AccommodationId(accommodation_id), draft)?;
    Ok(Json(view))
}

pub(crate) async fn delete_handler<S, D>(
    State(portal): State<Arc<Portal<S, D>>>,
    headers: HeaderMap,
    ApiPath(accommodation_id): ApiPath<u64>,
) -> Result<StatusCode, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    portal
        .accommodations()
        .delete(actor, AccommodationId(accommodation_id))?;
    Ok(StatusCode::NO_CONTENT)
}
