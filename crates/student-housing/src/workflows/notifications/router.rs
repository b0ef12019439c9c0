use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};

use serde::Serialize;

use super::dispatch::MessageDispatcher;
use super::domain::{
    BroadcastReport, BroadcastRequest, Inbox, InboxQuery, Notification, NotificationId,
};
use crate::workflows::error::WorkflowError;
use crate::workflows::extract::{ApiJson, ApiPath, ApiQuery};
use crate::workflows::portal::Portal;
use crate::workflows::storage::HousingStore;

pub fn routes<S, D>() -> Router<Arc<Portal<S, D>>>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    Router::new()
        .route("/api/v1/notifications", get(inbox_handler::<S, D>))
        .route(
            "/api/v1/notifications/unread-count",
            get(unread_count_handler::<S, D>),
        )
        .route(
            "/api/v1/notifications/read-all",
            post(mark_all_read_handler::<S, D>),
        )
        .route(
            "/api/v1/notifications/broadcast",
            post(broadcast_handler::<S, D>),
        )
        .route(
            "/api/v1/notifications/:notification_id/read",
            post(mark_read_handler::<S, D>),
        )
}

#[derive(Debug, Serialize)]
pub(crate) struct UnreadCount {
    unread: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct MarkedRead {
    marked: usize,
}

pub(crate) async fn inbox_handler<S, D>(
    State(portal): State<Arc<Portal<S, D>>>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<InboxQuery>,
) -> Result<Json<Inbox>, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    Ok(Json(portal.notifications().inbox(actor, &query)?))
}

pub(crate) async fn unread_count_handler<S, D>(
    State(portal): State<Arc<Portal<S, D>>>,
    headers: HeaderMap,
) -> Result<Json<UnreadCount>, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    let unread = portal.notifications().unread_count(actor)?;
    Ok(Json(UnreadCount { unread }))
}

pub(crate) async fn mark_read_handler<S, D>(
    State(portal): State<Arc<Portal<S, D>>>,
    headers: HeaderMap,
    ApiPath(notification_id): ApiPath<u64>,
) -> Result<Json<Notification>, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    let notification = portal
        .notifications()
        .mark_read(actor, NotificationId(notification_id))?;
    Ok(Json(notification))
}

pub(crate) async fn mark_all_read_handler<S, D>(
    State(portal): State<Arc<Portal<S, D>>>,
    headers: HeaderMap,
) -> Result<Json<MarkedRead>, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    let marked = portal.notifications().mark_all_read(actor)?;
    Ok(Json(MarkedRead { marked }))
}

pub(crate) async fn broadcast_handler<S, D>(
    State(portal): State<Arc<Portal<S, D>>>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<BroadcastRequest>,
) -> Result<Json<BroadcastReport>, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    Ok(Json(portal.notifications().broadcast(actor, request)?))
}
