use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};

use super::domain::{InvoiceDraft, InvoiceFilter, InvoiceId, InvoiceView, Payment};
use crate::workflows::error::WorkflowError;
use crate::workflows::extract::{ApiJson, ApiPath, ApiQuery};
use crate::workflows::notifications::{Delivery, MessageDispatcher};
use crate::workflows::portal::Portal;
use crate::workflows::storage::HousingStore;

pub fn routes<S, D>() -> Router<Arc<Portal<S, D>>>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    Router::new()
        .route(
            "/api/v1/invoices",
            get(list_handler::<S, D>).post(create_handler::<S, D>),
        )
        .route("/api/v1/invoices/:invoice_id", get(detail_handler::<S, D>))
        .route("/api/v1/invoices/:invoice_id/pay", post(pay_handler::<S, D>))
        .route(
            "/api/v1/invoices/:invoice_id/remind",
            post(remind_handler::<S, D>),
        )
}

pub(crate) async fn list_handler<S, D>(
    State(portal): State<Arc<Portal<S, D>>>,
    headers: HeaderMap,
    ApiQuery(filter): ApiQuery<InvoiceFilter>,
) -> Result<Json<Vec<InvoiceView>>, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    Ok(Json(portal.invoices().list(actor, &filter)?))
}

pub(crate) async fn detail_handler<S, D>(
    State(portal): State<Arc<Portal<S, D>>>,
    headers: HeaderMap,
    ApiPath(invoice_id): ApiPath<u64>,
) -> Result<Json<InvoiceView>, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    Ok(Json(portal.invoices().get(actor, InvoiceId(invoice_id))?))
}

pub(crate) async fn create_handler<S, D>(
    State(portal): State<Arc<Portal<S, D>>>,
    headers: HeaderMap,
    ApiJson(draft): ApiJson<InvoiceDraft>,
) -> Result<(StatusCode, Json<InvoiceView>), WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    let invoice = portal.invoices().create(actor, draft)?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub(crate) async fn pay_handler<S, D>(
    State(portal): State<Arc<Portal<S, D>>>,
    headers: HeaderMap,
    ApiPath(invoice_id): ApiPath<u64>,
    ApiJson(payment): ApiJson<Payment>,
) -> Result<Json<InvoiceView>, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    let invoice = portal
        .invoices()
        .mark_paid(actor, InvoiceId(invoice_id), payment)?;
    Ok(Json(invoice))
}

pub(crate) async fn remind_handler<S, D>(
    State(portal): State<Arc<Portal<S, D>>>,
    headers: HeaderMap,
    ApiPath(invoice_id): ApiPath<u64>,
) -> Result<Json<Delivery>, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    Ok(Json(portal.invoices().remind(actor, InvoiceId(invoice_id))?))
}
