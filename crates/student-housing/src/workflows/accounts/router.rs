use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};

use serde::Deserialize;

use super::domain::{
    AccountView, AdminUpdate, Credentials, LoginResponse, NewAccount, PasswordChange,
    PasswordReset, ProfileUpdate, Registration, Role, UserId, UserView,
};
use super::session::bearer_token;
use crate::workflows::error::WorkflowError;
use crate::workflows::extract::{ApiJson, ApiPath, ApiQuery};
use crate::workflows::notifications::MessageDispatcher;
use crate::workflows::portal::Portal;
use crate::workflows::storage::HousingStore;

type PortalState<S, D> = State<Arc<Portal<S, D>>>;

pub fn routes<S, D>() -> Router<Arc<Portal<S, D>>>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    Router::new()
        .route("/api/v1/auth/register", post(register_handler::<S, D>))
        .route("/api/v1/auth/login", post(login_handler::<S, D>))
        .route("/api/v1/auth/logout", post(logout_handler::<S, D>))
        .route(
            "/api/v1/me",
            get(me_handler::<S, D>).put(update_profile_handler::<S, D>),
        )
        .route("/api/v1/me/password", put(change_password_handler::<S, D>))
        .route(
            "/api/v1/users",
            get(list_users_handler::<S, D>).post(create_user_handler::<S, D>),
        )
        .route(
            "/api/v1/users/:user_id",
            put(update_admin_handler::<S, D>).delete(delete_admin_handler::<S, D>),
        )
        .route(
            "/api/v1/users/:user_id/password",
            put(reset_password_handler::<S, D>),
        )
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct UserFilter {
    #[serde(default)]
    role: Option<Role>,
}

pub(crate) async fn register_handler<S, D>(
    State(portal): PortalState<S, D>,
    ApiJson(form): ApiJson<Registration>,
) -> Result<(StatusCode, Json<UserView>), WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let user = portal.accounts().register(form)?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub(crate) async fn login_handler<S, D>(
    State(portal): PortalState<S, D>,
    ApiJson(credentials): ApiJson<Credentials>,
) -> Result<Json<LoginResponse>, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    Ok(Json(portal.accounts().login(credentials)?))
}

pub(crate) async fn logout_handler<S, D>(
    State(portal): PortalState<S, D>,
    headers: HeaderMap,
) -> Result<StatusCode, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    portal.authenticate(&headers)?;
    if let Some(token) = bearer_token(&headers) {
        portal.accounts().logout(token);
    }
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn me_handler<S, D>(
    State(portal): PortalState<S, D>,
    headers: HeaderMap,
) -> Result<Json<AccountView>, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    Ok(Json(portal.accounts().me(actor)?))
}

pub(crate) async fn update_profile_handler<S, D>(
    State(portal): PortalState<S, D>,
    headers: HeaderMap,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> Result<Json<AccountView>, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    Ok(Json(portal.accounts().update_profile(actor, update)?))
}

pub(crate) async fn change_password_handler<S, D>(
    State(portal): PortalState<S, D>,
    headers: HeaderMap,
    ApiJson(change): ApiJson<PasswordChange>,
) -> Result<StatusCode, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    let token = bearer_token(&headers).unwrap_or_default();
    portal.accounts().change_password(actor, token, change)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn list_users_handler<S, D>(
    State(portal): PortalState<S, D>,
    headers: HeaderMap,
    ApiQuery(filter): ApiQuery<UserFilter>,
) -> Result<Json<Vec<UserView>>, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    Ok(Json(portal.accounts().list_users(actor, filter.role)?))
}

pub(crate) async fn create_user_handler<S, D>(
    State(portal): PortalState<S, D>,
    headers: HeaderMap,
    ApiJson(account): ApiJson<NewAccount>,
) -> Result<(StatusCode, Json<UserView>), WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    let user = portal.accounts().create_user(actor, account)?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub(crate) async fn update_admin_handler<S, D>(
    State(portal): PortalState<S, D>,
    headers: HeaderMap,
    ApiPath(user_id): ApiPath<u64>,
    ApiJson(update): ApiJson<AdminUpdate>,
) -> Result<Json<UserView>, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    let user = portal
        .accounts()
        .update_admin(actor, UserId(user_id), update)?;
    Ok(Json(user))
}

pub(crate) async fn reset_password_handler<S, D>(
    State(portal): PortalState<S, D>,
    headers: HeaderMap,
    ApiPath(user_id): ApiPath<u64>,
    ApiJson(reset): ApiJson<PasswordReset>,
) -> Result<StatusCode, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    portal
        .accounts()
        .reset_password(actor, UserId(user_id), reset)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn delete_admin_handler<S, D>(
    State(portal): PortalState<S, D>,
    headers: HeaderMap,
    ApiPath(user_id): ApiPath<u64>,
) -> Result<StatusCode, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    portal.accounts().delete_admin(actor, UserId(user_id))?;
    Ok(StatusCode::NO_CONTENT)
}
