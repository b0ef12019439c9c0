//! Composition root: one state value holding every workflow service and the session table.

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::Router;
use chrono::{Duration, Utc};

use super::accommodations::{self, AccommodationService};
use super::accounts::{self, bearer_token, AccountService, Actor, SessionStore};
use super::applications::{self, ApplicationService};
use super::dashboard::{self, DashboardService};
use super::error::WorkflowError;
use super::invoices::{self, InvoiceService};
use super::leases::{self, LeaseService};
use super::maintenance::{self, MaintenanceService};
use super::notifications::{
    self, MessageDispatcher, MessagingSettings, NotificationService, Notifier,
};
use super::storage::HousingStore;
use crate::config::AppConfig;

#[derive(Debug, Clone)]
pub struct PortalSettings {
    pub messaging: MessagingSettings,
    pub session_idle_timeout: Duration,
}

impl PortalSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            messaging: MessagingSettings::from(&config.messaging),
            session_idle_timeout: Duration::seconds(i64::from(config.session.idle_timeout_secs)),
        }
    }
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            messaging: MessagingSettings {
                app_name: "Harambee Student Living".to_string(),
                mail_from: "noreply@harambee.com".to_string(),
                sms_enabled: false,
            },
            session_idle_timeout: Duration::seconds(7200),
        }
    }
}

pub struct Portal<S, D> {
    sessions: Arc<SessionStore>,
    accounts: AccountService<S, D>,
    accommodations: AccommodationService<S>,
    applications: ApplicationService<S, D>,
    leases: LeaseService<S, D>,
    invoices: InvoiceService<S, D>,
    maintenance: MaintenanceService<S, D>,
    notifications: NotificationService<S, D>,
    dashboard: DashboardService<S>,
}

impl<S, D> Portal<S, D>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    pub fn new(store: Arc<S>, dispatcher: Arc<D>, settings: PortalSettings) -> Self {
        let sessions = Arc::new(SessionStore::new(settings.session_idle_timeout));
        let notifier = Notifier::new(Arc::clone(&store), dispatcher, settings.messaging);

        Self {
            accounts: AccountService::new(
                Arc::clone(&store),
                Arc::clone(&sessions),
                notifier.clone(),
            ),
            accommodations: AccommodationService::new(Arc::clone(&store)),
            applications: ApplicationService::new(Arc::clone(&store), notifier.clone()),
            leases: LeaseService::new(Arc::clone(&store), notifier.clone()),
            invoices: InvoiceService::new(Arc::clone(&store), notifier.clone()),
            maintenance: MaintenanceService::new(Arc::clone(&store), notifier.clone()),
            notifications: NotificationService::new(Arc::clone(&store), notifier),
            dashboard: DashboardService::new(store),
            sessions,
        }
    }

    /// Resolves the bearer token on a request into the acting user.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Actor, WorkflowError> {
        let token = bearer_token(headers).ok_or(WorkflowError::Unauthorized)?;
        self.sessions.authenticate(token, Utc::now())
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn accounts(&self) -> &AccountService<S, D> {
        &self.accounts
    }

    pub fn accommodations(&self) -> &AccommodationService<S> {
        &self.accommodations
    }

    pub fn applications(&self) -> &ApplicationService<S, D> {
        &self.applications
    }

    pub fn leases(&self) -> &LeaseService<S, D> {
        &self.leases
    }

    pub fn invoices(&self) -> &InvoiceService<S, D> {
        &self.invoices
    }

    pub fn maintenance(&self) -> &MaintenanceService<S, D> {
        &self.maintenance
    }

    pub fn notifications(&self) -> &NotificationService<S, D> {
        &self.notifications
    }

    pub fn dashboard(&self) -> &DashboardService<S> {
        &self.dashboard
    }
}

/// Every `/api/v1` route with the portal applied as state.
pub fn portal_router<S, D>(portal: Arc<Portal<S, D>>) -> Router
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    Router::new()
        .merge(accounts::router::routes::<S, D>())
        .merge(accommodations::router::routes::<S, D>())
        .merge(applications::router::routes::<S, D>())
        .merge(leases::router::routes::<S, D>())
        .merge(invoices::router::routes::<S, D>())
        .merge(maintenance::router::routes::<S, D>())
        .merge(notifications::router::routes::<S, D>())
        .merge(dashboard::routes::<S, D>())
        .with_state(portal)
}
