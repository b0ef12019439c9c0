//! Landing-page summaries: what a student should act on, and the work queue an admin owns.

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, routing::get, Json, Router};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::accommodations::service::occupancy_of;
use super::accounts::{Actor, Role};
use super::applications::ApplicationStatus;
use super::error::WorkflowError;
use super::invoices::total_due;
use super::leases::{Lease, LeaseView};
use super::maintenance::Priority;
use super::notifications::MessageDispatcher;
use super::portal::Portal;
use super::scope::Scope;
use super::storage::HousingStore;
use super::today;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplicationCounts {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl ApplicationCounts {
    fn record(&mut self, status: ApplicationStatus) {
        match status {
            ApplicationStatus::Pending => self.pending += 1,
            ApplicationStatus::Approved => self.approved += 1,
            ApplicationStatus::Rejected => self.rejected += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentDashboard {
    pub applications: ApplicationCounts,
    pub current_lease: Option<LeaseView>,
    pub unpaid_invoices: usize,
    pub overdue_invoices: usize,
    pub amount_due: Decimal,
    pub open_maintenance: usize,
    pub unread_notifications: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminDashboard {
    pub accommodations: usize,
    pub total_rooms: u32,
    pub occupied_rooms: u32,
    pub pending_applications: usize,
    pub unsigned_leases: usize,
    pub unpaid_invoices: usize,
    pub overdue_invoices: usize,
    pub outstanding: Decimal,
    pub open_maintenance: usize,
    pub urgent_maintenance: usize,
    pub unread_notifications: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum Dashboard {
    Student(StudentDashboard),
    Admin(AdminDashboard),
}

pub struct DashboardService<S> {
    store: Arc<S>,
}

impl<S> DashboardService<S>
where
    S: HousingStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn summary(&self, actor: Actor) -> Result<Dashboard, WorkflowError> {
        let today = today();
        match actor.role {
            Role::Student => self.student(actor, today).map(Dashboard::Student),
            Role::Admin | Role::MasterAdmin => self.admin(actor, today).map(Dashboard::Admin),
        }
    }

    fn student(&self, actor: Actor, today: NaiveDate) -> Result<StudentDashboard, WorkflowError> {
        let mut applications = ApplicationCounts::default();
        for application in self.store.list_applications()? {
            if application.user_id == actor.user_id {
                applications.record(application.status);
            }
        }

        let current_lease = self
            .store
            .list_leases()?
            .into_iter()
            .filter(|lease| lease.user_id == actor.user_id && lease.is_current(today))
            .max_by_key(|lease| lease.start_date)
            .map(|lease: Lease| lease.view(today));

        let invoices: Vec<_> = self
            .store
            .list_invoices()?
            .into_iter()
            .filter(|invoice| invoice.user_id == actor.user_id)
            .collect();

        let open_maintenance = self
            .store
            .list_maintenance_requests()?
            .iter()
            .filter(|request| request.user_id == actor.user_id && request.is_open())
            .count();

        Ok(StudentDashboard {
            applications,
            current_lease,
            unpaid_invoices: invoices.iter().filter(|invoice| !invoice.paid).count(),
            overdue_invoices: invoices
                .iter()
                .filter(|invoice| invoice.is_overdue(today))
                .count(),
            amount_due: total_due(&invoices),
            open_maintenance,
            unread_notifications: self.store.count_unread_notifications(actor.user_id)?,
        })
    }

    fn admin(&self, actor: Actor, today: NaiveDate) -> Result<AdminDashboard, WorkflowError> {
        let store = self.store.as_ref();
        let scope = Scope::for_actor(store, actor)?;

        let mut accommodations = 0;
        let mut total_rooms = 0u32;
        let mut occupied_rooms = 0u32;
        for accommodation in store.list_accommodations()? {
            if !scope.covers(accommodation.id) {
                continue;
            }
            let occupancy = occupancy_of(store, &accommodation)?;
            accommodations += 1;
            total_rooms = total_rooms.saturating_add(accommodation.rooms_available);
            occupied_rooms = occupied_rooms.saturating_add(occupancy.occupied_rooms);
        }

        let pending_applications = store
            .list_applications()?
            .iter()
            .filter(|application| scope.covers(application.accommodation_id))
            .filter(|application| application.status == ApplicationStatus::Pending)
            .count();

        let unsigned_leases = store
            .list_leases()?
            .iter()
            .filter(|lease| scope.covers(lease.accommodation_id))
            .filter(|lease| {
                !lease.signed && lease.terminated_on.is_none() && lease.is_current(today)
            })
            .count();

        let invoices: Vec<_> = store
            .list_invoices()?
            .into_iter()
            .filter(|invoice| scope.covers(invoice.accommodation_id))
            .collect();

        let open: Vec<_> = store
            .list_maintenance_requests()?
            .into_iter()
            .filter(|request| scope.covers(request.accommodation_id) && request.is_open())
            .collect();

        Ok(AdminDashboard {
            accommodations,
            total_rooms,
            occupied_rooms,
            pending_applications,
            unsigned_leases,
            unpaid_invoices: invoices.iter().filter(|invoice| !invoice.paid).count(),
            overdue_invoices: invoices
                .iter()
                .filter(|invoice| invoice.is_overdue(today))
                .count(),
            outstanding: total_due(&invoices),
            open_maintenance: open.len(),
            urgent_maintenance: open
                .iter()
                .filter(|request| {
                    matches!(request.priority, Priority::High | Priority::Emergency)
                })
                .count(),
            unread_notifications: store.count_unread_notifications(actor.user_id)?,
        })
    }
}

pub fn routes<S, D>() -> Router<Arc<Portal<S, D>>>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    Router::new().route("/api/v1/dashboard", get(dashboard_handler::<S, D>))
}

pub(crate) async fn dashboard_handler<S, D>(
    State(portal): State<Arc<Portal<S, D>>>,
    headers: HeaderMap,
) -> Result<Json<Dashboard>, WorkflowError>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    let actor = portal.authenticate(&headers)?;
    Ok(Json(portal.dashboard().summary(actor)?))
}
