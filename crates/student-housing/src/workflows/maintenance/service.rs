use std::sync::Arc;

use chrono::Utc;

use super::domain::{
    sort_queue, MaintenanceFilter, MaintenanceId, MaintenanceRequest, MaintenanceSubmission,
    NewMaintenanceRequest, StatusChange, StatusUpdate,
};
use crate::workflows::accommodations::{Accommodation, AccommodationId};
use crate::workflows::accounts::{Action, Actor, Resource, User, UserId};
use crate::workflows::error::{RepositoryError, WorkflowError};
use crate::workflows::notifications::{notice, MessageDispatcher, Notifier};
use crate::workflows::scope::Scope;
use crate::workflows::storage::HousingStore;
use crate::workflows::today;

pub struct MaintenanceService<S, D> {
    store: Arc<S>,
    notifier: Notifier<S, D>,
}

impl<S, D> MaintenanceService<S, D>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    pub fn new(store: Arc<S>, notifier: Notifier<S, D>) -> Self {
        Self { store, notifier }
    }

    /// Students may only report issues where they currently hold a lease.
    pub fn submit(
        &self,
        actor: Actor,
        submission: MaintenanceSubmission,
    ) -> Result<MaintenanceRequest, WorkflowError> {
        actor.require(Resource::Maintenance, Action::Create)?;
        WorkflowError::check(submission.validate())?;
        let accommodation = self.accommodation(submission.accommodation_id)?;

        let today = today();
        let resides = self.store.list_leases()?.iter().any(|lease| {
            lease.user_id == actor.user_id
                && lease.accommodation_id == accommodation.id
                && lease.is_current(today)
        });
        if !resides {
            return Err(WorkflowError::forbidden(
                "You can only report maintenance issues for accommodations you lease",
            ));
        }

        let request = self
            .store
            .insert_maintenance_request(NewMaintenanceRequest {
                user_id: actor.user_id,
                accommodation_id: accommodation.id,
                issue: submission.issue.trim().to_string(),
                description: submission.description.trim().to_string(),
                priority: submission.priority,
                created_at: Utc::now(),
            })?;

        if let Some(admin_id) = accommodation.admin_id {
            let student = self.user(actor.user_id)?;
            self.notifier.post(
                admin_id,
                &notice::maintenance_reported(
                    &student.display_name(),
                    &accommodation.name,
                    &request.issue,
                    request.priority.label(),
                ),
            );
        }

        tracing::info!(
            request_id = %request.id,
            accommodation_id = %accommodation.id,
            priority = request.priority.label(),
            "maintenance request submitted"
        );
        Ok(request)
    }

    /// Most urgent first.
    pub fn list(
        &self,
        actor: Actor,
        filter: &MaintenanceFilter,
    ) -> Result<Vec<MaintenanceRequest>, WorkflowError> {
        actor.require(Resource::Maintenance, Action::View)?;
        let scope = Scope::for_actor(self.store.as_ref(), actor)?;
        let mut requests: Vec<MaintenanceRequest> = self
            .store
            .list_maintenance_requests()?
            .into_iter()
            .filter(|request| scope.admits(request.user_id, request.accommodation_id))
            .filter(|request| filter.status.map_or(true, |status| request.status == status))
            .collect();
        sort_queue(&mut requests);
        Ok(requests)
    }

    pub fn get(
        &self,
        actor: Actor,
        id: MaintenanceId,
    ) -> Result<MaintenanceRequest, WorkflowError> {
        actor.require(Resource::Maintenance, Action::View)?;
        let request = self.request(id)?;
        let accommodation = self.accommodation(request.accommodation_id)?;
        if !actor.can_view(request.user_id, accommodation.admin_id) {
            return Err(WorkflowError::forbidden(
                "You do not have permission to view this maintenance request",
            ));
        }
        Ok(request)
    }

    pub fn update_status(
        &self,
        actor: Actor,
        id: MaintenanceId,
        update: StatusUpdate,
    ) -> Result<MaintenanceRequest, WorkflowError> {
        actor.require(Resource::Maintenance, Action::Update)?;
        let request = self.request(id)?;
        let accommodation = self.accommodation(request.accommodation_id)?;
        actor.require_manager(accommodation.admin_id, "accommodation")?;

        let closed = || {
            WorkflowError::conflict(format!(
                "Maintenance request is already {}",
                request.status.label()
            ))
        };
        if request.status.is_terminal() {
            return Err(closed());
        }

        let notes = update
            .notes
            .map(|notes| notes.trim().to_string())
            .filter(|notes| !notes.is_empty());
        let updated = self
            .store
            .update_maintenance_status(
                id,
                StatusChange {
                    status: update.status,
                    notes: notes.clone(),
                    at: Utc::now(),
                },
            )
            .map_err(|err| match err {
                RepositoryError::StaleState { .. } => closed(),
                other => other.into(),
            })?;

        let student = self.user(updated.user_id)?;
        self.notifier.deliver(
            &student,
            &notice::maintenance_updated(&updated.issue, updated.status.label(), notes.as_deref()),
        );
        tracing::info!(
            request_id = %updated.id,
            status = updated.status.label(),
            updated_by = %actor.user_id,
            "maintenance status updated"
        );
        Ok(updated)
    }

    fn request(&self, id: MaintenanceId) -> Result<MaintenanceRequest, WorkflowError> {
        self.store
            .fetch_maintenance_request(id)?
            .ok_or(WorkflowError::NotFound("maintenance request"))
    }

    fn accommodation(&self, id: AccommodationId) -> Result<Accommodation, WorkflowError> {
        self.store
            .fetch_accommodation(id)?
            .ok_or(WorkflowError::NotFound("accommodation"))
    }

    fn user(&self, id: UserId) -> Result<User, WorkflowError> {
        self.store
            .fetch_user(id)?
            .ok_or(WorkflowError::NotFound("user"))
    }
}
