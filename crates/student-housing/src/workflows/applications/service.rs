use std::sync::Arc;

use chrono::Utc;

use super::domain::{
    Application, ApplicationFilter, ApplicationId, ApplicationRequest, ApplicationStatus,
    ApprovalOutcome, ApprovalTerms, NewApplication, Rejection,
};
use crate::workflows::accommodations::service::occupancy_of;
use crate::workflows::accommodations::{Accommodation, AccommodationId};
use crate::workflows::accounts::{Action, Actor, Resource, User, UserId};
use crate::workflows::error::{RepositoryError, WorkflowError};
use crate::workflows::leases::NewLease;
use crate::workflows::notifications::{notice, MessageDispatcher, Notifier};
use crate::workflows::scope::Scope;
use crate::workflows::storage::HousingStore;
use crate::workflows::today;

/// Student applications and the admin decision that turns one into a lease.
pub struct ApplicationService<S, D> {
    store: Arc<S>,
    notifier: Notifier<S, D>,
}

impl<S, D> ApplicationService<S, D>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    pub fn new(store: Arc<S>, notifier: Notifier<S, D>) -> Self {
        Self { store, notifier }
    }

    pub fn submit(
        &self,
        actor: Actor,
        request: ApplicationRequest,
    ) -> Result<Application, WorkflowError> {
        actor.require(Resource::Application, Action::Create)?;
        let today = today();
        WorkflowError::check(request.validate(today))?;

        let accommodation = self.accommodation(request.accommodation_id)?;
        let holds_lease = self
            .store
            .list_leases()?
            .iter()
            .any(|lease| lease.user_id == actor.user_id && lease.is_current(today));
        if holds_lease {
            return Err(WorkflowError::conflict(
                "You already have an active lease. \
                 Contact administration if you wish to change accommodations.",
            ));
        }
        if !occupancy_of(self.store.as_ref(), &accommodation)?.has_vacancy() {
            return Err(WorkflowError::conflict(
                "Selected accommodation has no available rooms",
            ));
        }

        let application = self
            .store
            .insert_application(NewApplication {
                user_id: actor.user_id,
                accommodation_id: accommodation.id,
                move_in_date: request.move_in_date,
                notes: clean(request.notes),
                created_at: Utc::now(),
            })
            .map_err(|err| match err {
                RepositoryError::Conflict => WorkflowError::conflict(
                    "You already have a pending application for this accommodation",
                ),
                other => other.into(),
            })?;

        self.notifier.post(
            actor.user_id,
            &notice::application_submitted(&accommodation.name),
        );
        if let Some(admin_id) = accommodation.admin_id {
            let student = self.user(actor.user_id)?;
            self.notifier.post(
                admin_id,
                &notice::application_received(&student.display_name(), &accommodation.name),
            );
        }

        tracing::info!(
            application_id = %application.id,
            accommodation_id = %accommodation.id,
            user_id = %actor.user_id,
            "application submitted"
        );
        Ok(application)
    }

    /// Newest first, restricted to what the actor may see.
    pub fn list(
        &self,
        actor: Actor,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, WorkflowError> {
        actor.require(Resource::Application, Action::View)?;
        let scope = Scope::for_actor(self.store.as_ref(), actor)?;
        let mut applications: Vec<Application> = self
            .store
            .list_applications()?
            .into_iter()
            .filter(|application| scope.admits(application.user_id, application.accommodation_id))
            .filter(|application| {
                filter
                    .status
                    .map_or(true, |status| application.status == status)
            })
            .collect();
        applications.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(applications)
    }

    pub fn get(&self, actor: Actor, id: ApplicationId) -> Result<Application, WorkflowError> {
        actor.require(Resource::Application, Action::View)?;
        let application = self.application(id)?;
        let accommodation = self.accommodation(application.accommodation_id)?;
        if !actor.can_view(application.user_id, accommodation.admin_id) {
            return Err(WorkflowError::forbidden(
                "You do not have permission to view this application",
            ));
        }
        Ok(application)
    }

    /// Approves a pending application and issues exactly one lease for it.
    pub fn approve(
        &self,
        actor: Actor,
        id: ApplicationId,
        terms: ApprovalTerms,
    ) -> Result<ApprovalOutcome, WorkflowError> {
        actor.require(Resource::Application, Action::Approve)?;
        let application = self.application(id)?;
        let accommodation = self.accommodation(application.accommodation_id)?;
        actor.require_manager(accommodation.admin_id, "accommodation")?;
        ensure_pending(&application)?;

        if !occupancy_of(self.store.as_ref(), &accommodation)?.has_vacancy() {
            return Err(WorkflowError::conflict(
                "No rooms available in this accommodation",
            ));
        }

        let lease_terms = terms.resolve(&application, &accommodation, today());
        WorkflowError::check(lease_terms.validate())?;

        let (application, lease) = self
            .store
            .approve_application(
                id,
                clean(terms.notes),
                NewLease {
                    user_id: application.user_id,
                    accommodation_id: application.accommodation_id,
                    application_id: Some(application.id),
                    terms: lease_terms,
                    created_at: Utc::now(),
                },
            )
            .map_err(|err| match err {
                RepositoryError::NoVacancy => {
                    WorkflowError::conflict("No rooms available in this accommodation")
                }
                other => other.into(),
            })?;

        let student = self.user(application.user_id)?;
        self.notifier.deliver(
            &student,
            &notice::application_approved(
                &accommodation.name,
                lease.start_date,
                lease.end_date,
                lease.monthly_rent,
            ),
        );

        tracing::info!(
            application_id = %application.id,
            lease_id = %lease.id,
            approved_by = %actor.user_id,
            "application approved"
        );
        Ok(ApprovalOutcome { application, lease })
    }

    pub fn reject(
        &self,
        actor: Actor,
        id: ApplicationId,
        rejection: Rejection,
    ) -> Result<Application, WorkflowError> {
        actor.require(Resource::Application, Action::Reject)?;
        let application = self.application(id)?;
        let accommodation = self.accommodation(application.accommodation_id)?;
        actor.require_manager(accommodation.admin_id, "accommodation")?;
        ensure_pending(&application)?;

        let notes = clean(rejection.notes);
        let application = self.store.transition_application(
            id,
            ApplicationStatus::Pending,
            ApplicationStatus::Rejected,
            notes.clone(),
            Utc::now(),
        )?;

        let student = self.user(application.user_id)?;
        self.notifier.deliver(
            &student,
            &notice::application_rejected(&accommodation.name, notes.as_deref()),
        );

        tracing::info!(
            application_id = %application.id,
            rejected_by = %actor.user_id,
            "application rejected"
        );
        Ok(application)
    }

    fn application(&self, id: ApplicationId) -> Result<Application, WorkflowError> {
        self.store
            .fetch_application(id)?
            .ok_or(WorkflowError::NotFound("application"))
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

fn ensure_pending(application: &Application) -> Result<(), WorkflowError> {
    if application.status == ApplicationStatus::Pending {
        Ok(())
    } else {
        Err(WorkflowError::conflict(format!(
            "Application has already been {}",
            application.status.label()
        )))
    }
}

fn clean(notes: Option<String>) -> Option<String> {
    notes
        .map(|notes| notes.trim().to_string())
        .filter(|notes| !notes.is_empty())
}
