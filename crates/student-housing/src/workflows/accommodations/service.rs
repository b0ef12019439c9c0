use std::sync::Arc;

use chrono::Utc;

use super::domain::{
    Accommodation, AccommodationDraft, AccommodationId, AccommodationView, NewAccommodation,
    Occupancy,
};
use crate::workflows::accounts::{Action, Actor, Resource, Role, UserId};
use crate::workflows::error::{RepositoryError, WorkflowError};
use crate::workflows::storage::HousingStore;
use crate::workflows::today;

pub struct AccommodationService<S> {
    store: Arc<S>,
}

impl<S> AccommodationService<S>
where
    S: HousingStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn list(&self, actor: Actor) -> Result<Vec<AccommodationView>, WorkflowError> {
        actor.require(Resource::Accommodation, Action::View)?;
        let accommodations = self.store.list_accommodations()?;
        accommodations
            .into_iter()
            .map(|accommodation| self.view(accommodation))
            .collect()
    }

    pub fn get(
        &self,
        actor: Actor,
        id: AccommodationId,
    ) -> Result<AccommodationView, WorkflowError> {
        actor.require(Resource::Accommodation, Action::View)?;
        let accommodation = self.fetch(id)?;
        self.view(accommodation)
    }

    /// Admins always own what they create; master admins may assign any admin.
    pub fn create(
        &self,
        actor: Actor,
        draft: AccommodationDraft,
    ) -> Result<AccommodationView, WorkflowError> {
        actor.require(Resource::Accommodation, Action::Edit)?;
        let mut errors = draft.validate();
        let admin_id = if actor.is_master() {
            if let Some(admin_id) = draft.admin_id {
                errors.extend(self.admin_errors(admin_id)?);
            }
            draft.admin_id
        } else {
            Some(actor.user_id)
        };
        WorkflowError::check(errors)?;

        let accommodation = self.store.insert_accommodation(NewAccommodation {
            name: draft.name.trim().to_string(),
            location: draft.location.trim().to_string(),
            description: draft.description.trim().to_string(),
            rooms_available: draft.rooms_available,
            price_per_month: draft.price_per_month,
            admin_id,
            created_at: Utc::now(),
        })?;
        tracing::info!(
            accommodation_id = %accommodation.id,
            created_by = %actor.user_id,
            "accommodation created"
        );
        self.view(accommodation)
    }

    pub fn update(
        &self,
        actor: Actor,
        id: AccommodationId,
        draft: AccommodationDraft,
    ) -> Result<AccommodationView, WorkflowError> {
        actor.require(Resource::Accommodation, Action::Edit)?;
        let mut accommodation = self.fetch(id)?;
        actor.require_manager(accommodation.admin_id, "accommodation")?;

        let mut errors = draft.validate();
        if let (true, Some(admin_id)) = (actor.is_master(), draft.admin_id) {
            errors.extend(self.admin_errors(admin_id)?);
            accommodation.admin_id = Some(admin_id);
        }
        WorkflowError::check(errors)?;

        accommodation.name = draft.name.trim().to_string();
        accommodation.location = draft.location.trim().to_string();
        accommodation.description = draft.description.trim().to_string();
        accommodation.rooms_available = draft.rooms_available;
        accommodation.price_per_month = draft.price_per_month;
        self.store.update_accommodation(accommodation.clone())?;
        tracing::info!(
            accommodation_id = %id,
            updated_by = %actor.user_id,
            "accommodation updated"
        );
        self.view(accommodation)
    }

    /// Removes an accommodation and every application, lease, invoice, and maintenance
    /// request filed against it. Refused while any lease is current.
    pub fn delete(&self, actor: Actor, id: AccommodationId) -> Result<(), WorkflowError> {
        actor.require(Resource::Accommodation, Action::Delete)?;
        let removed = self
            .store
            .delete_accommodation(id, today())
            .map_err(|err| match err {
                RepositoryError::NotFound => WorkflowError::NotFound("accommodation"),
                RepositoryError::Conflict => WorkflowError::conflict(
                    "Cannot delete accommodation with active leases. End all leases first.",
                ),
                other => other.into(),
            })?;
        tracing::info!(
            accommodation_id = %removed.id,
            deleted_by = %actor.user_id,
            "accommodation deleted"
        );
        Ok(())
    }

    fn fetch(&self, id: AccommodationId) -> Result<Accommodation, WorkflowError> {
        self.store
            .fetch_accommodation(id)?
            .ok_or(WorkflowError::NotFound("accommodation"))
    }

    fn admin_errors(&self, admin_id: UserId) -> Result<Vec<String>, WorkflowError> {
        let is_admin = self
            .store
            .fetch_user(admin_id)?
            .is_some_and(|user| user.role == Role::Admin);
        Ok(if is_admin {
            Vec::new()
        } else {
            vec!["Assigned admin must be an admin account".to_string()]
        })
    }

    fn view(&self, accommodation: Accommodation) -> Result<AccommodationView, WorkflowError> {
        let occupancy = occupancy_of(self.store.as_ref(), &accommodation)?;
        Ok(AccommodationView {
            accommodation,
            occupancy,
        })
    }
}

/// Current occupancy of one accommodation.
pub(crate) fn occupancy_of<S>(
    store: &S,
    accommodation: &Accommodation,
) -> Result<Occupancy, WorkflowError>
where
    S: HousingStore,
{
    let leases = store.list_leases()?;
    Ok(Occupancy::from_leases(
        accommodation.rooms_available,
        leases
            .iter()
            .filter(|lease| lease.accommodation_id == accommodation.id),
        today(),
    ))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::workflows::testing::Harness;

    fn draft(name: &str, rooms: u32, admin_id: Option<UserId>) -> AccommodationDraft {
        AccommodationDraft {
            name: name.to_string(),
            location: "Hatfield, Pretoria".to_string(),
            description: String::new(),
            rooms_available: rooms,
            price_per_month: Decimal::new(3800, 0),
            admin_id,
        }
    }

    #[test]
    fn admins_own_what_they_create() {
        let harness = Harness::new();
        let warden = harness.admin("warden");
        let bursar = harness.admin("bursar");

        let view = harness
            .portal
            .accommodations()
            .create(warden, draft("Jacaranda House", 6, Some(bursar.user_id)))
            .expect("created");
        assert_eq!(view.accommodation.admin_id, Some(warden.user_id));
        assert_eq!(view.occupancy.vacant_rooms, 6);

        let update = harness.portal.accommodations().update(
            bursar,
            view.accommodation.id,
            draft("Renamed", 6, None),
        );
        assert!(matches!(update, Err(WorkflowError::Forbidden(_))));
    }

    #[test]
    fn master_assignments_must_target_admins() {
        let harness = Harness::new();
        let warden = harness.admin("warden");
        let student = harness.student("thandi");
        let accommodations = harness.portal.accommodations();

        let invalid = accommodations.create(
            harness.master,
            draft("Jacaranda House", 6, Some(student.user_id)),
        );
        match invalid {
            Err(WorkflowError::Validation(errors)) => assert_eq!(
                errors,
                vec!["Assigned admin must be an admin account".to_string()]
            ),
            other => panic!("expected validation error, got {other:?}"),
        }

        let view = accommodations
            .create(harness.master, draft("Jacaranda House", 6, None))
            .expect("created unassigned");
        let reassigned = accommodations
            .update(
                harness.master,
                view.accommodation.id,
                draft("Jacaranda House", 8, Some(warden.user_id)),
            )
            .expect("reassigned");
        assert_eq!(reassigned.accommodation.admin_id, Some(warden.user_id));
        assert_eq!(reassigned.accommodation.rooms_available, 8);
    }

    #[test]
    fn master_edits_without_admin_keep_the_owner() {
        let harness = Harness::new();
        let warden = harness.admin("warden");
        let lodge = harness.accommodation(warden, 3);
        let accommodations = harness.portal.accommodations();

        let renamed = accommodations
            .update(harness.master, lodge, draft("Varsity Lodge North", 3, None))
            .expect("master renames");
        assert_eq!(renamed.accommodation.admin_id, Some(warden.user_id));
        assert_eq!(renamed.accommodation.name, "Varsity Lodge North");

        let own_edit = accommodations
            .update(warden, lodge, draft("Varsity Lodge", 4, None))
            .expect("owner still manages it");
        assert_eq!(own_edit.accommodation.rooms_available, 4);
    }

    #[test]
    fn only_master_deletes_vacated_accommodations() {
        let harness = Harness::new();
        let warden = harness.admin("warden");
        let student = harness.student("thandi");
        let lodge = harness.accommodation(warden, 2);
        let empty = harness.accommodation(warden, 2);
        let lease = harness.lease(student, warden, lodge);
        let accommodations = harness.portal.accommodations();

        assert!(matches!(
            accommodations.delete(warden, empty),
            Err(WorkflowError::Forbidden(_))
        ));
        match accommodations.delete(harness.master, lodge) {
            Err(WorkflowError::Conflict(message)) => assert_eq!(
                message,
                "Cannot delete accommodation with active leases. End all leases first."
            ),
            other => panic!("expected conflict, got {other:?}"),
        }

        accommodations
            .delete(harness.master, empty)
            .expect("vacant accommodation deleted");
        assert!(matches!(
            accommodations.get(student, empty),
            Err(WorkflowError::NotFound("accommodation"))
        ));
        assert!(matches!(
            accommodations.delete(harness.master, empty),
            Err(WorkflowError::NotFound("accommodation"))
        ));
        assert!(harness.portal.leases().get(student, lease).is_ok());
    }

    #[test]
    fn occupancy_counts_current_leases() {
        let harness = Harness::new();
        let warden = harness.admin("warden");
        let student = harness.student("thandi");
        let lodge = harness.accommodation(warden, 3);
        harness.lease(student, warden, lodge);

        let view = harness
            .portal
            .accommodations()
            .get(student, lodge)
            .expect("visible to students");
        assert_eq!(view.occupancy.occupied_rooms, 1);
        assert_eq!(view.occupancy.vacant_rooms, 2);
        assert!(matches!(
            harness
                .portal
                .accommodations()
                .create(student, draft("Squat", 1, None)),
            Err(WorkflowError::Forbidden(_))
        ));
    }
}
