use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use super::domain::{
    Lease, LeaseId, LeaseRequest, LeaseView, NewLease, SigningOutcome, Termination,
};
use crate::workflows::accommodations::{Accommodation, AccommodationId};
use crate::workflows::accounts::{Action, Actor, Resource, Role, User, UserId};
use crate::workflows::error::{RepositoryError, WorkflowError};
use crate::workflows::invoices::NewInvoice;
use crate::workflows::notifications::{notice, MessageDispatcher, Notifier};
use crate::workflows::scope::Scope;
use crate::workflows::storage::HousingStore;
use crate::workflows::today;

pub struct LeaseService<S, D> {
    store: Arc<S>,
    notifier: Notifier<S, D>,
}

impl<S, D> LeaseService<S, D>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    pub fn new(store: Arc<S>, notifier: Notifier<S, D>) -> Self {
        Self { store, notifier }
    }

    pub fn list(&self, actor: Actor) -> Result<Vec<LeaseView>, WorkflowError> {
        actor.require(Resource::Lease, Action::View)?;
        let scope = Scope::for_actor(self.store.as_ref(), actor)?;
        let today = today();
        let mut leases: Vec<Lease> = self
            .store
            .list_leases()?
            .into_iter()
            .filter(|lease| scope.admits(lease.user_id, lease.accommodation_id))
            .collect();
        leases.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(leases.iter().map(|lease| lease.view(today)).collect())
    }

    pub fn get(&self, actor: Actor, id: LeaseId) -> Result<LeaseView, WorkflowError> {
        actor.require(Resource::Lease, Action::View)?;
        let lease = self.lease(id)?;
        let accommodation = self.accommodation(lease.accommodation_id)?;
        if !actor.can_view(lease.user_id, accommodation.admin_id) {
            return Err(WorkflowError::forbidden(
                "You do not have permission to view this lease",
            ));
        }
        Ok(lease.view(today()))
    }

    /// Issues a lease outside the application flow. It awaits the student's signature.
    pub fn create(&self, actor: Actor, request: LeaseRequest) -> Result<LeaseView, WorkflowError> {
        actor.require(Resource::Lease, Action::Create)?;
        let accommodation = self.store.fetch_accommodation(request.accommodation_id)?;
        if let Some(accommodation) = &accommodation {
            if !actor.manages(accommodation.admin_id) {
                return Err(WorkflowError::forbidden(
                    "You do not have permission to create a lease for this accommodation",
                ));
            }
        }
        let student = self
            .store
            .fetch_user(request.user_id)?
            .filter(|user| user.role == Role::Student);

        let terms = request.terms();
        let mut errors = terms.validate();
        if student.is_none() {
            errors.push("Invalid student selected".to_string());
        }
        if accommodation.is_none() {
            errors.push("Invalid accommodation selected".to_string());
        }
        let (student, accommodation) = match (student, accommodation) {
            (Some(student), Some(accommodation)) if errors.is_empty() => (student, accommodation),
            _ => return Err(WorkflowError::Validation(errors)),
        };

        let lease = self
            .store
            .insert_lease(NewLease {
                user_id: student.id,
                accommodation_id: accommodation.id,
                application_id: None,
                terms,
                created_at: Utc::now(),
            })
            .map_err(|err| match err {
                RepositoryError::NoVacancy => {
                    WorkflowError::conflict("No rooms available in this accommodation")
                }
                other => other.into(),
            })?;
        self.notifier
            .post(student.id, &notice::lease_created(&accommodation.name));

        tracing::info!(
            lease_id = %lease.id,
            user_id = %student.id,
            created_by = %actor.user_id,
            "lease created"
        );
        Ok(lease.view(today()))
    }

    /// Signs the caller's own lease and bills the first month.
    pub fn sign(&self, actor: Actor, id: LeaseId) -> Result<SigningOutcome, WorkflowError> {
        actor.require(Resource::Lease, Action::Sign)?;
        let lease = self.lease(id)?;
        if lease.user_id != actor.user_id {
            return Err(WorkflowError::forbidden("You can only sign your own lease"));
        }
        if lease.signed {
            return Err(WorkflowError::conflict("Lease has already been signed"));
        }
        if lease.terminated_on.is_some() {
            return Err(WorkflowError::conflict("Lease has been terminated"));
        }

        let now = Utc::now();
        let lease = self.store.mark_lease_signed(id, now)?;
        let period = lease.first_billing_period();
        let invoice = self.store.insert_invoice(NewInvoice {
            user_id: lease.user_id,
            accommodation_id: lease.accommodation_id,
            lease_id: lease.id,
            amount: lease.monthly_rent,
            late_fee: Decimal::ZERO,
            period_start: period.period_start,
            period_end: period.period_end,
            due_date: period.due_date,
            created_at: now,
        })?;

        let accommodation = self.accommodation(lease.accommodation_id)?;
        let student = self.user(lease.user_id)?;
        self.notifier.deliver(
            &student,
            &notice::lease_signed(&accommodation.name, lease.start_date),
        );
        self.notifier.deliver(
            &student,
            &notice::invoice_issued(&invoice.id.number(), invoice.total(), invoice.due_date),
        );

        tracing::info!(
            lease_id = %lease.id,
            invoice_id = %invoice.id,
            user_id = %actor.user_id,
            "lease signed"
        );
        let today = today();
        Ok(SigningOutcome {
            lease: lease.view(today),
            invoice: invoice.view(today),
        })
    }

    /// Ends a lease early. The date must fall strictly inside the lease term.
    pub fn terminate(
        &self,
        actor: Actor,
        id: LeaseId,
        termination: Termination,
    ) -> Result<LeaseView, WorkflowError> {
        actor.require(Resource::Lease, Action::Edit)?;
        let lease = self.lease(id)?;
        let accommodation = self.accommodation(lease.accommodation_id)?;
        actor.require_manager(accommodation.admin_id, "accommodation")?;
        if lease.terminated_on.is_some() {
            return Err(WorkflowError::conflict("Lease has already been terminated"));
        }

        let date = termination.termination_date;
        if date <= lease.start_date || date >= lease.end_date {
            return Err(WorkflowError::Validation(vec![
                "Termination date must fall between the lease start and end dates".to_string(),
            ]));
        }

        let lease = self.store.terminate_lease(id, date)?;
        let student = self.user(lease.user_id)?;
        self.notifier.deliver(
            &student,
            &notice::lease_terminated(&accommodation.name, date, termination.reason.as_deref()),
        );

        tracing::info!(
            lease_id = %lease.id,
            terminated_by = %actor.user_id,
            termination_date = %date,
            "lease terminated"
        );
        Ok(lease.view(today()))
    }

    fn lease(&self, id: LeaseId) -> Result<Lease, WorkflowError> {
        self.store
            .fetch_lease(id)?
            .ok_or(WorkflowError::NotFound("lease"))
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

#[cfg(test)]
mod tests {
    use chrono::{Days, Months};

    use super::*;
    use crate::workflows::invoices::{InvoiceRepository, InvoiceStatus};
    use crate::workflows::leases::{LeaseRepository, LeaseStatus};
    use crate::workflows::testing::Harness;

    #[test]
    fn signing_bills_the_first_month_once() {
        let harness = Harness::new();
        let admin = harness.admin("warden");
        let student = harness.student("thandi");
        let lodge = harness.accommodation(admin, 2);
        let lease = harness.lease(student, admin, lodge);

        let outcome = harness
            .portal
            .leases()
            .sign(student, lease)
            .expect("signing succeeds");

        assert_eq!(outcome.lease.status, LeaseStatus::Active);
        assert!(outcome.lease.lease.signed_at.is_some());
        let invoice = &outcome.invoice.invoice;
        assert_eq!(invoice.amount, Decimal::new(4500, 0));
        assert_eq!(invoice.late_fee, Decimal::ZERO);
        assert_eq!(invoice.period_start, outcome.lease.lease.start_date);
        assert_eq!(outcome.invoice.number, "INV-000001");
        assert_eq!(outcome.invoice.status, InvoiceStatus::Overdue);

        let subjects: Vec<String> = harness
            .dispatcher
            .emails()
            .into_iter()
            .map(|email| email.subject)
            .collect();
        assert!(subjects.contains(&"Lease Signed".to_string()));
        assert!(subjects.contains(&"New Invoice INV-000001".to_string()));

        match harness.portal.leases().sign(student, lease) {
            Err(WorkflowError::Conflict(message)) => {
                assert_eq!(message, "Lease has already been signed")
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        assert_eq!(harness.store.list_invoices().expect("invoices").len(), 1);
    }

    #[test]
    fn only_the_leaseholder_signs() {
        let harness = Harness::new();
        let admin = harness.admin("warden");
        let student = harness.student("thandi");
        let other = harness.student("sipho");
        let lodge = harness.accommodation(admin, 2);
        let lease = harness.lease(student, admin, lodge);

        assert!(matches!(
            harness.portal.leases().sign(other, lease),
            Err(WorkflowError::Forbidden(_))
        ));
        assert!(matches!(
            harness.portal.leases().sign(admin, lease),
            Err(WorkflowError::Forbidden(_))
        ));
        assert!(matches!(
            harness.portal.leases().get(other, lease),
            Err(WorkflowError::Forbidden(_))
        ));
    }

    #[test]
    fn termination_must_fall_inside_the_term() {
        let harness = Harness::new();
        let admin = harness.admin("warden");
        let student = harness.student("thandi");
        let lodge = harness.accommodation(admin, 1);
        let lease = harness.lease(student, admin, lodge);
        let start = harness
            .portal
            .leases()
            .get(admin, lease)
            .expect("lease")
            .lease
            .start_date;

        let on_start = harness.portal.leases().terminate(
            admin,
            lease,
            Termination {
                termination_date: start,
                reason: None,
            },
        );
        assert!(matches!(on_start, Err(WorkflowError::Validation(_))));

        let date = start
            .checked_add_months(Months::new(3))
            .expect("valid date");
        let terminated = harness
            .portal
            .leases()
            .terminate(
                admin,
                lease,
                Termination {
                    termination_date: date,
                    reason: Some("Relocating for internship".to_string()),
                },
            )
            .expect("termination succeeds");
        assert_eq!(terminated.status, LeaseStatus::Terminated);
        assert_eq!(terminated.lease.end_date, date);

        let again = harness.portal.leases().terminate(
            admin,
            lease,
            Termination {
                termination_date: date - Days::new(1),
                reason: None,
            },
        );
        assert!(matches!(again, Err(WorkflowError::Conflict(_))));
        assert!(matches!(
            harness.portal.leases().sign(student, lease),
            Err(WorkflowError::Conflict(_))
        ));
    }

    fn request(student: Actor, accommodation: AccommodationId) -> LeaseRequest {
        let start = today();
        LeaseRequest {
            user_id: student.user_id,
            accommodation_id: accommodation,
            start_date: start,
            end_date: start.checked_add_months(Months::new(6)).expect("valid date"),
            monthly_rent: Decimal::new(3900, 0),
            security_deposit: Decimal::ZERO,
        }
    }

    #[test]
    fn admins_issue_leases_directly() {
        let harness = Harness::new();
        let warden = harness.admin("warden");
        let student = harness.student("thandi");
        let lodge = harness.accommodation(warden, 1);

        let view = harness
            .portal
            .leases()
            .create(warden, request(student, lodge))
            .expect("lease created");
        assert_eq!(view.status, LeaseStatus::AwaitingSignature);
        assert_eq!(view.lease.application_id, None);
        assert_eq!(view.lease.monthly_rent, Decimal::new(3900, 0));

        let inbox = harness
            .portal
            .notifications()
            .inbox(student, &Default::default())
            .expect("inbox");
        assert!(inbox.notifications.iter().any(|notification| {
            notification.subject == "New Lease"
                && notification.message.starts_with("Your lease for Varsity Lodge has been created")
        }));

        let other = harness.student("sipho");
        match harness.portal.leases().create(warden, request(other, lodge)) {
            Err(WorkflowError::Conflict(message)) => {
                assert_eq!(message, "No rooms available in this accommodation")
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        harness
            .portal
            .leases()
            .sign(student, view.lease.id)
            .expect("student signs");
    }

    #[test]
    fn direct_leases_check_parties_and_terms() {
        let harness = Harness::new();
        let warden = harness.admin("warden");
        let bursar = harness.admin("bursar");
        let student = harness.student("thandi");
        let lodge = harness.accommodation(warden, 2);
        let leases = harness.portal.leases();

        assert!(matches!(
            leases.create(bursar, request(student, lodge)),
            Err(WorkflowError::Forbidden(_))
        ));
        assert!(matches!(
            leases.create(student, request(student, lodge)),
            Err(WorkflowError::Forbidden(_))
        ));

        let mut invalid = request(bursar, AccommodationId(999));
        invalid.end_date = invalid.start_date;
        invalid.monthly_rent = Decimal::ZERO;
        match leases.create(harness.master, invalid) {
            Err(WorkflowError::Validation(errors)) => assert_eq!(
                errors,
                vec![
                    "End date must be after start date",
                    "Monthly rent must be greater than zero",
                    "Invalid student selected",
                    "Invalid accommodation selected",
                ]
            ),
            other => panic!("expected validation errors, got {other:?}"),
        }
        assert!(harness.store.list_leases().expect("leases").is_empty());
    }

    #[test]
    fn listing_is_scoped_to_the_caller() {
        let harness = Harness::new();
        let warden = harness.admin("warden");
        let bursar = harness.admin("bursar");
        let thandi = harness.student("thandi");
        let sipho = harness.student("sipho");
        let lodge = harness.accommodation(warden, 2);
        let annex = harness.accommodation(bursar, 2);
        harness.lease(thandi, warden, lodge);
        harness.lease(sipho, bursar, annex);

        assert_eq!(harness.portal.leases().list(thandi).expect("list").len(), 1);
        assert_eq!(harness.portal.leases().list(warden).expect("list").len(), 1);
        assert_eq!(
            harness.portal.leases().list(harness.master).expect("list").len(),
            2
        );
    }
}
