use std::sync::Arc;

use chrono::Utc;

use super::domain::{
    Invoice, InvoiceDraft, InvoiceFilter, InvoiceId, InvoiceView, NewInvoice, Payment,
    PaymentRecord,
};
use crate::workflows::accommodations::{Accommodation, AccommodationId};
use crate::workflows::accounts::{Action, Actor, Resource, User, UserId};
use crate::workflows::error::WorkflowError;
use crate::workflows::notifications::{notice, Delivery, MessageDispatcher, Notifier};
use crate::workflows::scope::Scope;
use crate::workflows::storage::HousingStore;
use crate::workflows::today;

/// Billing: manual invoices, payment capture, and reminders.
pub struct InvoiceService<S, D> {
    store: Arc<S>,
    notifier: Notifier<S, D>,
}

impl<S, D> InvoiceService<S, D>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    pub fn new(store: Arc<S>, notifier: Notifier<S, D>) -> Self {
        Self { store, notifier }
    }

    pub fn list(
        &self,
        actor: Actor,
        filter: &InvoiceFilter,
    ) -> Result<Vec<InvoiceView>, WorkflowError> {
        actor.require(Resource::Invoice, Action::View)?;
        let scope = Scope::for_actor(self.store.as_ref(), actor)?;
        let today = today();
        let mut invoices: Vec<Invoice> = self
            .store
            .list_invoices()?
            .into_iter()
            .filter(|invoice| scope.admits(invoice.user_id, invoice.accommodation_id))
            .filter(|invoice| {
                filter
                    .status
                    .map_or(true, |status| invoice.matches(status, today))
            })
            .collect();
        invoices.sort_by(|a, b| b.due_date.cmp(&a.due_date).then(b.id.cmp(&a.id)));
        Ok(invoices.iter().map(|invoice| invoice.view(today)).collect())
    }

    pub fn get(&self, actor: Actor, id: InvoiceId) -> Result<InvoiceView, WorkflowError> {
        actor.require(Resource::Invoice, Action::View)?;
        let invoice = self.invoice(id)?;
        let accommodation = self.accommodation(invoice.accommodation_id)?;
        if !actor.can_view(invoice.user_id, accommodation.admin_id) {
            return Err(WorkflowError::forbidden(
                "You do not have permission to view this invoice",
            ));
        }
        Ok(invoice.view(today()))
    }

    pub fn create(&self, actor: Actor, draft: InvoiceDraft) -> Result<InvoiceView, WorkflowError> {
        actor.require(Resource::Invoice, Action::Create)?;
        let lease = self
            .store
            .fetch_lease(draft.lease_id)?
            .ok_or(WorkflowError::NotFound("lease"))?;
        let accommodation = self.accommodation(lease.accommodation_id)?;
        actor.require_manager(accommodation.admin_id, "accommodation")?;
        WorkflowError::check(draft.validate())?;

        let invoice = self.store.insert_invoice(NewInvoice {
            user_id: lease.user_id,
            accommodation_id: lease.accommodation_id,
            lease_id: lease.id,
            amount: draft.amount,
            late_fee: draft.late_fee,
            period_start: draft.period_start,
            period_end: draft.period_end,
            due_date: draft.due_date.unwrap_or(draft.period_start),
            created_at: Utc::now(),
        })?;

        let student = self.user(invoice.user_id)?;
        self.notifier.deliver(
            &student,
            &notice::invoice_issued(&invoice.id.number(), invoice.total(), invoice.due_date),
        );
        tracing::info!(
            invoice_id = %invoice.id,
            lease_id = %lease.id,
            created_by = %actor.user_id,
            "invoice created"
        );
        Ok(invoice.view(today()))
    }

    pub fn mark_paid(
        &self,
        actor: Actor,
        id: InvoiceId,
        payment: Payment,
    ) -> Result<InvoiceView, WorkflowError> {
        actor.require(Resource::Invoice, Action::Edit)?;
        let invoice = self.invoice(id)?;
        let accommodation = self.accommodation(invoice.accommodation_id)?;
        actor.require_manager(accommodation.admin_id, "accommodation")?;
        WorkflowError::check(payment.validate())?;
        if invoice.paid {
            return Err(WorkflowError::conflict("Invoice has already been paid"));
        }

        let invoice = self.store.mark_invoice_paid(
            id,
            PaymentRecord {
                payment_method: payment.payment_method.trim().to_string(),
                reference_number: payment
                    .reference_number
                    .map(|reference| reference.trim().to_string())
                    .filter(|reference| !reference.is_empty()),
                paid_at: Utc::now(),
            },
        )?;

        let student = self.user(invoice.user_id)?;
        self.notifier.deliver(
            &student,
            &notice::payment_received(&invoice.id.number(), invoice.total()),
        );
        tracing::info!(invoice_id = %invoice.id, recorded_by = %actor.user_id, "invoice paid");
        Ok(invoice.view(today()))
    }

    /// Sends a payment reminder for an open invoice.
    pub fn remind(&self, actor: Actor, id: InvoiceId) -> Result<Delivery, WorkflowError> {
        actor.require(Resource::Invoice, Action::Edit)?;
        let invoice = self.invoice(id)?;
        let accommodation = self.accommodation(invoice.accommodation_id)?;
        actor.require_manager(accommodation.admin_id, "accommodation")?;
        if invoice.paid {
            return Err(WorkflowError::conflict("Invoice has already been paid"));
        }

        let student = self.user(invoice.user_id)?;
        let reminder = notice::payment_reminder(
            &invoice.id.number(),
            invoice.total(),
            invoice.due_date,
            invoice.is_overdue(today()),
        );
        let delivery = self.notifier.deliver(&student, &reminder);
        tracing::info!(invoice_id = %invoice.id, sent_by = %actor.user_id, "payment reminder sent");
        Ok(delivery)
    }

    fn invoice(&self, id: InvoiceId) -> Result<Invoice, WorkflowError> {
        self.store
            .fetch_invoice(id)?
            .ok_or(WorkflowError::NotFound("invoice"))
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
