use super::domain::{Invoice, InvoiceId, NewInvoice, PaymentRecord};
use crate::workflows::error::RepositoryError;

pub trait InvoiceRepository: Send + Sync {
    fn insert_invoice(&self, invoice: NewInvoice) -> Result<Invoice, RepositoryError>;
    fn fetch_invoice(&self, id: InvoiceId) -> Result<Option<Invoice>, RepositoryError>;
    fn list_invoices(&self) -> Result<Vec<Invoice>, RepositoryError>;
    /// Compare-and-set: only an unpaid invoice can be settled.
    fn mark_invoice_paid(
        &self,
        id: InvoiceId,
        payment: PaymentRecord,
    ) -> Result<Invoice, RepositoryError>;
}
