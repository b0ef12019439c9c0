pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{
    total_due, Invoice, InvoiceDraft, InvoiceFilter, InvoiceId, InvoiceStatus, InvoiceView,
    NewInvoice, Payment, PaymentRecord,
};
pub use repository::InvoiceRepository;
pub use service::InvoiceService;
