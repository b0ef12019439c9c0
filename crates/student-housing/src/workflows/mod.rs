pub mod accommodations;
pub mod accounts;
pub mod applications;
pub mod dashboard;
pub mod error;
pub(crate) mod extract;
pub mod invoices;
pub mod leases;
pub mod maintenance;
pub mod notifications;
pub mod portal;
pub(crate) mod scope;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

use chrono::{NaiveDate, Utc};

pub use error::{RepositoryError, WorkflowError};
pub use portal::{portal_router, Portal, PortalSettings};
pub use storage::{HousingStore, InMemoryHousingStore, SqliteHousingStore};

/// Calendar date every lease, invoice, and occupancy check is evaluated against.
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}
