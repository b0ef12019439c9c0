//! Persistence seam shared by every workflow.

mod memory;
mod sqlite;
#[cfg(test)]
pub(crate) mod suite;

pub use memory::InMemoryHousingStore;
pub use sqlite::SqliteHousingStore;

use crate::workflows::accommodations::AccommodationRepository;
use crate::workflows::accounts::UserRepository;
use crate::workflows::applications::ApplicationRepository;
use crate::workflows::invoices::InvoiceRepository;
use crate::workflows::leases::LeaseRepository;
use crate::workflows::maintenance::MaintenanceRepository;
use crate::workflows::notifications::NotificationRepository;

/// A backend able to serve every portal workflow.
pub trait HousingStore:
    UserRepository
    + AccommodationRepository
    + ApplicationRepository
    + LeaseRepository
    + InvoiceRepository
    + MaintenanceRepository
    + NotificationRepository
    + 'static
{
}

impl<T> HousingStore for T where
    T: UserRepository
        + AccommodationRepository
        + ApplicationRepository
        + LeaseRepository
        + InvoiceRepository
        + MaintenanceRepository
        + NotificationRepository
        + 'static
{
}
