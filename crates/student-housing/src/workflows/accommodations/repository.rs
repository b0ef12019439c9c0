use chrono::NaiveDate;

use super::domain::{Accommodation, AccommodationId, NewAccommodation};
use crate::workflows::error::RepositoryError;

pub trait AccommodationRepository: Send + Sync {
    fn insert_accommodation(
        &self,
        accommodation: NewAccommodation,
    ) -> Result<Accommodation, RepositoryError>;
    fn update_accommodation(&self, accommodation: Accommodation) -> Result<(), RepositoryError>;
    fn fetch_accommodation(
        &self,
        id: AccommodationId,
    ) -> Result<Option<Accommodation>, RepositoryError>;
    fn list_accommodations(&self) -> Result<Vec<Accommodation>, RepositoryError>;
    /// Removes the accommodation together with its applications, leases, invoices, and
    /// maintenance requests. Fails with [`RepositoryError::Conflict`] while any of its leases
    /// is current on `today`.
    fn delete_accommodation(
        &self,
        id: AccommodationId,
        today: NaiveDate,
    ) -> Result<Accommodation, RepositoryError>;
}
