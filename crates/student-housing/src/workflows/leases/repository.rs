use chrono::{DateTime, NaiveDate, Utc};

use super::domain::{Lease, LeaseId, NewLease};
use crate::workflows::error::RepositoryError;

pub trait LeaseRepository: Send + Sync {
    /// Fails with [`RepositoryError::Conflict`] when the application already produced a lease,
    /// [`RepositoryError::NotFound`] for an unknown accommodation, and
    /// [`RepositoryError::NoVacancy`] when current leases already fill every room.
    fn insert_lease(&self, lease: NewLease) -> Result<Lease, RepositoryError>;
    fn fetch_lease(&self, id: LeaseId) -> Result<Option<Lease>, RepositoryError>;
    fn list_leases(&self) -> Result<Vec<Lease>, RepositoryError>;
    /// Compare-and-set: only an unsigned lease can be signed.
    fn mark_lease_signed(
        &self,
        id: LeaseId,
        signed_at: DateTime<Utc>,
    ) -> Result<Lease, RepositoryError>;
    /// Moves the end date to `on` and records the termination; a lease terminates once.
    fn terminate_lease(&self, id: LeaseId, on: NaiveDate) -> Result<Lease, RepositoryError>;
}
