use chrono::{DateTime, Utc};

use super::domain::{Application, ApplicationId, ApplicationStatus, NewApplication};
use crate::workflows::error::RepositoryError;
use crate::workflows::leases::{Lease, NewLease};

/// Storage abstraction for student applications.
pub trait ApplicationRepository: Send + Sync {
    /// Fails with [`RepositoryError::Conflict`] while the student has a pending or
    /// approved application for the same accommodation.
    fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<Application, RepositoryError>;
    fn fetch_application(
        &self,
        id: ApplicationId,
    ) -> Result<Option<Application>, RepositoryError>;
    fn list_applications(&self) -> Result<Vec<Application>, RepositoryError>;
    /// Compare-and-set status change. Fails with [`RepositoryError::StaleState`] when the
    /// application is no longer in `from`.
    fn transition_application(
        &self,
        id: ApplicationId,
        from: ApplicationStatus,
        to: ApplicationStatus,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Application, RepositoryError>;
    /// Moves a pending application to approved and inserts its lease atomically. On
    /// [`RepositoryError::StaleState`] or [`RepositoryError::NoVacancy`] nothing is written.
    fn approve_application(
        &self,
        id: ApplicationId,
        notes: Option<String>,
        lease: NewLease,
    ) -> Result<(Application, Lease), RepositoryError>;
}
