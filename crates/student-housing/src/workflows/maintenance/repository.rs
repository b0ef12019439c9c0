use super::domain::{MaintenanceId, MaintenanceRequest, NewMaintenanceRequest, StatusChange};
use crate::workflows::error::RepositoryError;

pub trait MaintenanceRepository: Send + Sync {
    fn insert_maintenance_request(
        &self,
        request: NewMaintenanceRequest,
    ) -> Result<MaintenanceRequest, RepositoryError>;
    fn fetch_maintenance_request(
        &self,
        id: MaintenanceId,
    ) -> Result<Option<MaintenanceRequest>, RepositoryError>;
    fn list_maintenance_requests(&self) -> Result<Vec<MaintenanceRequest>, RepositoryError>;
    /// Fails with [`RepositoryError::StaleState`] once the request is completed or cancelled.
    /// Moving to `completed` stamps `completed_at`.
    fn update_maintenance_status(
        &self,
        id: MaintenanceId,
        change: StatusChange,
    ) -> Result<MaintenanceRequest, RepositoryError>;
}
