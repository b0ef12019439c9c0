//! Maintenance requests filed by residents and worked by accommodation admins.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{
    sort_queue, MaintenanceFilter, MaintenanceId, MaintenanceRequest, MaintenanceStatus,
    MaintenanceSubmission, NewMaintenanceRequest, Priority, StatusChange, StatusUpdate,
};
pub use repository::MaintenanceRepository;
pub use service::MaintenanceService;
