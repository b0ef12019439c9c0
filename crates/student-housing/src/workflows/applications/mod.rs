//! Student applications and the approval step that issues leases.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Application, ApplicationFilter, ApplicationId, ApplicationRequest, ApplicationStatus,
    ApprovalOutcome, ApprovalTerms, NewApplication, Rejection,
};
pub use repository::ApplicationRepository;
pub use service::ApplicationService;
