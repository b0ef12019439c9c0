pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{
    BillingPeriod, Lease, LeaseId, LeaseRequest, LeaseStatus, LeaseTerms, LeaseView, NewLease,
    SigningOutcome, Termination,
};
pub use repository::LeaseRepository;
pub use service::LeaseService;
