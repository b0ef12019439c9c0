//! Accommodation catalog with occupancy derived from current leases.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{
    Accommodation, AccommodationDraft, AccommodationId, AccommodationView, NewAccommodation,
    Occupancy,
};
pub use repository::AccommodationRepository;
pub use service::AccommodationService;
