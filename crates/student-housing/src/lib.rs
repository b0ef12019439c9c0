//! Student housing portal: accommodation catalog, the application → lease → invoice
//! pipeline, maintenance requests, and notification fan-out behind a role-gated HTTP API.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
