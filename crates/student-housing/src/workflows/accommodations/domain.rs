use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::workflows::accounts::UserId;
use crate::workflows::leases::Lease;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccommodationId(pub u64);

impl fmt::Display for AccommodationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A residence students can apply for. `admin_id` names the managing admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accommodation {
    pub id: AccommodationId,
    pub name: String,
    pub location: String,
    pub description: String,
    pub rooms_available: u32,
    pub price_per_month: Decimal,
    pub admin_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccommodation {
    pub name: String,
    pub location: String,
    pub description: String,
    pub rooms_available: u32,
    pub price_per_month: Decimal,
    pub admin_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Create/edit form. Only master admins may choose `admin_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccommodationDraft {
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub description: String,
    pub rooms_available: u32,
    pub price_per_month: Decimal,
    #[serde(default)]
    pub admin_id: Option<UserId>,
}

impl AccommodationDraft {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("Name is required".to_string());
        }
        if self.location.trim().is_empty() {
            errors.push("Location is required".to_string());
        }
        if self.price_per_month <= Decimal::ZERO {
            errors.push("Price per month must be greater than zero".to_string());
        }
        errors
    }
}

/// Room usage derived from leases that have not yet ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupancy {
    pub occupied_rooms: u32,
    pub vacant_rooms: u32,
}

impl Occupancy {
    pub fn from_leases<'a>(
        rooms_available: u32,
        leases: impl IntoIterator<Item = &'a Lease>,
        today: NaiveDate,
    ) -> Self {
        let occupied = leases
            .into_iter()
            .filter(|lease| lease.is_current(today))
            .count();
        let occupied_rooms = u32::try_from(occupied).unwrap_or(u32::MAX);
        Self {
            occupied_rooms,
            vacant_rooms: rooms_available.saturating_sub(occupied_rooms),
        }
    }

    pub fn has_vacancy(&self) -> bool {
        self.vacant_rooms > 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccommodationView {
    #[serde(flatten)]
    pub accommodation: Accommodation,
    #[serde(flatten)]
    pub occupancy: Occupancy,
}
