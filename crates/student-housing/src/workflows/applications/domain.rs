use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::workflows::accommodations::{Accommodation, AccommodationId};
use crate::workflows::accounts::UserId;
use crate::workflows::leases::{Lease, LeaseTerms};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub u64);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub user_id: UserId,
    pub accommodation_id: AccommodationId,
    pub status: ApplicationStatus,
    pub move_in_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApplication {
    pub user_id: UserId,
    pub accommodation_id: AccommodationId,
    pub move_in_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Student-submitted application form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationRequest {
    pub accommodation_id: AccommodationId,
    #[serde(default)]
    pub move_in_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ApplicationRequest {
    pub fn validate(&self, today: NaiveDate) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(move_in) = self.move_in_date {
            if move_in < today {
                errors.push("Move-in date must be in the future".to_string());
            }
        }
        errors
    }
}

/// Optional overrides an admin may supply when approving.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApprovalTerms {
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub monthly_rent: Option<Decimal>,
    #[serde(default)]
    pub security_deposit: Option<Decimal>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ApprovalTerms {
    /// Fills gaps from the application and listing: start on the requested move-in date
    /// (or today), run twelve months, charge the listed price with one month's deposit.
    pub fn resolve(
        &self,
        application: &Application,
        accommodation: &Accommodation,
        today: NaiveDate,
    ) -> LeaseTerms {
        let start_date = self
            .start_date
            .or(application.move_in_date)
            .unwrap_or(today);
        let monthly_rent = self.monthly_rent.unwrap_or(accommodation.price_per_month);
        let standard = LeaseTerms::standard(start_date, monthly_rent);

        LeaseTerms {
            start_date,
            end_date: self.end_date.unwrap_or(standard.end_date),
            monthly_rent,
            security_deposit: self.security_deposit.unwrap_or(monthly_rent),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rejection {
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationFilter {
    #[serde(default)]
    pub status: Option<ApplicationStatus>,
}

/// Result of an approval: the updated application and the lease it produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalOutcome {
    pub application: Application,
    pub lease: Lease,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn application(move_in_date: Option<NaiveDate>) -> Application {
        Application {
            id: ApplicationId(1),
            user_id: UserId(5),
            accommodation_id: AccommodationId(2),
            status: ApplicationStatus::Pending,
            move_in_date,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn accommodation() -> Accommodation {
        Accommodation {
            id: AccommodationId(2),
            name: "Sunnyside Residence".to_string(),
            location: "Pretoria".to_string(),
            description: String::new(),
            rooms_available: 4,
            price_per_month: Decimal::new(3850, 0),
            admin_id: Some(UserId(2)),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn defaults_start_today_at_listed_price() {
        let today = date(2025, 1, 15);
        let terms = ApprovalTerms::default().resolve(&application(None), &accommodation(), today);

        assert_eq!(terms.start_date, today);
        assert_eq!(terms.end_date, date(2026, 1, 15));
        assert_eq!(terms.monthly_rent, Decimal::new(3850, 0));
        assert_eq!(terms.security_deposit, Decimal::new(3850, 0));
    }

    #[test]
    fn requested_move_in_date_becomes_start() {
        let terms = ApprovalTerms::default().resolve(
            &application(Some(date(2025, 2, 1))),
            &accommodation(),
            date(2025, 1, 15),
        );
        assert_eq!(terms.start_date, date(2025, 2, 1));
        assert_eq!(terms.end_date, date(2026, 2, 1));
    }

    #[test]
    fn admin_overrides_win() {
        let overrides = ApprovalTerms {
            start_date: Some(date(2025, 3, 1)),
            end_date: Some(date(2025, 11, 30)),
            monthly_rent: Some(Decimal::new(4000, 0)),
            security_deposit: Some(Decimal::ZERO),
            notes: None,
        };
        let terms = overrides.resolve(
            &application(Some(date(2025, 2, 1))),
            &accommodation(),
            date(2025, 1, 15),
        );
        assert_eq!(terms.start_date, date(2025, 3, 1));
        assert_eq!(terms.end_date, date(2025, 11, 30));
        assert_eq!(terms.monthly_rent, Decimal::new(4000, 0));
        assert_eq!(terms.security_deposit, Decimal::ZERO);
    }

    #[test]
    fn past_move_in_dates_are_rejected() {
        let request = ApplicationRequest {
            accommodation_id: AccommodationId(2),
            move_in_date: Some(date(2025, 1, 1)),
            notes: None,
        };
        assert_eq!(
            request.validate(date(2025, 1, 15)),
            vec!["Move-in date must be in the future"]
        );
    }
}
