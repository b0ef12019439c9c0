use std::fmt;

use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::workflows::accommodations::AccommodationId;
use crate::workflows::accounts::UserId;
use crate::workflows::applications::ApplicationId;
use crate::workflows::invoices::InvoiceView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeaseId(pub u64);

impl fmt::Display for LeaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    pub id: LeaseId,
    pub user_id: UserId,
    pub accommodation_id: AccommodationId,
    pub application_id: Option<ApplicationId>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub monthly_rent: Decimal,
    pub security_deposit: Decimal,
    pub signed: bool,
    pub signed_at: Option<DateTime<Utc>>,
    pub terminated_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaseStatus {
    AwaitingSignature,
    Active,
    Terminated,
    Ended,
}

impl LeaseStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LeaseStatus::AwaitingSignature => "awaiting_signature",
            LeaseStatus::Active => "active",
            LeaseStatus::Terminated => "terminated",
            LeaseStatus::Ended => "ended",
        }
    }
}

impl Lease {
    /// A lease holds a room until its end date has passed.
    pub fn is_current(&self, today: NaiveDate) -> bool {
        self.end_date >= today
    }

    pub fn status(&self, today: NaiveDate) -> LeaseStatus {
        if self.terminated_on.is_some() {
            LeaseStatus::Terminated
        } else if !self.is_current(today) {
            LeaseStatus::Ended
        } else if !self.signed {
            LeaseStatus::AwaitingSignature
        } else {
            LeaseStatus::Active
        }
    }

    /// First invoice issued on signing: one month of rent, due a week before move-in.
    pub fn first_billing_period(&self) -> BillingPeriod {
        let period_end = self
            .start_date
            .checked_add_months(Months::new(1))
            .and_then(|date| date.checked_sub_days(Days::new(1)))
            .unwrap_or(self.start_date);
        let due_date = self
            .start_date
            .checked_sub_days(Days::new(7))
            .unwrap_or(self.start_date);

        BillingPeriod {
            period_start: self.start_date,
            period_end,
            due_date,
        }
    }

    pub fn view(&self, today: NaiveDate) -> LeaseView {
        LeaseView {
            lease: self.clone(),
            status: self.status(today),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingPeriod {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub due_date: NaiveDate,
}

/// Dates and money a lease is issued with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseTerms {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub monthly_rent: Decimal,
    pub security_deposit: Decimal,
}

impl LeaseTerms {
    /// Twelve months from `start_date` at the listed price, with one month's deposit.
    pub fn standard(start_date: NaiveDate, monthly_rent: Decimal) -> Self {
        let end_date = start_date
            .checked_add_months(Months::new(12))
            .unwrap_or(start_date);
        Self {
            start_date,
            end_date,
            monthly_rent,
            security_deposit: monthly_rent,
        }
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.end_date <= self.start_date {
            errors.push("End date must be after start date".to_string());
        }
        if self.monthly_rent <= Decimal::ZERO {
            errors.push("Monthly rent must be greater than zero".to_string());
        }
        if self.security_deposit < Decimal::ZERO {
            errors.push("Security deposit cannot be negative".to_string());
        }
        errors
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLease {
    pub user_id: UserId,
    pub accommodation_id: AccommodationId,
    pub application_id: Option<ApplicationId>,
    pub terms: LeaseTerms,
    pub created_at: DateTime<Utc>,
}

/// Admin form for issuing a lease without an application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseRequest {
    pub user_id: UserId,
    pub accommodation_id: AccommodationId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub monthly_rent: Decimal,
    pub security_deposit: Decimal,
}

impl LeaseRequest {
    pub fn terms(&self) -> LeaseTerms {
        LeaseTerms {
            start_date: self.start_date,
            end_date: self.end_date,
            monthly_rent: self.monthly_rent,
            security_deposit: self.security_deposit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Termination {
    pub termination_date: NaiveDate,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseView {
    #[serde(flatten)]
    pub lease: Lease,
    pub status: LeaseStatus,
}

/// Result of signing: the signed lease and the first invoice it produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningOutcome {
    pub lease: LeaseView,
    pub invoice: InvoiceView,
}
