use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::workflows::accommodations::AccommodationId;
use crate::workflows::accounts::UserId;
use crate::workflows::leases::LeaseId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(pub u64);

impl InvoiceId {
    /// Display number printed on statements, e.g. `INV-000042`.
    pub fn number(self) -> String {
        format!("INV-{:06}", self.0)
    }
}

impl fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub user_id: UserId,
    pub accommodation_id: AccommodationId,
    pub lease_id: LeaseId,
    pub amount: Decimal,
    pub late_fee: Decimal,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub due_date: NaiveDate,
    pub paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_method: Option<String>,
    pub reference_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Paid,
    Unpaid,
    Overdue,
}

impl Invoice {
    pub fn total(&self) -> Decimal {
        self.amount + self.late_fee
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.paid && self.due_date < today
    }

    pub fn status(&self, today: NaiveDate) -> InvoiceStatus {
        if self.paid {
            InvoiceStatus::Paid
        } else if self.is_overdue(today) {
            InvoiceStatus::Overdue
        } else {
            InvoiceStatus::Unpaid
        }
    }

    /// `unpaid` matches every open invoice, overdue ones included.
    pub fn matches(&self, filter: InvoiceStatus, today: NaiveDate) -> bool {
        match filter {
            InvoiceStatus::Paid => self.paid,
            InvoiceStatus::Unpaid => !self.paid,
            InvoiceStatus::Overdue => self.is_overdue(today),
        }
    }

    pub fn view(&self, today: NaiveDate) -> InvoiceView {
        InvoiceView {
            number: self.id.number(),
            invoice: self.clone(),
            status: self.status(today),
            total: self.total(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoice {
    pub user_id: UserId,
    pub accommodation_id: AccommodationId,
    pub lease_id: LeaseId,
    pub amount: Decimal,
    pub late_fee: Decimal,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Admin form for billing a lease outside the signing flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceDraft {
    pub lease_id: LeaseId,
    pub amount: Decimal,
    #[serde(default)]
    pub late_fee: Decimal,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    /// Defaults to the period start.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

impl InvoiceDraft {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.amount <= Decimal::ZERO {
            errors.push("Amount must be greater than zero".to_string());
        }
        if self.late_fee < Decimal::ZERO {
            errors.push("Late fee cannot be negative".to_string());
        }
        if self.period_end < self.period_start {
            errors.push("Period end must not be before period start".to_string());
        }
        errors
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub payment_method: String,
    #[serde(default)]
    pub reference_number: Option<String>,
}

impl Payment {
    pub fn validate(&self) -> Vec<String> {
        if self.payment_method.trim().is_empty() {
            vec!["Payment method is required".to_string()]
        } else {
            Vec::new()
        }
    }
}

/// Payment details persisted by [`super::InvoiceRepository::mark_invoice_paid`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRecord {
    pub payment_method: String,
    pub reference_number: Option<String>,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceFilter {
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceView {
    pub number: String,
    #[serde(flatten)]
    pub invoice: Invoice,
    pub status: InvoiceStatus,
    pub total: Decimal,
}

/// Sum of `amount + late_fee` over unpaid invoices.
pub fn total_due<'a>(invoices: impl IntoIterator<Item = &'a Invoice>) -> Decimal {
    invoices
        .into_iter()
        .filter(|invoice| !invoice.paid)
        .map(Invoice::total)
        .sum()
}
