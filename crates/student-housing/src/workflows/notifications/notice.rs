//! Message templates for workflow events.
//!
//! Each builder returns a [`Notice`] whose `message` is stored in the in-app inbox and
//! wrapped into the email body. `sms` carries the short form when the event warrants a text.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

use super::domain::NotificationKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NotificationKind,
    pub subject: String,
    pub message: String,
    pub sms: Option<String>,
}

impl Notice {
    fn new(
        kind: NotificationKind,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            subject: subject.into(),
            message: message.into(),
            sms: None,
        }
    }

    fn with_sms(mut self, text: impl Into<String>) -> Self {
        self.sms = Some(text.into());
        self
    }
}

/// Formats rand amounts as `R 1,234.50`.
pub fn format_currency(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}R {grouped}.{cents}")
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%d %B %Y").to_string()
}

pub fn welcome(app_name: &str, username: &str) -> Notice {
    Notice::new(
        NotificationKind::Account,
        format!("Welcome to {app_name}"),
        format!(
            "Your account has been created. You can now sign in as '{username}' to browse \
             accommodations and apply for a room."
        ),
    )
    .with_sms(format!(
        "Welcome to {app_name}! Your account '{username}' is ready."
    ))
}

pub fn application_submitted(accommodation: &str) -> Notice {
    Notice::new(
        NotificationKind::Application,
        "Application Submitted",
        format!(
            "Your application for {accommodation} has been submitted and is awaiting review."
        ),
    )
}

pub fn application_received(student: &str, accommodation: &str) -> Notice {
    Notice::new(
        NotificationKind::Application,
        "New Application",
        format!("{student} has applied for {accommodation}."),
    )
}

pub fn application_approved(
    accommodation: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    monthly_rent: Decimal,
) -> Notice {
    Notice::new(
        NotificationKind::Application,
        "Application Approved",
        format!(
            "Congratulations! Your application for {accommodation} has been approved. \
             A lease from {} to {} at {} per month is ready for your signature.",
            format_date(start_date),
            format_date(end_date),
            format_currency(monthly_rent),
        ),
    )
    .with_sms(format!(
        "Your application for {accommodation} was approved. Please sign your lease online."
    ))
}

pub fn application_rejected(accommodation: &str, notes: Option<&str>) -> Notice {
    let mut message =
        format!("Unfortunately your application for {accommodation} was not successful.");
    if let Some(notes) = notes.map(str::trim).filter(|notes| !notes.is_empty()) {
        message.push_str(&format!(" Reason: {notes}"));
    }
    Notice::new(NotificationKind::Application, "Application Rejected", message).with_sms(format!(
        "Your application for {accommodation} was not successful. See the portal for details."
    ))
}

pub fn lease_signed(accommodation: &str, start_date: NaiveDate) -> Notice {
    Notice::new(
        NotificationKind::Lease,
        "Lease Signed",
        format!(
            "Thank you for signing your lease for {accommodation}. Your tenancy starts on {}.",
            format_date(start_date)
        ),
    )
}

pub fn lease_created(accommodation: &str) -> Notice {
    Notice::new(
        NotificationKind::Lease,
        "New Lease",
        format!(
            "Your lease for {accommodation} has been created. \
             Please sign it to complete the process."
        ),
    )
}

pub fn lease_terminated(
    accommodation: &str,
    termination_date: NaiveDate,
    reason: Option<&str>,
) -> Notice {
    let mut message = format!(
        "Your lease for {accommodation} has been terminated effective {}.",
        format_date(termination_date)
    );
    if let Some(reason) = reason.map(str::trim).filter(|reason| !reason.is_empty()) {
        message.push_str(&format!(" Reason: {reason}"));
    }
    Notice::new(NotificationKind::Lease, "Lease Terminated", message).with_sms(format!(
        "Your lease for {accommodation} ends {}.",
        format_date(termination_date)
    ))
}

pub fn invoice_issued(number: &str, amount: Decimal, due_date: NaiveDate) -> Notice {
    Notice::new(
        NotificationKind::Invoice,
        format!("New Invoice {number}"),
        format!(
            "Invoice {number} for {} has been issued and is due on {}.",
            format_currency(amount),
            format_date(due_date)
        ),
    )
    .with_sms(format!(
        "Invoice {number}: {} due {}.",
        format_currency(amount),
        format_date(due_date)
    ))
}

pub fn payment_received(number: &str, amount: Decimal) -> Notice {
    Notice::new(
        NotificationKind::Invoice,
        "Payment Received",
        format!(
            "We have received your payment of {} for invoice {number}. Thank you.",
            format_currency(amount)
        ),
    )
    .with_sms(format!(
        "Payment of {} received for {number}. Thank you.",
        format_currency(amount)
    ))
}

pub fn payment_reminder(
    number: &str,
    amount: Decimal,
    due_date: NaiveDate,
    overdue: bool,
) -> Notice {
    let (subject, message) = if overdue {
        (
            "Payment Overdue",
            format!(
                "Invoice {number} for {} was due on {} and is now overdue. \
                 Please pay as soon as possible.",
                format_currency(amount),
                format_date(due_date)
            ),
        )
    } else {
        (
            "Payment Reminder",
            format!(
                "This is a reminder that invoice {number} for {} is due on {}.",
                format_currency(amount),
                format_date(due_date)
            ),
        )
    };
    Notice::new(NotificationKind::Invoice, subject, message).with_sms(format!(
        "Reminder: invoice {number} for {} due {}.",
        format_currency(amount),
        format_date(due_date)
    ))
}

pub fn maintenance_reported(
    student: &str,
    accommodation: &str,
    issue: &str,
    priority: &str,
) -> Notice {
    Notice::new(
        NotificationKind::Maintenance,
        "New Maintenance Request",
        format!("{student} reported '{issue}' at {accommodation} ({priority} priority)."),
    )
}

pub fn maintenance_updated(issue: &str, status: &str, notes: Option<&str>) -> Notice {
    let mut message = format!("Your maintenance request '{issue}' is now {status}.");
    if let Some(notes) = notes.map(str::trim).filter(|notes| !notes.is_empty()) {
        message.push_str(&format!(" Notes: {notes}"));
    }
    Notice::new(NotificationKind::Maintenance, "Maintenance Update", message)
}

pub fn broadcast(subject: &str, message: &str, sms: Option<String>) -> Notice {
    let notice = Notice::new(NotificationKind::Broadcast, subject.trim(), message.trim());
    match sms {
        Some(text) => notice.with_sms(text),
        None => notice,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(format_currency(Decimal::new(123450, 2)), "R 1,234.50");
        assert_eq!(format_currency(Decimal::new(4500, 0)), "R 4,500.00");
        assert_eq!(format_currency(Decimal::new(999, 0)), "R 999.00");
        assert_eq!(format_currency(Decimal::new(1_000_000, 0)), "R 1,000,000.00");
        assert_eq!(format_currency(Decimal::new(-2505, 1)), "-R 250.50");
        assert_eq!(format_currency(Decimal::new(1005, 3)), "R 1.01");
    }

    #[test]
    fn dates_use_long_month_names() {
        let date = NaiveDate::from_ymd_opt(2025, 2, 1).expect("valid date");
        assert_eq!(format_date(date), "01 February 2025");
    }

    #[test]
    fn rejection_includes_reason_when_given() {
        let notice = application_rejected("Unity Lodge", Some("Incomplete documents"));
        assert_eq!(notice.subject, "Application Rejected");
        assert!(notice.message.ends_with("Reason: Incomplete documents"));

        let notice = application_rejected("Unity Lodge", Some("  "));
        assert!(!notice.message.contains("Reason"));
    }

    #[test]
    fn approval_quotes_lease_terms() {
        let notice = application_approved(
            "Unity Lodge",
            NaiveDate::from_ymd_opt(2025, 2, 1).expect("valid date"),
            NaiveDate::from_ymd_opt(2026, 2, 1).expect("valid date"),
            Decimal::new(4250, 0),
        );
        assert!(notice.message.contains("01 February 2025"));
        assert!(notice.message.contains("R 4,250.00"));
        assert!(notice.sms.is_some());
    }
}
