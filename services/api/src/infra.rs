use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use student_housing::workflows::notifications::{
    DispatchError, EmailMessage, MessageDispatcher, SmsMessage,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Outbound channel that records messages in the service log instead of relaying them.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct LogDispatcher;

impl MessageDispatcher for LogDispatcher {
    fn send_email(&self, message: &EmailMessage) -> Result<(), DispatchError> {
        if !message.to.contains('@') {
            return Err(DispatchError::Recipient(message.to.clone()));
        }
        tracing::info!(
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            "email queued"
        );
        Ok(())
    }

    fn send_sms(&self, message: &SmsMessage) -> Result<(), DispatchError> {
        tracing::info!(to = %message.to, chars = message.body.chars().count(), "sms queued");
        Ok(())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
