use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::dispatch::{EmailMessage, MessageDispatcher, SmsMessage};
use super::domain::NewNotification;
use super::notice::Notice;
use super::repository::NotificationRepository;
use crate::config::MessagingConfig;
use crate::workflows::accounts::{User, UserId};

#[derive(Debug, Clone)]
pub struct MessagingSettings {
    pub app_name: String,
    pub mail_from: String,
    pub sms_enabled: bool,
}

impl From<&MessagingConfig> for MessagingSettings {
    fn from(config: &MessagingConfig) -> Self {
        Self {
            app_name: config.app_name.clone(),
            mail_from: config.mail_from.clone(),
            sms_enabled: config.sms_enabled,
        }
    }
}

/// Outcome per channel; `sms` is `None` when no text was attempted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub in_app: bool,
    pub email: bool,
    pub sms: Option<bool>,
}

/// Fans notices out to the inbox, email, and SMS. Failures are logged, never returned.
pub struct Notifier<S, D> {
    store: Arc<S>,
    dispatcher: Arc<D>,
    settings: MessagingSettings,
}

impl<S, D> Clone for Notifier<S, D> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            dispatcher: Arc::clone(&self.dispatcher),
            settings: self.settings.clone(),
        }
    }
}

impl<S, D> Notifier<S, D>
where
    S: NotificationRepository + 'static,
    D: MessageDispatcher + 'static,
{
    pub fn new(store: Arc<S>, dispatcher: Arc<D>, settings: MessagingSettings) -> Self {
        Self {
            store,
            dispatcher,
            settings,
        }
    }

    pub fn settings(&self) -> &MessagingSettings {
        &self.settings
    }

    /// In-app notice only.
    pub fn post(&self, user_id: UserId, notice: &Notice) -> bool {
        let result = self.store.insert_notification(NewNotification {
            user_id,
            subject: notice.subject.clone(),
            message: notice.message.clone(),
            kind: notice.kind,
            created_at: Utc::now(),
        });
        match result {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(user_id = %user_id, error = %err, "failed to store notification");
                false
            }
        }
    }

    pub fn email(&self, recipient: &User, subject: &str, message: &str) -> bool {
        let email = EmailMessage {
            from: self.settings.mail_from.clone(),
            to: recipient.email.clone(),
            subject: subject.to_string(),
            body: self.email_body(recipient, message),
        };
        match self.dispatcher.send_email(&email) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(user_id = %recipient.id, error = %err, "email delivery failed");
                false
            }
        }
    }

    /// Sends a text when SMS is enabled and the recipient has a phone number.
    pub fn sms(&self, recipient: &User, text: &str) -> Option<bool> {
        if !self.settings.sms_enabled {
            return None;
        }
        let phone = recipient
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|phone| !phone.is_empty())?;

        let sms = SmsMessage {
            to: phone.to_string(),
            body: text.to_string(),
        };
        match self.dispatcher.send_sms(&sms) {
            Ok(()) => Some(true),
            Err(err) => {
                tracing::warn!(user_id = %recipient.id, error = %err, "sms delivery failed");
                Some(false)
            }
        }
    }

    /// Inbox, email, and (if the notice carries one) SMS.
    pub fn deliver(&self, recipient: &User, notice: &Notice) -> Delivery {
        Delivery {
            in_app: self.post(recipient.id, notice),
            email: self.email(recipient, &notice.subject, &notice.message),
            sms: notice
                .sms
                .as_deref()
                .and_then(|text| self.sms(recipient, text)),
        }
    }

    fn email_body(&self, recipient: &User, message: &str) -> String {
        let name = if recipient.first_name.trim().is_empty() {
            recipient.username.as_str()
        } else {
            recipient.first_name.trim()
        };
        format!(
            "Dear {name},\n\n{message}\n\nKind regards,\n{}",
            self.settings.app_name
        )
    }
}
