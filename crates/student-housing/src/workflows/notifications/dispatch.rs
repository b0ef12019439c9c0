use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsMessage {
    pub to: String,
    pub body: String,
}

/// Outbound delivery hooks (SMTP relay, SMS gateway, or an in-process recorder).
pub trait MessageDispatcher: Send + Sync {
    fn send_email(&self, message: &EmailMessage) -> Result<(), DispatchError>;
    fn send_sms(&self, message: &SmsMessage) -> Result<(), DispatchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("email transport unavailable: {0}")]
    Email(String),
    #[error("sms transport unavailable: {0}")]
    Sms(String),
    #[error("invalid recipient '{0}'")]
    Recipient(String),
}
