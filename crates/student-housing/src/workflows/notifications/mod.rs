//! In-app inbox, outbound email/SMS, and admin broadcasts.

pub mod dispatch;
pub mod domain;
pub mod notice;
pub mod notifier;
pub mod repository;
pub mod router;
pub mod service;

pub use dispatch::{DispatchError, EmailMessage, MessageDispatcher, SmsMessage};
pub use domain::{
    Audience, BroadcastReport, BroadcastRequest, Inbox, InboxQuery, NewNotification,
    Notification, NotificationId, NotificationKind,
};
pub use notice::Notice;
pub use notifier::{Delivery, MessagingSettings, Notifier};
pub use repository::NotificationRepository;
pub use service::NotificationService;
