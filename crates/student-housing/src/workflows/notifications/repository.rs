use super::domain::{NewNotification, Notification, NotificationId};
use crate::workflows::accounts::UserId;
use crate::workflows::error::RepositoryError;

pub trait NotificationRepository: Send + Sync {
    fn insert_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, RepositoryError>;
    /// Newest first.
    fn notifications_for_user(
        &self,
        user: UserId,
        unread_only: bool,
    ) -> Result<Vec<Notification>, RepositoryError>;
    /// Fails with [`RepositoryError::NotFound`] unless the notification belongs to `user`.
    fn mark_notification_read(
        &self,
        id: NotificationId,
        user: UserId,
    ) -> Result<Notification, RepositoryError>;
    fn mark_all_notifications_read(&self, user: UserId) -> Result<usize, RepositoryError>;
    fn count_unread_notifications(&self, user: UserId) -> Result<usize, RepositoryError>;
}
