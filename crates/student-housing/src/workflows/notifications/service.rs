use std::collections::BTreeMap;
use std::sync::Arc;

use super::dispatch::MessageDispatcher;
use super::domain::{
    Audience, BroadcastReport, BroadcastRequest, Inbox, InboxQuery, Notification, NotificationId,
};
use super::notice;
use super::notifier::Notifier;
use crate::workflows::accommodations::AccommodationId;
use crate::workflows::accounts::{Action, Actor, Resource, Role, User, UserId};
use crate::workflows::error::{RepositoryError, WorkflowError};
use crate::workflows::scope::Scope;
use crate::workflows::storage::HousingStore;
use crate::workflows::today;

/// Inbox management and admin broadcasts.
pub struct NotificationService<S, D> {
    store: Arc<S>,
    notifier: Notifier<S, D>,
}

impl<S, D> NotificationService<S, D>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    pub fn new(store: Arc<S>, notifier: Notifier<S, D>) -> Self {
        Self { store, notifier }
    }

    pub fn inbox(&self, actor: Actor, query: &InboxQuery) -> Result<Inbox, WorkflowError> {
        actor.require(Resource::Notification, Action::View)?;
        let notifications = self
            .store
            .notifications_for_user(actor.user_id, query.unread_only)?;
        let unread = self.store.count_unread_notifications(actor.user_id)?;
        Ok(Inbox {
            unread,
            notifications,
        })
    }

    pub fn unread_count(&self, actor: Actor) -> Result<usize, WorkflowError> {
        Ok(self.store.count_unread_notifications(actor.user_id)?)
    }

    pub fn mark_read(
        &self,
        actor: Actor,
        id: NotificationId,
    ) -> Result<Notification, WorkflowError> {
        match self.store.mark_notification_read(id, actor.user_id) {
            Ok(notification) => Ok(notification),
            Err(RepositoryError::NotFound) => Err(WorkflowError::NotFound("notification")),
            Err(other) => Err(other.into()),
        }
    }

    pub fn mark_all_read(&self, actor: Actor) -> Result<usize, WorkflowError> {
        Ok(self.store.mark_all_notifications_read(actor.user_id)?)
    }

    /// Sends one message to every resolved recipient: inbox and email always, SMS on request.
    pub fn broadcast(
        &self,
        actor: Actor,
        request: BroadcastRequest,
    ) -> Result<BroadcastReport, WorkflowError> {
        actor.require(Resource::Notification, Action::Create)?;
        WorkflowError::check(request.validate())?;

        let recipients = self.recipients(actor, &request.audience)?;
        if recipients.is_empty() {
            return Err(WorkflowError::Validation(vec![
                "No recipients found for the selected audience".to_string(),
            ]));
        }

        let sms_text = request.send_sms.then(|| request.sms_text());
        let notice = notice::broadcast(&request.subject, &request.message, sms_text.clone());

        let mut report = BroadcastReport {
            recipients: recipients.len(),
            ..BroadcastReport::default()
        };
        for recipient in &recipients {
            self.notifier.post(recipient.id, &notice);

            if self.notifier.email(recipient, &notice.subject, &notice.message) {
                report.emails_sent += 1;
            } else {
                report.emails_failed += 1;
            }

            if let Some(text) = &sms_text {
                match self.notifier.sms(recipient, text) {
                    Some(true) => report.sms_sent += 1,
                    Some(false) => report.sms_failed += 1,
                    None => {}
                }
            }
        }

        tracing::info!(
            sender = %actor.user_id,
            recipients = report.recipients,
            emails_failed = report.emails_failed,
            sms_sent = report.sms_sent,
            "broadcast delivered"
        );
        Ok(report)
    }

    fn recipients(&self, actor: Actor, audience: &Audience) -> Result<Vec<User>, WorkflowError> {
        let scope = Scope::for_actor(self.store.as_ref(), actor)?;

        let recipients = match audience {
            Audience::AllStudents if actor.is_master() => {
                self.store.list_users(Some(Role::Student))?
            }
            Audience::AllStudents => {
                self.residents(|accommodation| scope.covers(accommodation))?
            }
            Audience::Accommodation { accommodation_id } => {
                let accommodation = self
                    .store
                    .fetch_accommodation(*accommodation_id)?
                    .ok_or(WorkflowError::NotFound("accommodation"))?;
                actor.require_manager(accommodation.admin_id, "accommodation")?;
                self.residents(|candidate| candidate == accommodation.id)?
            }
            Audience::Selected { user_ids } => {
                let residents: Vec<UserId> = if actor.is_master() {
                    Vec::new()
                } else {
                    self.residents(|accommodation| scope.covers(accommodation))?
                        .into_iter()
                        .map(|user| user.id)
                        .collect()
                };

                let mut selected = Vec::new();
                for id in user_ids {
                    let Some(user) = self.store.fetch_user(*id)? else {
                        continue;
                    };
                    if user.role != Role::Student {
                        continue;
                    }
                    if actor.is_master() || residents.contains(&user.id) {
                        selected.push(user);
                    }
                }
                selected
            }
        };

        let mut unique = BTreeMap::new();
        for user in recipients {
            unique.entry(user.id).or_insert(user);
        }
        Ok(unique.into_values().collect())
    }

    /// Students holding a current lease in an accommodation accepted by `include`.
    fn residents(
        &self,
        include: impl Fn(AccommodationId) -> bool,
    ) -> Result<Vec<User>, WorkflowError> {
        let today = today();
        let mut residents = Vec::new();
        for lease in self.store.list_leases()? {
            if !lease.is_current(today) || !include(lease.accommodation_id) {
                continue;
            }
            if let Some(user) = self.store.fetch_user(lease.user_id)? {
                if user.role == Role::Student {
                    residents.push(user);
                }
            }
        }
        Ok(residents)
    }
}
