use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};

use crate::workflows::accommodations::{
    Accommodation, AccommodationId, AccommodationRepository, NewAccommodation, Occupancy,
};
use crate::workflows::accounts::{
    NewUser, Role, StudentProfile, User, UserId, UserRepository,
};
use crate::workflows::applications::{
    Application, ApplicationId, ApplicationRepository, ApplicationStatus, NewApplication,
};
use crate::workflows::error::RepositoryError;
use crate::workflows::invoices::{
    Invoice, InvoiceId, InvoiceRepository, NewInvoice, PaymentRecord,
};
use crate::workflows::leases::{Lease, LeaseId, LeaseRepository, NewLease};
use crate::workflows::maintenance::{
    MaintenanceId, MaintenanceRepository, MaintenanceRequest, MaintenanceStatus,
    NewMaintenanceRequest, StatusChange,
};
use crate::workflows::notifications::{
    NewNotification, Notification, NotificationId, NotificationRepository,
};

/// Process-local store backing every repository trait behind one lock.
#[derive(Default)]
pub struct InMemoryHousingStore {
    tables: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    profiles: BTreeMap<UserId, StudentProfile>,
    accommodations: BTreeMap<AccommodationId, Accommodation>,
    applications: BTreeMap<ApplicationId, Application>,
    leases: BTreeMap<LeaseId, Lease>,
    invoices: BTreeMap<InvoiceId, Invoice>,
    maintenance: BTreeMap<MaintenanceId, MaintenanceRequest>,
    notifications: BTreeMap<NotificationId, Notification>,
    sequence: Sequence,
}

#[derive(Default)]
struct Sequence {
    users: u64,
    accommodations: u64,
    applications: u64,
    leases: u64,
    invoices: u64,
    maintenance: u64,
    notifications: u64,
}

fn next(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

impl Tables {
    fn ensure_vacancy(
        &self,
        accommodation_id: AccommodationId,
        on: NaiveDate,
    ) -> Result<(), RepositoryError> {
        let accommodation = self
            .accommodations
            .get(&accommodation_id)
            .ok_or(RepositoryError::NotFound)?;
        let occupancy = Occupancy::from_leases(
            accommodation.rooms_available,
            self.leases
                .values()
                .filter(|lease| lease.accommodation_id == accommodation_id),
            on,
        );
        if occupancy.has_vacancy() {
            Ok(())
        } else {
            Err(RepositoryError::NoVacancy)
        }
    }

    fn push_lease(&mut self, lease: NewLease) -> Result<Lease, RepositoryError> {
        if let Some(application_id) = lease.application_id {
            let issued = self
                .leases
                .values()
                .any(|existing| existing.application_id == Some(application_id));
            if issued {
                return Err(RepositoryError::Conflict);
            }
        }
        self.ensure_vacancy(lease.accommodation_id, lease.created_at.date_naive())?;

        let id = LeaseId(next(&mut self.sequence.leases));
        let stored = Lease {
            id,
            user_id: lease.user_id,
            accommodation_id: lease.accommodation_id,
            application_id: lease.application_id,
            start_date: lease.terms.start_date,
            end_date: lease.terms.end_date,
            monthly_rent: lease.terms.monthly_rent,
            security_deposit: lease.terms.security_deposit,
            signed: false,
            signed_at: None,
            terminated_on: None,
            created_at: lease.created_at,
        };
        self.leases.insert(id, stored.clone());
        Ok(stored)
    }
}

impl InMemoryHousingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl UserRepository for InMemoryHousingStore {
    fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.tables()?;
        let taken = tables.users.values().any(|existing| {
            existing.username.eq_ignore_ascii_case(&user.username)
                || existing.email.eq_ignore_ascii_case(&user.email)
        });
        if taken {
            return Err(RepositoryError::Conflict);
        }

        let id = UserId(next(&mut tables.sequence.users));
        let stored = User {
            id,
            username: user.username,
            email: user.email,
            password: user.password,
            role: user.role,
            phone: user.phone,
            first_name: user.first_name,
            last_name: user.last_name,
            created_at: user.created_at,
            last_login: None,
        };
        tables.users.insert(id, stored.clone());
        Ok(stored)
    }

    fn update_user(&self, user: User) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        if !tables.users.contains_key(&user.id) {
            return Err(RepositoryError::NotFound);
        }
        let email_taken = tables.users.values().any(|existing| {
            existing.id != user.id && existing.email.eq_ignore_ascii_case(&user.email)
        });
        if email_taken {
            return Err(RepositoryError::Conflict);
        }
        tables.users.insert(user.id, user);
        Ok(())
    }

    fn fetch_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.tables()?.users.get(&id).cloned())
    }

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .tables()?
            .users
            .values()
            .find(|user| user.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .tables()?
            .users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    fn list_users(&self, role: Option<Role>) -> Result<Vec<User>, RepositoryError> {
        Ok(self
            .tables()?
            .users
            .values()
            .filter(|user| role.map_or(true, |role| user.role == role))
            .cloned()
            .collect())
    }

    fn count_users(&self) -> Result<usize, RepositoryError> {
        Ok(self.tables()?.users.len())
    }

    fn fetch_student_profile(
        &self,
        user: UserId,
    ) -> Result<Option<StudentProfile>, RepositoryError> {
        Ok(self.tables()?.profiles.get(&user).cloned())
    }

    fn save_student_profile(&self, profile: StudentProfile) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        if !tables.users.contains_key(&profile.user_id) {
            return Err(RepositoryError::NotFound);
        }
        tables.profiles.insert(profile.user_id, profile);
        Ok(())
    }

    fn delete_user(&self, id: UserId) -> Result<User, RepositoryError> {
        let mut tables = self.tables()?;
        let user = tables.users.remove(&id).ok_or(RepositoryError::NotFound)?;
        tables.profiles.remove(&id);
        tables
            .notifications
            .retain(|_, notification| notification.user_id != id);
        for accommodation in tables.accommodations.values_mut() {
            if accommodation.admin_id == Some(id) {
                accommodation.admin_id = None;
            }
        }
        Ok(user)
    }
}

impl AccommodationRepository for InMemoryHousingStore {
    fn insert_accommodation(
        &self,
        accommodation: NewAccommodation,
    ) -> Result<Accommodation, RepositoryError> {
        let mut tables = self.tables()?;
        let id = AccommodationId(next(&mut tables.sequence.accommodations));
        let stored = Accommodation {
            id,
            name: accommodation.name,
            location: accommodation.location,
            description: accommodation.description,
            rooms_available: accommodation.rooms_available,
            price_per_month: accommodation.price_per_month,
            admin_id: accommodation.admin_id,
            created_at: accommodation.created_at,
        };
        tables.accommodations.insert(id, stored.clone());
        Ok(stored)
    }

    fn update_accommodation(&self, accommodation: Accommodation) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        match tables.accommodations.get_mut(&accommodation.id) {
            Some(slot) => {
                *slot = accommodation;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_accommodation(
        &self,
        id: AccommodationId,
    ) -> Result<Option<Accommodation>, RepositoryError> {
        Ok(self.tables()?.accommodations.get(&id).cloned())
    }

    fn list_accommodations(&self) -> Result<Vec<Accommodation>, RepositoryError> {
        Ok(self.tables()?.accommodations.values().cloned().collect())
    }

    fn delete_accommodation(
        &self,
        id: AccommodationId,
        today: NaiveDate,
    ) -> Result<Accommodation, RepositoryError> {
        let mut tables = self.tables()?;
        if !tables.accommodations.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        let occupied = tables
            .leases
            .values()
            .any(|lease| lease.accommodation_id == id && lease.is_current(today));
        if occupied {
            return Err(RepositoryError::Conflict);
        }

        tables
            .applications
            .retain(|_, application| application.accommodation_id != id);
        tables.leases.retain(|_, lease| lease.accommodation_id != id);
        tables
            .invoices
            .retain(|_, invoice| invoice.accommodation_id != id);
        tables
            .maintenance
            .retain(|_, request| request.accommodation_id != id);
        tables
            .accommodations
            .remove(&id)
            .ok_or(RepositoryError::NotFound)
    }
}

impl ApplicationRepository for InMemoryHousingStore {
    fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<Application, RepositoryError> {
        let mut tables = self.tables()?;
        let duplicate = tables.applications.values().any(|existing| {
            existing.user_id == application.user_id
                && existing.accommodation_id == application.accommodation_id
                && existing.status != ApplicationStatus::Rejected
        });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }

        let id = ApplicationId(next(&mut tables.sequence.applications));
        let stored = Application {
            id,
            user_id: application.user_id,
            accommodation_id: application.accommodation_id,
            status: ApplicationStatus::Pending,
            move_in_date: application.move_in_date,
            notes: application.notes,
            created_at: application.created_at,
            updated_at: application.created_at,
        };
        tables.applications.insert(id, stored.clone());
        Ok(stored)
    }

    fn fetch_application(
        &self,
        id: ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(self.tables()?.applications.get(&id).cloned())
    }

    fn list_applications(&self) -> Result<Vec<Application>, RepositoryError> {
        Ok(self.tables()?.applications.values().cloned().collect())
    }

    fn transition_application(
        &self,
        id: ApplicationId,
        from: ApplicationStatus,
        to: ApplicationStatus,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Application, RepositoryError> {
        let mut tables = self.tables()?;
        let application = tables
            .applications
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        if application.status != from {
            return Err(RepositoryError::StaleState {
                expected: from.label(),
            });
        }

        application.status = to;
        if notes.is_some() {
            application.notes = notes;
        }
        application.updated_at = at;
        Ok(application.clone())
    }

    fn approve_application(
        &self,
        id: ApplicationId,
        notes: Option<String>,
        lease: NewLease,
    ) -> Result<(Application, Lease), RepositoryError> {
        let mut tables = self.tables()?;
        let status = tables
            .applications
            .get(&id)
            .ok_or(RepositoryError::NotFound)?
            .status;
        if status != ApplicationStatus::Pending {
            return Err(RepositoryError::StaleState {
                expected: ApplicationStatus::Pending.label(),
            });
        }

        let at = lease.created_at;
        let lease = tables.push_lease(lease)?;
        let application = tables
            .applications
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        application.status = ApplicationStatus::Approved;
        if notes.is_some() {
            application.notes = notes;
        }
        application.updated_at = at;
        Ok((application.clone(), lease))
    }
}

impl LeaseRepository for InMemoryHousingStore {
    fn insert_lease(&self, lease: NewLease) -> Result<Lease, RepositoryError> {
        self.tables()?.push_lease(lease)
    }

    fn fetch_lease(&self, id: LeaseId) -> Result<Option<Lease>, RepositoryError> {
        Ok(self.tables()?.leases.get(&id).cloned())
    }

    fn list_leases(&self) -> Result<Vec<Lease>, RepositoryError> {
        Ok(self.tables()?.leases.values().cloned().collect())
    }

    fn mark_lease_signed(
        &self,
        id: LeaseId,
        signed_at: DateTime<Utc>,
    ) -> Result<Lease, RepositoryError> {
        let mut tables = self.tables()?;
        let lease = tables.leases.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if lease.signed {
            return Err(RepositoryError::StaleState {
                expected: "unsigned",
            });
        }
        lease.signed = true;
        lease.signed_at = Some(signed_at);
        Ok(lease.clone())
    }

    fn terminate_lease(&self, id: LeaseId, on: NaiveDate) -> Result<Lease, RepositoryError> {
        let mut tables = self.tables()?;
        let lease = tables.leases.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if lease.terminated_on.is_some() {
            return Err(RepositoryError::StaleState {
                expected: "in force",
            });
        }
        lease.end_date = on;
        lease.terminated_on = Some(on);
        Ok(lease.clone())
    }
}

impl InvoiceRepository for InMemoryHousingStore {
    fn insert_invoice(&self, invoice: NewInvoice) -> Result<Invoice, RepositoryError> {
        let mut tables = self.tables()?;
        let id = InvoiceId(next(&mut tables.sequence.invoices));
        let stored = Invoice {
            id,
            user_id: invoice.user_id,
            accommodation_id: invoice.accommodation_id,
            lease_id: invoice.lease_id,
            amount: invoice.amount,
            late_fee: invoice.late_fee,
            period_start: invoice.period_start,
            period_end: invoice.period_end,
            due_date: invoice.due_date,
            paid: false,
            paid_at: None,
            payment_method: None,
            reference_number: None,
            created_at: invoice.created_at,
        };
        tables.invoices.insert(id, stored.clone());
        Ok(stored)
    }

    fn fetch_invoice(&self, id: InvoiceId) -> Result<Option<Invoice>, RepositoryError> {
        Ok(self.tables()?.invoices.get(&id).cloned())
    }

    fn list_invoices(&self) -> Result<Vec<Invoice>, RepositoryError> {
        Ok(self.tables()?.invoices.values().cloned().collect())
    }

    fn mark_invoice_paid(
        &self,
        id: InvoiceId,
        payment: PaymentRecord,
    ) -> Result<Invoice, RepositoryError> {
        let mut tables = self.tables()?;
        let invoice = tables
            .invoices
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        if invoice.paid {
            return Err(RepositoryError::StaleState { expected: "unpaid" });
        }
        invoice.paid = true;
        invoice.paid_at = Some(payment.paid_at);
        invoice.payment_method = Some(payment.payment_method);
        invoice.reference_number = payment.reference_number;
        Ok(invoice.clone())
    }
}

impl MaintenanceRepository for InMemoryHousingStore {
    fn insert_maintenance_request(
        &self,
        request: NewMaintenanceRequest,
    ) -> Result<MaintenanceRequest, RepositoryError> {
        let mut tables = self.tables()?;
        let id = MaintenanceId(next(&mut tables.sequence.maintenance));
        let stored = MaintenanceRequest {
            id,
            user_id: request.user_id,
            accommodation_id: request.accommodation_id,
            issue: request.issue,
            description: request.description,
            priority: request.priority,
            status: MaintenanceStatus::Pending,
            notes: None,
            created_at: request.created_at,
            updated_at: request.created_at,
            completed_at: None,
        };
        tables.maintenance.insert(id, stored.clone());
        Ok(stored)
    }

    fn fetch_maintenance_request(
        &self,
        id: MaintenanceId,
    ) -> Result<Option<MaintenanceRequest>, RepositoryError> {
        Ok(self.tables()?.maintenance.get(&id).cloned())
    }

    fn list_maintenance_requests(&self) -> Result<Vec<MaintenanceRequest>, RepositoryError> {
        Ok(self.tables()?.maintenance.values().cloned().collect())
    }

    fn update_maintenance_status(
        &self,
        id: MaintenanceId,
        change: StatusChange,
    ) -> Result<MaintenanceRequest, RepositoryError> {
        let mut tables = self.tables()?;
        let request = tables
            .maintenance
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        if request.status.is_terminal() {
            return Err(RepositoryError::StaleState { expected: "open" });
        }

        request.status = change.status;
        if change.notes.is_some() {
            request.notes = change.notes;
        }
        request.updated_at = change.at;
        if change.status == MaintenanceStatus::Completed {
            request.completed_at = Some(change.at);
        }
        Ok(request.clone())
    }
}

impl NotificationRepository for InMemoryHousingStore {
    fn insert_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, RepositoryError> {
        let mut tables = self.tables()?;
        let id = NotificationId(next(&mut tables.sequence.notifications));
        let stored = Notification {
            id,
            user_id: notification.user_id,
            subject: notification.subject,
            message: notification.message,
            kind: notification.kind,
            is_read: false,
            created_at: notification.created_at,
        };
        tables.notifications.insert(id, stored.clone());
        Ok(stored)
    }

    fn notifications_for_user(
        &self,
        user: UserId,
        unread_only: bool,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let tables = self.tables()?;
        let mut inbox: Vec<Notification> = tables
            .notifications
            .values()
            .filter(|notification| notification.user_id == user)
            .filter(|notification| !unread_only || !notification.is_read)
            .cloned()
            .collect();
        inbox.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(inbox)
    }

    fn mark_notification_read(
        &self,
        id: NotificationId,
        user: UserId,
    ) -> Result<Notification, RepositoryError> {
        let mut tables = self.tables()?;
        match tables.notifications.get_mut(&id) {
            Some(notification) if notification.user_id == user => {
                notification.is_read = true;
                Ok(notification.clone())
            }
            _ => Err(RepositoryError::NotFound),
        }
    }

    fn mark_all_notifications_read(&self, user: UserId) -> Result<usize, RepositoryError> {
        let mut tables = self.tables()?;
        let mut updated = 0;
        for notification in tables.notifications.values_mut() {
            if notification.user_id == user && !notification.is_read {
                notification.is_read = true;
                updated += 1;
            }
        }
        Ok(updated)
    }

    fn count_unread_notifications(&self, user: UserId) -> Result<usize, RepositoryError> {
        Ok(self
            .tables()?
            .notifications
            .values()
            .filter(|notification| notification.user_id == user && !notification.is_read)
            .count())
    }
}
