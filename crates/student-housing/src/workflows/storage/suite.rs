//! Behaviour every [`HousingStore`] backend must share. Each backend's test module runs
//! these checks against a fresh store.

use chrono::{Days, NaiveDate, Utc};
use rust_decimal::Decimal;

use super::HousingStore;
use crate::workflows::accommodations::{AccommodationId, NewAccommodation};
use crate::workflows::accounts::{NewUser, PasswordHash, Role, StudentProfile, UserId};
use crate::workflows::applications::{ApplicationId, ApplicationStatus, NewApplication};
use crate::workflows::error::RepositoryError;
use crate::workflows::invoices::{NewInvoice, PaymentRecord};
use crate::workflows::leases::{Lease, LeaseTerms, NewLease};
use crate::workflows::maintenance::{
    MaintenanceStatus, NewMaintenanceRequest, Priority, StatusChange,
};
use crate::workflows::notifications::{NewNotification, NotificationKind};

fn new_user(username: &str, email: &str, role: Role) -> NewUser {
    NewUser {
        username: username.to_string(),
        email: email.to_string(),
        password: PasswordHash::generate("secret1").expect("hashed"),
        role,
        phone: None,
        first_name: "Sipho".to_string(),
        last_name: "Dlamini".to_string(),
        created_at: Utc::now(),
    }
}

fn user<S: HousingStore>(store: &S, username: &str, role: Role) -> UserId {
    store
        .insert_user(new_user(username, &format!("{username}@example.com"), role))
        .expect("user inserted")
        .id
}

fn accommodation<S: HousingStore>(
    store: &S,
    rooms: u32,
    admin: Option<UserId>,
) -> AccommodationId {
    store
        .insert_accommodation(NewAccommodation {
            name: "Varsity Lodge".to_string(),
            location: "Braamfontein".to_string(),
            description: String::new(),
            rooms_available: rooms,
            price_per_month: Decimal::new(4100, 0),
            admin_id: admin,
            created_at: Utc::now(),
        })
        .expect("accommodation inserted")
        .id
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn new_lease(
    user_id: UserId,
    accommodation_id: AccommodationId,
    application_id: Option<ApplicationId>,
) -> NewLease {
    NewLease {
        user_id,
        accommodation_id,
        application_id,
        terms: LeaseTerms::standard(today(), Decimal::new(4100, 0)),
        created_at: Utc::now(),
    }
}

fn application<S: HousingStore>(
    store: &S,
    user_id: UserId,
    accommodation_id: AccommodationId,
) -> ApplicationId {
    store
        .insert_application(NewApplication {
            user_id,
            accommodation_id,
            move_in_date: None,
            notes: None,
            created_at: Utc::now(),
        })
        .expect("application inserted")
        .id
}

fn invoice_for(lease: &Lease) -> NewInvoice {
    let period = lease.first_billing_period();
    NewInvoice {
        user_id: lease.user_id,
        accommodation_id: lease.accommodation_id,
        lease_id: lease.id,
        amount: lease.monthly_rent,
        late_fee: Decimal::ZERO,
        period_start: period.period_start,
        period_end: period.period_end,
        due_date: period.due_date,
        created_at: Utc::now(),
    }
}

pub(crate) fn usernames_and_emails_are_unique_ignoring_case<S: HousingStore>(store: &S) {
    store
        .insert_user(new_user("sipho", "sipho@example.com", Role::Student))
        .expect("first insert");

    let same_name = store.insert_user(new_user("SIPHO", "other@example.com", Role::Student));
    assert!(matches!(same_name, Err(RepositoryError::Conflict)));
    let same_email = store.insert_user(new_user("sipho2", "Sipho@Example.com", Role::Student));
    assert!(matches!(same_email, Err(RepositoryError::Conflict)));
    assert_eq!(store.count_users().expect("count"), 1);

    let found = store
        .find_user_by_username("Sipho")
        .expect("lookup")
        .expect("found ignoring case");
    assert!(found.password.verify("secret1"));
    assert_eq!(found.role, Role::Student);
}

pub(crate) fn rejected_applications_allow_reapplying<S: HousingStore>(store: &S) {
    let student = user(store, "thandi", Role::Student);
    let lodge = accommodation(store, 2, None);
    let first = application(store, student, lodge);
    assert!(matches!(
        store.insert_application(NewApplication {
            user_id: student,
            accommodation_id: lodge,
            move_in_date: None,
            notes: None,
            created_at: Utc::now(),
        }),
        Err(RepositoryError::Conflict)
    ));

    store
        .transition_application(
            first,
            ApplicationStatus::Pending,
            ApplicationStatus::Rejected,
            Some("No rooms".to_string()),
            Utc::now(),
        )
        .expect("rejected");
    application(store, student, lodge);
}

pub(crate) fn transitions_compare_current_status<S: HousingStore>(store: &S) {
    let student = user(store, "thandi", Role::Student);
    let lodge = accommodation(store, 2, None);
    let id = application(store, student, lodge);

    let approved = store
        .transition_application(
            id,
            ApplicationStatus::Pending,
            ApplicationStatus::Approved,
            None,
            Utc::now(),
        )
        .expect("approved once");
    assert_eq!(approved.status, ApplicationStatus::Approved);
    let again = store.transition_application(
        id,
        ApplicationStatus::Pending,
        ApplicationStatus::Approved,
        None,
        Utc::now(),
    );
    assert!(matches!(
        again,
        Err(RepositoryError::StaleState {
            expected: "pending"
        })
    ));
}

pub(crate) fn leases_sign_once_and_one_per_application<S: HousingStore>(store: &S) {
    let student = user(store, "thandi", Role::Student);
    let lodge = accommodation(store, 3, None);
    let applied = application(store, student, lodge);
    let lease = new_lease(student, lodge, Some(applied));

    let stored = store.insert_lease(lease.clone()).expect("lease created");
    assert_eq!(stored.monthly_rent, Decimal::new(4100, 0));
    assert!(matches!(
        store.insert_lease(lease),
        Err(RepositoryError::Conflict)
    ));

    let signed = store
        .mark_lease_signed(stored.id, Utc::now())
        .expect("signed");
    assert!(signed.signed && signed.signed_at.is_some());
    assert!(matches!(
        store.mark_lease_signed(stored.id, Utc::now()),
        Err(RepositoryError::StaleState { .. })
    ));

    let on = stored
        .start_date
        .checked_add_days(Days::new(30))
        .expect("valid date");
    let terminated = store.terminate_lease(stored.id, on).expect("terminated");
    assert_eq!(terminated.end_date, on);
    assert!(matches!(
        store.terminate_lease(stored.id, on),
        Err(RepositoryError::StaleState { .. })
    ));
}

pub(crate) fn leases_never_exceed_the_room_count<S: HousingStore>(store: &S) {
    let lodge = accommodation(store, 1, None);
    let thandi = user(store, "thandi", Role::Student);
    let sipho = user(store, "sipho", Role::Student);

    store
        .insert_lease(new_lease(thandi, lodge, None))
        .expect("first room taken");
    assert!(matches!(
        store.insert_lease(new_lease(sipho, lodge, None)),
        Err(RepositoryError::NoVacancy)
    ));
    assert!(matches!(
        store.insert_lease(new_lease(sipho, AccommodationId(999), None)),
        Err(RepositoryError::NotFound)
    ));
    assert_eq!(store.list_leases().expect("leases").len(), 1);
}

pub(crate) fn approval_writes_nothing_without_a_vacancy<S: HousingStore>(store: &S) {
    let lodge = accommodation(store, 1, None);
    let thandi = user(store, "thandi", Role::Student);
    let sipho = user(store, "sipho", Role::Student);
    let first = application(store, thandi, lodge);
    let second = application(store, sipho, lodge);

    let (approved, lease) = store
        .approve_application(
            first,
            Some("Welcome".to_string()),
            new_lease(thandi, lodge, Some(first)),
        )
        .expect("first approval");
    assert_eq!(approved.status, ApplicationStatus::Approved);
    assert_eq!(approved.notes.as_deref(), Some("Welcome"));
    assert_eq!(lease.application_id, Some(first));

    assert!(matches!(
        store.approve_application(first, None, new_lease(thandi, lodge, Some(first))),
        Err(RepositoryError::StaleState { .. })
    ));
    assert!(matches!(
        store.approve_application(second, None, new_lease(sipho, lodge, Some(second))),
        Err(RepositoryError::NoVacancy)
    ));
    let untouched = store
        .fetch_application(second)
        .expect("fetch")
        .expect("still stored");
    assert_eq!(untouched.status, ApplicationStatus::Pending);
    assert_eq!(store.list_leases().expect("leases").len(), 1);
}

pub(crate) fn deleting_an_accommodation_cascades<S: HousingStore>(store: &S) {
    let lodge = accommodation(store, 2, None);
    let annex = accommodation(store, 2, None);
    let thandi = user(store, "thandi", Role::Student);

    let applied = application(store, thandi, lodge);
    let lease = store
        .insert_lease(new_lease(thandi, lodge, Some(applied)))
        .expect("lease");
    store.insert_invoice(invoice_for(&lease)).expect("invoice");
    store
        .insert_maintenance_request(NewMaintenanceRequest {
            user_id: thandi,
            accommodation_id: lodge,
            issue: "Leaking tap".to_string(),
            description: "Kitchen tap drips".to_string(),
            priority: Priority::Low,
            created_at: Utc::now(),
        })
        .expect("maintenance");
    application(store, thandi, annex);

    assert!(matches!(
        store.delete_accommodation(lodge, today()),
        Err(RepositoryError::Conflict)
    ));

    let after_lease = lease
        .end_date
        .checked_add_days(Days::new(1))
        .expect("valid date");
    let removed = store
        .delete_accommodation(lodge, after_lease)
        .expect("deleted once leases ended");
    assert_eq!(removed.id, lodge);
    assert!(store.fetch_accommodation(lodge).expect("fetch").is_none());
    assert!(store.list_leases().expect("leases").is_empty());
    assert!(store.list_invoices().expect("invoices").is_empty());
    assert!(store
        .list_maintenance_requests()
        .expect("maintenance")
        .is_empty());
    let remaining = store.list_applications().expect("applications");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].accommodation_id, annex);

    assert!(matches!(
        store.delete_accommodation(lodge, after_lease),
        Err(RepositoryError::NotFound)
    ));
}

pub(crate) fn deleting_a_user_releases_their_accommodations<S: HousingStore>(store: &S) {
    let warden = user(store, "warden", Role::Admin);
    let bursar = user(store, "bursar", Role::Admin);
    let lodge = accommodation(store, 2, Some(warden));
    let annex = accommodation(store, 2, Some(bursar));
    for user_id in [warden, bursar] {
        store
            .insert_notification(NewNotification {
                user_id,
                subject: "Welcome".to_string(),
                message: "Your account is ready".to_string(),
                kind: NotificationKind::Account,
                created_at: Utc::now(),
            })
            .expect("notification");
    }
    store
        .save_student_profile(StudentProfile::empty(warden, Utc::now()))
        .expect("profile");

    let removed = store.delete_user(warden).expect("deleted");
    assert_eq!(removed.username, "warden");
    assert!(store.fetch_user(warden).expect("fetch").is_none());
    assert!(store.fetch_student_profile(warden).expect("fetch").is_none());
    assert!(store
        .notifications_for_user(warden, false)
        .expect("inbox")
        .is_empty());
    assert_eq!(
        store.notifications_for_user(bursar, false).expect("inbox").len(),
        1
    );

    let lodge = store
        .fetch_accommodation(lodge)
        .expect("fetch")
        .expect("accommodation kept");
    assert_eq!(lodge.admin_id, None);
    let annex = store
        .fetch_accommodation(annex)
        .expect("fetch")
        .expect("accommodation kept");
    assert_eq!(annex.admin_id, Some(bursar));

    assert!(matches!(
        store.delete_user(warden),
        Err(RepositoryError::NotFound)
    ));
}

pub(crate) fn notifications_are_private_to_their_owner<S: HousingStore>(store: &S) {
    let owner = user(store, "thandi", Role::Student);
    let other = user(store, "sipho", Role::Student);
    let notification = store
        .insert_notification(NewNotification {
            user_id: owner,
            subject: "Welcome".to_string(),
            message: "Your account is ready".to_string(),
            kind: NotificationKind::Account,
            created_at: Utc::now(),
        })
        .expect("inserted");

    assert!(matches!(
        store.mark_notification_read(notification.id, other),
        Err(RepositoryError::NotFound)
    ));
    assert_eq!(store.count_unread_notifications(owner).expect("count"), 1);
    let read = store
        .mark_notification_read(notification.id, owner)
        .expect("owner marks read");
    assert!(read.is_read);
    assert_eq!(store.count_unread_notifications(owner).expect("count"), 0);
    assert_eq!(store.mark_all_notifications_read(owner).expect("mark"), 0);
}

pub(crate) fn maintenance_stops_at_terminal_states<S: HousingStore>(store: &S) {
    let lodge = accommodation(store, 2, None);
    let thandi = user(store, "thandi", Role::Student);
    let request = store
        .insert_maintenance_request(NewMaintenanceRequest {
            user_id: thandi,
            accommodation_id: lodge,
            issue: "Broken window".to_string(),
            description: "Bedroom window cracked".to_string(),
            priority: Priority::High,
            created_at: Utc::now(),
        })
        .expect("inserted");
    assert_eq!(request.status, MaintenanceStatus::Pending);

    let completed = store
        .update_maintenance_status(
            request.id,
            StatusChange {
                status: MaintenanceStatus::Completed,
                notes: Some("Glass replaced".to_string()),
                at: Utc::now(),
            },
        )
        .expect("completed");
    assert!(completed.completed_at.is_some());
    assert_eq!(completed.notes.as_deref(), Some("Glass replaced"));
    assert!(matches!(
        store.update_maintenance_status(
            request.id,
            StatusChange {
                status: MaintenanceStatus::InProgress,
                notes: None,
                at: Utc::now(),
            },
        ),
        Err(RepositoryError::StaleState { expected: "open" })
    ));
}

pub(crate) fn invoices_are_paid_once<S: HousingStore>(store: &S) {
    let lodge = accommodation(store, 2, None);
    let thandi = user(store, "thandi", Role::Student);
    let lease = store
        .insert_lease(new_lease(thandi, lodge, None))
        .expect("lease");
    let invoice = store.insert_invoice(invoice_for(&lease)).expect("invoice");
    assert_eq!(invoice.id.number(), "INV-000001");

    let payment = PaymentRecord {
        payment_method: "eft".to_string(),
        reference_number: Some("REF-1".to_string()),
        paid_at: Utc::now(),
    };
    let paid = store
        .mark_invoice_paid(invoice.id, payment.clone())
        .expect("paid");
    assert!(paid.paid);
    assert_eq!(paid.reference_number.as_deref(), Some("REF-1"));
    assert!(matches!(
        store.mark_invoice_paid(invoice.id, payment),
        Err(RepositoryError::StaleState { expected: "unpaid" })
    ));
}
