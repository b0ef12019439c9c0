//! Shared fixtures for workflow unit tests.

use std::sync::{Arc, Mutex, PoisonError};

use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use chrono::Duration;
use rust_decimal::Decimal;

use super::accommodations::{AccommodationDraft, AccommodationId};
use super::accounts::{Actor, Credentials, NewAccount, Registration, Role};
use super::applications::{ApplicationId, ApplicationRequest, ApprovalTerms};
use super::leases::LeaseId;
use super::notifications::{
    DispatchError, EmailMessage, MessageDispatcher, MessagingSettings, SmsMessage,
};
use super::portal::{portal_router, Portal, PortalSettings};
use super::storage::InMemoryHousingStore;
use crate::config::SeedAdminConfig;

pub(crate) const PASSWORD: &str = "secret1";

/// Captures outbound messages instead of sending them.
#[derive(Default)]
pub(crate) struct RecordingDispatcher {
    fail: bool,
    emails: Mutex<Vec<EmailMessage>>,
    texts: Mutex<Vec<SmsMessage>>,
}

impl RecordingDispatcher {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn emails(&self) -> Vec<EmailMessage> {
        self.emails
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn texts(&self) -> Vec<SmsMessage> {
        self.texts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl MessageDispatcher for RecordingDispatcher {
    fn send_email(&self, message: &EmailMessage) -> Result<(), DispatchError> {
        if self.fail {
            return Err(DispatchError::Email("relay refused connection".to_string()));
        }
        self.emails
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());
        Ok(())
    }

    fn send_sms(&self, message: &SmsMessage) -> Result<(), DispatchError> {
        if self.fail {
            return Err(DispatchError::Sms("gateway timeout".to_string()));
        }
        self.texts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());
        Ok(())
    }
}

pub(crate) type TestPortal = Portal<InMemoryHousingStore, RecordingDispatcher>;

/// A portal over a fresh store with SMS enabled and a seeded master admin.
pub(crate) struct Harness {
    pub store: Arc<InMemoryHousingStore>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub portal: Arc<TestPortal>,
    pub master: Actor,
}

impl Harness {
    pub(crate) fn new() -> Self {
        let store = Arc::new(InMemoryHousingStore::new());
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let settings = PortalSettings {
            messaging: MessagingSettings {
                app_name: "Harambee Student Living".to_string(),
                mail_from: "noreply@harambee.com".to_string(),
                sms_enabled: true,
            },
            session_idle_timeout: Duration::minutes(30),
        };
        let portal = Arc::new(Portal::new(
            Arc::clone(&store),
            Arc::clone(&dispatcher),
            settings,
        ));
        let seeded = portal
            .accounts()
            .ensure_master_admin(&SeedAdminConfig {
                username: "master".to_string(),
                email: "master@harambee.com".to_string(),
                password: PASSWORD.to_string(),
            })
            .expect("seed succeeds")
            .expect("store starts empty");

        Self {
            store,
            dispatcher,
            portal,
            master: Actor::new(seeded.id, seeded.role),
        }
    }

    pub(crate) fn router(&self) -> Router {
        portal_router(Arc::clone(&self.portal))
    }

    pub(crate) fn student(&self, username: &str) -> Actor {
        let user = self
            .portal
            .accounts()
            .register(registration(username, Some("0825550101")))
            .expect("student registers");
        Actor::new(user.id, user.role)
    }

    pub(crate) fn admin(&self, username: &str) -> Actor {
        let user = self
            .portal
            .accounts()
            .create_user(
                self.master,
                NewAccount {
                    role: Role::Admin,
                    registration: registration(username, None),
                },
            )
            .expect("admin created");
        Actor::new(user.id, user.role)
    }

    pub(crate) fn accommodation(&self, admin: Actor, rooms: u32) -> AccommodationId {
        self.portal
            .accommodations()
            .create(
                admin,
                AccommodationDraft {
                    name: "Varsity Lodge".to_string(),
                    location: "12 Jan Smuts Ave, Braamfontein".to_string(),
                    description: "Furnished rooms close to campus".to_string(),
                    rooms_available: rooms,
                    price_per_month: Decimal::new(4500, 0),
                    admin_id: None,
                },
            )
            .expect("accommodation created")
            .accommodation
            .id
    }

    pub(crate) fn apply(&self, student: Actor, accommodation: AccommodationId) -> ApplicationId {
        self.portal
            .applications()
            .submit(
                student,
                ApplicationRequest {
                    accommodation_id: accommodation,
                    move_in_date: None,
                    notes: None,
                },
            )
            .expect("application submitted")
            .id
    }

    /// Applies and approves with default terms, returning the issued lease.
    pub(crate) fn lease(
        &self,
        student: Actor,
        admin: Actor,
        accommodation: AccommodationId,
    ) -> LeaseId {
        let application = self.apply(student, accommodation);
        self.portal
            .applications()
            .approve(admin, application, ApprovalTerms::default())
            .expect("application approved")
            .lease
            .id
    }

    pub(crate) fn token(&self, username: &str) -> String {
        self.portal
            .accounts()
            .login(Credentials {
                username: username.to_string(),
                password: PASSWORD.to_string(),
            })
            .expect("login succeeds")
            .token
    }
}

pub(crate) fn registration(username: &str, phone: Option<&str>) -> Registration {
    Registration {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password: PASSWORD.to_string(),
        confirm_password: PASSWORD.to_string(),
        first_name: "Thandi".to_string(),
        last_name: "Mokoena".to_string(),
        phone: phone.map(str::to_string),
    }
}

pub(crate) fn json_request(
    method: &str,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

/// A bodiless request with the given method, as sent by clients posting no payload.
pub(crate) fn empty_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .expect("request builds")
}

pub(crate) fn get_request(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .expect("request builds")
}

pub(crate) async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}
