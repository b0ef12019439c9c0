use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::access::Actor;
use super::domain::UserId;
use crate::workflows::error::WorkflowError;

/// Live session bound to an opaque bearer token.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub actor: Actor,
    pub last_activity: DateTime<Utc>,
}

/// In-process session table with a sliding idle timeout.
pub struct SessionStore {
    idle_timeout: Duration,
    table: Mutex<SessionTable>,
}

struct SessionTable {
    sessions: HashMap<String, Session>,
    last_sweep: Option<DateTime<Utc>>,
}

impl SessionTable {
    /// Drops idle sessions at most once per sweep interval.
    fn sweep(&mut self, now: DateTime<Utc>, idle_timeout: Duration) {
        if self
            .last_sweep
            .is_some_and(|last| now - last < sweep_interval(idle_timeout))
        {
            return;
        }
        self.sessions
            .retain(|_, session| now - session.last_activity <= idle_timeout);
        self.last_sweep = Some(now);
    }
}

fn sweep_interval(idle_timeout: Duration) -> Duration {
    idle_timeout.min(Duration::minutes(1))
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            idle_timeout,
            table: Mutex::new(SessionTable {
                sessions: HashMap::new(),
                last_sweep: None,
            }),
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    fn table(&self) -> MutexGuard<'_, SessionTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn issue(&self, actor: Actor, now: DateTime<Utc>) -> Session {
        let session = Session {
            token: Uuid::new_v4().simple().to_string(),
            actor,
            last_activity: now,
        };
        let mut table = self.table();
        table.sweep(now, self.idle_timeout);
        table
            .sessions
            .insert(session.token.clone(), session.clone());
        session
    }

    /// Resolves a token and refreshes its activity stamp. Expired sessions are dropped.
    pub fn authenticate(&self, token: &str, now: DateTime<Utc>) -> Result<Actor, WorkflowError> {
        let mut table = self.table();
        let last_activity = table
            .sessions
            .get(token)
            .map(|session| session.last_activity)
            .ok_or(WorkflowError::Unauthorized)?;

        if now - last_activity > self.idle_timeout {
            table.sessions.remove(token);
            return Err(WorkflowError::SessionExpired);
        }

        let actor = match table.sessions.get_mut(token) {
            Some(session) => {
                session.last_activity = now;
                session.actor
            }
            None => return Err(WorkflowError::Unauthorized),
        };
        table.sweep(now, self.idle_timeout);
        Ok(actor)
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.table().sessions.remove(token).is_some()
    }

    /// Drops every session of a user except `keep`.
    pub fn revoke_user(&self, user_id: UserId, keep: Option<&str>) {
        self.table().sessions.retain(|token, session| {
            session.actor.user_id != user_id || Some(token.as_str()) == keep
        });
    }

    pub fn active_sessions(&self) -> usize {
        self.table().sessions.len()
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::accounts::domain::Role;
    use axum::http::HeaderValue;

    fn store() -> SessionStore {
        SessionStore::new(Duration::seconds(7200))
    }

    fn student() -> Actor {
        Actor::new(UserId(4), Role::Student)
    }

    #[test]
    fn issued_tokens_authenticate() {
        let store = store();
        let now = Utc::now();
        let session = store.issue(student(), now);

        let actor = store
            .authenticate(&session.token, now + Duration::minutes(5))
            .expect("session valid");
        assert_eq!(actor, student());
    }

    #[test]
    fn activity_slides_the_expiry() {
        let store = store();
        let start = Utc::now();
        let session = store.issue(student(), start);

        store
            .authenticate(&session.token, start + Duration::seconds(7000))
            .expect("still valid");
        store
            .authenticate(&session.token, start + Duration::seconds(14000))
            .expect("refreshed by previous request");
    }

    #[test]
    fn idle_sessions_expire_and_are_removed() {
        let store = store();
        let start = Utc::now();
        let session = store.issue(student(), start);

        let expired = store.authenticate(&session.token, start + Duration::seconds(7201));
        assert!(matches!(expired, Err(WorkflowError::SessionExpired)));
        let gone = store.authenticate(&session.token, start + Duration::seconds(7202));
        assert!(matches!(gone, Err(WorkflowError::Unauthorized)));
    }

    #[test]
    fn revoke_user_keeps_current_session() {
        let store = store();
        let now = Utc::now();
        let current = store.issue(student(), now);
        let other = store.issue(student(), now);
        let admin = store.issue(Actor::new(UserId(2), Role::Admin), now);

        store.revoke_user(UserId(4), Some(&current.token));

        assert!(store.authenticate(&current.token, now).is_ok());
        assert!(store.authenticate(&other.token, now).is_err());
        assert!(store.authenticate(&admin.token, now).is_ok());
        assert_eq!(store.active_sessions(), 2);
    }

    #[test]
    fn abandoned_sessions_are_swept() {
        let store = store();
        let start = Utc::now();
        for _ in 0..1000 {
            store.issue(student(), start);
        }
        assert_eq!(store.active_sessions(), 1000);

        let later = start + Duration::days(30);
        let fresh = store.issue(student(), later);
        store
            .authenticate(&fresh.token, later + Duration::seconds(1))
            .expect("fresh session valid");
        assert_eq!(store.active_sessions(), 1);
    }

    #[test]
    fn sweeping_keeps_sessions_within_the_timeout() {
        let store = store();
        let start = Utc::now();
        let idle = store.issue(student(), start);
        let busy = store.issue(student(), start);

        store
            .authenticate(&busy.token, start + Duration::seconds(7000))
            .expect("still valid");
        store.issue(student(), start + Duration::seconds(7300));

        assert_eq!(store.active_sessions(), 2);
        assert!(matches!(
            store.authenticate(&idle.token, start + Duration::seconds(7301)),
            Err(WorkflowError::Unauthorized)
        ));
        assert!(store
            .authenticate(&busy.token, start + Duration::seconds(7301))
            .is_ok());
    }

    #[test]
    fn parses_bearer_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(bearer_token(&headers), None);
    }
}
