use std::sync::Arc;

use chrono::Utc;

use super::access::{Action, Actor, Resource};
use super::domain::{
    is_valid_email, is_valid_phone, non_empty, password_errors, AccountView, AdminUpdate,
    Credentials, LoginResponse, NewAccount, NewUser, PasswordChange, PasswordReset,
    ProfileUpdate, Registration, Role, StudentProfile, User, UserId, UserView,
};
use super::password::PasswordHash;
use super::session::SessionStore;
use crate::config::SeedAdminConfig;
use crate::workflows::error::{RepositoryError, WorkflowError};
use crate::workflows::notifications::{notice, MessageDispatcher, Notifier};
use crate::workflows::storage::HousingStore;

/// Registration, sign-in, and profile management.
pub struct AccountService<S, D> {
    store: Arc<S>,
    sessions: Arc<SessionStore>,
    notifier: Notifier<S, D>,
}

impl<S, D> AccountService<S, D>
where
    S: HousingStore,
    D: MessageDispatcher + 'static,
{
    pub fn new(store: Arc<S>, sessions: Arc<SessionStore>, notifier: Notifier<S, D>) -> Self {
        Self {
            store,
            sessions,
            notifier,
        }
    }

    /// Seeds the master admin on an empty user table. Returns the account when one was created.
    pub fn ensure_master_admin(
        &self,
        seed: &SeedAdminConfig,
    ) -> Result<Option<UserView>, WorkflowError> {
        if self.store.count_users()? > 0 {
            return Ok(None);
        }

        let user = self.store.insert_user(NewUser {
            username: seed.username.clone(),
            email: seed.email.clone(),
            password: PasswordHash::generate(&seed.password)?,
            role: Role::MasterAdmin,
            phone: None,
            first_name: "Master".to_string(),
            last_name: "Admin".to_string(),
            created_at: Utc::now(),
        })?;
        tracing::info!(username = %user.username, "seeded master admin account");
        Ok(Some(user.view()))
    }

    /// Public sign-up; always creates a student.
    pub fn register(&self, form: Registration) -> Result<UserView, WorkflowError> {
        let user = self.create(Role::Student, form)?;
        Ok(user.view())
    }

    pub fn create_user(
        &self,
        actor: Actor,
        account: NewAccount,
    ) -> Result<UserView, WorkflowError> {
        actor.require(Resource::User, Action::Create)?;
        let user = self.create(account.role, account.registration)?;
        tracing::info!(
            created_by = %actor.user_id,
            user_id = %user.id,
            role = user.role.label(),
            "account created"
        );
        Ok(user.view())
    }

    pub fn list_users(
        &self,
        actor: Actor,
        role: Option<Role>,
    ) -> Result<Vec<UserView>, WorkflowError> {
        actor.require(Resource::User, Action::View)?;
        let users = self.store.list_users(role)?;
        Ok(users.iter().map(User::view).collect())
    }

    /// Edits an admin's contact details and, when listed, the accommodations they manage.
    pub fn update_admin(
        &self,
        actor: Actor,
        id: UserId,
        update: AdminUpdate,
    ) -> Result<UserView, WorkflowError> {
        actor.require(Resource::User, Action::Edit)?;
        let mut user = self.admin_account(id)?;

        let mut errors = update.validate();
        let email = update.email.trim();
        if errors.is_empty()
            && !email.eq_ignore_ascii_case(&user.email)
            && self.store.find_user_by_email(email)?.is_some()
        {
            errors.push("Email already exists".to_string());
        }
        let accommodations = match &update.accommodation_ids {
            Some(ids) => {
                let accommodations = self.store.list_accommodations()?;
                for wanted in ids {
                    if !accommodations.iter().any(|known| known.id == *wanted) {
                        errors.push(format!("Accommodation {wanted} does not exist"));
                    }
                }
                accommodations
            }
            None => Vec::new(),
        };
        WorkflowError::check(errors)?;

        user.email = email.to_string();
        user.phone = non_empty(&update.phone).map(str::to_string);
        user.first_name = update.first_name.trim().to_string();
        user.last_name = update.last_name.trim().to_string();
        self.store.update_user(user.clone()).map_err(|err| match err {
            RepositoryError::Conflict => WorkflowError::conflict("Email already exists"),
            other => other.into(),
        })?;

        if let Some(ids) = &update.accommodation_ids {
            for mut accommodation in accommodations {
                let owner = if ids.contains(&accommodation.id) {
                    Some(id)
                } else if accommodation.admin_id == Some(id) {
                    None
                } else {
                    accommodation.admin_id
                };
                if owner != accommodation.admin_id {
                    accommodation.admin_id = owner;
                    self.store.update_accommodation(accommodation)?;
                }
            }
        }

        tracing::info!(user_id = %id, updated_by = %actor.user_id, "admin account updated");
        Ok(user.view())
    }

    /// Sets a new password for an admin and signs out all of their sessions.
    pub fn reset_password(
        &self,
        actor: Actor,
        id: UserId,
        reset: PasswordReset,
    ) -> Result<(), WorkflowError> {
        actor.require(Resource::User, Action::Edit)?;
        let mut user = self.admin_account(id)?;
        WorkflowError::check(password_errors(
            &reset.new_password,
            &reset.confirm_password,
        ))?;

        user.password = PasswordHash::generate(&reset.new_password)?;
        self.store.update_user(user)?;
        self.sessions.revoke_user(id, None);
        tracing::info!(user_id = %id, reset_by = %actor.user_id, "admin password reset");
        Ok(())
    }

    /// Deletes an admin. Their accommodations become unassigned and their sessions end.
    pub fn delete_admin(&self, actor: Actor, id: UserId) -> Result<(), WorkflowError> {
        actor.require(Resource::User, Action::Delete)?;
        self.admin_account(id)?;
        let removed = self.store.delete_user(id)?;
        self.sessions.revoke_user(id, None);
        tracing::info!(
            user_id = %id,
            username = %removed.username,
            deleted_by = %actor.user_id,
            "admin account deleted"
        );
        Ok(())
    }

    pub fn login(&self, credentials: Credentials) -> Result<LoginResponse, WorkflowError> {
        let username = credentials.username.trim();
        if username.is_empty() || credentials.password.is_empty() {
            return Err(WorkflowError::Validation(vec![
                "Username and password are required".to_string(),
            ]));
        }

        let mut user = match self.store.find_user_by_username(username)? {
            Some(user) if user.password.verify(&credentials.password) => user,
            _ => {
                tracing::info!(username, "rejected sign-in attempt");
                return Err(WorkflowError::InvalidCredentials);
            }
        };

        let now = Utc::now();
        user.last_login = Some(now);
        self.store.update_user(user.clone())?;

        let session = self.sessions.issue(Actor::new(user.id, user.role), now);
        tracing::info!(user_id = %user.id, role = user.role.label(), "signed in");
        Ok(LoginResponse {
            token: session.token,
            expires_in_secs: self.sessions.idle_timeout().num_seconds(),
            user: user.view(),
        })
    }

    pub fn logout(&self, token: &str) -> bool {
        self.sessions.revoke(token)
    }

    pub fn me(&self, actor: Actor) -> Result<AccountView, WorkflowError> {
        let user = self.user(actor)?;
        let profile = if user.role == Role::Student {
            self.store.fetch_student_profile(user.id)?
        } else {
            None
        };
        Ok(AccountView {
            user: user.view(),
            profile,
        })
    }

    pub fn update_profile(
        &self,
        actor: Actor,
        update: ProfileUpdate,
    ) -> Result<AccountView, WorkflowError> {
        let mut user = self.user(actor)?;
        let mut errors = Vec::new();

        if let Some(email) = update.email.as_deref().map(str::trim) {
            if email.is_empty() {
                errors.push("Email is required".to_string());
            } else if !is_valid_email(email) {
                errors.push("Invalid email format".to_string());
            } else if !email.eq_ignore_ascii_case(&user.email) {
                if self.store.find_user_by_email(email)?.is_some() {
                    errors.push("Email already exists".to_string());
                }
                user.email = email.to_string();
            }
        }
        if let Some(phone) = update.phone.as_deref().map(str::trim) {
            if phone.is_empty() {
                user.phone = None;
            } else if is_valid_phone(phone) {
                user.phone = Some(phone.to_string());
            } else {
                errors.push("Invalid phone number format".to_string());
            }
        }
        if let Some(phone) = non_empty(&update.emergency_contact_phone) {
            if !is_valid_phone(phone) {
                errors.push("Invalid emergency contact phone format".to_string());
            }
        }
        if update.touches_student_profile() && user.role != Role::Student {
            errors.push("Student details apply to student accounts only".to_string());
        }
        WorkflowError::check(errors)?;

        if let Some(first_name) = &update.first_name {
            user.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = &update.last_name {
            user.last_name = last_name.trim().to_string();
        }
        self.store.update_user(user.clone()).map_err(|err| match err {
            RepositoryError::Conflict => WorkflowError::conflict("Email already exists"),
            other => other.into(),
        })?;

        if update.touches_student_profile() {
            let now = Utc::now();
            let mut profile = self
                .store
                .fetch_student_profile(user.id)?
                .unwrap_or_else(|| StudentProfile::empty(user.id, now));
            apply_profile(&mut profile, update);
            profile.updated_at = now;
            self.store.save_student_profile(profile)?;
        }

        self.me(actor)
    }

    /// Verifies the current password, then signs out every other session of the user.
    pub fn change_password(
        &self,
        actor: Actor,
        current_token: &str,
        change: PasswordChange,
    ) -> Result<(), WorkflowError> {
        let mut user = self.user(actor)?;
        let mut errors = Vec::new();
        if !user.password.verify(&change.current_password) {
            errors.push("Current password is incorrect".to_string());
        }
        errors.extend(password_errors(&change.new_password, &change.confirm_password));
        WorkflowError::check(errors)?;

        user.password = PasswordHash::generate(&change.new_password)?;
        self.store.update_user(user)?;
        self.sessions.revoke_user(actor.user_id, Some(current_token));
        tracing::info!(user_id = %actor.user_id, "password changed");
        Ok(())
    }

    fn user(&self, actor: Actor) -> Result<User, WorkflowError> {
        self.store
            .fetch_user(actor.user_id)?
            .ok_or(WorkflowError::NotFound("user"))
    }

    fn admin_account(&self, id: UserId) -> Result<User, WorkflowError> {
        self.store
            .fetch_user(id)?
            .filter(|user| user.role == Role::Admin)
            .ok_or(WorkflowError::NotFound("admin user"))
    }

    fn create(&self, role: Role, form: Registration) -> Result<User, WorkflowError> {
        let mut errors = form.validate();
        let username = form.username.trim();
        let email = form.email.trim();
        if !username.is_empty() && self.store.find_user_by_username(username)?.is_some() {
            errors.push("Username already exists".to_string());
        }
        if !email.is_empty() && self.store.find_user_by_email(email)?.is_some() {
            errors.push("Email already exists".to_string());
        }
        WorkflowError::check(errors)?;

        let user = self
            .store
            .insert_user(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password: PasswordHash::generate(&form.password)?,
                role,
                phone: non_empty(&form.phone).map(str::to_string),
                first_name: form.first_name.trim().to_string(),
                last_name: form.last_name.trim().to_string(),
                created_at: Utc::now(),
            })
            .map_err(|err| match err {
                RepositoryError::Conflict => {
                    WorkflowError::conflict("Username or email already exists")
                }
                other => other.into(),
            })?;

        let welcome = notice::welcome(&self.notifier.settings().app_name, &user.username);
        self.notifier.deliver(&user, &welcome);
        tracing::info!(user_id = %user.id, role = user.role.label(), "account registered");
        Ok(user)
    }
}

fn apply_profile(profile: &mut StudentProfile, update: ProfileUpdate) {
    fn set(slot: &mut Option<String>, value: Option<String>) {
        if let Some(value) = value {
            let value = value.trim();
            *slot = (!value.is_empty()).then(|| value.to_string());
        }
    }

    set(&mut profile.student_number, update.student_number);
    set(&mut profile.gender, update.gender);
    set(&mut profile.id_number, update.id_number);
    set(&mut profile.address, update.address);
    set(&mut profile.emergency_contact_name, update.emergency_contact_name);
    set(&mut profile.emergency_contact_phone, update.emergency_contact_phone);
    if update.date_of_birth.is_some() {
        profile.date_of_birth = update.date_of_birth;
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::workflows::accommodations::{AccommodationId, AccommodationRepository};
    use crate::workflows::testing::{registration, Harness, PASSWORD};

    fn credentials(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn seeding_only_happens_on_an_empty_store() {
        let harness = Harness::new();
        let again = harness
            .portal
            .accounts()
            .ensure_master_admin(&SeedAdminConfig {
                username: "root".to_string(),
                email: "root@example.com".to_string(),
                password: "changeme".to_string(),
            })
            .expect("seed check");
        assert!(again.is_none());
    }

    #[test]
    fn registration_reports_every_problem() {
        let harness = Harness::new();
        harness.student("thandi");

        let mut form = registration("thandi", Some("12"));
        form.email = "THANDI@example.com".to_string();
        form.confirm_password = "different".to_string();

        match harness.portal.accounts().register(form) {
            Err(WorkflowError::Validation(errors)) => {
                assert!(errors.contains(&"Invalid phone number format".to_string()));
                assert!(errors.contains(&"Passwords do not match".to_string()));
                assert!(errors.contains(&"Username already exists".to_string()));
                assert!(errors.contains(&"Email already exists".to_string()));
            }
            other => panic!("expected validation errors, got {other:?}"),
        }
    }

    #[test]
    fn registration_welcomes_the_student() {
        let harness = Harness::new();
        let student = harness.student("thandi");

        assert_eq!(student.role, Role::Student);
        let emails = harness.dispatcher.emails();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].to, "thandi@example.com");
        assert_eq!(emails[0].subject, "Welcome to Harambee Student Living");
        assert_eq!(harness.dispatcher.texts().len(), 1);
    }

    #[test]
    fn login_issues_a_session_and_rejects_bad_passwords() {
        let harness = Harness::new();
        let student = harness.student("thandi");
        let accounts = harness.portal.accounts();

        assert!(matches!(
            accounts.login(credentials("thandi", "wrong-password")),
            Err(WorkflowError::InvalidCredentials)
        ));
        assert!(matches!(
            accounts.login(credentials("nobody", PASSWORD)),
            Err(WorkflowError::InvalidCredentials)
        ));
        assert!(matches!(
            accounts.login(credentials(" ", "")),
            Err(WorkflowError::Validation(_))
        ));

        let response = accounts
            .login(credentials("thandi", PASSWORD))
            .expect("login succeeds");
        assert!(response.user.last_login.is_some());
        assert_eq!(response.expires_in_secs, 30 * 60);
        let actor = harness
            .portal
            .sessions()
            .authenticate(&response.token, Utc::now())
            .expect("session valid");
        assert_eq!(actor, student);

        assert!(accounts.logout(&response.token));
        assert!(harness
            .portal
            .sessions()
            .authenticate(&response.token, Utc::now())
            .is_err());
    }

    #[test]
    fn only_master_admins_create_accounts() {
        let harness = Harness::new();
        let admin = harness.admin("warden");
        let student = harness.student("thandi");

        let attempt = harness.portal.accounts().create_user(
            admin,
            NewAccount {
                role: Role::Admin,
                registration: registration("deputy", None),
            },
        );
        assert!(matches!(attempt, Err(WorkflowError::Forbidden(_))));
        assert!(matches!(
            harness.portal.accounts().list_users(student, None),
            Err(WorkflowError::Forbidden(_))
        ));

        let admins = harness
            .portal
            .accounts()
            .list_users(harness.master, Some(Role::Admin))
            .expect("list");
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].username, "warden");
    }

    #[test]
    fn profile_updates_create_student_details_lazily() {
        let harness = Harness::new();
        let student = harness.student("thandi");
        let accounts = harness.portal.accounts();
        assert!(accounts.me(student).expect("me").profile.is_none());

        let view = accounts
            .update_profile(
                student,
                ProfileUpdate {
                    phone: Some(String::new()),
                    student_number: Some(" 2025001234 ".to_string()),
                    date_of_birth: NaiveDate::from_ymd_opt(2004, 5, 17),
                    emergency_contact_name: Some("Nomsa Mokoena".to_string()),
                    emergency_contact_phone: Some("011 555 0199".to_string()),
                    ..ProfileUpdate::default()
                },
            )
            .expect("profile updated");

        assert_eq!(view.user.phone, None);
        let profile = view.profile.expect("profile created");
        assert_eq!(profile.student_number.as_deref(), Some("2025001234"));
        assert_eq!(profile.emergency_contact_phone.as_deref(), Some("011 555 0199"));

        let admin = harness.admin("warden");
        let rejected = accounts.update_profile(
            admin,
            ProfileUpdate {
                student_number: Some("123".to_string()),
                ..ProfileUpdate::default()
            },
        );
        assert!(matches!(rejected, Err(WorkflowError::Validation(_))));
    }

    #[test]
    fn password_change_signs_out_other_sessions() {
        let harness = Harness::new();
        let student = harness.student("thandi");
        let kept = harness.token("thandi");
        let other = harness.token("thandi");
        let accounts = harness.portal.accounts();

        let wrong = accounts.change_password(
            student,
            &kept,
            PasswordChange {
                current_password: "nope".to_string(),
                new_password: "better-secret".to_string(),
                confirm_password: "better-secret".to_string(),
            },
        );
        assert!(matches!(wrong, Err(WorkflowError::Validation(_))));

        accounts
            .change_password(
                student,
                &kept,
                PasswordChange {
                    current_password: PASSWORD.to_string(),
                    new_password: "better-secret".to_string(),
                    confirm_password: "better-secret".to_string(),
                },
            )
            .expect("password changed");

        let sessions = harness.portal.sessions();
        assert!(sessions.authenticate(&kept, Utc::now()).is_ok());
        assert!(sessions.authenticate(&other, Utc::now()).is_err());
        assert!(accounts.login(credentials("thandi", "better-secret")).is_ok());
    }

    fn admin_update(email: &str, accommodation_ids: Option<Vec<AccommodationId>>) -> AdminUpdate {
        AdminUpdate {
            email: email.to_string(),
            phone: Some("011 555 0123".to_string()),
            first_name: "Lerato".to_string(),
            last_name: "Nkosi".to_string(),
            accommodation_ids,
        }
    }

    #[test]
    fn master_edits_admins_and_their_assignments() {
        let harness = Harness::new();
        let warden = harness.admin("warden");
        let bursar = harness.admin("bursar");
        let student = harness.student("thandi");
        let lodge = harness.accommodation(warden, 2);
        let annex = harness.accommodation(bursar, 2);
        let accounts = harness.portal.accounts();

        assert!(matches!(
            accounts.update_admin(warden, bursar.user_id, admin_update("b@example.com", None)),
            Err(WorkflowError::Forbidden(_))
        ));
        assert!(matches!(
            accounts.update_admin(
                harness.master,
                student.user_id,
                admin_update("t@example.com", None)
            ),
            Err(WorkflowError::NotFound("admin user"))
        ));
        match accounts.update_admin(
            harness.master,
            warden.user_id,
            admin_update("bursar@example.com", Some(vec![AccommodationId(99)])),
        ) {
            Err(WorkflowError::Validation(errors)) => assert_eq!(
                errors,
                vec!["Email already exists", "Accommodation 99 does not exist"]
            ),
            other => panic!("expected validation errors, got {other:?}"),
        }

        let view = accounts
            .update_admin(
                harness.master,
                warden.user_id,
                admin_update("lerato@example.com", Some(vec![annex])),
            )
            .expect("admin updated");
        assert_eq!(view.email, "lerato@example.com");
        assert_eq!(view.phone.as_deref(), Some("011 555 0123"));
        assert_eq!(view.first_name, "Lerato");

        let owner = |id: AccommodationId| {
            harness
                .store
                .fetch_accommodation(id)
                .expect("fetch")
                .expect("exists")
                .admin_id
        };
        assert_eq!(owner(lodge), None);
        assert_eq!(owner(annex), Some(warden.user_id));

        accounts
            .update_admin(
                harness.master,
                warden.user_id,
                admin_update("lerato@example.com", None),
            )
            .expect("contact-only edit");
        assert_eq!(owner(annex), Some(warden.user_id));
    }

    #[test]
    fn reset_password_replaces_credentials_and_ends_sessions() {
        let harness = Harness::new();
        let warden = harness.admin("warden");
        let token = harness.token("warden");
        let accounts = harness.portal.accounts();

        let short = accounts.reset_password(
            harness.master,
            warden.user_id,
            PasswordReset {
                new_password: "abc".to_string(),
                confirm_password: "abcd".to_string(),
            },
        );
        match short {
            Err(WorkflowError::Validation(errors)) => assert_eq!(
                errors,
                vec![
                    "Password must be at least 6 characters",
                    "Passwords do not match"
                ]
            ),
            other => panic!("expected validation errors, got {other:?}"),
        }

        accounts
            .reset_password(
                harness.master,
                warden.user_id,
                PasswordReset {
                    new_password: "fresh-start".to_string(),
                    confirm_password: "fresh-start".to_string(),
                },
            )
            .expect("password reset");
        assert!(harness
            .portal
            .sessions()
            .authenticate(&token, Utc::now())
            .is_err());
        assert!(matches!(
            accounts.login(credentials("warden", PASSWORD)),
            Err(WorkflowError::InvalidCredentials)
        ));
        assert!(accounts.login(credentials("warden", "fresh-start")).is_ok());
    }

    #[test]
    fn deleting_an_admin_unassigns_their_accommodations() {
        let harness = Harness::new();
        let warden = harness.admin("warden");
        let lodge = harness.accommodation(warden, 2);
        let token = harness.token("warden");
        let accounts = harness.portal.accounts();

        assert!(matches!(
            accounts.delete_admin(harness.master, harness.master.user_id),
            Err(WorkflowError::NotFound("admin user"))
        ));
        assert!(matches!(
            accounts.delete_admin(warden, warden.user_id),
            Err(WorkflowError::Forbidden(_))
        ));

        accounts
            .delete_admin(harness.master, warden.user_id)
            .expect("admin deleted");
        assert!(harness
            .portal
            .sessions()
            .authenticate(&token, Utc::now())
            .is_err());
        let lodge = harness
            .portal
            .accommodations()
            .get(harness.master, lodge)
            .expect("accommodation kept");
        assert_eq!(lodge.accommodation.admin_id, None);
        assert!(accounts
            .list_users(harness.master, Some(Role::Admin))
            .expect("list")
            .is_empty());
    }
}
