use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::password::PasswordHash;
use crate::workflows::accommodations::AccommodationId;

/// Identifier wrapper for portal users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Admin,
    MasterAdmin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
            Role::MasterAdmin => "master_admin",
        }
    }

    pub const fn is_admin(self) -> bool {
        matches!(self, Role::Admin | Role::MasterAdmin)
    }
}

/// Stored account. The password hash never leaves the service; use [`User::view`] for output.
#[derive(Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password: PasswordHash,
    pub role: Role,
    pub phone: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Full name, or the username when no name was given.
    pub fn display_name(&self) -> String {
        let name = self.full_name();
        if name.is_empty() {
            self.username.clone()
        } else {
            name
        }
    }

    pub fn view(&self) -> UserView {
        UserView {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
            phone: self.phone.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            created_at: self.created_at,
            last_login: self.last_login,
        }
    }
}

/// Account fields handed to the repository; the store assigns the id.
#[derive(Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: PasswordHash,
    pub role: Role,
    pub phone: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}

/// Public representation of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub phone: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Student-only details captured after registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub user_id: UserId,
    pub student_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub id_number: Option<String>,
    pub address: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl StudentProfile {
    pub fn empty(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            student_number: None,
            date_of_birth: None,
            gender: None,
            id_number: None,
            address: None,
            emergency_contact_name: None,
            emergency_contact_phone: None,
            updated_at: now,
        }
    }
}

/// Self-service registration form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Registration {
    /// Field-level checks; uniqueness is verified against the repository by the service.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let username = self.username.trim();
        if username.is_empty() {
            errors.push("Username is required".to_string());
        } else if !(3..=20).contains(&username.chars().count()) {
            errors.push("Username must be between 3 and 20 characters".to_string());
        }

        let email = self.email.trim();
        if email.is_empty() {
            errors.push("Email is required".to_string());
        } else if !is_valid_email(email) {
            errors.push("Invalid email format".to_string());
        }

        if let Some(phone) = non_empty(&self.phone) {
            if !is_valid_phone(phone) {
                errors.push("Invalid phone number format".to_string());
            }
        }

        errors.extend(password_errors(&self.password, &self.confirm_password));
        errors
    }
}

/// Master-admin request to create an account with an explicit role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    pub role: Role,
    #[serde(flatten)]
    pub registration: Registration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in_secs: i64,
    pub user: UserView,
}

/// Account view returned by `/me`, including the student profile when one exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountView {
    pub user: UserView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<StudentProfile>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub student_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub id_number: Option<String>,
    pub address: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
}

impl ProfileUpdate {
    pub fn touches_student_profile(&self) -> bool {
        self.student_number.is_some()
            || self.date_of_birth.is_some()
            || self.gender.is_some()
            || self.id_number.is_some()
            || self.address.is_some()
            || self.emergency_contact_name.is_some()
            || self.emergency_contact_phone.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Master-admin edit of an admin account. When `accommodation_ids` is present it replaces
/// the set of accommodations the admin manages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUpdate {
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub accommodation_ids: Option<Vec<AccommodationId>>,
}

impl AdminUpdate {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let email = self.email.trim();
        if email.is_empty() {
            errors.push("Email is required".to_string());
        } else if !is_valid_email(email) {
            errors.push("Invalid email format".to_string());
        }
        if let Some(phone) = non_empty(&self.phone) {
            if !is_valid_phone(phone) {
                errors.push("Invalid phone number format".to_string());
            }
        }
        if self.first_name.trim().is_empty() {
            errors.push("First name is required".to_string());
        }
        if self.last_name.trim().is_empty() {
            errors.push("Last name is required".to_string());
        }
        errors
    }
}

/// Master-admin password reset; no current password is required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordReset {
    pub new_password: String,
    pub confirm_password: String,
}

pub(crate) fn password_errors(password: &str, confirmation: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if password.is_empty() {
        errors.push("Password is required".to_string());
    } else if password.chars().count() < 6 {
        errors.push("Password must be at least 6 characters".to_string());
    }
    if password != confirmation {
        errors.push("Passwords do not match".to_string());
    }
    errors
}

pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

pub fn is_valid_email(email: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok())
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(email))
}

/// Accepts 10 to 15 digits once separators are stripped, with an optional leading `+`.
pub fn is_valid_phone(phone: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let compact: String = phone
        .chars()
        .filter(|ch| !matches!(ch, ' ' | '-' | '(' | ')' | '.'))
        .collect();
    PATTERN
        .get_or_init(|| Regex::new(r"^\+?[0-9]{10,15}$").ok())
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(&compact))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> Registration {
        Registration {
            username: "thandi".to_string(),
            email: "thandi@example.com".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
            first_name: "Thandi".to_string(),
            last_name: "Mokoena".to_string(),
            phone: Some("+27 82 555 0101".to_string()),
        }
    }

    #[test]
    fn accepts_well_formed_registration() {
        assert!(registration().validate().is_empty());
    }

    #[test]
    fn collects_every_field_error() {
        let mut form = registration();
        form.username = "ab".to_string();
        form.email = "not-an-email".to_string();
        form.phone = Some("12345".to_string());
        form.password = "abc".to_string();
        form.confirm_password = "abcd".to_string();

        let errors = form.validate();
        assert_eq!(
            errors,
            vec![
                "Username must be between 3 and 20 characters",
                "Invalid email format",
                "Invalid phone number format",
                "Password must be at least 6 characters",
                "Passwords do not match",
            ]
        );
    }

    #[test]
    fn blank_phone_is_ignored() {
        let mut form = registration();
        form.phone = Some("   ".to_string());
        assert!(form.validate().is_empty());
    }

    #[test]
    fn phone_validation_strips_separators() {
        assert!(is_valid_phone("(082) 555-0101"));
        assert!(is_valid_phone("+27825550101"));
        assert!(!is_valid_phone("555-0101"));
        assert!(!is_valid_phone("+27 82 555 0101 ext 4"));
    }

    #[test]
    fn admin_updates_require_names_and_contact_details() {
        let update = AdminUpdate {
            email: "warden@".to_string(),
            phone: Some(" ".to_string()),
            first_name: "Lerato".to_string(),
            last_name: String::new(),
            accommodation_ids: None,
        };
        assert_eq!(
            update.validate(),
            vec!["Invalid email format", "Last name is required"]
        );
    }

    #[test]
    fn roles_report_admin_capability() {
        assert!(Role::MasterAdmin.is_admin());
        assert!(Role::Admin.is_admin());
        assert!(!Role::Student.is_admin());
        assert_eq!(Role::MasterAdmin.label(), "master_admin");
    }
}
