use super::domain::{NewUser, Role, StudentProfile, User, UserId};
use crate::workflows::error::RepositoryError;

/// Storage abstraction for accounts and student profiles.
pub trait UserRepository: Send + Sync {
    /// Fails with [`RepositoryError::Conflict`] when the username or email is taken.
    fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError>;
    fn update_user(&self, user: User) -> Result<(), RepositoryError>;
    fn fetch_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    fn find_user_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    fn list_users(&self, role: Option<Role>) -> Result<Vec<User>, RepositoryError>;
    fn count_users(&self) -> Result<usize, RepositoryError>;
    fn fetch_student_profile(&self, user: UserId)
        -> Result<Option<StudentProfile>, RepositoryError>;
    fn save_student_profile(&self, profile: StudentProfile) -> Result<(), RepositoryError>;
    /// Removes the account with its profile and inbox. Accommodations it managed are left
    /// without an admin.
    fn delete_user(&self, id: UserId) -> Result<User, RepositoryError>;
}
