//! Accounts, credentials, sessions, and the role permission matrix.

pub mod access;
pub mod domain;
mod password;
pub mod repository;
pub mod router;
pub mod service;
pub mod session;

pub use access::{Action, Actor, Resource};
pub use domain::{
    is_valid_email, is_valid_phone, AccountView, AdminUpdate, Credentials, LoginResponse,
    NewAccount, NewUser, PasswordChange, PasswordReset, ProfileUpdate, Registration, Role,
    StudentProfile, User, UserId, UserView,
};
pub use password::{PasswordHash, PasswordHashError};
pub use repository::UserRepository;
pub use service::AccountService;
pub use session::{bearer_token, Session, SessionStore};
