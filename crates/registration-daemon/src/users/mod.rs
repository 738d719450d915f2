//! User registration and login

pub mod model;
mod password;
mod service;

pub use model::{LoginRequest, Phone, RegisterRequest, User, UserView};
pub use service::UserService;

use crate::error::StorageError;
use registration_policy::PolicyError;
use thiserror::Error;

/// Errors raised while registering or authenticating users
#[derive(Debug, Error)]
pub enum UserError {
    /// Request failed field validation
    #[error("{0}")]
    Validation(String),

    #[error("email already registered")]
    DuplicateEmail,

    /// Password rejected by the policy
    #[error("password does not meet requirements")]
    InvalidPassword,

    /// Unknown email or wrong password
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Password policy could not be evaluated
    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Hashing or token signing failed
    #[error("credential error: {0}")]
    Credentials(String),
}
