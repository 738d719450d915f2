//! API request handlers

mod auth;
mod configurations;
mod health;
mod users;

pub use auth::*;
pub use configurations::*;
pub use health::*;
pub use users::register_user;
