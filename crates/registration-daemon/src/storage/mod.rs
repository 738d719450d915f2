//! Storage layer for registrationd
//!
//! Persists registered users. Policy parameters live in the policy crate's
//! own stores and share the same connection pool.

mod memory;
mod postgres;
mod traits;

pub use memory::InMemoryUserStorage;
pub use postgres::PostgresUserStorage;
pub use traits::{StorageResult, UserStorage};
