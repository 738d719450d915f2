//! Registration daemon library
//!
//! This module provides the core components for the registration daemon:
//! - REST API handlers for registration, login and policy administration
//! - Bearer token issuing and verification
//! - User storage backends
//! - Server lifecycle management

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod server;
pub mod storage;
pub mod users;

pub use config::DaemonConfig;
pub use error::{ApiError, DaemonError, StorageError};
pub use server::Server;
pub use storage::{InMemoryUserStorage, UserStorage};
