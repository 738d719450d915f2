//! Password policy engine for the registration service.
//!
//! Policy parameters are persisted as individual key/value records and
//! compiled into a single immutable [`Matcher`]:
//! - [`store`] holds the durable parameter records
//! - [`compiler`] turns the active parameter set into a matcher
//! - [`engine`] owns the current matcher and swaps it atomically
//! - [`admin`] is the surface used to read and mutate parameters
//!
//! Validators never take a lock across evaluation; they clone the current
//! `Arc<Matcher>` and evaluate against that snapshot.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod admin;
pub mod clock;
pub mod compiler;
pub mod engine;
mod error;
pub mod key;
pub mod matcher;
mod model;
pub mod store;

pub use admin::{AdminConfig, PolicyAdmin};
pub use clock::{Clock, ManualClock, SystemClock};
pub use compiler::compile;
pub use engine::{EngineStatus, PolicyEngine};
pub use error::{PolicyError, PolicyResult, StoreError, StoreResult};
pub use key::{ParameterKey, ValueKind};
pub use matcher::{CompiledPolicy, Matcher};
pub use model::{ParameterRecord, ParameterTypeRecord, ParameterView};
pub use store::{InMemoryPolicyStore, PolicyStore};
#[cfg(feature = "postgres")]
pub use store::PostgresPolicyStore;
