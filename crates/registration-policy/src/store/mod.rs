//! Durable storage for policy parameters.

mod memory;
#[cfg(feature = "postgres")]
mod postgres;
mod traits;

pub use memory::InMemoryPolicyStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresPolicyStore;
pub use traits::PolicyStore;
