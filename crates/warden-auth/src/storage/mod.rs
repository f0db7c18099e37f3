//! Storage traits for user accounts.
//!
//! # Implementations
//!
//! - [`InMemoryUserStorage`] - process-local, for tests and development
//! - `warden-auth-postgres` - PostgreSQL storage backend

pub mod memory;
pub mod user;

pub use memory::InMemoryUserStorage;
pub use user::{NewUser, User, UserStorage};
