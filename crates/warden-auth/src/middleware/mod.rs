//! HTTP middleware for authentication.
//!
//! This module provides:
//!
//! - Bearer token extraction and validation ([`BearerAuth`])
//! - JSON error responses for [`AuthError`](crate::AuthError)

pub mod auth;
pub mod error;

pub use auth::{AuthState, BearerAuth};
