//! Shared request-scoped models.

pub mod session;

pub use session::{CurrentUser, session_keys};
