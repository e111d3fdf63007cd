//! Botsmith Core - Shared types library.
//!
//! This crate provides common types used across all Botsmith components:
//! - `server` - The JSON API binary (tokens, subscriptions, admin, cron)
//! - `cli` - Command-line tools for migrations, seeding and maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, emails, statuses
//!   and usage periods

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
