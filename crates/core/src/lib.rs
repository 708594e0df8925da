//! Shelfwise Core - Shared domain types.
//!
//! This crate provides the types used across all Shelfwise components:
//! - `admin` - Merchant automation service (API, jobs, scheduler)
//! - `cli` - Command-line tools for migrations and one-off runs
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no HTTP clients. The `postgres` feature adds `sqlx` encode/decode
//! support so repositories can bind these types directly.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for shop domains, keywords, certificate
//!   numbers, emails, ids and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
