//! Rolodex Core - Shared types library.
//!
//! This crate provides common types used across all Rolodex components:
//! - `server` - The contact-management web service
//! - `cli` - Command-line tools for migrations and user management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, and tag colors

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
