//! Core types for Rolodex.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod color;
pub mod email;
pub mod id;

pub use color::{ColorError, TagColor};
pub use email::{Email, EmailError};
pub use id::*;
