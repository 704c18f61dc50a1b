//! Domain models for the server.

pub mod contact;
pub mod session;
pub mod tag;
pub mod user;

pub use contact::{Contact, ContactDetail, NameField};
pub use session::{CurrentUser, session_keys};
pub use tag::{Tag, TagWithCount};
pub use user::{User, UserSummary};
