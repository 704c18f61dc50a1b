//! HTTP middleware: sessions and authentication.

pub mod auth;
pub mod session;

pub use auth::RequireAuth;
pub use session::create_session_layer;
