//! # SSO API
//!
//! Thin HTTP surface over the identity core: extractors, handlers, and the
//! response envelope.

pub mod extract;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
