// REST client for the marketplace backend.
//
// `client` owns the transport and request decoration, `auth` the token
// lifecycle, `content` the listing pass-throughs, `types` the wire shapes.

pub mod auth;
pub mod client;
pub mod content;
pub mod types;

pub use auth::AuthState;
pub use client::{ApiClient, SessionExpiredHook, LOGIN_ROUTE};
pub use content::{OrderQuery, ReviewQuery, ServiceQuery};
