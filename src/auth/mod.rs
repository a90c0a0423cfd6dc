pub mod client_kind;
pub mod extract;
pub mod middleware;

pub use client_kind::{access_cookie, refresh_cookie, removal_cookie, ClientKind};
pub use middleware::authenticate_request;
