pub mod auth;
pub mod listing;
pub mod markup;
pub mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use auth::{AuthStep, Authenticator, SessionContext};
pub use listing::{fetch_listing, parse_listing};
pub use transport::{FormPost, HttpResponse, Redirects, ReqwestTransport, Transport};
