pub mod config;
pub mod credentials;
pub mod error;
pub mod listing;
pub mod notification;
pub mod trace;

pub use credentials::Credentials;
pub use error::{Error, Result};
pub use listing::{KeywordFilter, Listing, Post};
pub use notification::Notification;
