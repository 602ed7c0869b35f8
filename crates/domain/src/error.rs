/// Shared error type used across all bulletin-watch crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Network, DNS, connection or body-read failure outside the handshake.
    #[error("transport: {0}")]
    Transport(String),

    /// A handshake step could not be completed.  HTTP status codes never
    /// produce this; only transport failures, redirect policy violations and
    /// a failed post-login verification do.
    #[error("auth step {step}: {message}")]
    AuthFlow { step: String, message: String },

    #[error("store: {0}")]
    Store(String),

    #[error("delivery: {0}")]
    Delivery(String),

    #[error("config: {0}")]
    Config(String),
}

impl Error {
    pub fn auth(step: impl Into<String>, message: impl Into<String>) -> Self {
        Error::AuthFlow {
            step: step.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
