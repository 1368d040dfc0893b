use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Fatal conditions for a run. Failed CLI attempts never show up here; they
/// are logged and the cascade moves on to the next attempt.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing env vars. {0}")]
    MissingConfig(String),

    #[error("Authorization failed: {status} {body}")]
    AuthorizationFailed { status: u16, body: String },

    #[error("Update failed: {status} {body}")]
    UpdateFailed { status: u16, body: String },

    #[error("Missing {0} in authorization response")]
    MalformedResponse(&'static str),

    #[error("Request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
