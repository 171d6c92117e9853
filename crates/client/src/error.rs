use thiserror::Error;

/// Client-side failures. `Display` is what a screen shows inline.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Missing, expired or revoked token. Stored credentials are gone.
    #[error("your session has expired, please log in again")]
    Unauthorized,

    /// The server answered with an error body.
    #[error("{message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("could not reach the server: {0}")]
    Http(#[from] reqwest::Error),

    #[error("could not access stored credentials: {0}")]
    Credentials(#[from] std::io::Error),

    /// Rejected locally before anything was sent.
    #[error("{0}")]
    Validation(String),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Unauthorized => Some(401),
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
