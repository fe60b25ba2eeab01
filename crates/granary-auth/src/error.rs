use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no .netrc file found (looked at {})", path.display())]
    NetrcMissing { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    NetrcRead {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("home directory could not be determined")]
    NoHome,

    #[error("no login for `{host}` in .netrc")]
    NoCredentials { host: String },

    #[error("token endpoint rejected the request ({status}): {body}")]
    TokenRejected { status: u16, body: String },

    #[error("malformed token response: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, AuthError>;
