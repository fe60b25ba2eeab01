use thiserror::Error;

/// Bad input detected before any network activity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(
        "error parsing bounds: {0}. Format is <W Longitude>,<S Latitude>,<E Longitude>,<N Latitude> without spaces"
    )]
    Bounds(String),

    #[error("error parsing {kind} date: {value}. Format must be like 2021-01-14T00:00:00Z")]
    Date { kind: &'static str, value: String },

    #[error("error parsing minutes: {0}. Number must be an integer")]
    Minutes(String),

    #[error("one of start-date or end-date must be specified")]
    MissingTimeRange,

    #[error("unknown extension list `{0}` (expected one of TIF, L30, S30)")]
    ExtensionList(String),

    #[error("unsupported transfer protocol `{0}` (expected https or s3)")]
    Protocol(String),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("catalog returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed catalog response: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
