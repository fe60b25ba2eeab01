use thiserror::Error;

#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("expected exactly one tile id in `{url}`, found {found}")]
    TileId { url: String, found: usize },

    #[error("no file name in `{url}`")]
    FileName { url: String },

    #[error("invalid tile pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("chunk size must be at least 1")]
    ChunkSize,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("job queue request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("job queue returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("job queue rejected the job: {message}")]
    Rejected { message: String },

    #[error("malformed job queue response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("submission task failed: {0}")]
    Task(String),
}
