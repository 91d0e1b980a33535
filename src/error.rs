#[derive(Debug, thiserror::Error)]
pub enum DealerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A blob listing response that is not in a recognised shape.
    #[error("Malformed blob listing: {0}")]
    Listing(String),
}

pub type Result<T> = std::result::Result<T, DealerError>;
