use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Webpage returned status code {0}")]
    FetchStatus(u16),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Analysis cancelled")]
    Cancelled,
}

impl ScanError {
    /// True for failures of the primary page fetch (bad status or transport error).
    pub fn is_fetch_error(&self) -> bool {
        matches!(self, ScanError::FetchStatus(_) | ScanError::HttpError(_))
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
