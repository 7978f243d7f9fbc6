//! Error types for the catalog client.

/// Errors that can occur when requesting catalog pages.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The configured base URL does not form a valid catalog URL.
    #[error("invalid catalog url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The underlying HTTP client could not be constructed.
    #[error("could not build http client: {0}")]
    Client(#[source] reqwest::Error),
    /// The request for a page failed (network error or timeout).
    #[error("could not fetch page {page}: {source}")]
    Transport {
        page: u32,
        #[source]
        source: reqwest::Error,
    },
    /// The upstream answered a page request with a non-success status.
    #[error("could not fetch page {page}: status {status}")]
    HttpStatus { page: u32, status: u16, body: String },
    /// The page response was not the expected `{markup, next_page}` JSON.
    #[error("could not decode page {page}: {source}")]
    Decode {
        page: u32,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// Page number the failure belongs to, if it happened during a page request.
    pub fn page(&self) -> Option<u32> {
        match self {
            Self::Transport { page, .. }
            | Self::HttpStatus { page, .. }
            | Self::Decode { page, .. } => Some(*page),
            Self::InvalidUrl(_) | Self::Client(_) => None,
        }
    }
}
