//! Error types for the scrape pipeline.

/// The markup extractor could not be set up or could not read a page.
#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    /// A CSS selector failed to compile.
    #[error("invalid selector {selector:?}: {reason}")]
    Selector {
        selector: &'static str,
        reason: String,
    },
}

/// Errors that abort a whole scrape. No partial item list is returned.
#[derive(thiserror::Error, Debug)]
pub enum ScrapeError {
    /// A page request failed. The wrapped error names the page.
    #[error(transparent)]
    Fetch(#[from] atb_api::Error),
    /// A page's markup could not be turned into items.
    #[error("could not extract items from page {page}: {source}")]
    Extract {
        page: u32,
        #[source]
        source: ExtractError,
    },
    /// The background refresh task panicked or was cancelled.
    #[error("refresh task failed: {0}")]
    Aborted(#[from] tokio::task::JoinError),
}
