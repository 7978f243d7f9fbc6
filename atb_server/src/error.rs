use std::sync::Arc;

use atb_lib::ScrapeError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Scrape(Arc<ScrapeError>),
    #[error("could not encode discount items to json: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<Arc<ScrapeError>> for AppError {
    fn from(e: Arc<ScrapeError>) -> Self {
        Self::Scrape(e)
    }
}

impl AppError {
    /// 500 with the standard reason phrase, hiding the cause.
    pub fn into_generic_response(self) -> Response {
        tracing::error!("{}", self.log_message());
        internal_error(StatusCode::INTERNAL_SERVER_ERROR.canonical_reason().unwrap_or("error"))
    }

    fn log_message(&self) -> String {
        match self {
            Self::Scrape(e) => format!("could not scrape discount items: {}", e),
            Self::Encode(_) => self.to_string(),
        }
    }
}

/// 500 with the scrape error as the body; encoding failures stay generic.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("{}", self.log_message());
        match &self {
            Self::Scrape(e) => internal_error(&e.to_string()),
            Self::Encode(_) => internal_error("Internal Server Error"),
        }
    }
}

fn internal_error(msg: &str) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, msg.to_string()).into_response()
}
