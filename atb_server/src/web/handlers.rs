use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};

use crate::error::AppError;
use crate::render::render_page;
use crate::state::AppState;

const STYLE_CSS: &str = include_str!("../../assets/style.css");

/// `GET /api`: the discount list as a JSON array.
pub async fn items_json(State(state): State<AppState>) -> Result<Response, AppError> {
    let items = state.service.get_items().await?;
    let body = serde_json::to_vec(items.as_slice())?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

/// `GET /`: the discount list as an HTML page.
pub async fn items_html(State(state): State<AppState>) -> Response {
    match state.service.get_items().await {
        Ok(items) => Html(render_page(&items)).into_response(),
        Err(e) => AppError::from(e).into_generic_response(),
    }
}

/// `GET /ping`
pub async fn ping() -> &'static str {
    "."
}

/// `GET /style.css`
pub async fn style() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], STYLE_CSS)
}
