use axum::{extract::State, http::StatusCode, response::Html};
use std::sync::Arc;

use crate::{
    startup::AppState,
    templates::{host_page, PageConfig},
};

pub async fn host_page_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    let config = PageConfig {
        title: &state.title,
        embed_settings: &state.embed_settings,
    };
    Html(host_page(&config).into_string())
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}
