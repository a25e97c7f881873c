use std::sync::Arc;

use askama::Template;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, header};
use axum::response::{Html, IntoResponse, Response};
use rust_embed::RustEmbed;
use serde_json::json;
use tracing::error;

use super::response::{HttpError, HttpResult};
use super::templates::{FileTemplate, Page};
use crate::app::AppState;
use crate::renderer::to_markdown;
use crate::timeutil::{format_duration, human_bytes};
use crate::types::FILE_TYPE_MARKDOWN;

#[derive(RustEmbed)]
#[folder = "docs"]
struct Docs;

const README: &str = include_str!("../../README.md");

fn render_doc(state: &AppState, name: &str, content: &[u8]) -> HttpResult<Response> {
    let html = to_markdown(content).map_err(|e| {
        error!(doc = name, error = %e, "unable to render doc");
        HttpError::internal()
    })?;

    let template = FileTemplate {
        page: Page::new(state),
        file_id: name.to_string(),
        file_size: human_bytes(content.len() as u64),
        file_type: FILE_TYPE_MARKDOWN.to_string(),
        private: false,
        updated_at: None,
        revisions_href: None,
        raw_href: None,
        html,
    };
    Ok(Html(template.render()?).into_response())
}

pub async fn index(State(state): State<Arc<AppState>>) -> HttpResult<Response> {
    render_doc(&state, "README.md", README.as_bytes())
}

pub async fn doc(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> HttpResult<Response> {
    if name.contains('/') || name.contains("..") {
        return Err(HttpError::not_found());
    }
    let doc = Docs::get(&name).ok_or_else(HttpError::not_found)?;
    render_doc(&state, &name, &doc.data)
}

pub async fn health() -> &'static str {
    "💚\n"
}

pub async fn meta(State(state): State<Arc<AppState>>) -> HttpResult<Response> {
    let config = &state.config;
    let meta = json!({
        "limits": {
            "file_size": {
                "bytes": config.limits.file_size,
                "human": human_bytes(config.limits.file_size),
            },
            "files_per_user": config.limits.files_per_user,
            "session_duration": {
                "seconds": config.limits.session_duration.as_secs(),
                "human": format_duration(config.limits.session_duration),
            },
        },
        "endpoints": {
            "http": config.http.external.as_str(),
            "ssh": config.ssh.external.as_str(),
        },
        "guesser_enabled": config.enable_guesser,
        "version": env!("CARGO_PKG_VERSION"),
    });

    let body = serde_json::to_string_pretty(&meta).map_err(|e| {
        error!(error = %e, "unable to encode meta");
        HttpError::internal()
    })?;
    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        body,
    )
        .into_response())
}

pub async fn not_found() -> HttpError {
    HttpError::not_found()
}
