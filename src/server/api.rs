//! JSON API, mounted under `/api/v1`.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::response::HttpResult;
use crate::app::AppState;

pub const FEED_PAGE_SIZE: u64 = 10;

#[derive(Debug, Deserialize)]
pub struct FeedParams {
    pub page: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedFile {
    pub id: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub file_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub url: String,
}

/// Latest public files, newest first. An unparsable `page` reads as the
/// first page.
pub async fn feed(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FeedParams>,
) -> HttpResult<Json<Vec<FeedFile>>> {
    let page = params
        .page
        .and_then(|p| p.parse::<u64>().ok())
        .unwrap_or(0);

    let files = state
        .store
        .latest_public_files(page, FEED_PAGE_SIZE)?
        .into_iter()
        .map(|file| FeedFile {
            url: state.config.http_address_for_file(&file.id).to_string(),
            id: file.id,
            size: file.size,
            file_type: file.file_type,
            created_at: file.created_at,
            updated_at: file.updated_at,
        })
        .collect();

    Ok(Json(files))
}
