use axum::Json;
use axum::extract::Path;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use super::response::HttpError;
use crate::stats;

#[derive(Debug, Serialize)]
struct RuntimeProfile {
    num_workers: usize,
    num_alive_tasks: usize,
    global_queue_depth: usize,
}

/// Process introspection, mounted only in debug mode.
pub async fn profile(Path(profile): Path<String>) -> Response {
    match profile.as_str() {
        "stats" => Json(stats::snapshot()).into_response(),
        "runtime" => {
            let metrics = tokio::runtime::Handle::current().metrics();
            Json(RuntimeProfile {
                num_workers: metrics.num_workers(),
                num_alive_tasks: metrics.num_alive_tasks(),
                global_queue_depth: metrics.global_queue_depth(),
            })
            .into_response()
        }
        _ => HttpError::not_found().into_response(),
    }
}
