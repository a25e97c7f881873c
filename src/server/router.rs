use std::sync::Arc;

use axum::middleware;
use axum::{Router, routing::get};
use tower_http::catch_panic::CatchPanicLayer;

use super::middleware::{
    log_request, panic_response, record_metrics, request_id, request_timeout,
};
use super::{api, assets, debug, files, pages};
use crate::app::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let files = Router::new()
        .route("/f/{id}", get(files::file))
        .route("/f/{id}/rev", get(files::revisions))
        .route("/f/{id}/rev/{rev}", get(files::revision))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            files::with_file,
        ));

    let mut router = Router::new()
        .route("/", get(pages::index))
        .route("/docs/{name}", get(pages::doc))
        .route("/health", get(pages::health))
        .route("/meta.json", get(pages::meta))
        .route("/assets/{*asset}", get(assets::serve_asset))
        .route("/api/v1/snips", get(api::feed))
        .merge(files);

    if state.config.debug {
        router = router.route("/_debug/pprof/{profile}", get(debug::profile));
    }

    let timeout = state.config.http.request_timeout;
    router
        .fallback(pages::not_found)
        .layer(request_timeout(timeout))
        .layer(middleware::from_fn(log_request))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(record_metrics))
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}
