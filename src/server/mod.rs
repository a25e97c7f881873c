mod api;
mod assets;
mod debug;
mod files;
mod middleware;
mod pages;
pub mod response;
mod router;
mod templates;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use api::{FEED_PAGE_SIZE, FeedFile};
pub use middleware::REQUEST_ID_HEADER;
pub use router::create_router;

use crate::app::AppState;
use crate::error::Result;

/// Serves HTTP on `listener` until `shutdown` fires, then lets in-flight
/// requests finish.
pub async fn serve(
    state: Arc<AppState>,
    listener: TcpListener,
    shutdown: CancellationToken,
) -> Result<()> {
    let router = create_router(state);
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown.cancelled_owned())
    .await?;
    Ok(())
}
