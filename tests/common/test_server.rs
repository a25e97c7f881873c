use std::net::SocketAddr;
use std::sync::Arc;

use snips::app::AppState;
use snips::config::Config;
use snips::server;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// The HTTP service on an ephemeral local port, with its external URL
/// pointing at that port so signed links round-trip.
pub struct TestServer {
    pub temp_dir: TempDir,
    pub base_url: String,
    pub state: Arc<AppState>,
    shutdown: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(Config::default()).await
    }

    pub async fn start_with(mut config: Config) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr: SocketAddr = listener.local_addr().expect("local addr");
        let base_url = format!("http://{addr}");
        config.http.external = base_url.parse().expect("external url");

        let (temp_dir, state) = super::test_state(config);
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn({
            let state = state.clone();
            let shutdown = shutdown.clone();
            async move {
                server::serve(state, listener, shutdown)
                    .await
                    .expect("serve");
            }
        });

        Self::wait_for_ready(&base_url).await;

        Self {
            temp_dir,
            base_url,
            state,
            shutdown,
            handle: Some(handle),
        }
    }

    async fn wait_for_ready(base_url: &str) {
        let client = reqwest::Client::new();
        for _ in 0..50 {
            if client
                .get(format!("{base_url}/health"))
                .send()
                .await
                .is_ok()
            {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
        panic!("Server did not become ready");
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn stop(mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.handle.take() {
            handle.await.expect("server task");
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
