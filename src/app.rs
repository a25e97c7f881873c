use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::signer::Signer;
use crate::store::{SqliteStore, Store};
use crate::{server, ssh};

/// How long in-flight sessions and requests get to finish after a signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Everything a session or request needs: configuration, the store and the
/// URL signer. Shared behind an `Arc` by both listeners.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub signer: Signer,
    /// Contents appended to every page's `<head>`.
    pub extend_head: Option<String>,
    /// Fingerprints allowed to connect. `None` lets every key in.
    pub authorized_fingerprints: Option<HashSet<String>>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn Store>) -> Self {
        let signer = Signer::new(config.hmac_key.as_bytes());
        Self {
            config,
            store,
            signer,
            extend_head: None,
            authorized_fingerprints: None,
        }
    }

    /// Builds the state for a running service, reading the optional
    /// `<head>` extension and authorized keys files named by `config`.
    pub fn load(config: Config, store: Arc<dyn Store>) -> Result<Self> {
        let extend_head = config.extend_head()?;
        let authorized_fingerprints = match &config.ssh.authorized_keys_path {
            Some(path) => Some(ssh::load_authorized_keys(path)?),
            None => None,
        };

        let mut state = Self::new(config, store);
        state.extend_head = extend_head;
        state.authorized_fingerprints = authorized_fingerprints;
        Ok(state)
    }

    /// Whether a key may open sessions.
    #[must_use]
    pub fn is_authorized(&self, fingerprint: &str) -> bool {
        self.authorized_fingerprints
            .as_ref()
            .is_none_or(|allowed| allowed.contains(fingerprint))
    }
}

/// Opens the database and serves SSH and HTTP until SIGINT or SIGTERM.
pub async fn run(config: Config) -> Result<()> {
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = SqliteStore::new(&config.db_path)?;
    store.migrate()?;

    let host_key = ssh::load_or_generate_host_key(&config.ssh.host_key_path)?;
    let state = Arc::new(AppState::load(config, Arc::new(store))?);

    let http_addr = state.config.http_listen_addr()?;
    let ssh_addr = state.config.ssh_listen_addr()?;
    let http_listener = TcpListener::bind(&http_addr).await?;
    let ssh_listener = TcpListener::bind(&ssh_addr).await?;
    info!(addr = %http_addr, "http listening");
    info!(addr = %ssh_addr, "ssh listening");

    let shutdown = CancellationToken::new();

    let mut servers = JoinSet::new();
    servers.spawn(server::serve(state.clone(), http_listener, shutdown.clone()));
    servers.spawn(ssh::serve(
        state.clone(),
        host_key,
        ssh_listener,
        shutdown.clone(),
    ));

    tokio::select! {
        () = shutdown_signal() => info!("shutdown signal received"),
        Some(res) = servers.join_next() => warn!(result = ?res, "listener exited early"),
    }
    shutdown.cancel();

    let drain = async {
        while let Some(res) = servers.join_next().await {
            if let Ok(Err(e)) = res {
                warn!(error = %e, "listener stopped with error");
            }
        }
    };
    if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
        warn!("shutdown grace period elapsed");
    }

    state.store.close()?;
    info!("goodbye");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use chrono::Utc;
    use tempfile::TempDir;

    use super::AppState;
    use crate::config::Config;
    use crate::store::{SqliteStore, Store};
    use crate::types::{File, PublicKey, User};

    pub(crate) fn test_state() -> (TempDir, Arc<AppState>) {
        test_state_with(Config::default())
    }

    pub(crate) fn test_state_with(config: Config) -> (TempDir, Arc<AppState>) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.migrate().unwrap();
        (temp, Arc::new(AppState::new(config, Arc::new(store))))
    }

    pub(crate) fn create_user(state: &AppState, fingerprint: &str) -> User {
        let now = Utc::now();
        state
            .store
            .create_user_with_public_key(&mut PublicKey {
                id: String::new(),
                created_at: now,
                updated_at: now,
                fingerprint: fingerprint.to_string(),
                key_type: "ssh-ed25519".to_string(),
                user_id: String::new(),
            })
            .unwrap()
    }

    pub(crate) fn create_file(
        state: &AppState,
        user_id: &str,
        content: &[u8],
        file_type: &str,
        private: bool,
    ) -> File {
        let mut file = File::new(user_id);
        file.file_type = file_type.to_string();
        file.private = private;
        file.set_content(content, true).unwrap();
        state.store.create_file(&mut file, 0).unwrap();
        file
    }
}
