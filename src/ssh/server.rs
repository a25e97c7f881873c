//! russh glue: authenticates keys, tracks channels and turns each shell or
//! exec request into a [`SessionContext`] run by the middleware chain.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::keys::ssh_key::rand_core::OsRng;
use russh::keys::ssh_key::{HashAlg, LineEnding};
use russh::keys::{Algorithm, PrivateKey, PublicKey};
use russh::server::{Auth, Handle, Msg, Server as _, Session};
use russh::{Channel, ChannelId, CryptoVec, MethodSet};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use super::middleware;
use super::session::{Input, Output, Pty, SessionContext};
use crate::app::AppState;
use crate::error::{Error, Result};
use crate::id;

/// Loads the OpenSSH host key at `path`, generating an Ed25519 key there
/// when the file does not exist.
pub fn load_or_generate_host_key(path: &Path) -> Result<PrivateKey> {
    if path.exists() {
        info!(path = %path.display(), "loading host key");
        let data = std::fs::read_to_string(path)?;
        return data
            .parse::<PrivateKey>()
            .map_err(|e| Error::Config(format!("invalid host key {}: {e}", path.display())));
    }

    warn!(path = %path.display(), "host key not found, generating a new one");
    let key = PrivateKey::random(&mut OsRng, Algorithm::Ed25519)
        .map_err(|e| Error::Config(format!("unable to generate host key: {e}")))?;
    let encoded = key
        .to_openssh(LineEnding::LF)
        .map_err(|e| Error::Config(format!("unable to encode host key: {e}")))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, encoded.as_bytes())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(key)
}

/// Fingerprints of the keys listed in an OpenSSH `authorized_keys` file.
pub fn load_authorized_keys(path: &Path) -> Result<HashSet<String>> {
    let data = std::fs::read_to_string(path)?;
    let mut fingerprints = HashSet::new();
    for (n, line) in data.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let key = PublicKey::from_openssh(line).map_err(|e| {
            Error::Config(format!("{}:{}: invalid public key: {e}", path.display(), n + 1))
        })?;
        fingerprints.insert(fingerprint(&key));
    }
    info!(path = %path.display(), keys = fingerprints.len(), "loaded authorized keys");
    Ok(fingerprints)
}

/// SHA-256 fingerprint in the `SHA256:<base64>` form OpenSSH prints.
#[must_use]
pub fn fingerprint(key: &PublicKey) -> String {
    key.fingerprint(HashAlg::Sha256).to_string()
}

/// Accepts SSH connections on `listener` until `shutdown` fires, then waits
/// for open sessions to finish.
pub async fn serve(
    state: Arc<AppState>,
    host_key: PrivateKey,
    listener: TcpListener,
    shutdown: CancellationToken,
) -> Result<()> {
    let config = russh::server::Config {
        inactivity_timeout: None,
        auth_rejection_time: Duration::from_secs(1),
        auth_rejection_time_initial: Some(Duration::from_secs(0)),
        methods: MethodSet::PUBLICKEY | MethodSet::PASSWORD,
        keys: vec![host_key],
        ..Default::default()
    };

    let sessions = TaskTracker::new();
    let mut server = SshServer {
        state,
        sessions: sessions.clone(),
    };

    tokio::select! {
        res = server.run_on_socket(Arc::new(config), &listener) => res?,
        () = shutdown.cancelled() => info!("ssh server shutting down"),
    }

    sessions.close();
    sessions.wait().await;
    Ok(())
}

#[derive(Clone)]
struct SshServer {
    state: Arc<AppState>,
    sessions: TaskTracker,
}

impl russh::server::Server for SshServer {
    type Handler = SshConnection;

    fn new_client(&mut self, addr: Option<SocketAddr>) -> SshConnection {
        debug!(?addr, "new ssh connection");
        SshConnection {
            state: self.state.clone(),
            sessions: self.sessions.clone(),
            addr,
            user: String::new(),
            fingerprint: None,
            key_type: None,
            channels: HashMap::new(),
        }
    }

    fn handle_session_error(&mut self, error: russh::Error) {
        debug!(error = %error, "ssh connection error");
    }
}

#[derive(Default)]
struct ChannelState {
    pty: Option<Pty>,
    input: Option<mpsc::Sender<Input>>,
}

struct SshConnection {
    state: Arc<AppState>,
    sessions: TaskTracker,
    addr: Option<SocketAddr>,
    user: String,
    fingerprint: Option<String>,
    key_type: Option<String>,
    channels: HashMap<ChannelId, ChannelState>,
}

impl SshConnection {
    fn start(
        &mut self,
        channel: ChannelId,
        command: Vec<String>,
        session: &mut Session,
    ) -> std::result::Result<(), russh::Error> {
        let state = self.channels.entry(channel).or_default();
        if state.input.is_some() {
            session.channel_failure(channel)?;
            return Ok(());
        }
        session.channel_success(channel)?;

        let (ctx, io) = SessionContext::new(
            id::must_generate(),
            self.user.clone(),
            command,
            self.state.config.limits.idle_timeout,
        );
        let mut ctx = ctx.with_remote_addr(self.addr).with_pty(state.pty.clone());
        if let (Some(fingerprint), Some(key_type)) = (&self.fingerprint, &self.key_type) {
            ctx = ctx.with_public_key(fingerprint.clone(), key_type.clone());
        }
        state.input = Some(io.input);

        self.sessions
            .spawn(forward_output(session.handle(), channel, io.output));
        self.sessions.spawn(middleware::run(self.state.clone(), ctx));
        Ok(())
    }
}

/// Relays session output to the client until the session exits.
async fn forward_output(handle: Handle, channel: ChannelId, mut output: mpsc::UnboundedReceiver<Output>) {
    while let Some(out) = output.recv().await {
        let sent = match out {
            Output::Stdout(bytes) => handle.data(channel, CryptoVec::from_slice(&bytes)).await,
            Output::Stderr(bytes) => {
                handle
                    .extended_data(channel, 1, CryptoVec::from_slice(&bytes))
                    .await
            }
            Output::Exit(code) => {
                let _ = handle.exit_status_request(channel, code).await;
                let _ = handle.eof(channel).await;
                let _ = handle.close(channel).await;
                return;
            }
        };
        if sent.is_err() {
            debug!(?channel, "client went away");
            return;
        }
    }
}

#[async_trait]
impl russh::server::Handler for SshConnection {
    type Error = russh::Error;

    async fn auth_publickey(&mut self, user: &str, public_key: &PublicKey) -> std::result::Result<Auth, Self::Error> {
        self.user = user.to_string();
        self.fingerprint = Some(fingerprint(public_key));
        self.key_type = Some(public_key.algorithm().to_string());
        Ok(Auth::Accept)
    }

    /// Password sessions are let in so they can be told to use a key.
    async fn auth_password(&mut self, user: &str, _password: &str) -> std::result::Result<Auth, Self::Error> {
        self.user = user.to_string();
        self.fingerprint = None;
        self.key_type = None;
        Ok(Auth::Accept)
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        _session: &mut Session,
    ) -> std::result::Result<bool, Self::Error> {
        self.channels.insert(channel.id(), ChannelState::default());
        Ok(true)
    }

    #[allow(clippy::too_many_arguments)]
    async fn pty_request(
        &mut self,
        channel: ChannelId,
        term: &str,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _modes: &[(russh::Pty, u32)],
        session: &mut Session,
    ) -> std::result::Result<(), Self::Error> {
        let state = self.channels.entry(channel).or_default();
        state.pty = Some(Pty {
            term: term.to_string(),
            width: u16::try_from(col_width).unwrap_or(u16::MAX),
            height: u16::try_from(row_height).unwrap_or(u16::MAX),
        });
        session.channel_success(channel)?;
        Ok(())
    }

    async fn window_change_request(
        &mut self,
        channel: ChannelId,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _session: &mut Session,
    ) -> std::result::Result<(), Self::Error> {
        let width = u16::try_from(col_width).unwrap_or(u16::MAX);
        let height = u16::try_from(row_height).unwrap_or(u16::MAX);
        if let Some(state) = self.channels.get_mut(&channel) {
            if let Some(pty) = &mut state.pty {
                pty.width = width;
                pty.height = height;
            }
            if let Some(input) = &state.input {
                let _ = input.send(Input::Resize { width, height }).await;
            }
        }
        Ok(())
    }

    async fn shell_request(&mut self, channel: ChannelId, session: &mut Session) -> std::result::Result<(), Self::Error> {
        self.start(channel, Vec::new(), session)
    }

    async fn exec_request(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        session: &mut Session,
    ) -> std::result::Result<(), Self::Error> {
        let command = String::from_utf8_lossy(data)
            .split_whitespace()
            .map(String::from)
            .collect();
        self.start(channel, command, session)
    }

    async fn data(&mut self, channel: ChannelId, data: &[u8], _session: &mut Session) -> std::result::Result<(), Self::Error> {
        if let Some(input) = self.channels.get(&channel).and_then(|s| s.input.as_ref()) {
            let _ = input.send(Input::Data(data.to_vec())).await;
        }
        Ok(())
    }

    async fn channel_eof(&mut self, channel: ChannelId, _session: &mut Session) -> std::result::Result<(), Self::Error> {
        if let Some(input) = self.channels.get(&channel).and_then(|s| s.input.as_ref()) {
            let _ = input.send(Input::Eof).await;
        }
        Ok(())
    }

    async fn channel_close(&mut self, channel: ChannelId, _session: &mut Session) -> std::result::Result<(), Self::Error> {
        self.channels.remove(&channel);
        Ok(())
    }
}
