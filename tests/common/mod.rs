#![allow(dead_code)]

pub mod test_server;

use std::sync::Arc;
use std::time::Duration;

use snips::app::AppState;
use snips::config::Config;
use snips::ssh::{Input, Output, SessionContext, run_session};
use snips::store::{SqliteStore, Store};
use tempfile::TempDir;

pub fn test_state(config: Config) -> (TempDir, Arc<AppState>) {
    let temp_dir = TempDir::new().expect("create temp dir");
    let store = SqliteStore::new(temp_dir.path().join("snips.db")).expect("open store");
    store.migrate().expect("migrate");
    (temp_dir, Arc::new(AppState::new(config, Arc::new(store))))
}

/// What a finished non-interactive SSH session wrote back.
pub struct SessionOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: Option<u32>,
}

impl SessionOutput {
    /// The first http(s) URL printed on stdout.
    pub fn url(&self) -> Option<url::Url> {
        self.stdout
            .split_whitespace()
            .find(|word| word.starts_with("http://") || word.starts_with("https://"))
            .and_then(|word| url::Url::parse(word).ok())
    }
}

/// Runs one SSH session as `fingerprint` with `stdin` piped in, the way
/// `echo ... | ssh user@host command` would.
pub async fn ssh(
    state: &Arc<AppState>,
    fingerprint: &str,
    user: &str,
    command: &str,
    stdin: &[u8],
) -> SessionOutput {
    let command = command.split_whitespace().map(String::from).collect();
    let (ctx, mut io) = SessionContext::new("test", user, command, Duration::from_secs(5));
    let ctx = ctx.with_public_key(fingerprint, "ssh-ed25519");

    if !stdin.is_empty() {
        io.input
            .send(Input::Data(stdin.to_vec()))
            .await
            .expect("send stdin");
    }
    io.input.send(Input::Eof).await.expect("send eof");
    run_session(state.clone(), ctx).await;

    let (mut stdout, mut stderr, mut code) = (Vec::new(), Vec::new(), None);
    while let Some(output) = io.output.recv().await {
        match output {
            Output::Stdout(b) => stdout.extend(b),
            Output::Stderr(b) => stderr.extend(b),
            Output::Exit(c) => {
                code = Some(c);
                break;
            }
        }
    }
    SessionOutput {
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        code,
    }
}

/// The id of the only file owned by `fingerprint`.
pub fn only_file_id(state: &AppState, fingerprint: &str) -> String {
    let key = state
        .store
        .find_public_key_by_fingerprint(fingerprint)
        .expect("lookup key")
        .expect("key registered");
    let files = state.store.find_files_by_user(&key.user_id).expect("list files");
    assert_eq!(files.len(), 1);
    files[0].id.clone()
}
