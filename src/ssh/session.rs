//! Transport-free view of one SSH session. The russh handler feeds client
//! input in and drains output out; everything above it (middleware,
//! uploads, file actions, the TUI) only talks to [`SessionContext`].

use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// Bytes and events coming from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Data(Vec<u8>),
    Resize { width: u16, height: u16 },
    Eof,
}

/// What the session sends back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
    Exit(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pty {
    pub term: String,
    pub width: u16,
    pub height: u16,
}

/// The client side of a session's channels.
pub struct SessionIo {
    pub input: mpsc::Sender<Input>,
    pub output: mpsc::UnboundedReceiver<Output>,
}

pub struct SessionContext {
    pub request_id: String,
    pub remote_addr: Option<SocketAddr>,
    /// The SSH user name, e.g. `f:abc123` for file actions.
    pub user: String,
    /// Words of the exec command, empty for a shell.
    pub command: Vec<String>,
    /// SHA-256 fingerprint of the authenticated key, if any.
    pub fingerprint: Option<String>,
    pub key_type: Option<String>,
    pub pty: Option<Pty>,
    /// Set by the auth binder once the key is bound to a user.
    pub user_id: Option<String>,
    idle_timeout: Duration,
    eof: bool,
    input: mpsc::Receiver<Input>,
    output: mpsc::UnboundedSender<Output>,
}

impl SessionContext {
    pub fn new(
        request_id: impl Into<String>,
        user: impl Into<String>,
        command: Vec<String>,
        idle_timeout: Duration,
    ) -> (Self, SessionIo) {
        let (input_tx, input_rx) = mpsc::channel(64);
        let (output_tx, output_rx) = mpsc::unbounded_channel();
        let ctx = Self {
            request_id: request_id.into(),
            remote_addr: None,
            user: user.into(),
            command,
            fingerprint: None,
            key_type: None,
            pty: None,
            user_id: None,
            idle_timeout,
            eof: false,
            input: input_rx,
            output: output_tx,
        };
        let io = SessionIo {
            input: input_tx,
            output: output_rx,
        };
        (ctx, io)
    }

    #[must_use]
    pub fn with_remote_addr(mut self, addr: Option<SocketAddr>) -> Self {
        self.remote_addr = addr;
        self
    }

    #[must_use]
    pub fn with_public_key(mut self, fingerprint: impl Into<String>, key_type: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self.key_type = Some(key_type.into());
        self
    }

    #[must_use]
    pub fn with_pty(mut self, pty: Option<Pty>) -> Self {
        self.pty = pty;
        self
    }

    /// The user id bound by the auth binder.
    pub fn user_id(&self) -> Result<&str> {
        self.user_id.as_deref().ok_or(Error::Unauthorized)
    }

    /// Next input event. Fails with [`Error::IdleTimeout`] when the client
    /// stays silent for longer than the idle timeout; `None` once the
    /// client has gone away.
    pub async fn recv(&mut self) -> Result<Option<Input>> {
        if self.eof {
            return Ok(None);
        }
        let input = tokio::time::timeout(self.idle_timeout, self.input.recv())
            .await
            .map_err(|_| Error::IdleTimeout)?;

        match input {
            Some(Input::Resize { width, height }) => {
                if let Some(pty) = &mut self.pty {
                    pty.width = width;
                    pty.height = height;
                }
                Ok(Some(Input::Resize { width, height }))
            }
            Some(Input::Eof) | None => {
                self.eof = true;
                Ok(Some(Input::Eof))
            }
            Some(data) => Ok(Some(data)),
        }
    }

    /// Next chunk of stdin, `None` at end of input.
    pub async fn read(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            match self.recv().await? {
                Some(Input::Data(data)) => return Ok(Some(data)),
                Some(Input::Resize { .. }) => continue,
                Some(Input::Eof) | None => return Ok(None),
            }
        }
    }

    /// Writes bytes to stdout untouched.
    pub fn write_raw(&self, bytes: impl Into<Vec<u8>>) {
        let _ = self.output.send(Output::Stdout(bytes.into()));
    }

    /// Writes text to stdout, translating newlines when a terminal is
    /// attached.
    pub fn print(&self, text: &str) {
        self.write_raw(self.terminal_text(text));
    }

    pub fn eprint(&self, text: &str) {
        let _ = self.output.send(Output::Stderr(self.terminal_text(text)));
    }

    pub fn exit(&self, code: u32) {
        let _ = self.output.send(Output::Exit(code));
    }

    fn terminal_text(&self, text: &str) -> Vec<u8> {
        if self.pty.is_none() {
            return text.as_bytes().to_vec();
        }
        let mut out = Vec::with_capacity(text.len() + 16);
        let mut prev = 0u8;
        for &b in text.as_bytes() {
            if b == b'\n' && prev != b'\r' {
                out.push(b'\r');
            }
            out.push(b);
            prev = b;
        }
        out
    }

    /// A sender for output produced away from the session task, such as
    /// terminal frames drawn by the TUI.
    pub(crate) fn output_sender(&self) -> mpsc::UnboundedSender<Output> {
        self.output.clone()
    }
}
