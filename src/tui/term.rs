use std::io;

use ratatui::backend::CrosstermBackend;
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::layout::Rect;
use ratatui::{Terminal, TerminalOptions, Viewport};
use tokio::sync::mpsc::UnboundedSender;

use crate::ssh::Output;

pub type SessionTerminal = Terminal<CrosstermBackend<SessionWriter>>;

/// Buffers terminal escape output and hands it to the SSH channel on flush.
pub struct SessionWriter {
    buf: Vec<u8>,
    output: UnboundedSender<Output>,
}

impl SessionWriter {
    pub fn new(output: UnboundedSender<Output>) -> Self {
        Self {
            buf: Vec::with_capacity(8 * 1024),
            output,
        }
    }
}

impl io::Write for SessionWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let frame = std::mem::take(&mut self.buf);
        self.output
            .send(Output::Stdout(frame))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "session closed"))
    }
}

/// A terminal sized to the client's pty. The viewport is fixed because the
/// size comes from pty requests, not from the local process.
pub fn open(output: UnboundedSender<Output>, width: u16, height: u16) -> io::Result<SessionTerminal> {
    let mut backend = CrosstermBackend::new(SessionWriter::new(output));
    execute!(backend, EnterAlternateScreen)?;
    let mut terminal = Terminal::with_options(
        backend,
        TerminalOptions {
            viewport: Viewport::Fixed(Rect::new(0, 0, width, height)),
        },
    )?;
    terminal.clear()?;
    terminal.hide_cursor()?;
    Ok(terminal)
}

pub fn resize(terminal: &mut SessionTerminal, width: u16, height: u16) -> io::Result<()> {
    terminal.resize(Rect::new(0, 0, width, height))
}

pub fn close(terminal: &mut SessionTerminal) -> io::Result<()> {
    terminal.show_cursor()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
}
