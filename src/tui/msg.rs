use ratatui::crossterm::event::KeyEvent;

use crate::renderer::Segment;
use crate::types::File;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Browser,
    Code,
    Prompt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    ChangeExtension,
    ChangeVisibility,
    GenerateSignedUrl,
    DeleteFile,
}

/// A file with its content highlighted for the code view.
#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub file: File,
    pub lines: Vec<Vec<Segment>>,
}

/// Everything that can change the interface state. Terminal input arrives
/// as `Key` and `Resize`; the rest are produced by views or by commands
/// finishing on the worker.
#[derive(Debug, Clone)]
pub enum Msg {
    Key(KeyEvent),
    Resize { width: u16, height: u16 },
    FileSelected { id: String },
    FileLoaded(Box<LoadedFile>),
    FileDeselected,
    ReloadFiles { files: Vec<File> },
    PushView(ViewKind),
    PopView,
    /// Unrecoverable; logged and ends the session.
    Error(String),
    PromptKindSet(PromptKind),
    PromptError(String),
    /// Outcome of a finished prompt, shown in place of the question.
    PromptFeedback(String),
    Batch(Vec<Msg>),
}
