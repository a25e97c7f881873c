use std::sync::mpsc;

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, error};

use super::msg::{LoadedFile, Msg, PromptKind, ViewKind};
use super::worker::WorkerCommand;
use crate::actions::normalize_extension;
use crate::config::Config;
use crate::renderer::lexer::find_lexer;
use crate::timeutil::parse_duration;
use crate::types::File;

/// Rows taken by the title, the list borders, the footer and the help bar.
const BROWSER_CHROME_ROWS: u16 = 6;
const CODE_CHROME_ROWS: u16 = 4;
pub const DETAILS_MIN_WIDTH: u16 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserOption {
    EditExtension,
    GenerateSignedUrl,
    ToggleVisibility,
    DeleteFile,
}

impl BrowserOption {
    const ALL: [BrowserOption; 4] = [
        BrowserOption::EditExtension,
        BrowserOption::GenerateSignedUrl,
        BrowserOption::ToggleVisibility,
        BrowserOption::DeleteFile,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            BrowserOption::EditExtension => "edit extension",
            BrowserOption::GenerateSignedUrl => "generate signed url",
            BrowserOption::ToggleVisibility => "toggle visibility",
            BrowserOption::DeleteFile => "delete file",
        }
    }

    #[must_use]
    pub fn is_dangerous(self) -> bool {
        self == BrowserOption::DeleteFile
    }

    fn prompt(self) -> PromptKind {
        match self {
            BrowserOption::EditExtension => PromptKind::ChangeExtension,
            BrowserOption::GenerateSignedUrl => PromptKind::GenerateSignedUrl,
            BrowserOption::ToggleVisibility => PromptKind::ChangeVisibility,
            BrowserOption::DeleteFile => PromptKind::DeleteFile,
        }
    }

    /// Binary files cannot change type and public files need no signature.
    fn applies_to(self, file: &File) -> bool {
        match self {
            BrowserOption::EditExtension => !file.is_binary(),
            BrowserOption::GenerateSignedUrl => file.private,
            BrowserOption::ToggleVisibility | BrowserOption::DeleteFile => true,
        }
    }
}

#[derive(Debug, Default)]
pub struct Browser {
    pub files: Vec<File>,
    pub selected: usize,
    pub options_focused: bool,
    pub option_index: usize,
}

impl Browser {
    #[must_use]
    pub fn selected_file(&self) -> Option<&File> {
        self.files.get(self.selected)
    }

    #[must_use]
    pub fn options(&self) -> Vec<BrowserOption> {
        match self.selected_file() {
            Some(file) => BrowserOption::ALL
                .into_iter()
                .filter(|o| o.applies_to(file))
                .collect(),
            None => Vec::new(),
        }
    }

    fn set_files(&mut self, files: Vec<File>) {
        self.files = files;
        if self.selected >= self.files.len() {
            self.selected = self.files.len().saturating_sub(1);
        }
        if self.files.is_empty() {
            self.options_focused = false;
        }
        self.option_index = 0;
    }

    fn move_by(&mut self, delta: isize) {
        if self.files.is_empty() {
            return;
        }
        let last = self.files.len() - 1;
        self.selected = self.selected.saturating_add_signed(delta).min(last);
        self.option_index = 0;
    }
}

#[derive(Debug, Default)]
pub struct Prompt {
    pub kind: Option<PromptKind>,
    pub file: Option<File>,
    pub input: String,
    pub error: Option<String>,
    pub feedback: Option<String>,
    pub finished: bool,
    pub pending: bool,
}

impl Prompt {
    #[must_use]
    pub fn question(&self) -> String {
        let (Some(kind), Some(file)) = (self.kind, &self.file) else {
            return String::new();
        };
        match kind {
            PromptKind::ChangeExtension => {
                "What extension do you want to change the file to?".to_string()
            }
            PromptKind::ChangeVisibility => format!(
                "Do you want to make {:?} {}? (y/n)",
                file.id,
                if file.private { "public" } else { "private" }
            ),
            PromptKind::GenerateSignedUrl => format!(
                "How long do you want the signed url for {:?} to last for? (e.g. 30s, 5m, 3h)",
                file.id
            ),
            PromptKind::DeleteFile => format!(
                "Are you sure you want to delete {:?}? Type the file ID to confirm.",
                file.id
            ),
        }
    }
}

/// Interface state for one interactive session. Key presses and worker
/// results come in as [`Msg`]s; store work goes out as [`WorkerCommand`]s.
pub struct App {
    pub running: bool,
    pub width: u16,
    pub height: u16,
    pub user_id: String,
    pub config: Config,
    pub views: Vec<ViewKind>,
    pub browser: Browser,
    pub code: Option<LoadedFile>,
    pub code_offset: usize,
    pub prompt: Prompt,
    /// Why the session ended, when it ended on an error.
    pub error: Option<String>,
    cmd_tx: mpsc::Sender<WorkerCommand>,
}

impl App {
    pub fn new(
        config: Config,
        user_id: impl Into<String>,
        cmd_tx: mpsc::Sender<WorkerCommand>,
        width: u16,
        height: u16,
    ) -> Self {
        let mut app = Self {
            running: true,
            width,
            height,
            user_id: user_id.into(),
            config,
            views: vec![ViewKind::Browser],
            browser: Browser::default(),
            code: None,
            code_offset: 0,
            prompt: Prompt::default(),
            error: None,
            cmd_tx,
        };
        app.send_command(WorkerCommand::ReloadFiles);
        app
    }

    #[must_use]
    pub fn current_view(&self) -> ViewKind {
        self.views.last().copied().unwrap_or(ViewKind::Browser)
    }

    #[must_use]
    pub fn show_details(&self) -> bool {
        self.width >= DETAILS_MIN_WIDTH
    }

    fn quit(&mut self) {
        self.running = false;
    }

    fn send_command(&mut self, cmd: WorkerCommand) -> bool {
        match self.cmd_tx.send(cmd) {
            Ok(()) => true,
            Err(_) => {
                self.update(Msg::Error("worker disconnected".to_string()));
                false
            }
        }
    }

    pub fn update(&mut self, msg: Msg) {
        match msg {
            Msg::Key(key) => self.handle_key_event(key),
            Msg::Resize { width, height } => {
                self.width = width;
                self.height = height;
            }
            Msg::FileSelected { id } => {
                self.code = None;
                self.code_offset = 0;
                self.send_command(WorkerCommand::LoadFile { id });
            }
            Msg::FileLoaded(loaded) => {
                self.code = Some(*loaded);
                self.code_offset = 0;
            }
            Msg::FileDeselected => {
                self.code = None;
                self.code_offset = 0;
            }
            Msg::ReloadFiles { files } => {
                self.browser.set_files(files);
                self.code = None;
            }
            Msg::PushView(view) => self.views.push(view),
            Msg::PopView => self.pop_view(),
            Msg::Error(message) => {
                error!(error = %message, "tui error");
                self.error = Some(message);
                self.quit();
            }
            Msg::PromptKindSet(kind) => {
                self.prompt = Prompt {
                    kind: Some(kind),
                    file: self.browser.selected_file().cloned(),
                    ..Prompt::default()
                };
            }
            Msg::PromptError(message) => {
                self.prompt.pending = false;
                self.prompt.error = Some(message);
            }
            Msg::PromptFeedback(feedback) => {
                self.prompt.pending = false;
                self.prompt.error = None;
                self.prompt.feedback = Some(feedback);
                self.prompt.finished = true;
            }
            Msg::Batch(msgs) => {
                for msg in msgs {
                    self.update(msg);
                }
            }
        }
    }

    fn pop_view(&mut self) {
        if self.views.len() <= 1 {
            return;
        }
        if self.views.pop() == Some(ViewKind::Prompt) {
            self.prompt = Prompt::default();
        }
        if self.current_view() == ViewKind::Browser {
            self.update(Msg::FileDeselected);
        }
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit();
            return;
        }

        let view = self.current_view();
        match key.code {
            KeyCode::Char('q') if view != ViewKind::Prompt => self.quit(),
            KeyCode::Esc => {
                if view == ViewKind::Browser && self.browser.options_focused {
                    self.browser.options_focused = false;
                } else if self.views.len() == 1 {
                    self.quit();
                } else {
                    self.update(Msg::PopView);
                }
            }
            _ => match view {
                ViewKind::Browser => self.handle_browser_key(key),
                ViewKind::Code => self.handle_code_key(key),
                ViewKind::Prompt => self.handle_prompt_key(key),
            },
        }
    }

    fn page_rows(&self, chrome: u16) -> usize {
        usize::from(self.height.saturating_sub(chrome).max(1))
    }

    fn handle_browser_key(&mut self, key: KeyEvent) {
        if self.browser.options_focused {
            self.handle_options_key(key);
            return;
        }

        let page = self.page_rows(BROWSER_CHROME_ROWS) as isize;
        match key.code {
            KeyCode::Char('k') | KeyCode::Up => self.browser.move_by(-1),
            KeyCode::Char('j') | KeyCode::Down => self.browser.move_by(1),
            KeyCode::Char('l') | KeyCode::Right | KeyCode::PageDown => self.browser.move_by(page),
            KeyCode::Char('h') | KeyCode::Left | KeyCode::PageUp => self.browser.move_by(-page),
            KeyCode::Enter => {
                if let Some(file) = self.browser.selected_file() {
                    let id = file.id.clone();
                    self.update(Msg::Batch(vec![
                        Msg::FileSelected { id },
                        Msg::PushView(ViewKind::Code),
                    ]));
                }
            }
            KeyCode::Tab => {
                if self.browser.selected_file().is_some() {
                    self.browser.options_focused = true;
                    self.browser.option_index = 0;
                }
            }
            _ => {}
        }
    }

    fn handle_options_key(&mut self, key: KeyEvent) {
        let options = self.browser.options();
        if options.is_empty() {
            self.browser.options_focused = false;
            return;
        }

        match key.code {
            KeyCode::Char('k') | KeyCode::Up => {
                self.browser.option_index =
                    (self.browser.option_index + options.len() - 1) % options.len();
            }
            KeyCode::Char('j') | KeyCode::Down => {
                self.browser.option_index = (self.browser.option_index + 1) % options.len();
            }
            KeyCode::Tab => self.browser.options_focused = false,
            KeyCode::Enter => {
                let option = options[self.browser.option_index.min(options.len() - 1)];
                if let Some(file) = self.browser.selected_file() {
                    let id = file.id.clone();
                    debug!(file_id = %id, option = option.label(), "option selected");
                    self.browser.options_focused = false;
                    self.update(Msg::Batch(vec![
                        Msg::FileSelected { id },
                        Msg::PromptKindSet(option.prompt()),
                        Msg::PushView(ViewKind::Prompt),
                    ]));
                }
            }
            _ => {}
        }
    }

    fn handle_code_key(&mut self, key: KeyEvent) {
        let total = self.code.as_ref().map_or(0, |c| c.lines.len());
        let page = self.page_rows(CODE_CHROME_ROWS);
        let max_offset = total.saturating_sub(page);

        self.code_offset = match key.code {
            KeyCode::Char('k') | KeyCode::Up => self.code_offset.saturating_sub(1),
            KeyCode::Char('j') | KeyCode::Down => self.code_offset + 1,
            KeyCode::PageUp | KeyCode::Char('b') => self.code_offset.saturating_sub(page),
            KeyCode::PageDown | KeyCode::Char(' ') | KeyCode::Char('f') => self.code_offset + page,
            KeyCode::Home | KeyCode::Char('g') => 0,
            KeyCode::End | KeyCode::Char('G') => max_offset,
            _ => self.code_offset,
        }
        .min(max_offset);
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        if self.prompt.finished {
            if key.code == KeyCode::Enter {
                self.update(Msg::PopView);
            }
            return;
        }
        if self.prompt.pending {
            return;
        }

        match key.code {
            KeyCode::Char(c) => self.prompt.input.push(c),
            KeyCode::Backspace => {
                self.prompt.input.pop();
            }
            KeyCode::Enter => self.submit_prompt(),
            _ => {}
        }
    }

    fn submit_prompt(&mut self) {
        let (Some(kind), Some(file)) = (self.prompt.kind, self.prompt.file.clone()) else {
            return;
        };
        let input = self.prompt.input.trim().to_string();

        let cmd = match kind {
            PromptKind::ChangeExtension => {
                let extension = normalize_extension(&input);
                if find_lexer(&extension).is_none() {
                    self.update(Msg::PromptError(format!("unknown extension {input:?}")));
                    return;
                }
                WorkerCommand::ChangeExtension {
                    id: file.id,
                    extension,
                }
            }
            PromptKind::ChangeVisibility => match input.to_lowercase().as_str() {
                "y" | "yes" => WorkerCommand::SetVisibility {
                    id: file.id,
                    private: !file.private,
                },
                "n" | "no" => {
                    self.update(Msg::PopView);
                    return;
                }
                _ => {
                    self.update(Msg::PromptError("please specify yes or no".to_string()));
                    return;
                }
            },
            PromptKind::GenerateSignedUrl => match parse_duration(&input) {
                Ok(ttl) if !ttl.is_zero() => WorkerCommand::SignUrl { id: file.id, ttl },
                _ => {
                    self.update(Msg::PromptError(
                        "please specify a duration longer than zero".to_string(),
                    ));
                    return;
                }
            },
            PromptKind::DeleteFile => {
                if input != file.id {
                    self.update(Msg::PromptError(
                        "please specify the file id to confirm".to_string(),
                    ));
                    return;
                }
                WorkerCommand::DeleteFile { id: file.id }
            }
        };

        self.prompt.error = None;
        self.prompt.pending = self.send_command(cmd);
    }
}
