//! Store work for the TUI. Commands run one at a time, in the order they
//! were sent, on a blocking thread; each produces exactly one [`Msg`].

use std::sync::mpsc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use super::msg::{LoadedFile, Msg};
use crate::actions;
use crate::app::AppState;
use crate::error::{Error, Result};
use crate::renderer::styled_lines;
use crate::types::File;

#[derive(Debug, Clone)]
pub enum WorkerCommand {
    LoadFile { id: String },
    ReloadFiles,
    ChangeExtension { id: String, extension: String },
    SetVisibility { id: String, private: bool },
    SignUrl { id: String, ttl: Duration },
    DeleteFile { id: String },
}

pub fn run_worker(
    state: &AppState,
    user_id: &str,
    cmd_rx: mpsc::Receiver<WorkerCommand>,
    result_tx: UnboundedSender<Msg>,
) {
    while let Ok(cmd) = cmd_rx.recv() {
        debug!(?cmd, "tui command");
        if result_tx.send(execute(state, user_id, cmd)).is_err() {
            break;
        }
    }
}

pub fn execute(state: &AppState, user_id: &str, cmd: WorkerCommand) -> Msg {
    match cmd {
        WorkerCommand::LoadFile { id } => do_load_file(state, user_id, &id),
        WorkerCommand::ReloadFiles => do_reload_files(state, user_id),
        WorkerCommand::ChangeExtension { id, extension } => {
            let result = owned_file(state, user_id, &id).and_then(|mut file| {
                match actions::change_extension(state, &mut file, &extension)? {
                    Some(old) => Ok(format!("file type changed from {old} to {}", file.file_type)),
                    None => Ok(format!("file type is already {}", file.file_type)),
                }
            });
            finish_prompt(state, user_id, result)
        }
        WorkerCommand::SetVisibility { id, private } => {
            let result = owned_file(state, user_id, &id).and_then(|mut file| {
                actions::set_visibility(state, &mut file, private)?;
                Ok(format!("{} is now {}", file.id, file.visibility()))
            });
            finish_prompt(state, user_id, result)
        }
        WorkerCommand::SignUrl { id, ttl } => {
            let result = owned_file(state, user_id, &id).and_then(|file| {
                let (url, expires_at) = actions::sign_file(state, &file, ttl)?;
                Ok(format!("{url}\nexpires at: {}", expires_at.to_rfc3339()))
            });
            finish_prompt(state, user_id, result)
        }
        WorkerCommand::DeleteFile { id } => {
            let result = owned_file(state, user_id, &id).and_then(|file| {
                actions::delete_file(state, &file)?;
                Ok(format!("{} deleted", file.id))
            });
            finish_prompt(state, user_id, result)
        }
    }
}

fn owned_file(state: &AppState, user_id: &str, id: &str) -> Result<File> {
    match state.store.find_file(id)? {
        Some(file) if file.is_owned_by(user_id) => Ok(file),
        Some(_) => {
            warn!(file_id = %id, error = %Error::NotOwned, "tui action rejected");
            Err(Error::FileNotFound)
        }
        None => Err(Error::FileNotFound),
    }
}

fn do_load_file(state: &AppState, user_id: &str, id: &str) -> Msg {
    let loaded = owned_file(state, user_id, id).and_then(|file| {
        let content = file.get_content()?;
        let lines = styled_lines(&file.file_type, &content)?;
        Ok(LoadedFile { file, lines })
    });
    match loaded {
        Ok(loaded) => Msg::FileLoaded(Box::new(loaded)),
        Err(e) => Msg::Error(format!("unable to load file {id}: {e}")),
    }
}

fn do_reload_files(state: &AppState, user_id: &str) -> Msg {
    match state.store.find_files_by_user(user_id) {
        Ok(files) => Msg::ReloadFiles { files },
        Err(e) => Msg::Error(format!("unable to load files: {e}")),
    }
}

/// Feedback plus a fresh file list on success. Mistakes the user can fix
/// stay in the prompt; anything else ends the session.
fn finish_prompt(state: &AppState, user_id: &str, result: Result<String>) -> Msg {
    match result {
        Ok(feedback) => Msg::Batch(vec![
            Msg::PromptFeedback(feedback),
            do_reload_files(state, user_id),
        ]),
        Err(e) if e.is_user_error() => Msg::PromptError(e.to_string()),
        Err(e) => Msg::Error(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::{create_file, create_user, test_state};

    #[test]
    fn test_load_file_highlights() {
        let (_temp, state) = test_state();
        let owner = create_user(&state, "SHA256:owner").id;
        let file = create_file(&state, &owner, b"fn main() {}\n", "rust", false);

        match execute(&state, &owner, WorkerCommand::LoadFile { id: file.id.clone() }) {
            Msg::FileLoaded(loaded) => {
                assert_eq!(loaded.file.id, file.id);
                assert_eq!(loaded.lines.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_other_users_file_is_not_loaded() {
        let (_temp, state) = test_state();
        let owner = create_user(&state, "SHA256:owner").id;
        let other = create_user(&state, "SHA256:other").id;
        let file = create_file(&state, &owner, b"secret", "text", true);

        assert!(matches!(
            execute(&state, &other, WorkerCommand::LoadFile { id: file.id.clone() }),
            Msg::Error(_)
        ));
        assert!(matches!(
            execute(&state, &other, WorkerCommand::DeleteFile { id: file.id.clone() }),
            Msg::PromptError(e) if e == "file not found"
        ));
        assert!(state.store.find_file(&file.id).unwrap().is_some());
    }

    #[test]
    fn test_mutation_reloads_files() {
        let (_temp, state) = test_state();
        let owner = create_user(&state, "SHA256:owner").id;
        let file = create_file(&state, &owner, b"hello", "text", false);

        let msg = execute(
            &state,
            &owner,
            WorkerCommand::SetVisibility {
                id: file.id.clone(),
                private: true,
            },
        );
        let Msg::Batch(msgs) = msg else {
            panic!("expected batch");
        };
        assert!(matches!(&msgs[0], Msg::PromptFeedback(f) if f.ends_with("is now private")));
        assert!(matches!(&msgs[1], Msg::ReloadFiles { files } if files[0].private));
    }

    #[test]
    fn test_sign_public_file_is_prompt_error() {
        let (_temp, state) = test_state();
        let owner = create_user(&state, "SHA256:owner").id;
        let file = create_file(&state, &owner, b"hello", "text", false);

        assert!(matches!(
            execute(
                &state,
                &owner,
                WorkerCommand::SignUrl {
                    id: file.id,
                    ttl: Duration::from_secs(60),
                }
            ),
            Msg::PromptError(e) if e == "unable to sign public file"
        ));
    }

    #[test]
    fn test_worker_preserves_order() {
        let (_temp, state) = test_state();
        let owner = create_user(&state, "SHA256:owner").id;
        let file = create_file(&state, &owner, b"hello", "text", false);

        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (result_tx, mut result_rx) = tokio::sync::mpsc::unbounded_channel();
        cmd_tx
            .send(WorkerCommand::DeleteFile { id: file.id.clone() })
            .unwrap();
        cmd_tx.send(WorkerCommand::ReloadFiles).unwrap();
        drop(cmd_tx);

        run_worker(&state, &owner, cmd_rx, result_tx);

        assert!(matches!(result_rx.try_recv().unwrap(), Msg::Batch(_)));
        assert!(matches!(
            result_rx.try_recv().unwrap(),
            Msg::ReloadFiles { files } if files.is_empty()
        ));
    }
}
