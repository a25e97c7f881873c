//! The interactive file browser shown to sessions that request a pty.

mod app;
mod input;
mod msg;
mod term;
mod ui;
mod worker;

use std::sync::{Arc, mpsc};

use tokio::sync::mpsc as async_mpsc;
use tracing::{debug, warn};

use crate::app::AppState;
use crate::error::Result;
use crate::ssh::{Input, SessionContext};

use app::App;
use msg::Msg;

const DEFAULT_SIZE: (u16, u16) = (80, 24);

pub async fn run(state: Arc<AppState>, ctx: &mut SessionContext) -> Result<()> {
    let user_id = ctx.user_id()?.to_string();
    let (width, height) = ctx
        .pty
        .as_ref()
        .map_or(DEFAULT_SIZE, |pty| (pty.width, pty.height));

    let (cmd_tx, cmd_rx) = mpsc::channel();
    let (result_tx, mut result_rx) = async_mpsc::unbounded_channel();

    let worker_state = state.clone();
    let worker_user = user_id.clone();
    let worker = tokio::task::spawn_blocking(move || {
        worker::run_worker(&worker_state, &worker_user, cmd_rx, result_tx);
    });

    let mut app = App::new(state.config.clone(), user_id, cmd_tx, width, height);
    let mut terminal = term::open(ctx.output_sender(), width, height)?;

    let result = event_loop(&mut app, &mut terminal, ctx, &mut result_rx).await;

    if let Err(e) = term::close(&mut terminal) {
        warn!(error = %e, "failed to restore terminal");
    }

    // Dropping the app closes the command channel, which ends the worker.
    drop(app);
    if let Err(e) = worker.await {
        warn!(error = %e, "tui worker panicked");
    }

    result
}

async fn event_loop(
    app: &mut App,
    terminal: &mut term::SessionTerminal,
    ctx: &mut SessionContext,
    results: &mut async_mpsc::UnboundedReceiver<Msg>,
) -> Result<()> {
    terminal.draw(|frame| ui::draw(frame, app))?;

    while app.running {
        tokio::select! {
            event = ctx.recv() => match event? {
                Some(Input::Data(bytes)) => {
                    for key in input::parse_keys(&bytes) {
                        app.update(Msg::Key(key));
                        if !app.running {
                            break;
                        }
                    }
                }
                Some(Input::Resize { width, height }) => {
                    term::resize(terminal, width, height)?;
                    app.update(Msg::Resize { width, height });
                }
                Some(Input::Eof) | None => {
                    debug!("client closed input");
                    break;
                }
            },
            Some(msg) = results.recv() => app.update(msg),
        }

        if app.running {
            terminal.draw(|frame| ui::draw(frame, app))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::app::test_support::{create_file, create_user, test_state};
    use crate::ssh::{Output, Pty};

    #[tokio::test]
    async fn test_session_browses_and_quits() {
        let (_temp, state) = test_state();
        let user = create_user(&state, "SHA256:tui");
        let file = create_file(&state, &user.id, b"hello", "text", false);

        let (ctx, io) = SessionContext::new("req", "snips", Vec::new(), Duration::from_secs(5));
        let mut ctx = ctx.with_pty(Some(Pty {
            term: "xterm".to_string(),
            width: 100,
            height: 20,
        }));
        ctx.user_id = Some(user.id);

        let mut output = io.output;
        let input = io.input;
        let session = tokio::spawn(async move {
            let result = run(state, &mut ctx).await;
            (result, ctx)
        });

        // Wait until the file list has been drawn before quitting.
        let mut screen = String::new();
        while !screen.contains(&file.id) {
            match output.recv().await {
                Some(Output::Stdout(bytes)) => screen.push_str(&String::from_utf8_lossy(&bytes)),
                Some(_) => {}
                None => panic!("session ended early"),
            }
        }
        input.send(Input::Data(b"q".to_vec())).await.unwrap();

        let (result, _ctx) = session.await.unwrap();
        result.unwrap();
    }

    #[tokio::test]
    async fn test_requires_bound_user() {
        let (_temp, state) = test_state();
        let (mut ctx, _io) = SessionContext::new("req", "snips", Vec::new(), Duration::from_secs(5));
        assert!(run(state, &mut ctx).await.is_err());
    }
}
