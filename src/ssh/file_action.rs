//! Commands run against one file with `ssh f:<id>@host <command>`.

use tracing::{info, warn};

use super::confirm::confirm;
use super::flags::{DeleteFlags, SignFlags};
use super::notify::{self, Details};
use super::session::SessionContext;
use crate::actions;
use crate::app::AppState;
use crate::error::{Error, Result};
use crate::renderer::to_syntax_highlighted_term;
use crate::stats::{self, Counter};
use crate::timeutil::human_time;
use crate::types::File;

pub const FILE_USER_PREFIX: &str = "f:";

pub async fn handle(state: &AppState, ctx: &mut SessionContext) -> Result<()> {
    let file_id = ctx
        .user
        .strip_prefix(FILE_USER_PREFIX)
        .unwrap_or_default()
        .to_string();
    let user_id = ctx.user_id()?.to_string();

    let mut file = match state.store.find_file(&file_id)? {
        Some(file) if file.is_owned_by(&user_id) => file,
        Some(_) => {
            // Reported as missing so ids of other users' files are not confirmed.
            warn!(file_id = %file_id, error = %Error::NotOwned, "file action rejected");
            return Err(Error::FileNotFound);
        }
        None => return Err(Error::FileNotFound),
    };

    stats::incr(Counter::SshFileActions);

    let command = ctx.command.first().cloned().unwrap_or_default();
    let args: Vec<String> = ctx.command.iter().skip(1).cloned().collect();
    info!(file_id = %file.id, command = %command, "file action");

    match command.as_str() {
        "" | "cat" => cat(ctx, &file),
        "rm" => delete(state, ctx, &file, &args).await,
        "sign" => sign(state, ctx, &file, &args),
        "private" => visibility(state, ctx, &mut file, true),
        "public" => visibility(state, ctx, &mut file, false),
        "ext" => extension(state, ctx, &mut file, &args),
        other => Err(Error::UnknownCommand(other.to_string())),
    }
}

fn cat(ctx: &SessionContext, file: &File) -> Result<()> {
    let content = file.get_content()?;
    if ctx.pty.is_some() {
        ctx.print(&to_syntax_highlighted_term(&file.file_type, &content)?);
    } else {
        ctx.write_raw(content);
    }
    Ok(())
}

async fn delete(
    state: &AppState,
    ctx: &mut SessionContext,
    file: &File,
    args: &[String],
) -> Result<()> {
    let flags = DeleteFlags::parse_args(args)?;
    if !flags.force {
        ctx.print(&notify::warning(&format!(
            "Are you sure you want to delete {}?",
            file.id
        )));
        if !confirm(ctx, "Delete").await? {
            ctx.print(&notify::hint("Cancelled, nothing was deleted."));
            return Ok(());
        }
    }

    actions::delete_file(state, file)?;
    ctx.print(&notify::success(&format!("Deleted {}", file.id)));
    Ok(())
}

fn sign(state: &AppState, ctx: &SessionContext, file: &File, args: &[String]) -> Result<()> {
    let ttl = SignFlags::parse_ttl(args)?;
    let (url, expires_at) = actions::sign_file(state, file, ttl)?;

    let details = Details::default()
        .row(
            "⏰ Expires",
            format!("{} ({})", expires_at.to_rfc3339(), human_time(expires_at)),
        )
        .row("🔗 URL", url.to_string());
    ctx.print(&format!(
        "{}\n{}",
        notify::success("Signed URL Generated!"),
        details.render()
    ));
    Ok(())
}

fn visibility(
    state: &AppState,
    ctx: &SessionContext,
    file: &mut File,
    private: bool,
) -> Result<()> {
    actions::set_visibility(state, file, private)?;
    ctx.print(&notify::success(&format!(
        "{} is now {}",
        file.id,
        file.visibility()
    )));
    Ok(())
}

fn extension(
    state: &AppState,
    ctx: &SessionContext,
    file: &mut File,
    args: &[String],
) -> Result<()> {
    let ext = args
        .first()
        .ok_or_else(|| Error::FlagRequired("extension".to_string()))?;

    match actions::change_extension(state, file, ext)? {
        Some(old_type) => {
            let details = Details::default().row(
                "📁 Type",
                format!("{old_type} → {}", file.file_type),
            );
            ctx.print(&format!(
                "{}\n{}",
                notify::success("File Type Updated!"),
                details.render()
            ));
        }
        None => ctx.print(&notify::hint(&format!(
            "File type is already {}.",
            file.file_type
        ))),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::app::test_support::{create_file, create_user, test_state};
    use crate::ssh::session::{Input, Output, Pty, SessionIo};

    struct Fixture {
        _temp: tempfile::TempDir,
        state: std::sync::Arc<AppState>,
        owner: String,
        file: File,
    }

    fn fixture(private: bool) -> Fixture {
        let (temp, state) = test_state();
        let owner = create_user(&state, "SHA256:owner").id;
        let file = create_file(&state, &owner, b"int main() { return 0; }\n", "text", private);
        Fixture {
            _temp: temp,
            state,
            owner,
            file,
        }
    }

    fn session(fx: &Fixture, user_id: &str, command: &str) -> (SessionContext, SessionIo) {
        let command = command.split_whitespace().map(String::from).collect();
        let (mut ctx, io) = SessionContext::new(
            "req",
            format!("f:{}", fx.file.id),
            command,
            Duration::from_secs(5),
        );
        ctx.user_id = Some(user_id.to_string());
        (ctx, io)
    }

    fn stdout(io: &mut SessionIo) -> Vec<u8> {
        let mut out = Vec::new();
        while let Ok(output) = io.output.try_recv() {
            if let Output::Stdout(bytes) = output {
                out.extend(bytes);
            }
        }
        out
    }

    #[tokio::test]
    async fn test_cat_raw_without_pty() {
        let fx = fixture(false);
        let (mut ctx, mut io) = session(&fx, &fx.owner, "");
        handle(&fx.state, &mut ctx).await.unwrap();
        assert_eq!(stdout(&mut io), b"int main() { return 0; }\n");

        let (mut ctx, mut io) = session(&fx, &fx.owner, "cat");
        handle(&fx.state, &mut ctx).await.unwrap();
        assert_eq!(stdout(&mut io), b"int main() { return 0; }\n");
    }

    #[tokio::test]
    async fn test_cat_with_pty_uses_crlf() {
        let fx = fixture(false);
        let (ctx, mut io) = session(&fx, &fx.owner, "cat");
        let mut ctx = ctx.with_pty(Some(Pty {
            term: "xterm-256color".to_string(),
            width: 80,
            height: 24,
        }));
        handle(&fx.state, &mut ctx).await.unwrap();
        let out = String::from_utf8(stdout(&mut io)).unwrap();
        assert!(out.ends_with("\r\n"));
    }

    #[tokio::test]
    async fn test_non_owner_sees_not_found() {
        let fx = fixture(false);
        let other = create_user(&fx.state, "SHA256:other").id;
        for command in ["", "rm -f", "private", "ext go"] {
            let (mut ctx, _io) = session(&fx, &other, command);
            assert!(matches!(
                handle(&fx.state, &mut ctx).await,
                Err(Error::FileNotFound)
            ));
        }
        assert!(fx.state.store.find_file(&fx.file.id).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let fx = fixture(false);
        let (mut ctx, _io) = session(&fx, &fx.owner, "");
        ctx.user = "f:doesnotexist".to_string();
        assert!(matches!(
            handle(&fx.state, &mut ctx).await,
            Err(Error::FileNotFound)
        ));
    }

    #[tokio::test]
    async fn test_rm_confirmed() {
        let fx = fixture(false);
        let (mut ctx, io) = session(&fx, &fx.owner, "rm");
        io.input.send(Input::Data(b"y\n".to_vec())).await.unwrap();
        handle(&fx.state, &mut ctx).await.unwrap();
        assert!(fx.state.store.find_file(&fx.file.id).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rm_declined() {
        let fx = fixture(false);
        let (mut ctx, io) = session(&fx, &fx.owner, "rm");
        io.input.send(Input::Data(b"n\n".to_vec())).await.unwrap();
        handle(&fx.state, &mut ctx).await.unwrap();
        assert!(fx.state.store.find_file(&fx.file.id).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rm_force() {
        let fx = fixture(false);
        let (mut ctx, _io) = session(&fx, &fx.owner, "rm -f");
        handle(&fx.state, &mut ctx).await.unwrap();
        assert!(fx.state.store.find_file(&fx.file.id).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign() {
        let fx = fixture(false);
        let (mut ctx, _io) = session(&fx, &fx.owner, "sign -ttl 1h");
        assert!(matches!(
            handle(&fx.state, &mut ctx).await,
            Err(Error::UnableToSignPublicFile)
        ));

        let fx = fixture(true);
        let (mut ctx, _io) = session(&fx, &fx.owner, "sign");
        assert!(matches!(
            handle(&fx.state, &mut ctx).await,
            Err(Error::FlagRequired(_))
        ));

        let (mut ctx, mut io) = session(&fx, &fx.owner, "sign -ttl 1h");
        handle(&fx.state, &mut ctx).await.unwrap();
        let out = String::from_utf8(stdout(&mut io)).unwrap();
        assert!(out.contains(&format!("/f/{}?", fx.file.id)));
        assert!(out.contains("sig="));

        let (mut ctx, _io) = session(&fx, &fx.owner, "sign -ttl 100000000w");
        assert!(matches!(
            handle(&fx.state, &mut ctx).await,
            Err(Error::FlagParse(_))
        ));
    }

    #[tokio::test]
    async fn test_visibility_toggle() {
        let fx = fixture(false);
        let (mut ctx, _io) = session(&fx, &fx.owner, "private");
        handle(&fx.state, &mut ctx).await.unwrap();
        assert!(fx.state.store.find_file(&fx.file.id).unwrap().unwrap().private);

        let (mut ctx, _io) = session(&fx, &fx.owner, "public");
        handle(&fx.state, &mut ctx).await.unwrap();
        assert!(!fx.state.store.find_file(&fx.file.id).unwrap().unwrap().private);
    }

    #[tokio::test]
    async fn test_ext() {
        let fx = fixture(false);
        let (mut ctx, _io) = session(&fx, &fx.owner, "ext c");
        handle(&fx.state, &mut ctx).await.unwrap();
        let file = fx.state.store.find_file(&fx.file.id).unwrap().unwrap();
        assert_eq!(file.file_type, "c");

        let (mut ctx, _io) = session(&fx, &fx.owner, "ext");
        assert!(matches!(
            handle(&fx.state, &mut ctx).await,
            Err(Error::FlagRequired(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let fx = fixture(false);
        let (mut ctx, _io) = session(&fx, &fx.owner, "frobnicate");
        assert!(matches!(
            handle(&fx.state, &mut ctx).await,
            Err(Error::UnknownCommand(cmd)) if cmd == "frobnicate"
        ));
    }
}
