//! The per-session chain: logging, the public key gate, the allow-list,
//! the auth binder and finally the handler the session asked for.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::file_action::{self, FILE_USER_PREFIX};
use super::notify;
use super::session::SessionContext;
use super::upload;
use crate::app::AppState;
use crate::error::{Error, Result};
use crate::stats::{self, Counter};
use crate::tui;
use crate::types::PublicKey;

const NO_PUBLIC_KEY_HELP: &str = "❌ Unfortunately snips.sh only supports public key authentication.\n🔐 Please generate a keypair and try again.\n";

/// Runs one session to completion and reports its exit status.
pub async fn run(state: Arc<AppState>, mut ctx: SessionContext) {
    let span = info_span!(
        "session",
        svc = "ssh",
        request_id = %ctx.request_id,
        addr = ?ctx.remote_addr,
        user = %ctx.user,
        user_id = tracing::field::Empty,
    );

    async move {
        stats::incr(Counter::SshSessions);
        info!("connected");
        let start = Instant::now();

        let result = match tokio::time::timeout(
            state.config.limits.session_duration,
            chain(&state, &mut ctx),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(Error::SessionExpired),
        };

        let code = match result {
            Ok(code) => code,
            Err(e) => {
                report(&ctx, &e);
                1
            }
        };
        ctx.exit(code);

        info!(
            duration_ms = start.elapsed().as_millis() as u64,
            exit = code,
            "disconnected"
        );
    }
    .instrument(span)
    .await;
}

fn report(ctx: &SessionContext, e: &Error) {
    if e.is_user_error() {
        info!(error = %e, "session ended with user error");
        ctx.eprint(&notify::error(&e.to_string()));
    } else {
        error!(error = %e, "session failed");
        ctx.eprint(&notify::error("Something went wrong, please try again later."));
    }
}

async fn chain(state: &Arc<AppState>, ctx: &mut SessionContext) -> Result<u32> {
    let Some(fingerprint) = ctx.fingerprint.clone() else {
        stats::incr(Counter::SshAuthFailures);
        info!("session without public key");
        ctx.eprint(NO_PUBLIC_KEY_HELP);
        return Ok(1);
    };

    if !state.is_authorized(&fingerprint) {
        stats::incr(Counter::SshAuthFailures);
        warn!(fingerprint = %fingerprint, "key not in authorized keys");
        return Err(Error::Unauthorized);
    }

    let user_id = bind_user(state, &fingerprint, ctx.key_type.as_deref().unwrap_or_default())?;
    tracing::Span::current().record("user_id", user_id.as_str());
    debug!(user_id = %user_id, fingerprint = %fingerprint, "session user bound");
    ctx.user_id = Some(user_id);

    dispatch(state, ctx).await?;
    Ok(0)
}

/// Finds the user owning `fingerprint`, creating one on first contact.
fn bind_user(state: &AppState, fingerprint: &str, key_type: &str) -> Result<String> {
    if let Some(key) = state.store.find_public_key_by_fingerprint(fingerprint)? {
        if state.store.find_user(&key.user_id)?.is_some() {
            return Ok(key.user_id);
        }
        warn!(fingerprint = %fingerprint, user_id = %key.user_id, "public key without user");
    }

    let now = Utc::now();
    let user = state.store.create_user_with_public_key(&mut PublicKey {
        id: String::new(),
        created_at: now,
        updated_at: now,
        fingerprint: fingerprint.to_string(),
        key_type: key_type.to_string(),
        user_id: String::new(),
    })?;
    info!(user_id = %user.id, fingerprint = %fingerprint, "created user");
    Ok(user.id)
}

async fn dispatch(state: &Arc<AppState>, ctx: &mut SessionContext) -> Result<()> {
    if ctx.user.starts_with(FILE_USER_PREFIX) {
        file_action::handle(state, ctx).await
    } else if ctx.pty.is_some() {
        stats::incr(Counter::SshInteractive);
        tui::run(state.clone(), ctx).await
    } else {
        upload::handle(state, ctx).await
    }
}
