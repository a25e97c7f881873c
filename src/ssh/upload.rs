use std::time::Duration;

use tracing::info;

use super::flags::UploadFlags;
use super::notify::{self, Details};
use super::session::SessionContext;
use crate::actions;
use crate::app::AppState;
use crate::error::{Error, Result};
use crate::renderer::detect_file_type;
use crate::stats::{self, Counter};
use crate::timeutil::{human_bytes, human_time};
use crate::types::File;

/// Reads stdin to the end and stores it as a new file owned by the session
/// user.
pub async fn handle(state: &AppState, ctx: &mut SessionContext) -> Result<()> {
    let flags = UploadFlags::parse_args(&ctx.command)?;
    if let Some(ttl) = flags.ttl {
        actions::signed_ttl(ttl)?;
    }
    let user_id = ctx.user_id()?.to_string();
    let limit = state.config.limits.file_size;

    let mut content = Vec::new();
    while let Some(chunk) = ctx.read().await? {
        content.extend_from_slice(&chunk);
        if content.len() as u64 > limit {
            info!(limit, "upload exceeded size limit");
            return Err(Error::FileTooLarge);
        }
    }

    if content.is_empty() {
        ctx.print(&notify::warning("Skipping upload, file is empty!"));
        return Ok(());
    }

    let mut file = File::new(user_id);
    file.private = flags.private;
    file.file_type = detect_file_type(&content, &flags.ext, state.config.enable_guesser);
    let compress = state.config.file_compression && !file.is_binary();
    file.set_content(&content, compress)?;

    state
        .store
        .create_file(&mut file, state.config.limits.files_per_user)?;

    stats::incr(Counter::SshUploads);
    stats::add(Counter::SshUploadBytes, file.size);
    info!(
        file_id = %file.id,
        size = file.size,
        file_type = %file.file_type,
        private = file.private,
        "file uploaded"
    );

    ctx.print(&uploaded(state, &file, flags.ttl)?);
    Ok(())
}

fn uploaded(state: &AppState, file: &File, ttl: Option<Duration>) -> Result<String> {
    let mut details = Details::default()
        .row("💳 ID", file.id.clone())
        .row("🏋️ Size", human_bytes(file.size))
        .row("📁 Type", file.file_type.clone());
    if file.private {
        details = details.marker("🔐 Private");
    }

    let url = match (file.private, ttl) {
        (false, _) => Some(state.config.http_address_for_file(&file.id)),
        (true, Some(ttl)) => {
            let (url, expires_at) = actions::sign_file(state, file, ttl)?;
            details = details.row(
                "⏰ Expires",
                format!("{} ({})", expires_at.to_rfc3339(), human_time(expires_at)),
            );
            Some(url)
        }
        (true, None) => None,
    };

    let mut links = Details::default();
    if let Some(url) = url {
        links = links.row("🔗 URL", url.to_string());
    }
    links = links.row("📠 SSH Command", state.config.ssh_command_for_file(&file.id));

    let mut out = notify::success("File Uploaded Successfully!");
    out.push('\n');
    out.push_str(&details.render());
    out.push('\n');
    out.push_str(&links.render());
    if file.private && ttl.is_none() {
        out.push('\n');
        out.push_str(&notify::hint(&format!(
            "Private files have no public link. Run `{} sign -ttl 1h` to share one.",
            state.config.ssh_command_for_file(&file.id)
        )));
    }
    Ok(out)
}
