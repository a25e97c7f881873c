//! File operations shared by the SSH commands and the TUI prompts.

use chrono::{DateTime, Utc};
use tracing::info;
use url::Url;

use crate::app::AppState;
use crate::error::{Error, Result};
use crate::renderer::lexer::{get_lexer, type_name};
use crate::stats::{self, Counter};
use crate::types::{File, Revision};

/// Lowercases an extension hint, drops a leading dot and caps its length.
#[must_use]
pub fn normalize_extension(ext: &str) -> String {
    ext.trim()
        .trim_start_matches('.')
        .to_lowercase()
        .chars()
        .take(255)
        .collect()
}

pub fn set_visibility(state: &AppState, file: &mut File, private: bool) -> Result<()> {
    if file.private == private {
        return Ok(());
    }
    file.private = private;
    state.store.update_file(file)?;
    info!(file_id = %file.id, private, "updated file visibility");
    Ok(())
}

/// Retypes a file to the lexer named by `ext`, recording a revision that
/// describes the change. Returns the previous type when it changed.
pub fn change_extension(state: &AppState, file: &mut File, ext: &str) -> Result<Option<String>> {
    if file.is_binary() {
        return Err(Error::BinaryNotAllowed);
    }

    let ext = normalize_extension(ext);
    if ext.is_empty() {
        return Err(Error::FlagRequired("extension".to_string()));
    }

    let new_type = type_name(get_lexer(&ext));
    if new_type == file.file_type {
        return Ok(None);
    }

    let old_type = std::mem::replace(&mut file.file_type, new_type);
    state.store.update_file(file)?;

    let diff = format!(
        "--- a/{id}\ttype: {old_type}\n+++ b/{id}\ttype: {new}\n",
        id = file.id,
        new = file.file_type
    );
    let mut revision = Revision {
        id: 0,
        sequence: 0,
        file_id: file.id.clone(),
        created_at: Utc::now(),
        raw_diff: Vec::new(),
        size: file.size,
        file_type: file.file_type.clone(),
    };
    revision.set_diff(diff.as_bytes(), state.config.file_compression)?;
    state.store.create_revision(&mut revision)?;

    info!(
        file_id = %file.id,
        old_type = %old_type,
        new_type = %file.file_type,
        revision = revision.sequence,
        "updated file type"
    );
    Ok(Some(old_type))
}

fn ttl_too_large() -> Error {
    Error::FlagParse("ttl too large".to_string())
}

/// Rejects a TTL whose expiry cannot be represented, so callers can check it
/// before doing any work.
pub fn signed_ttl(ttl: std::time::Duration) -> Result<chrono::Duration> {
    let ttl = chrono::Duration::from_std(ttl).map_err(|_| ttl_too_large())?;
    Utc::now().checked_add_signed(ttl).ok_or_else(ttl_too_large)?;
    Ok(ttl)
}

/// Signed web address for a private file, valid for `ttl`.
pub fn sign_file(
    state: &AppState,
    file: &File,
    ttl: std::time::Duration,
) -> Result<(Url, DateTime<Utc>)> {
    if !file.private {
        return Err(Error::UnableToSignPublicFile);
    }
    let (url, expires_at) = state
        .signer
        .sign_url_with_ttl(&state.config.http_address_for_file(&file.id), signed_ttl(ttl)?)
        .ok_or_else(ttl_too_large)?;

    stats::incr(Counter::FilesSigned);
    info!(file_id = %file.id, expires_at = %expires_at, "private file signed");
    Ok((url, expires_at))
}

pub fn delete_file(state: &AppState, file: &File) -> Result<()> {
    if !state.store.delete_file(&file.id)? {
        return Err(Error::FileNotFound);
    }
    stats::incr(Counter::FilesDeleted);
    info!(file_id = %file.id, "file deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::app::test_support::{create_file, create_user, test_state};
    use crate::signer::EXPIRES_QUERY_PARAM;

    fn upload(state: &AppState, content: &[u8], file_type: &str) -> File {
        let user = create_user(state, "SHA256:test");
        create_file(state, &user.id, content, file_type, false)
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension(".TXT"), "txt");
        assert_eq!(normalize_extension("Rs"), "rs");
        assert_eq!(normalize_extension(&"a".repeat(300)).len(), 255);
    }

    #[test]
    fn test_change_extension_records_revision() {
        let (_temp, state) = test_state();
        let mut file = upload(&state, b"fn main() {}", "text");

        let old = change_extension(&state, &mut file, ".rs").unwrap();
        assert_eq!(old.as_deref(), Some("text"));
        assert_eq!(file.file_type, "rust");

        let stored = state.store.find_file(&file.id).unwrap().unwrap();
        assert_eq!(stored.file_type, "rust");

        let revisions = state.store.find_revisions_by_file_id(&file.id).unwrap();
        assert_eq!(revisions.len(), 1);
        let revision = state
            .store
            .find_revision(&file.id, revisions[0].id)
            .unwrap()
            .unwrap();
        let diff = String::from_utf8(revision.get_diff().unwrap()).unwrap();
        assert!(diff.contains("type: text"));
        assert!(diff.contains("type: rust"));
    }

    #[test]
    fn test_change_extension_same_type_is_noop() {
        let (_temp, state) = test_state();
        let mut file = upload(&state, b"fn main() {}", "rust");
        assert!(change_extension(&state, &mut file, "rs").unwrap().is_none());
        assert_eq!(state.store.count_revisions_by_file_id(&file.id).unwrap(), 0);
    }

    #[test]
    fn test_change_extension_rejects_binary() {
        let (_temp, state) = test_state();
        let mut file = upload(&state, &[0, 1, 2], "binary");
        assert!(matches!(
            change_extension(&state, &mut file, "rs"),
            Err(Error::BinaryNotAllowed)
        ));
    }

    #[test]
    fn test_sign_requires_private_file() {
        let (_temp, state) = test_state();
        let mut file = upload(&state, b"secret", "text");
        assert!(matches!(
            sign_file(&state, &file, Duration::from_secs(60)),
            Err(Error::UnableToSignPublicFile)
        ));

        set_visibility(&state, &mut file, true).unwrap();
        let (url, expires_at) = sign_file(&state, &file, Duration::from_secs(60)).unwrap();
        assert!(expires_at > Utc::now());
        assert!(url.query_pairs().any(|(k, _)| k == EXPIRES_QUERY_PARAM));
        assert!(state.signer.verify_url_and_not_expired(&url));
    }

    #[test]
    fn test_sign_with_huge_ttl_is_a_flag_error() {
        let (_temp, state) = test_state();
        let mut file = upload(&state, b"secret", "text");
        set_visibility(&state, &mut file, true).unwrap();

        let ttl = crate::timeutil::parse_duration("100000000w").unwrap();
        assert!(matches!(
            sign_file(&state, &file, ttl),
            Err(Error::FlagParse(msg)) if msg == "ttl too large"
        ));
        assert!(signed_ttl(Duration::from_secs(3600)).is_ok());
    }

    #[test]
    fn test_delete_file() {
        let (_temp, state) = test_state();
        let file = upload(&state, b"bye", "text");
        delete_file(&state, &file).unwrap();
        assert!(state.store.find_file(&file.id).unwrap().is_none());
        assert!(matches!(delete_file(&state, &file), Err(Error::FileNotFound)));
    }
}
