mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the persistence interface for users, keys, files and
/// revisions. Implementations serialize access internally, so callers may
/// share one store across every session and request.
pub trait Store: Send + Sync {
    /// Brings the schema up to date. Safe to call on every start.
    fn migrate(&self) -> Result<()>;

    // File operations

    /// Inserts `file`, assigning its id and timestamps. Fails with
    /// [`crate::error::Error::FileLimit`] when the owner already has
    /// `max_files_per_user` files; a limit of zero disables the check.
    fn create_file(&self, file: &mut File, max_files_per_user: u64) -> Result<()>;
    fn find_file(&self, id: &str) -> Result<Option<File>>;
    /// Persists content, size, visibility and type. Bumps `updated_at`.
    fn update_file(&self, file: &mut File) -> Result<()>;
    fn delete_file(&self, id: &str) -> Result<bool>;
    /// Files owned by `user_id`, newest first, without their content.
    fn find_files_by_user(&self, user_id: &str) -> Result<Vec<File>>;
    /// Public files, newest first, without their content. `page` is zero-based.
    fn latest_public_files(&self, page: u64, per_page: u64) -> Result<Vec<File>>;

    // Identity operations
    fn find_public_key_by_fingerprint(&self, fingerprint: &str) -> Result<Option<PublicKey>>;
    /// Creates a user owning `public_key`. If the fingerprint is already
    /// registered, returns the user that owns it instead of creating another.
    fn create_user_with_public_key(&self, public_key: &mut PublicKey) -> Result<User>;
    fn find_user(&self, id: &str) -> Result<Option<User>>;

    // Revision operations
    fn create_revision(&self, revision: &mut Revision) -> Result<()>;
    /// Revisions of a file, newest first, without their diffs.
    fn find_revisions_by_file_id(&self, file_id: &str) -> Result<Vec<Revision>>;
    fn find_revision(&self, file_id: &str, id: i64) -> Result<Option<Revision>>;
    fn count_revisions_by_file_id(&self, file_id: &str) -> Result<u64>;

    fn close(&self) -> Result<()>;
}
