mod confirm;
mod file_action;
mod flags;
mod middleware;
mod notify;
mod server;
pub mod session;
mod upload;

pub use file_action::FILE_USER_PREFIX;
pub use middleware::run as run_session;
pub use server::{fingerprint, load_authorized_keys, load_or_generate_host_key, serve};
pub use session::{Input, Output, Pty, SessionContext, SessionIo};
