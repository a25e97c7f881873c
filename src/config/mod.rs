mod env;
mod server;

pub use env::{ConfigArgs, UsageEntry, usage_entries, usage_table};
pub use server::{Config, DEFAULT_HMAC_KEY, HttpConfig, Limits, SshConfig};
