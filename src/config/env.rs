//! Environment-driven configuration. Every setting is read from a
//! `SNIPS_*` variable and may be overridden on the command line.

use std::path::PathBuf;

use clap::Args;
use url::Url;

use super::server::{Config, HttpConfig, Limits, SshConfig};
use crate::error::{Error, Result};
use crate::timeutil;

#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Enable debug logging and the profiling endpoints
    #[arg(long, env = "SNIPS_DEBUG", default_value_t = false)]
    pub debug: bool,

    /// Analyze content to detect file types when no extension is given
    #[arg(long, env = "SNIPS_ENABLEGUESSER", default_value_t = true, action = clap::ArgAction::Set)]
    pub enable_guesser: bool,

    /// Symmetric key used to sign URLs
    #[arg(long, env = "SNIPS_HMACKEY", default_value = "hmac-and-cheese", hide_env_values = true)]
    pub hmac_key: String,

    /// Compress file contents at rest
    #[arg(long, env = "SNIPS_FILECOMPRESSION", default_value_t = true, action = clap::ArgAction::Set)]
    pub file_compression: bool,

    /// Maximum file size in bytes
    #[arg(long, env = "SNIPS_LIMITS_FILESIZE", default_value_t = 1_048_576)]
    pub limits_file_size: u64,

    /// Maximum number of files per user
    #[arg(long, env = "SNIPS_LIMITS_FILESPERUSER", default_value_t = 100)]
    pub limits_files_per_user: u64,

    /// Maximum ssh session duration
    #[arg(long, env = "SNIPS_LIMITS_SESSIONDURATION", default_value = "15m")]
    pub limits_session_duration: String,

    /// Maximum time an ssh session may wait for input
    #[arg(long, env = "SNIPS_LIMITS_IDLETIMEOUT", default_value = "1m")]
    pub limits_idle_timeout: String,

    /// Path to the database file
    #[arg(long, env = "SNIPS_DB_FILEPATH", default_value = "data/snips.db")]
    pub db_filepath: PathBuf,

    /// Internal address to listen for http requests
    #[arg(long, env = "SNIPS_HTTP_INTERNAL", default_value = "http://localhost:8080")]
    pub http_internal: Url,

    /// External http address displayed in commands
    #[arg(long, env = "SNIPS_HTTP_EXTERNAL", default_value = "http://localhost:8080")]
    pub http_external: Url,

    /// Maximum time to handle one http request
    #[arg(long, env = "SNIPS_HTTP_TIMEOUT", default_value = "30s")]
    pub http_timeout: String,

    /// Path to an html file with extra content for <head>
    #[arg(long, env = "SNIPS_HTML_EXTENDHEADFILE")]
    pub html_extend_head_file: Option<PathBuf>,

    /// Internal address to listen for ssh requests
    #[arg(long, env = "SNIPS_SSH_INTERNAL", default_value = "ssh://localhost:2222")]
    pub ssh_internal: Url,

    /// External ssh address displayed in commands
    #[arg(long, env = "SNIPS_SSH_EXTERNAL", default_value = "ssh://localhost:2222")]
    pub ssh_external: Url,

    /// Path to the ssh host key, generated if missing
    #[arg(long, env = "SNIPS_SSH_HOSTKEYPATH", default_value = "data/keys/snips")]
    pub ssh_host_key_path: PathBuf,

    /// Path to authorized keys; if set, restricts ssh access to those keys
    #[arg(long, env = "SNIPS_SSH_AUTHORIZEDKEYSPATH")]
    pub ssh_authorized_keys_path: Option<PathBuf>,
}

impl TryFrom<ConfigArgs> for Config {
    type Error = Error;

    fn try_from(args: ConfigArgs) -> Result<Self> {
        let session_duration = timeutil::parse_duration(&args.limits_session_duration)
            .map_err(|e| Error::Config(format!("SNIPS_LIMITS_SESSIONDURATION: {e}")))?;
        let idle_timeout = timeutil::parse_duration(&args.limits_idle_timeout)
            .map_err(|e| Error::Config(format!("SNIPS_LIMITS_IDLETIMEOUT: {e}")))?;
        let request_timeout = timeutil::parse_duration(&args.http_timeout)
            .map_err(|e| Error::Config(format!("SNIPS_HTTP_TIMEOUT: {e}")))?;

        if args.hmac_key.is_empty() {
            return Err(Error::Config("SNIPS_HMACKEY must not be empty".to_string()));
        }

        Ok(Config {
            debug: args.debug,
            enable_guesser: args.enable_guesser,
            hmac_key: args.hmac_key,
            file_compression: args.file_compression,
            limits: Limits {
                file_size: args.limits_file_size,
                files_per_user: args.limits_files_per_user,
                session_duration,
                idle_timeout,
            },
            db_path: args.db_filepath,
            http: HttpConfig {
                internal: args.http_internal,
                external: args.http_external,
                extend_head_file: args.html_extend_head_file,
                request_timeout,
            },
            ssh: SshConfig {
                internal: args.ssh_internal,
                external: args.ssh_external,
                host_key_path: args.ssh_host_key_path,
                authorized_keys_path: args.ssh_authorized_keys_path,
            },
        })
    }
}

/// A row of the `usage` table.
pub struct UsageEntry {
    pub key: String,
    pub default: String,
    pub description: String,
}

/// Lists every environment variable the server understands, derived from
/// the clap definitions so the two never drift apart.
#[must_use]
pub fn usage_entries() -> Vec<UsageEntry> {
    use clap::CommandFactory;

    #[derive(clap::Parser)]
    struct Wrapper {
        #[command(flatten)]
        config: ConfigArgs,
    }

    Wrapper::command()
        .get_arguments()
        .filter_map(|arg| {
            let key = arg.get_env()?.to_string_lossy().into_owned();
            let default = arg
                .get_default_values()
                .iter()
                .map(|v| v.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(",");
            let description = arg.get_help().map(ToString::to_string).unwrap_or_default();
            Some(UsageEntry {
                key,
                default,
                description,
            })
        })
        .collect()
}

/// Renders [`usage_entries`] as an aligned table.
#[must_use]
pub fn usage_table() -> String {
    let entries = usage_entries();
    let key_width = entries.iter().map(|e| e.key.len()).max().unwrap_or(3).max(3);
    let default_width = entries
        .iter()
        .map(|e| e.default.len())
        .max()
        .unwrap_or(7)
        .max(7);

    let mut out = format!(
        "{:key_width$}  {:default_width$}  DESCRIPTION\n",
        "KEY", "DEFAULT"
    );
    for entry in entries {
        out.push_str(&format!(
            "{:key_width$}  {:default_width$}  {}\n",
            entry.key, entry.default, entry.description
        ));
    }
    out
}
