use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

pub const DEFAULT_HMAC_KEY: &str = "hmac-and-cheese";

#[derive(Debug, Clone)]
pub struct Limits {
    /// Maximum upload size in bytes.
    pub file_size: u64,
    pub files_per_user: u64,
    pub session_duration: Duration,
    /// Maximum time a session may sit without sending input.
    pub idle_timeout: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            file_size: 1_048_576,
            files_per_user: 100,
            session_duration: Duration::from_secs(15 * 60),
            idle_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub internal: Url,
    pub external: Url,
    /// Optional HTML fragment appended to every page's `<head>`.
    pub extend_head_file: Option<PathBuf>,
    /// Upper bound on handling a single request.
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SshConfig {
    pub internal: Url,
    pub external: Url,
    pub host_key_path: PathBuf,
    /// When set, only keys listed in this `authorized_keys` file may connect.
    pub authorized_keys_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub debug: bool,
    pub enable_guesser: bool,
    pub hmac_key: String,
    pub file_compression: bool,
    pub limits: Limits,
    pub db_path: PathBuf,
    pub http: HttpConfig,
    pub ssh: SshConfig,
}

impl Config {
    /// Public web address of a file, e.g. `https://snips.sh/f/abc123`.
    #[must_use]
    pub fn http_address_for_file(&self, file_id: &str) -> Url {
        let mut url = self.http.external.clone();
        url.set_path(&format!("/f/{file_id}"));
        url.set_query(None);
        url.set_fragment(None);
        url
    }

    /// The `ssh` invocation that targets a file, e.g. `ssh f:abc123@snips.sh`.
    #[must_use]
    pub fn ssh_command_for_file(&self, file_id: &str) -> String {
        let host = self.ssh.external.host_str().unwrap_or("localhost");
        let mut command = format!("ssh f:{file_id}@{host}");
        if let Some(port) = self.ssh.external.port() {
            if port != 22 {
                command.push_str(&format!(" -p {port}"));
            }
        }
        command
    }

    pub fn http_listen_addr(&self) -> Result<String> {
        listen_addr(&self.http.internal, 80)
    }

    pub fn ssh_listen_addr(&self) -> Result<String> {
        listen_addr(&self.ssh.internal, 22)
    }

    /// Reads the configured contents for the page `<head>`, if any.
    pub fn extend_head(&self) -> Result<Option<String>> {
        match &self.http.extend_head_file {
            Some(path) => Ok(Some(std::fs::read_to_string(path)?)),
            None => Ok(None),
        }
    }
}

fn listen_addr(url: &Url, default_port: u16) -> Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| Error::Config(format!("missing host in '{url}'")))?;
    let port = url.port_or_known_default().unwrap_or(default_port);
    Ok(format!("{host}:{port}"))
}

impl Default for Config {
    fn default() -> Self {
        let http = Url::parse("http://localhost:8080").unwrap_or_else(|_| unreachable!());
        let ssh = Url::parse("ssh://localhost:2222").unwrap_or_else(|_| unreachable!());
        Self {
            debug: false,
            enable_guesser: true,
            hmac_key: DEFAULT_HMAC_KEY.to_string(),
            file_compression: true,
            limits: Limits::default(),
            db_path: PathBuf::from("data/snips.db"),
            http: HttpConfig {
                internal: http.clone(),
                external: http,
                extend_head_file: None,
                request_timeout: Duration::from_secs(30),
            },
            ssh: SshConfig {
                internal: ssh.clone(),
                external: ssh,
                host_key_path: PathBuf::from("data/keys/snips"),
                authorized_keys_path: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_address_for_file() {
        let mut config = Config::default();
        config.http.external = Url::parse("https://snips.sh").unwrap();
        assert_eq!(
            config.http_address_for_file("abc123").as_str(),
            "https://snips.sh/f/abc123"
        );
    }

    #[test]
    fn test_ssh_command_for_file() {
        let mut config = Config::default();
        assert_eq!(
            config.ssh_command_for_file("abc123"),
            "ssh f:abc123@localhost -p 2222"
        );

        config.ssh.external = Url::parse("ssh://snips.sh").unwrap();
        assert_eq!(config.ssh_command_for_file("abc123"), "ssh f:abc123@snips.sh");

        config.ssh.external = Url::parse("ssh://snips.sh:22").unwrap();
        assert_eq!(config.ssh_command_for_file("abc123"), "ssh f:abc123@snips.sh");
    }

    #[test]
    fn test_listen_addrs() {
        let config = Config::default();
        assert_eq!(config.http_listen_addr().unwrap(), "localhost:8080");
        assert_eq!(config.ssh_listen_addr().unwrap(), "localhost:2222");
    }
}
