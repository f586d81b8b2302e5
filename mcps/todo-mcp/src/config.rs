//! Configuration loading
//!
//! Settings come from three layers, highest precedence first: command-line
//! flags (or their environment variables), an optional TOML file passed with
//! `--config`, and built-in defaults.

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_PATH: &str = "db.json";
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;
pub const DEFAULT_KEEP_ALIVE_SECS: u64 = 15;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// How strictly the `Accept` header is checked on `/mcp`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcceptPolicy {
    /// POST must accept JSON and SSE; GET must accept SSE
    #[default]
    Strict,
    /// No check; the reply format is still chosen from the header
    Lenient,
}

#[derive(Debug, Default, Parser)]
#[command(name = "todo-mcp")]
#[command(about = "Todo list MCP server over streamable HTTP", version)]
pub struct Cli {
    /// TOML file with default settings
    #[arg(long, env = "TODO_MCP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "TODO_MCP_HOST")]
    pub host: Option<IpAddr>,

    /// JSON file holding the todo list
    #[arg(long, env = "TODO_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Include internal error detail in client-facing errors
    #[arg(long, env = "TODO_MCP_DEV")]
    pub dev: bool,

    /// Accept header policy
    #[arg(long, value_enum, env = "TODO_MCP_ACCEPT_POLICY")]
    pub accept_policy: Option<AcceptPolicy>,

    /// Answer POSTed requests with a single JSON body instead of an SSE stream
    #[arg(long, env = "TODO_MCP_JSON_RESPONSE")]
    pub json_response: bool,

    /// Close sessions idle for this many seconds (0 disables)
    #[arg(long, env = "TODO_MCP_SESSION_IDLE_SECS")]
    pub session_idle_secs: Option<u64>,

    /// Interval between SSE keep-alive comments
    #[arg(long, env = "TODO_MCP_KEEP_ALIVE_SECS")]
    pub keep_alive_secs: Option<u64>,
}

/// Settings file (`--config`)
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub port: Option<u16>,
    pub host: Option<IpAddr>,
    pub db_path: Option<PathBuf>,
    pub dev: Option<bool>,
    pub accept_policy: Option<AcceptPolicy>,
    pub json_response: Option<bool>,
    pub session_idle_secs: Option<u64>,
    pub keep_alive_secs: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Per-request HTTP behavior
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub accept_policy: AcceptPolicy,
    pub json_response: bool,
    pub expose_detail: bool,
    pub keep_alive: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            accept_policy: AcceptPolicy::Strict,
            json_response: false,
            expose_detail: false,
            keep_alive: Duration::from_secs(DEFAULT_KEEP_ALIVE_SECS),
        }
    }
}

/// Fully resolved server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub db_path: PathBuf,
    pub http: HttpOptions,
    /// `None` disables idle eviction
    pub session_idle: Option<Duration>,
}

impl ServerConfig {
    /// Merge CLI/env over the optional settings file over defaults
    pub fn resolve(cli: Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => {
                tracing::debug!("Loading config from: {}", path.display());
                FileConfig::load(path)?
            }
            None => FileConfig::default(),
        };
        Ok(Self::merge(cli, file))
    }

    fn merge(cli: Cli, file: FileConfig) -> Self {
        let host = cli
            .host
            .or(file.host)
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let port = cli.port.or(file.port).unwrap_or(DEFAULT_PORT);
        let idle_secs = cli
            .session_idle_secs
            .or(file.session_idle_secs)
            .unwrap_or(DEFAULT_SESSION_IDLE_SECS);
        let keep_alive_secs = cli
            .keep_alive_secs
            .or(file.keep_alive_secs)
            .unwrap_or(DEFAULT_KEEP_ALIVE_SECS)
            .max(1);

        Self {
            bind: SocketAddr::new(host, port),
            db_path: cli
                .db_path
                .or(file.db_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            http: HttpOptions {
                accept_policy: cli.accept_policy.or(file.accept_policy).unwrap_or_default(),
                json_response: cli.json_response || file.json_response.unwrap_or(false),
                expose_detail: cli.dev || file.dev.unwrap_or(false),
                keep_alive: Duration::from_secs(keep_alive_secs),
            },
            session_idle: (idle_secs > 0).then(|| Duration::from_secs(idle_secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::resolve(Cli::default()).unwrap();
        assert_eq!(config.bind.port(), DEFAULT_PORT);
        assert!(config.bind.ip().is_unspecified());
        assert_eq!(config.db_path, PathBuf::from("db.json"));
        assert_eq!(config.http.accept_policy, AcceptPolicy::Strict);
        assert!(!config.http.expose_detail);
        assert_eq!(
            config.session_idle,
            Some(Duration::from_secs(DEFAULT_SESSION_IDLE_SECS))
        );
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "port = 4000\ndb_path = \"/tmp/todos.json\"\naccept_policy = \"lenient\"\ndev = true"
        )
        .unwrap();

        let cli = Cli {
            config: Some(file.path().to_path_buf()),
            port: Some(5000),
            ..Default::default()
        };
        let config = ServerConfig::resolve(cli).unwrap();
        assert_eq!(config.bind.port(), 5000);
        assert_eq!(config.db_path, PathBuf::from("/tmp/todos.json"));
        assert_eq!(config.http.accept_policy, AcceptPolicy::Lenient);
        assert!(config.http.expose_detail);
    }

    #[test]
    fn test_zero_idle_disables_eviction() {
        let cli = Cli {
            session_idle_secs: Some(0),
            ..Default::default()
        };
        assert!(ServerConfig::resolve(cli).unwrap().session_idle.is_none());
    }

    #[test]
    fn test_unknown_file_keys_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "prot = 4000").unwrap();
        let err = FileConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "todo-mcp",
            "--port",
            "8080",
            "--accept-policy",
            "lenient",
            "--json-response",
        ])
        .unwrap();
        assert_eq!(cli.port, Some(8080));
        assert_eq!(cli.accept_policy, Some(AcceptPolicy::Lenient));
        assert!(cli.json_response);
    }
}
