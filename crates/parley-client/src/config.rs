//! Command-line and environment configuration.
//!
//! Flags fall back to `PARLEY_*` environment variables. Parsed [`Args`] are
//! validated into a [`ClientConfig`] before anything connects.

use std::time::Duration;

use clap::Parser;
use parley_core::{AuthContext, UserId};
use thiserror::Error;

/// Parley console chat client
#[derive(Parser, Debug, Clone)]
#[command(name = "parley")]
#[command(about = "Console client for Parley rooms and direct messages")]
#[command(version)]
pub struct Args {
    /// HTTP base URL of the chat server
    #[arg(short, long, env = "PARLEY_SERVER", default_value = "http://localhost:8080")]
    pub server: String,

    /// STOMP WebSocket endpoint. Derived from `--server` if omitted.
    #[arg(long, env = "PARLEY_WS_URL")]
    pub ws_url: Option<String>,

    /// Authenticated user ID
    #[arg(short, long, env = "PARLEY_USER_ID")]
    pub user_id: UserId,

    /// Authenticated username
    #[arg(long, env = "PARLEY_USERNAME")]
    pub username: String,

    /// Bearer token issued at login
    #[arg(long, env = "PARLEY_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Channel list and presence refresh interval
    #[arg(long, env = "PARLEY_POLL_INTERVAL_MS", default_value = "5000")]
    pub poll_interval_ms: u64,

    /// How long a sent message waits for its echo
    #[arg(long, env = "PARLEY_ECHO_TTL_MS", default_value = "15000")]
    pub echo_ttl_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "PARLEY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Token is empty.
    #[error("token must not be empty")]
    EmptyToken,

    /// Username is empty.
    #[error("username must not be empty")]
    EmptyUsername,

    /// URL has an unsupported scheme.
    #[error("unsupported URL {url:?}, expected {expected}")]
    Scheme {
        /// Offending URL.
        url: String,
        /// Accepted schemes.
        expected: &'static str,
    },

    /// Interval or TTL is zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Validated client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// HTTP base URL, without trailing slash.
    pub server: String,
    /// STOMP WebSocket endpoint.
    pub ws_url: String,
    /// Authenticated user.
    pub auth: AuthContext,
    /// Registry poll interval.
    pub poll_interval: Duration,
    /// Echo lifetime.
    pub echo_ttl: Duration,
}

impl TryFrom<Args> for ClientConfig {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, ConfigError> {
        if args.token.trim().is_empty() {
            return Err(ConfigError::EmptyToken);
        }
        if args.username.trim().is_empty() {
            return Err(ConfigError::EmptyUsername);
        }
        if args.poll_interval_ms == 0 {
            return Err(ConfigError::Zero("poll interval"));
        }
        if args.echo_ttl_ms == 0 {
            return Err(ConfigError::Zero("echo TTL"));
        }

        let server = args.server.trim_end_matches('/').to_owned();
        if !(server.starts_with("http://") || server.starts_with("https://")) {
            return Err(ConfigError::Scheme { url: server, expected: "http:// or https://" });
        }

        let ws_url = match args.ws_url {
            Some(url) if url.starts_with("ws://") || url.starts_with("wss://") => url,
            Some(url) => return Err(ConfigError::Scheme { url, expected: "ws:// or wss://" }),
            None => derive_ws_url(&server),
        };

        Ok(Self {
            server,
            ws_url,
            auth: AuthContext::new(args.user_id, args.username, args.token),
            poll_interval: Duration::from_millis(args.poll_interval_ms),
            echo_ttl: Duration::from_millis(args.echo_ttl_ms),
        })
    }
}

/// Raw WebSocket endpoint of the server's STOMP broker.
fn derive_ws_url(server: &str) -> String {
    let base = match server.strip_prefix("https://") {
        Some(rest) => format!("wss://{rest}"),
        None => format!("ws://{}", server.trim_start_matches("http://")),
    };
    format!("{base}/ws/websocket")
}
