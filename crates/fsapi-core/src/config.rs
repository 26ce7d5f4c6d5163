//! Application configuration
//!
//! Configuration is assembled with the `config` crate from built-in defaults,
//! optional `config/*` files, `FSAPI__SECTION__KEY` environment variables and
//! the flat variable names the service has always accepted (`FSAPI_PORT`,
//! `ESL_HOST`, `ESL_PORT`, `ESL_PASSWORD`, `API_TOKENS`).

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub esl: EslConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// HTTP server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Time allowed for a client to send request headers, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Keep-alive for idle connections, in seconds
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,

    /// Maximum accepted JSON body size
    #[serde(default = "default_max_body")]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    37274
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_request_timeout() -> u64 {
    15
}

fn default_keep_alive() -> u64 {
    60
}

fn default_max_body() -> usize {
    1024 * 1024
}

/// FreeSWITCH event socket configuration
#[derive(Debug, Deserialize, Clone)]
pub struct EslConfig {
    /// Switch hostname or IP
    #[serde(default = "default_esl_host")]
    pub host: String,

    /// Event socket port
    #[serde(default = "default_esl_port")]
    pub port: u16,

    /// Event socket password
    #[serde(default = "default_esl_password")]
    pub password: String,

    /// Per-command reply timeout in seconds
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// TCP connect + auth handshake timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_esl_host() -> String {
    "localhost".to_string()
}

fn default_esl_port() -> u16 {
    8021
}

fn default_esl_password() -> String {
    "ClueCon".to_string()
}

fn default_command_timeout() -> u64 {
    10
}

fn default_connect_timeout() -> u64 {
    5
}

/// API authentication configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AuthConfig {
    /// Comma-separated bearer tokens; empty disables token checks
    #[serde(default)]
    pub api_tokens: String,
}

impl AuthConfig {
    /// Configured bearer tokens, trimmed, empties dropped
    pub fn tokens(&self) -> Vec<String> {
        self.api_tokens
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl EslConfig {
    /// `host:port` of the event socket
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for EslConfig {
    fn default() -> Self {
        Self {
            host: default_esl_host(),
            port: default_esl_port(),
            password: default_esl_password(),
            command_timeout_secs: default_command_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and optional config files
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?
            .set_default("server.workers", default_workers() as i64)?
            .set_default("server.request_timeout_secs", 15)?
            .set_default("server.keep_alive_secs", 60)?
            .set_default("server.max_body_bytes", default_max_body() as i64)?
            .set_default("esl.host", default_esl_host())?
            .set_default("esl.port", i64::from(default_esl_port()))?
            .set_default("esl.password", default_esl_password())?
            .set_default("esl.command_timeout_secs", 10)?
            .set_default("esl.connect_timeout_secs", 5)?
            .set_default("auth.api_tokens", "")?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables with FSAPI__ prefix
            .add_source(
                Environment::with_prefix("FSAPI")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            // Support legacy environment variables
            .set_override_option("server.port", legacy_var("FSAPI_PORT"))?
            .set_override_option("esl.host", legacy_var("ESL_HOST"))?
            .set_override_option("esl.port", legacy_var("ESL_PORT"))?
            .set_override_option("esl.password", legacy_var("ESL_PASSWORD"))?
            .set_override_option("auth.api_tokens", legacy_var("API_TOKENS"))?
            .build()?;

        config.try_deserialize()
    }

    /// Get the server bind address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Non-empty value of a legacy environment variable
fn legacy_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}
