//! Configuration Module
//!
//! Handles loading server, cache and backend settings from environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::queries::{APPOINTMENTS, ATTENDANCE, GROUPS, SESSIONS};

/// Where table data lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// In-process tables, lost on restart
    Memory,
    /// Hosted PostgREST endpoint at `SUPABASE_URL`
    Postgrest,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Memory => "memory",
            Backend::Postgrest => "postgrest",
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Backend::Memory),
            "postgrest" | "supabase" => Ok(Backend::Postgrest),
            other => Err(format!("unknown data backend '{}'", other)),
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// TTL in seconds for cached reads
    pub default_ttl: u64,
    /// Page size when a list request names none
    pub page_limit: u64,
    /// Largest page size a list request may ask for
    pub max_page_limit: u64,
    /// Upper bound for each remote round trip
    pub request_timeout: Duration,
    /// Expired-entry purge interval in seconds; 0 leaves eviction lazy
    pub cleanup_interval: u64,
    /// Tables exposed over HTTP
    pub tables: Vec<String>,
    pub backend: Backend,
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    /// Service account used to obtain a bearer token at startup
    pub auth_email: Option<String>,
    pub auth_password: Option<String>,
}

fn var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn table_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `DEFAULT_TTL` - Read cache TTL in seconds (default: 300)
    /// - `PAGE_LIMIT` - Default page size (default: 20)
    /// - `MAX_PAGE_LIMIT` - Largest page size (default: 100)
    /// - `REQUEST_TIMEOUT` - Remote call timeout in seconds (default: 10)
    /// - `CLEANUP_INTERVAL` - Purge frequency in seconds, 0 disables (default: 0)
    /// - `TABLES` - Comma separated exposed tables (default: the portal tables)
    /// - `DATA_BACKEND` - `memory` or `postgrest` (default: memory)
    /// - `SUPABASE_URL`, `SUPABASE_ANON_KEY` - Project endpoint and key
    /// - `AUTH_EMAIL`, `AUTH_PASSWORD` - Optional sign-in for a bearer token
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: var("SERVER_PORT").unwrap_or(defaults.server_port),
            default_ttl: var("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            page_limit: var("PAGE_LIMIT").unwrap_or(defaults.page_limit),
            max_page_limit: var("MAX_PAGE_LIMIT").unwrap_or(defaults.max_page_limit),
            request_timeout: var("REQUEST_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            cleanup_interval: var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            tables: non_empty("TABLES")
                .map(|raw| table_list(&raw))
                .unwrap_or(defaults.tables),
            backend: var("DATA_BACKEND").unwrap_or(defaults.backend),
            supabase_url: non_empty("SUPABASE_URL"),
            supabase_anon_key: non_empty("SUPABASE_ANON_KEY"),
            auth_email: non_empty("AUTH_EMAIL"),
            auth_password: non_empty("AUTH_PASSWORD"),
        }
    }

    /// True when `table` is exposed over HTTP.
    pub fn serves(&self, table: &str) -> bool {
        self.tables.iter().any(|t| t == table)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            default_ttl: 300,
            page_limit: 20,
            max_page_limit: 100,
            request_timeout: Duration::from_secs(10),
            cleanup_interval: 0,
            tables: [GROUPS, SESSIONS, ATTENDANCE, APPOINTMENTS]
                .map(String::from)
                .to_vec(),
            backend: Backend::Memory,
            supabase_url: None,
            supabase_anon_key: None,
            auth_email: None,
            auth_password: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server_port", &self.server_port)
            .field("default_ttl", &self.default_ttl)
            .field("page_limit", &self.page_limit)
            .field("max_page_limit", &self.max_page_limit)
            .field("request_timeout", &self.request_timeout)
            .field("cleanup_interval", &self.cleanup_interval)
            .field("tables", &self.tables)
            .field("backend", &self.backend)
            .field("supabase_url", &self.supabase_url)
            .field("auth_email", &self.auth_email)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.default_ttl, 300);
        assert_eq!(config.page_limit, 20);
        assert_eq!(config.max_page_limit, 100);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.cleanup_interval, 0);
        assert_eq!(config.backend, Backend::Memory);
        assert!(config.serves("groups"));
        assert!(!config.serves("users"));
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        for name in [
            "SERVER_PORT",
            "DEFAULT_TTL",
            "PAGE_LIMIT",
            "MAX_PAGE_LIMIT",
            "REQUEST_TIMEOUT",
            "CLEANUP_INTERVAL",
            "TABLES",
            "DATA_BACKEND",
        ] {
            env::remove_var(name);
        }

        let config = Config::from_env();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.default_ttl, 300);
        assert_eq!(config.tables.len(), 4);
        assert_eq!(config.backend, Backend::Memory);
    }

    #[test]
    fn test_table_list_parsing() {
        assert_eq!(
            table_list(" groups, ,sessions ,"),
            vec!["groups".to_string(), "sessions".to_string()]
        );
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("Postgrest".parse::<Backend>(), Ok(Backend::Postgrest));
        assert_eq!("memory".parse::<Backend>(), Ok(Backend::Memory));
        assert!("mysql".parse::<Backend>().is_err());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = Config {
            supabase_anon_key: Some("anon-secret".to_string()),
            auth_password: Some("hunter2".to_string()),
            ..Config::default()
        };

        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("anon-secret"));
        assert!(!rendered.contains("hunter2"));
    }
}
