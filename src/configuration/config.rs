use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::error_handling::types::ConfigError;

/// Runtime configuration for the whole process.
///
/// Every option is a long flag with an environment-variable fallback and a
/// default, so the binary runs with no arguments against a local agent.
/// Command-line values take precedence over the environment.
///
/// # Fields Overview
///
/// - `api_url` / `api_token`: where and how to reach the agent's
///   connection snapshot endpoint
/// - `database` / `archive_database`: the two SQLite files
/// - `flush_interval`: minutes between cache flushes (the write-behind
///   cadence)
/// - `poll_interval_ms`: milliseconds between snapshot polls
/// - `fetch_timeout_secs`: hard timeout on a snapshot request
/// - `port`: web API and dashboard port
/// - `host_suffixes`: ordered, comma-separated suffix allow-list used to
///   collapse subdomains; immutable after start
#[derive(Parser, Debug, Clone)]
#[command(name = "flowvault")]
#[command(version)]
#[command(about = "Write-behind recorder for a proxy agent's connection snapshots")]
pub struct Config {
    /// URL of the agent's connections snapshot endpoint
    #[arg(
        long,
        env = "FLOWVAULT_API_URL",
        default_value = "http://127.0.0.1:9090/connections"
    )]
    pub api_url: String,

    /// Bearer token for the agent API; no Authorization header is sent
    /// when empty
    #[arg(long, env = "FLOWVAULT_API_TOKEN", default_value = "")]
    pub api_token: String,

    /// Path of the primary SQLite database
    #[arg(long, env = "FLOWVAULT_DATABASE", default_value = "./traffic.db")]
    pub database: PathBuf,

    /// Path of the archive SQLite database
    #[arg(
        long,
        env = "FLOWVAULT_ARCHIVE_DATABASE",
        default_value = "./traffic_archive.db"
    )]
    pub archive_database: PathBuf,

    /// Minutes between live-cache flushes to the primary database
    #[arg(long, env = "FLOWVAULT_FLUSH_INTERVAL", default_value_t = 3)]
    pub flush_interval: u64,

    /// Milliseconds between agent snapshot polls
    #[arg(long, env = "FLOWVAULT_POLL_INTERVAL_MS", default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Seconds before an agent snapshot request times out
    #[arg(long, env = "FLOWVAULT_FETCH_TIMEOUT_SECS", default_value_t = 10)]
    pub fetch_timeout_secs: u64,

    /// Port for the web API and dashboard
    #[arg(long, env = "FLOWVAULT_PORT", default_value_t = 8081)]
    pub port: u16,

    /// Comma-separated, ordered host-suffix allow-list
    #[arg(long, env = "FLOWVAULT_HOST_SUFFIXES", default_value = "")]
    pub host_suffixes: String,
}

impl Config {
    pub fn from_args() -> Self {
        Config::parse()
    }

    /// Rejects values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_url.is_empty() {
            return Err(ConfigError::BadUrl("API URL must not be empty".to_string()));
        }
        if self.flush_interval == 0 {
            return Err(ConfigError::BadFlushInterval(
                "flush interval must be at least 1 minute".to_string(),
            ));
        }
        if self.poll_interval_ms < 100 {
            return Err(ConfigError::BadPollInterval(format!(
                "poll interval must be at least 100 ms, got {}",
                self.poll_interval_ms
            )));
        }
        Ok(())
    }

    /// The allow-list in configured order, with empty entries dropped so
    /// a blank value cannot match every host.
    pub fn suffix_list(&self) -> Vec<String> {
        self.host_suffixes
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn flush_period(&self) -> Duration {
        Duration::from_secs(self.flush_interval * 60)
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut full = vec!["flowvault"];
        full.extend_from_slice(args);
        Config::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);
        assert_eq!(config.api_url, "http://127.0.0.1:9090/connections");
        assert_eq!(config.flush_interval, 3);
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.fetch_timeout_secs, 10);
        assert_eq!(config.port, 8081);
        assert!(config.suffix_list().is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = parse(&[
            "--api-url",
            "http://10.0.0.1:9090/connections",
            "--flush-interval",
            "5",
            "--port",
            "9000",
        ]);
        assert_eq!(config.api_url, "http://10.0.0.1:9090/connections");
        assert_eq!(config.flush_period(), Duration::from_secs(300));
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_suffix_list_splits_and_drops_empties() {
        let config = parse(&["--host-suffixes", "googlevideo.com, example.com,,"]);
        assert_eq!(
            config.suffix_list(),
            vec!["googlevideo.com".to_string(), "example.com".to_string()]
        );
    }

    #[test]
    fn test_validate_rejects_bad_intervals() {
        let config = parse(&["--flush-interval", "0"]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BadFlushInterval(_))
        ));

        let config = parse(&["--poll-interval-ms", "10"]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BadPollInterval(_))
        ));
    }
}
