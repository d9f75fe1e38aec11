//! Configuration Module
//!
//! Handles loading and managing store configuration from environment variables.
//! Values are read once at startup.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

// == Cache Settings ==
/// Sizing and expiry of one lookup cache instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// Maximum entry age, None = no age-based expiry
    pub ttl: Option<Duration>,
}

// == Job Settings ==
/// Behaviour of an async job registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSettings {
    /// How long a completed job stays visible
    pub result_ttl: Duration,
    /// Interval between sweeps of expired jobs
    pub sweep_interval: Duration,
    /// Maximum number of producers running at once
    pub max_workers: usize,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            result_ttl: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(60),
            max_workers: 4,
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Cache for single-entity lookups
    pub entity_cache: CacheSettings,
    /// Cache for list query results
    pub query_cache: CacheSettings,
    /// Log extraction job registry
    pub jobs: JobSettings,
    /// Interval between cache sweeps
    pub sweep_interval: Duration,
    /// Active application log; archives sit next to it
    pub log_file_path: PathBuf,
    /// Artificial delay before each log extraction
    pub log_extract_delay: Duration,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `ENTITY_CACHE_MAX_ENTRIES` - Entity cache capacity (default: 3)
    /// - `ENTITY_CACHE_TTL` - Entity cache TTL in seconds, `0`/`none` = no TTL (default: none)
    /// - `QUERY_CACHE_MAX_ENTRIES` - Query cache capacity (default: 5)
    /// - `QUERY_CACHE_TTL` - Query cache TTL in seconds (default: 600)
    /// - `JOB_RESULT_TTL` - Seconds a finished job stays readable (default: 300)
    /// - `SWEEP_INTERVAL` - Seconds between expiry sweeps (default: 60)
    /// - `JOB_WORKERS` - Concurrent job producers (default: 4)
    /// - `LOG_FILE_PATH` - Application log file (default: logs/application.log)
    /// - `LOG_EXTRACT_DELAY` - Seconds of artificial extraction delay (default: 0)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let sweep_interval = env_secs("SWEEP_INTERVAL").unwrap_or(defaults.sweep_interval);

        Self {
            server_port: env_parse("SERVER_PORT").unwrap_or(defaults.server_port),
            entity_cache: CacheSettings {
                max_entries: env_parse("ENTITY_CACHE_MAX_ENTRIES")
                    .unwrap_or(defaults.entity_cache.max_entries),
                ttl: env_ttl("ENTITY_CACHE_TTL").unwrap_or(defaults.entity_cache.ttl),
            },
            query_cache: CacheSettings {
                max_entries: env_parse("QUERY_CACHE_MAX_ENTRIES")
                    .unwrap_or(defaults.query_cache.max_entries),
                ttl: env_ttl("QUERY_CACHE_TTL").unwrap_or(defaults.query_cache.ttl),
            },
            jobs: JobSettings {
                result_ttl: env_secs("JOB_RESULT_TTL").unwrap_or(defaults.jobs.result_ttl),
                sweep_interval,
                max_workers: env_parse("JOB_WORKERS").unwrap_or(defaults.jobs.max_workers),
            },
            sweep_interval,
            log_file_path: env::var("LOG_FILE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_file_path),
            log_extract_delay: env_secs("LOG_EXTRACT_DELAY")
                .unwrap_or(defaults.log_extract_delay),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            entity_cache: CacheSettings {
                max_entries: 3,
                ttl: None,
            },
            query_cache: CacheSettings {
                max_entries: 5,
                ttl: Some(Duration::from_secs(600)),
            },
            jobs: JobSettings::default(),
            sweep_interval: Duration::from_secs(60),
            log_file_path: PathBuf::from("logs/application.log"),
            log_extract_delay: Duration::ZERO,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn env_secs(name: &str) -> Option<Duration> {
    env_parse::<u64>(name).map(Duration::from_secs)
}

/// Outer None = unset or unparsable, inner None = explicitly no TTL.
fn env_ttl(name: &str) -> Option<Option<Duration>> {
    let raw = env::var(name).ok()?;
    parse_ttl(&raw)
}

fn parse_ttl(raw: &str) -> Option<Option<Duration>> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("none") {
        return Some(None);
    }
    match raw.parse::<u64>().ok()? {
        0 => Some(None),
        secs => Some(Some(Duration::from_secs(secs))),
    }
}
