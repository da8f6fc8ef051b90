use std::path::PathBuf;
use std::time::Duration;

/// Connection pool and deadline settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// SQLite database file.
    pub path: PathBuf,
    /// Upper bound on open connections.
    pub max_connections: u32,
    /// Idle connections the pool tries to keep warm. `None` keeps it at
    /// `max_connections`.
    pub min_idle: Option<u32>,
    /// Idle connections older than this are closed.
    pub idle_timeout: Option<Duration>,
    /// How long a caller waits to check a connection out of the pool.
    pub connection_timeout: Duration,
    /// Deadline for a single store operation, checkout included.
    pub query_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("marquee.db"),
            max_connections: 25,
            min_idle: Some(25),
            idle_timeout: Some(Duration::from_secs(15 * 60)),
            connection_timeout: Duration::from_secs(3),
            query_timeout: Duration::from_secs(3),
        }
    }
}

impl DbConfig {
    /// Read `MARQUEE_DB_*` overrides on top of the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let path = std::env::var("MARQUEE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.path);
        let max_connections = env_parse("MARQUEE_DB_MAX_CONNS").unwrap_or(defaults.max_connections);
        let min_idle = env_parse("MARQUEE_DB_MIN_IDLE")
            .or(defaults.min_idle)
            .map(|n: u32| n.min(max_connections));
        let idle_timeout = env_parse("MARQUEE_DB_IDLE_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .or(defaults.idle_timeout);
        let query_timeout = env_parse("MARQUEE_DB_QUERY_TIMEOUT_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.query_timeout);

        Self {
            path,
            max_connections,
            min_idle,
            idle_timeout,
            connection_timeout: query_timeout,
            query_timeout,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
