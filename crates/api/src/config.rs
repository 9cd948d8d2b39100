use std::str::FromStr;
use std::time::Duration;

use smoke_events::feed::DEFAULT_MAX_PARTITIONS;

/// Default bound on a single run's aggregation phase, matching the
/// platform's maximum function timeout.
const DEFAULT_RUN_DEADLINE_SECS: u64 = 540;

/// Where verdicts are appended and read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictSourceKind {
    /// The in-process feed behind this service's verdict routes.
    Service,
    /// The realtime store under `testRuns/{run_id}`.
    Realtime,
}

impl FromStr for VerdictSourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "service" => Ok(Self::Service),
            "realtime" => Ok(Self::Realtime),
            other => Err(format!("unknown verdict source '{other}'")),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `600`).
    ///
    /// Applies to every route except the entry endpoint, which is bounded
    /// by the run deadline instead.
    pub request_timeout_secs: u64,
    /// Upper bound on draining background cleanup at shutdown (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Base URL under which this service is reachable, used in failure
    /// locators (default: `http://localhost:{port}`).
    pub public_base_url: String,
    /// Aggregation deadline; `None` waits forever (default: 540 s).
    pub run_deadline: Option<Duration>,
    /// Backing store for verdicts (default: [`VerdictSourceKind::Service`]).
    pub verdict_source: VerdictSourceKind,
    /// Run partitions the in-process feed retains (default: `1024`).
    pub feed_max_partitions: usize,
    /// Test names a run waits for; `None` counts one verdict per stimulus.
    pub expected_tests: Option<Vec<String>>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `REQUEST_TIMEOUT_SECS` | `600`                      |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    /// | `PUBLIC_BASE_URL`      | `http://localhost:{PORT}`  |
    /// | `RUN_DEADLINE_SECS`    | `540` (`0` = unbounded)    |
    /// | `VERDICT_SOURCE`       | `service` (or `realtime`)  |
    /// | `FEED_MAX_PARTITIONS`  | `1024`                     |
    /// | `EXPECTED_TESTS`       | unset (comma-separated)    |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "600".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"));

        let run_deadline_secs: u64 = std::env::var("RUN_DEADLINE_SECS")
            .unwrap_or_else(|_| DEFAULT_RUN_DEADLINE_SECS.to_string())
            .parse()
            .expect("RUN_DEADLINE_SECS must be a valid u64");

        let verdict_source: VerdictSourceKind = std::env::var("VERDICT_SOURCE")
            .unwrap_or_else(|_| "service".into())
            .parse()
            .expect("VERDICT_SOURCE must be 'service' or 'realtime'");

        let feed_max_partitions: usize = std::env::var("FEED_MAX_PARTITIONS")
            .unwrap_or_else(|_| DEFAULT_MAX_PARTITIONS.to_string())
            .parse()
            .expect("FEED_MAX_PARTITIONS must be a valid usize");

        let expected_tests = std::env::var("EXPECTED_TESTS")
            .ok()
            .and_then(|raw| parse_name_list(&raw));

        Self {
            host,
            port,
            request_timeout_secs,
            shutdown_timeout_secs,
            public_base_url,
            run_deadline: deadline_from_secs(run_deadline_secs),
            verdict_source,
            feed_max_partitions,
            expected_tests,
        }
    }
}

/// `0` disables the deadline.
fn deadline_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Comma-separated names; blanks are dropped and an empty list is unset.
fn parse_name_list(raw: &str) -> Option<Vec<String>> {
    let names: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect();
    (!names.is_empty()).then_some(names)
}
