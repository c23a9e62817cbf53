use std::env;
use std::time::Duration;

/// Runtime settings for the what-if engine.
///
/// Every field has a sensible default so the engine can run without any
/// configuration (demo mode). Each default can be overridden through the
/// `WHATIF_*` environment variables before explicit construction.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the external topology store. `None` means the engine
    /// runs against the built-in demo topology.
    pub topology_url: Option<String>,

    /// Timeout for a single topology store request.
    pub topology_timeout: Duration,

    /// Retention TTL for cached simulation results.
    pub job_ttl: Duration,

    /// Upper bound on concurrently executing simulation runs.
    pub max_concurrent_simulations: usize,

    /// Token accepted by the static auth gate.
    pub api_token: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            topology_url: None,
            topology_timeout: Duration::from_secs(5),
            job_ttl: Duration::from_secs(3600),
            max_concurrent_simulations: 8,
            api_token: "demo-token".to_string(),
        }
    }
}

impl Settings {
    /// Builds settings from the environment, falling back to defaults for
    /// anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Settings::default();

        Settings {
            topology_url: env::var("WHATIF_TOPOLOGY_URL").ok().filter(|s| !s.is_empty()),
            topology_timeout: env_secs("WHATIF_TOPOLOGY_TIMEOUT_SECS").unwrap_or(defaults.topology_timeout),
            job_ttl: env_secs("WHATIF_JOB_TTL_SECS").unwrap_or(defaults.job_ttl),
            max_concurrent_simulations: env::var("WHATIF_MAX_CONCURRENT")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.max_concurrent_simulations),
            api_token: env::var("WHATIF_API_TOKEN").ok().filter(|s| !s.is_empty()).unwrap_or(defaults.api_token),
        }
    }
}

fn env_secs(key: &str) -> Option<Duration> {
    env::var(key).ok().and_then(|v| v.parse::<u64>().ok()).map(Duration::from_secs)
}
