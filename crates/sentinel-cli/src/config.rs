use std::path::Path;
use std::time::Duration;

use sentinel_node::NodeConfig;
use sentinel_storage::LedgerConfig;

/// Configuration, grouped section-by-section. Deserialized from an optional
/// TOML file; every field also has a hardcoded default, and every field can
/// be overridden by an `SENTINEL_<SECTION>_<FIELD>` environment variable
/// (applied after the file, before returning).
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub simulation: SimulationSection,
    pub database: DatabaseSection,
    pub agent: AgentSection,
    pub ledger: LedgerSection,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct SimulationSection {
    pub default_agents: usize,
    pub use_parallel_threshold: usize,
    pub stop_on_error: bool,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub path: String,
    pub timeout_seconds: u64,
    pub max_connections: u32,
    pub journal_mode: String,
    pub cache_size_kb: u32,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub anomaly_threshold: f64,
    pub validation_failure_rate: f64,
    pub min_data_points: usize,
    pub cache_max_size: usize,
    pub recent_data_capacity: usize,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct LedgerSection {
    pub cache_ttl_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            simulation: SimulationSection::default(),
            database: DatabaseSection::default(),
            agent: AgentSection::default(),
            ledger: LedgerSection::default(),
        }
    }
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self { default_agents: 100, use_parallel_threshold: 50, stop_on_error: false }
    }
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: "ledger.db".to_string(),
            timeout_seconds: 5,
            max_connections: 10,
            journal_mode: "WAL".to_string(),
            cache_size_kb: 10_000,
        }
    }
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            anomaly_threshold: -0.05,
            validation_failure_rate: 0.2,
            min_data_points: 10,
            cache_max_size: 100,
            recent_data_capacity: 100,
        }
    }
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self { cache_ttl_seconds: 300 }
    }
}

impl Config {
    /// Loads a TOML file at `path` if it exists, falling back to defaults if
    /// `path` is `None`; either way, environment overrides are then applied.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)
                    .map_err(|e| anyhow::anyhow!("could not read config file {}: {e}", p.display()))?;
                toml::from_str(&text).map_err(|e| anyhow::anyhow!("invalid config file {}: {e}", p.display()))?
            }
            None => Config::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        env_usize("SENTINEL_SIMULATION_DEFAULT_AGENTS", &mut self.simulation.default_agents);
        env_usize("SENTINEL_SIMULATION_USE_PARALLEL_THRESHOLD", &mut self.simulation.use_parallel_threshold);
        env_bool("SENTINEL_SIMULATION_STOP_ON_ERROR", &mut self.simulation.stop_on_error);

        env_string("SENTINEL_DATABASE_PATH", &mut self.database.path);
        env_u64("SENTINEL_DATABASE_TIMEOUT_SECONDS", &mut self.database.timeout_seconds);
        env_u32("SENTINEL_DATABASE_MAX_CONNECTIONS", &mut self.database.max_connections);
        env_string("SENTINEL_DATABASE_JOURNAL_MODE", &mut self.database.journal_mode);
        env_u32("SENTINEL_DATABASE_CACHE_SIZE_KB", &mut self.database.cache_size_kb);

        env_f64("SENTINEL_AGENT_ANOMALY_THRESHOLD", &mut self.agent.anomaly_threshold);
        env_f64("SENTINEL_AGENT_VALIDATION_FAILURE_RATE", &mut self.agent.validation_failure_rate);
        env_usize("SENTINEL_AGENT_MIN_DATA_POINTS", &mut self.agent.min_data_points);
        env_usize("SENTINEL_AGENT_CACHE_MAX_SIZE", &mut self.agent.cache_max_size);
        env_usize("SENTINEL_AGENT_RECENT_DATA_CAPACITY", &mut self.agent.recent_data_capacity);

        env_u64("SENTINEL_LEDGER_CACHE_TTL_SECONDS", &mut self.ledger.cache_ttl_seconds);
    }

    pub fn node_config(&self) -> NodeConfig {
        NodeConfig {
            anomaly_threshold: self.agent.anomaly_threshold,
            min_data_points: self.agent.min_data_points,
            validation_failure_rate: self.agent.validation_failure_rate,
            cache_max_size: self.agent.cache_max_size,
            recent_data_capacity: self.agent.recent_data_capacity,
            batch_size: NodeConfig::default().batch_size,
        }
    }

    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            path: self.database.path.clone(),
            max_connections: self.database.max_connections,
            timeout: Duration::from_secs(self.database.timeout_seconds),
            cache_ttl: Duration::from_secs(self.ledger.cache_ttl_seconds),
            max_retries: LedgerConfig::default().max_retries,
            cache_size_kb: self.database.cache_size_kb,
        }
    }
}

fn env_string(key: &str, field: &mut String) {
    if let Ok(v) = std::env::var(key) {
        *field = v;
    }
}

fn env_usize(key: &str, field: &mut usize) {
    if let Some(v) = std::env::var(key).ok().and_then(|s| s.parse().ok()) {
        *field = v;
    }
}

fn env_u32(key: &str, field: &mut u32) {
    if let Some(v) = std::env::var(key).ok().and_then(|s| s.parse().ok()) {
        *field = v;
    }
}

fn env_u64(key: &str, field: &mut u64) {
    if let Some(v) = std::env::var(key).ok().and_then(|s| s.parse().ok()) {
        *field = v;
    }
}

fn env_f64(key: &str, field: &mut f64) {
    if let Some(v) = std::env::var(key).ok().and_then(|s| s.parse().ok()) {
        *field = v;
    }
}

fn env_bool(key: &str, field: &mut bool) {
    if let Some(v) = std::env::var(key).ok().and_then(|s| s.parse().ok()) {
        *field = v;
    }
}
