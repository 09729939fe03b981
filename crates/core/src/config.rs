use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::job::JobType;
use crate::telemetry::ThermalLevel;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env_opt(key)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable env override");
            None
        }
    }
}

fn env_bool(key: &str) -> Option<bool> {
    let raw = env_opt(key)?;
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!(key, value = %raw, "ignoring unparseable env override");
            None
        }
    }
}

// ── Top-level config ──────────────────────────────────────────

/// Full edge worker configuration, usually read from `edgeloop.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub worker: WorkerConfig,

    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    #[serde(default)]
    pub outbox: OutboxConfig,

    /// External process executors keyed by job type wire name.
    #[serde(default)]
    pub executors: BTreeMap<String, ExecutorCommand>,
}

// ── Worker ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "default_tick_interval")]
    pub tick_interval_seconds: u64,

    /// Minimum battery charge (0.0..=1.0) required to take work.
    #[serde(default = "default_minimum_battery")]
    pub minimum_battery_fraction: f64,

    /// Thermal ceiling: work is accepted only strictly below this level.
    #[serde(default = "default_maximum_thermal")]
    pub maximum_thermal_level: ThermalLevel,

    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Deadline for jobs that carry no `max_duration_sec` of their own.
    #[serde(default = "default_job_timeout")]
    pub default_job_timeout_seconds: u64,

    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    #[serde(default = "default_cooldown_window")]
    pub cooldown_window_seconds: u64,

    /// Cap on retained completed/failed history entries.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Stable device identifier. When absent, a UUID is generated once and
    /// kept in `device_id_file` so restarts register as the same node.
    #[serde(default)]
    pub device_id: Option<String>,

    /// Where a generated device id is stored. `None` disables storage.
    #[serde(default = "default_device_id_file")]
    pub device_id_file: Option<PathBuf>,
}

fn default_tick_interval() -> u64 {
    5
}

fn default_minimum_battery() -> f64 {
    0.30
}

fn default_maximum_thermal() -> ThermalLevel {
    ThermalLevel::Critical
}

fn default_max_concurrent_jobs() -> usize {
    1
}

fn default_job_timeout() -> u64 {
    300
}

fn default_max_consecutive_failures() -> u32 {
    3
}

fn default_cooldown_window() -> u64 {
    60
}

fn default_history_limit() -> usize {
    500
}

fn default_device_id_file() -> Option<PathBuf> {
    Some(PathBuf::from("data/device_id"))
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            tick_interval_seconds: default_tick_interval(),
            minimum_battery_fraction: default_minimum_battery(),
            maximum_thermal_level: default_maximum_thermal(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
            default_job_timeout_seconds: default_job_timeout(),
            max_consecutive_failures: default_max_consecutive_failures(),
            cooldown_window_seconds: default_cooldown_window(),
            history_limit: default_history_limit(),
            device_id: None,
            device_id_file: default_device_id_file(),
        }
    }
}

impl WorkerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_seconds)
    }

    pub fn default_job_timeout(&self) -> Duration {
        Duration::from_secs(self.default_job_timeout_seconds)
    }

    pub fn cooldown_window(&self) -> Duration {
        Duration::from_secs(self.cooldown_window_seconds)
    }

    /// The configured device id, else the one stored in `device_id_file`,
    /// else a new UUID (stored for next time).
    pub fn resolved_device_id(&self) -> String {
        if let Some(id) = &self.device_id {
            return id.clone();
        }
        let Some(path) = &self.device_id_file else {
            return uuid::Uuid::new_v4().to_string();
        };
        if let Ok(stored) = std::fs::read_to_string(path) {
            let stored = stored.trim();
            if !stored.is_empty() {
                return stored.to_string();
            }
        }
        let id = uuid::Uuid::new_v4().to_string();
        match store_device_id(path, &id) {
            Ok(()) => tracing::info!(path = %path.display(), device_id = %id, "generated device id"),
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "could not store generated device id; it will change on restart"
            ),
        }
        id
    }
}

fn store_device_id(path: &Path, id: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, format!("{id}\n"))
}

// ── Coordinator ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer credential attached to every request when set.
    #[serde(default)]
    pub api_token: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080".into()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_token: None,
            request_timeout_seconds: default_request_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

impl CoordinatorConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

// ── Outbox ────────────────────────────────────────────────────

/// Durable retry queue for results the coordinator did not acknowledge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_outbox_path")]
    pub path: PathBuf,

    #[serde(default = "default_outbox_retries")]
    pub max_retries: u32,
}

fn default_outbox_path() -> PathBuf {
    PathBuf::from("data/outbox.json")
}

fn default_outbox_retries() -> u32 {
    3
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_outbox_path(),
            max_retries: default_outbox_retries(),
        }
    }
}

// ── Executors ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorCommand {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

// ── Loading & Validation ──────────────────────────────────────

impl Config {
    /// Parse config from a TOML string, then apply env overrides and validate.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Load from `path` when given and present, otherwise start from defaults.
    /// Env overrides and validation apply either way.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) if p.exists() => Self::from_file(p),
            Some(p) => {
                tracing::warn!(path = %p.display(), "config file not found, using defaults");
                Self::from_defaults()
            }
            None => Self::from_defaults(),
        }
    }

    fn from_defaults() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// - `EDGELOOP_COORDINATOR_URL` → `coordinator.base_url`
    /// - `EDGELOOP_API_TOKEN` → `coordinator.api_token`
    /// - `EDGELOOP_TICK_INTERVAL_SECONDS` → `worker.tick_interval_seconds`
    /// - `EDGELOOP_MAX_CONCURRENT_JOBS` → `worker.max_concurrent_jobs`
    /// - `EDGELOOP_DEVICE_ID` → `worker.device_id`
    /// - `EDGELOOP_OUTBOX_ENABLED` → `outbox.enabled`
    /// - `EDGELOOP_OUTBOX_PATH` → `outbox.path`
    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_opt("EDGELOOP_COORDINATOR_URL") {
            self.coordinator.base_url = v;
        }
        if let Some(v) = env_opt("EDGELOOP_API_TOKEN") {
            self.coordinator.api_token = Some(v);
        }
        if let Some(v) = env_parsed("EDGELOOP_TICK_INTERVAL_SECONDS") {
            self.worker.tick_interval_seconds = v;
        }
        if let Some(v) = env_parsed("EDGELOOP_MAX_CONCURRENT_JOBS") {
            self.worker.max_concurrent_jobs = v;
        }
        if let Some(v) = env_opt("EDGELOOP_DEVICE_ID") {
            self.worker.device_id = Some(v);
        }
        if let Some(v) = env_bool("EDGELOOP_OUTBOX_ENABLED") {
            self.outbox.enabled = v;
        }
        if let Some(v) = env_opt("EDGELOOP_OUTBOX_PATH") {
            self.outbox.path = PathBuf::from(v);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_worker()?;
        self.validate_coordinator()?;
        self.validate_executors()?;
        if self.outbox.max_retries == 0 {
            return Err(ConfigError::Invalid("outbox.max_retries must be at least 1".into()));
        }
        Ok(())
    }

    fn validate_worker(&self) -> Result<(), ConfigError> {
        let w = &self.worker;
        if w.tick_interval_seconds == 0 {
            return Err(ConfigError::Invalid("worker.tick_interval_seconds must be positive".into()));
        }
        if w.max_concurrent_jobs == 0 {
            return Err(ConfigError::Invalid("worker.max_concurrent_jobs must be at least 1".into()));
        }
        if w.max_consecutive_failures == 0 {
            return Err(ConfigError::Invalid(
                "worker.max_consecutive_failures must be at least 1".into(),
            ));
        }
        if w.default_job_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "worker.default_job_timeout_seconds must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&w.minimum_battery_fraction) {
            return Err(ConfigError::Invalid(format!(
                "worker.minimum_battery_fraction {} is outside 0.0..=1.0",
                w.minimum_battery_fraction
            )));
        }
        Ok(())
    }

    fn validate_coordinator(&self) -> Result<(), ConfigError> {
        let url = self.coordinator.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "coordinator.base_url '{url}' must start with http:// or https://"
            )));
        }
        Ok(())
    }

    fn validate_executors(&self) -> Result<(), ConfigError> {
        for (name, exec) in &self.executors {
            name.parse::<JobType>()
                .map_err(|e| ConfigError::Invalid(format!("executors.{name}: {e}")))?;
            if exec.command.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("executors.{name}: empty command")));
            }
        }
        Ok(())
    }

    /// Configured executors with their job types resolved.
    pub fn executor_commands(&self) -> Result<Vec<(JobType, &ExecutorCommand)>, ConfigError> {
        self.executors
            .iter()
            .map(|(name, exec)| {
                let job_type = name
                    .parse::<JobType>()
                    .map_err(|e| ConfigError::Invalid(format!("executors.{name}: {e}")))?;
                Ok((job_type, exec))
            })
            .collect()
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        let w = &self.worker;
        tracing::info!("Config loaded:");
        tracing::info!(
            "  worker:      tick={}s, max_jobs={}, timeout={}s, min_battery={:.2}, max_thermal={}",
            w.tick_interval_seconds,
            w.max_concurrent_jobs,
            w.default_job_timeout_seconds,
            w.minimum_battery_fraction,
            w.maximum_thermal_level
        );
        tracing::info!(
            "  cooldown:    after {} failures for {}s",
            w.max_consecutive_failures,
            w.cooldown_window_seconds
        );
        tracing::info!(
            "  coordinator: url={}, token={}",
            self.coordinator.base_url,
            if self.coordinator.api_token.is_some() { "(set)" } else { "(none)" }
        );
        tracing::info!(
            "  outbox:      enabled={}, path={}",
            self.outbox.enabled,
            self.outbox.path.display()
        );
        tracing::info!(
            "  executors:   {}",
            if self.executors.is_empty() {
                "(none)".to_string()
            } else {
                self.executors.keys().cloned().collect::<Vec<_>>().join(", ")
            }
        );
    }
}
