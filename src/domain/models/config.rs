use serde::{Deserialize, Serialize};

/// Main configuration structure for devloop
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Global overrides for the quality gate
    #[serde(default)]
    pub quality: QualitySettings,

    /// Work-queue worker loop settings
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Periodic maintenance loop settings
    #[serde(default)]
    pub maintenance: MaintenanceConfig,

    /// External judge process
    #[serde(default)]
    pub judge: JudgeConfig,

    /// External queue process commands
    #[serde(default)]
    pub queue: QueueConfig,

    /// Checkpoint emission
    #[serde(default)]
    pub checkpoints: CheckpointConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    #[serde(default = "default_true")]
    pub enable_stdout: bool,

    /// Rotation policy for file output: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

const fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            enable_stdout: true,
            rotation: default_rotation(),
        }
    }
}

/// Quality gate overrides applied on top of each domain's defaults.
///
/// Unset fields leave the domain default in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct QualitySettings {
    #[serde(default)]
    pub threshold: Option<f64>,

    #[serde(default)]
    pub max_iters: Option<u32>,
}

/// Queue worker loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WorkerConfig {
    /// Loop name used in logs
    #[serde(default = "default_worker_name")]
    pub name: String,

    /// Backoff when a poll yields no work
    #[serde(default = "default_empty_sleep_ms")]
    pub empty_sleep_ms: u64,

    /// Pause between items of one batch; 0 disables
    #[serde(default)]
    pub per_item_sleep_ms: u64,

    /// Fallback task text for items that carry none
    #[serde(default)]
    pub task: String,
}

fn default_worker_name() -> String {
    "dev_work_queue".to_string()
}

const fn default_empty_sleep_ms() -> u64 {
    10 * 60 * 1000
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            name: default_worker_name(),
            empty_sleep_ms: default_empty_sleep_ms(),
            per_item_sleep_ms: 0,
            task: String::new(),
        }
    }
}

/// Periodic maintenance loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MaintenanceConfig {
    #[serde(default = "default_maintenance_name")]
    pub name: String,

    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Routine description handed to the judge each cycle
    #[serde(default)]
    pub task: String,
}

fn default_maintenance_name() -> String {
    "dev_periodic_maintenance".to_string()
}

const fn default_interval_ms() -> u64 {
    24 * 60 * 60 * 1000
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            name: default_maintenance_name(),
            interval_ms: default_interval_ms(),
            task: String::new(),
        }
    }
}

/// External judge command configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct JudgeConfig {
    /// Command to execute; empty means no judge is configured
    #[serde(default)]
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_judge_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_judge_timeout_secs() -> u64 {
    600
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            args: Vec::new(),
            timeout_secs: default_judge_timeout_secs(),
        }
    }
}

/// External queue commands
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct QueueConfig {
    /// Prints a JSON array of items on stdout
    #[serde(default)]
    pub poll_command: Vec<String>,

    /// Receives `{item, ok, result}` on stdin; acks are skipped when empty
    #[serde(default)]
    pub ack_command: Vec<String>,
}

/// Checkpoint configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CheckpointConfig {
    /// Pipeline-wide checkpoint flag for planning, research, spec and tests
    #[serde(default)]
    pub enabled: bool,
}
