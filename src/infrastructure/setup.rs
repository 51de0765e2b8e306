//! Project initialization: the `.devloop/` directory and its default config.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration template content
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# devloop configuration
# Override settings by editing this file, adding .devloop/local.yaml, or
# setting environment variables with the DEVLOOP_ prefix:
#   export DEVLOOP_LOGGING__LEVEL=debug
#   export DEVLOOP_WORKER__EMPTY_SLEEP_MS=30000

logging:
  level: info          # trace, debug, info, warn, error
  format: pretty       # pretty, json
  # log_dir: .devloop/logs
  rotation: daily      # daily, hourly, never

# Global overrides for each domain's quality gate
quality: {}
  # threshold: 0.9
  # max_iters: 4

worker:
  name: dev_work_queue
  empty_sleep_ms: 600000
  per_item_sleep_ms: 0

maintenance:
  name: dev_periodic_maintenance
  interval_ms: 86400000
  task: "Weekly repo maintenance"

# Process answering judgment requests. Receives {"prompt", "context"} as
# JSON on stdin and answers on stdout.
judge:
  command: ""
  args: []
  timeout_secs: 600

# poll_command prints a JSON array of work items; ack_command receives
# {"item", "ok", "result"} on stdin.
queue:
  poll_command: []
  ack_command: []

checkpoints:
  enabled: false
"#;

/// Setup paths and directories
#[derive(Debug, Clone)]
pub struct SetupPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
}

impl SetupPaths {
    /// Paths for the current directory
    pub fn new() -> Result<Self> {
        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        Ok(Self::in_dir(&current_dir))
    }

    pub fn in_dir(root: &Path) -> Self {
        let config_dir = root.join(".devloop");
        Self {
            config_file: config_dir.join("config.yaml"),
            config_dir,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.config_file.exists()
    }
}

/// Create `.devloop/` and write the default config.
///
/// An existing config file is kept unless `force` is set. Returns whether
/// the file was written.
pub fn init_project(paths: &SetupPaths, force: bool) -> Result<bool> {
    fs::create_dir_all(&paths.config_dir).context("Failed to create config directory")?;

    if paths.config_file.exists() && !force {
        return Ok(false);
    }

    fs::write(&paths.config_file, DEFAULT_CONFIG_TEMPLATE)
        .context("Failed to write config file")?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Config;

    #[test]
    fn test_template_parses_and_validates() {
        let config: Config = serde_yaml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        crate::infrastructure::config::ConfigLoader::validate(&config).unwrap();
        assert_eq!(config.maintenance.task, "Weekly repo maintenance");
    }

    #[test]
    fn test_init_keeps_existing_config() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SetupPaths::in_dir(dir.path());
        assert!(init_project(&paths, false).unwrap());
        fs::write(&paths.config_file, "logging:\n  level: warn\n").unwrap();
        assert!(!init_project(&paths, false).unwrap());
        assert!(fs::read_to_string(&paths.config_file).unwrap().contains("warn"));
        assert!(init_project(&paths, true).unwrap());
        assert!(paths.is_initialized());
    }
}
