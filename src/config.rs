use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, SquadError};

const CONFIG_FILE: &str = "config.json";
const STATE_FILE: &str = "state.json";
const WORKERS_DIR: &str = "workers";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SquadConfig {
    /// Root for the state file and worker clones.
    pub home: PathBuf,
    pub base_port: u16,
    pub port_increment: u16,
    /// Name given to the first session of the shared window.
    pub marker_name: String,
    pub agent_command: String,
    /// Directory whose `.env*` files are copied into every new worker.
    pub env_source: Option<PathBuf>,
    pub timings: SessionTimings,
}

/// Fixed delays of the session protocol, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionTimings {
    pub agent_boot_ms: u64,
    pub confirm_ms: u64,
    pub interrupt_grace_ms: u64,
    pub launch_settle_ms: u64,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            agent_boot_ms: 4000,
            confirm_ms: 500,
            interrupt_grace_ms: 500,
            launch_settle_ms: 2000,
        }
    }
}

impl SessionTimings {
    /// No waiting at all; used where nothing real is on the other side.
    pub fn immediate() -> Self {
        Self {
            agent_boot_ms: 0,
            confirm_ms: 0,
            interrupt_grace_ms: 0,
            launch_settle_ms: 0,
        }
    }

    pub fn agent_boot(&self) -> Duration {
        Duration::from_millis(self.agent_boot_ms)
    }

    pub fn confirm(&self) -> Duration {
        Duration::from_millis(self.confirm_ms)
    }

    pub fn interrupt_grace(&self) -> Duration {
        Duration::from_millis(self.interrupt_grace_ms)
    }

    pub fn launch_settle(&self) -> Duration {
        Duration::from_millis(self.launch_settle_ms)
    }
}

impl Default for SquadConfig {
    fn default() -> Self {
        Self {
            home: default_home(),
            base_port: 3000,
            port_increment: 10,
            marker_name: "squadron".to_string(),
            agent_command: "claude".to_string(),
            env_source: None,
            timings: SessionTimings::default(),
        }
    }
}

fn default_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".squadron")
}

impl SquadConfig {
    /// Loads `<home>/config.json` when present, then applies `SQUADRON_*`
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let home = std::env::var_os("SQUADRON_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(default_home);

        let mut config = Self::load_from(&home)?;
        config.home = home;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_from(home: &Path) -> Result<Self> {
        let path = home.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self {
                home: home.to_path_buf(),
                ..Self::default()
            });
        }

        let raw = std::fs::read_to_string(&path)?;
        let mut config: SquadConfig = serde_json::from_str(&raw)
            .map_err(|e| SquadError::Config(format!("{}: {}", path.display(), e)))?;
        config.home = home.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("SQUADRON_BASE_PORT") {
            self.base_port = value
                .parse()
                .map_err(|_| SquadError::Config(format!("SQUADRON_BASE_PORT={}", value)))?;
        }
        if let Some(value) = lookup("SQUADRON_PORT_INCREMENT") {
            self.port_increment = value
                .parse()
                .map_err(|_| SquadError::Config(format!("SQUADRON_PORT_INCREMENT={}", value)))?;
        }
        if let Some(value) = lookup("SQUADRON_AGENT_COMMAND") {
            self.agent_command = value;
        }
        if let Some(value) = lookup("SQUADRON_ENV_SOURCE") {
            self.env_source = Some(PathBuf::from(value));
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if self.port_increment == 0 {
            return Err(SquadError::Config("port_increment must be positive".to_string()));
        }
        if self.marker_name.trim().is_empty() {
            return Err(SquadError::Config("marker_name must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn state_path(&self) -> PathBuf {
        self.home.join(STATE_FILE)
    }

    pub fn workers_root(&self) -> PathBuf {
        self.home.join(WORKERS_DIR)
    }

    pub fn worker_dir(&self, name: &str) -> PathBuf {
        self.workers_root().join(name)
    }
}
