use crate::error::VitalsError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application configuration, loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub goals: Goals,
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load configuration from default path (~/.config/vitals/config.toml),
    /// falling back to defaults if the file doesn't exist.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Write current configuration to the default path.
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;
        Ok(())
    }

    /// Reject configurations the metrics pipeline cannot divide by.
    pub fn validate(&self) -> Result<(), VitalsError> {
        let goals = &self.goals;
        if goals.water_goal_ml == 0 || goals.steps_goal == 0 || goals.exercise_goal_minutes == 0 {
            return Err(VitalsError::Config("goals must be greater than zero".into()));
        }
        if self.api.base_url.trim().is_empty() {
            return Err(VitalsError::Config("api.base_url must not be empty".into()));
        }
        Ok(())
    }

    /// Default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vitals")
            .join("config.toml")
    }

    /// Data directory for the persisted session.
    pub fn data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vitals")
    }

    /// Resolved location of the session store file.
    pub fn session_path(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("session.json"))
    }
}

/// Remote service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the health-tracking service.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            timeout_secs: 30,
            user_agent: concat!("vitals/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

/// Daily targets used to turn raw stats into progress percentages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Goals {
    pub water_goal_ml: u32,
    pub steps_goal: u64,
    pub exercise_goal_minutes: u32,
}

impl Default for Goals {
    fn default() -> Self {
        Self {
            water_goal_ml: 2000,
            steps_goal: 10_000,
            exercise_goal_minutes: 60,
        }
    }
}

/// Session persistence configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// File holding the persisted user id.
    pub path: Option<PathBuf>, // resolved at runtime to data_dir/session.json
}
