use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use fogwall_border::{BlockSnapshot, BorderPolicy, BorderSettings};
use serde::Deserialize;

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PolicyName {
    #[default]
    Ring,
    Enclosure,
}

impl From<PolicyName> for BorderPolicy {
    fn from(p: PolicyName) -> Self {
        match p {
            PolicyName::Ring => BorderPolicy::Ring,
            PolicyName::Enclosure => BorderPolicy::Enclosure,
        }
    }
}

/// Engine settings. Intervals are in game ticks.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub border_radius: i32,
    pub border_policy: PolicyName,
    pub border_state_id: u32,
    pub height_half: i32,
    pub light_update_interval: u64,
    pub bounds_update_interval: u64,
    pub bounds_debounce: u64,
    pub tick_millis: u64,
    pub server_view_distance: u32,
    pub enable_on_join: bool,
    pub verbose_logging: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            border_radius: 128,
            border_policy: PolicyName::Ring,
            border_state_id: 85,
            height_half: 3,
            light_update_interval: 20,
            bounds_update_interval: 5,
            bounds_debounce: 20,
            tick_millis: 50,
            server_view_distance: 10,
            enable_on_join: false,
            verbose_logging: false,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Invalid { field: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "failed to read config: {}", e),
            ConfigError::Parse(e) => write!(f, "failed to parse config: {}", e),
            ConfigError::Invalid { field, reason } => {
                write!(f, "invalid config value for {}: {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid { .. } => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: EngineConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("light_update_interval", self.light_update_interval),
            ("bounds_update_interval", self.bounds_update_interval),
            ("tick_millis", self.tick_millis),
        ];
        for (field, v) in positive {
            if v == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be at least 1".into(),
                });
            }
        }
        if self.border_radius < 0 {
            return Err(ConfigError::Invalid {
                field: "border_radius",
                reason: format!("{} is negative", self.border_radius),
            });
        }
        if self.height_half < 0 {
            return Err(ConfigError::Invalid {
                field: "height_half",
                reason: format!("{} is negative", self.height_half),
            });
        }
        Ok(())
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }

    pub fn border_settings(&self) -> BorderSettings {
        BorderSettings {
            policy: self.border_policy.into(),
            radius: self.border_radius,
            material: BlockSnapshot::new(self.border_state_id),
            verbose: self.verbose_logging,
        }
    }
}
