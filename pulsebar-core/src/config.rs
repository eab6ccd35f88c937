//! Bar configuration.
//!
//! Loaded with figment from a TOML file, overridden by `PULSEBAR_`-prefixed
//! environment variables (`__` separates nested keys). A missing file yields
//! an empty bar.
//!
//! ```toml
//! [[modules]]
//! kind = "systemd"
//! service = "syncthing"
//!
//! [[modules]]
//! kind = "shelly"
//! address = "192.168.178.64"
//! icon = "coffee"
//! interval_secs = 60
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

use crate::adapters::{shelly, systemd};
use crate::error::ConfigError;

pub const DEFAULT_PATH: &str = "pulsebar.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BarConfig {
    #[serde(default)]
    pub modules: Vec<ModuleConfig>,
}

/// One configured module.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModuleConfig {
    Systemd {
        service: String,
        #[serde(default = "default_systemd_interval")]
        interval_secs: u64,
        #[serde(default = "default_systemd_timeout")]
        timeout_secs: u64,
    },
    Shelly {
        address: String,
        /// Display name; defaults to the address.
        #[serde(default)]
        label: Option<String>,
        #[serde(default = "default_shelly_icon")]
        icon: String,
        #[serde(default = "default_shelly_interval")]
        interval_secs: u64,
        #[serde(default = "default_shelly_timeout")]
        timeout_secs: u64,
    },
}

fn default_systemd_interval() -> u64 {
    systemd::DEFAULT_INTERVAL.as_secs()
}

fn default_systemd_timeout() -> u64 {
    systemd::DEFAULT_TIMEOUT.as_secs()
}

fn default_shelly_interval() -> u64 {
    shelly::DEFAULT_INTERVAL.as_secs()
}

fn default_shelly_timeout() -> u64 {
    shelly::DEFAULT_TIMEOUT.as_secs()
}

fn default_shelly_icon() -> String {
    "power-socket-eu".to_string()
}

impl ModuleConfig {
    /// The name the module is addressed by (logs, click events).
    pub fn name(&self) -> &str {
        match self {
            Self::Systemd { service, .. } => service,
            Self::Shelly { label, address, .. } => label.as_deref().unwrap_or(address),
        }
    }

    pub fn interval(&self) -> Duration {
        match self {
            Self::Systemd { interval_secs, .. } | Self::Shelly { interval_secs, .. } => {
                Duration::from_secs(*interval_secs)
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::Module {
            name: self.name().to_string(),
            reason: reason.to_string(),
        };
        if self.interval().is_zero() {
            return Err(invalid("interval_secs must be positive"));
        }
        match self {
            Self::Systemd { service, .. } if service.trim().is_empty() => {
                Err(invalid("service must not be empty"))
            }
            Self::Shelly { address, .. } if address.trim().is_empty() => {
                Err(invalid("address must not be empty"))
            }
            Self::Systemd { timeout_secs: 0, .. } | Self::Shelly { timeout_secs: 0, .. } => {
                Err(invalid("timeout_secs must be positive"))
            }
            _ => Ok(()),
        }
    }
}

impl BarConfig {
    /// The provider stack: file, then environment.
    pub fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("PULSEBAR_").split("__"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment(path))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for module in &self.modules {
            module.validate()?;
            if !names.insert(module.name()) {
                return Err(ConfigError::Module {
                    name: module.name().to_string(),
                    reason: "duplicate module name".to_string(),
                });
            }
        }
        Ok(())
    }
}
