//! Adapters
//!
//! Concrete state sources and actions, plus their default renderings:
//!
//! - `toggle`: a module assembled from closures
//! - `systemd`: a systemd user service, toggled by click
//! - `shelly`: a Shelly relay polled over HTTP, toggled by click
//!
//! [`BarModule`] erases the fetcher and action types so a host can hold
//! modules of different kinds side by side.

pub mod shelly;
pub mod systemd;
pub mod toggle;

use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::task::JoinHandle;

use crate::config::ModuleConfig;
use crate::error::ConfigError;
use crate::module::{ActionTrigger, PollingModule, StateFetcher};
use crate::output::Output;
use crate::reactive::BroadcastCell;

/// What a host needs from a module, independent of its state type.
pub trait BarModule: Send + Sync {
    fn name(&self) -> &str;

    fn output(&self) -> BroadcastCell<Output>;

    fn spawn(&self) -> JoinHandle<()>;

    fn click(&self) -> BoxFuture<'_, ()>;
}

impl<F, A> BarModule for PollingModule<F, A, Output>
where
    F: StateFetcher,
    F::State: Default,
    A: ActionTrigger,
{
    fn name(&self) -> &str {
        PollingModule::name(self)
    }

    fn output(&self) -> BroadcastCell<Output> {
        PollingModule::output(self)
    }

    fn spawn(&self) -> JoinHandle<()> {
        PollingModule::spawn(self)
    }

    fn click(&self) -> BoxFuture<'_, ()> {
        Box::pin(PollingModule::click(self))
    }
}

/// Build the module described by `config`.
pub fn build(config: &ModuleConfig) -> Result<Box<dyn BarModule>, ConfigError> {
    match config {
        ModuleConfig::Systemd {
            service,
            timeout_secs,
            ..
        } => {
            let unit = systemd::UserService::new(service.clone())
                .with_timeout(Duration::from_secs(*timeout_secs));
            let module = systemd::from_unit(unit).every(config.interval());
            Ok(Box::new(module))
        }
        ModuleConfig::Shelly {
            address,
            icon,
            timeout_secs,
            ..
        } => {
            let timeout = Duration::from_secs(*timeout_secs);
            let device = shelly::ShellyDevice::new(address.clone(), timeout).map_err(|e| {
                ConfigError::Module {
                    name: config.name().to_string(),
                    reason: e.to_string(),
                }
            })?;
            let module = shelly::from_device(config.name(), device, icon.clone())
                .every(config.interval());
            Ok(Box::new(module))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_from_config() {
        let systemd = build(&ModuleConfig::Systemd {
            service: "syncthing".to_string(),
            interval_secs: 10,
            timeout_secs: 3,
        })
        .unwrap();
        assert_eq!(systemd.name(), "syncthing");

        let shelly = build(&ModuleConfig::Shelly {
            address: "192.168.178.64".to_string(),
            label: Some("quickmill".to_string()),
            icon: "coffee".to_string(),
            interval_secs: 60,
            timeout_secs: 3,
        })
        .unwrap();
        assert_eq!(shelly.name(), "quickmill");

        // Before the first fetch the output renders the unreachable state.
        let output = shelly.output().get();
        assert_eq!(output.summary().unwrap().icon.as_deref(), Some("mdi-coffee-off"));
    }
}
