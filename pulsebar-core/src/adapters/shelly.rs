//! Shelly relay status over HTTP.
//!
//! `GET http://<address>/status` is polled for relay and housekeeping data;
//! a click sends `GET http://<address>/relay/0?turn=toggle`. Anything short
//! of a successful, well-formed status with at least one relay is treated as
//! "unreachable", and clicks are ignored until the next fetch succeeds.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::module::{ActionTrigger, Degrading, PollingModule, TryFetch};
use crate::output::{Color, Output, Segment};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

const STATUS_PATH: &str = "/status";
const TOGGLE_PATH: &str = "/relay/0?turn=toggle";

const COLOR_ON: Color = Color::rgb(0x23, 0x85, 0x55);
const COLOR_OFF: Color = Color::rgb(0x97, 0x28, 0x22);
const COLOR_UPDATE: Color = Color::rgb(0x34, 0xeb, 0x55);

// Only the parts of the status document the module reads.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Status {
    relays: Vec<Relay>,
    has_update: bool,
    update: Update,
    ram_total: u64,
    ram_free: u64,
    fs_size: u64,
    fs_free: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Relay {
    ison: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Update {
    new_version: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ToggleResponse {
    ison: bool,
}

/// Snapshot of a Shelly device. The default value is the unreachable state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellyState {
    pub address: String,
    pub reachable: bool,
    pub is_on: bool,
    pub update_available: bool,
    pub update_version: String,
    pub ram_total: u64,
    pub ram_free: u64,
    pub fs_size: u64,
    pub fs_free: u64,
}

impl ShellyState {
    /// The state published when the device cannot be read.
    pub fn unreachable(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Decode a `/status` body.
    pub fn from_status(address: impl Into<String>, body: &[u8]) -> Result<Self, FetchError> {
        let status: Status = serde_json::from_slice(body)?;
        let relay = status
            .relays
            .first()
            .ok_or_else(|| FetchError::Malformed("status has no relays".to_string()))?;

        Ok(Self {
            address: address.into(),
            reachable: true,
            is_on: relay.ison,
            update_available: status.has_update,
            update_version: status.update.new_version,
            ram_total: status.ram_total,
            ram_free: status.ram_free,
            fs_size: status.fs_size,
            fs_free: status.fs_free,
        })
    }

    /// Percentage of the filesystem in use; 0 when the size is unknown.
    pub fn disk_utilization(&self) -> f64 {
        utilization(self.fs_size, self.fs_free)
    }

    /// Percentage of RAM in use; 0 when the total is unknown.
    pub fn memory_utilization(&self) -> f64 {
        utilization(self.ram_total, self.ram_free)
    }
}

fn utilization(total: u64, free: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    total.saturating_sub(free) as f64 / total as f64 * 100.0
}

/// A Shelly device reachable over HTTP. Serves as both the fetcher and the
/// click action; clones share the outcome of the last fetch.
#[derive(Debug, Clone)]
pub struct ShellyDevice {
    address: String,
    client: reqwest::Client,
    reachable: Arc<AtomicBool>,
}

impl ShellyDevice {
    /// Create a device handle. `timeout` bounds every request, which bounds
    /// how long one fetch can hold up the module loop.
    pub fn new(address: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            address: address.into(),
            client,
            reachable: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Whether the last status fetch succeeded.
    pub fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::Acquire)
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.address, path)
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.url(path);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url, status });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

impl TryFetch for ShellyDevice {
    type State = ShellyState;
    type Error = FetchError;

    async fn try_fetch(&self) -> Result<ShellyState, FetchError> {
        let result = match self.get(STATUS_PATH).await {
            Ok(body) => ShellyState::from_status(self.address.clone(), &body),
            Err(error) => Err(error),
        };
        self.reachable.store(result.is_ok(), Ordering::Release);
        result
    }

    fn degraded(&self) -> ShellyState {
        ShellyState::unreachable(self.address.clone())
    }
}

impl ActionTrigger for ShellyDevice {
    async fn invoke(&self) {
        if !self.is_reachable() {
            debug!(address = %self.address, "relay unreachable; click ignored");
            return;
        }
        let result = self.get(TOGGLE_PATH).await.and_then(|body| {
            serde_json::from_slice::<ToggleResponse>(&body).map_err(FetchError::from)
        });
        match result {
            Ok(response) => debug!(address = %self.address, ison = response.ison, "relay toggled"),
            Err(error) => warn!(address = %self.address, %error, "relay toggle failed"),
        }
    }
}

/// Default rendering for a relay that drives the device named by `icon`
/// (an `mdi-` icon suffix such as `coffee`).
///
/// The first segment is the summary icon; the rest are detail.
pub fn render(icon: impl Into<String>) -> impl Fn(&ShellyState) -> Output + Send + Sync + 'static {
    let icon = icon.into();
    move |state: &ShellyState| {
        if !state.reachable {
            return Output::empty()
                .with(Segment::icon(format!("mdi-{icon}-off")).color(COLOR_OFF))
                .with(Segment::text("shelly not reachable"));
        }

        let summary = if state.is_on {
            Segment::icon(format!("mdi-{icon}")).color(COLOR_ON)
        } else {
            Segment::icon(format!("mdi-{icon}-outline")).color(COLOR_OFF)
        };

        let update = if state.update_available {
            Segment::text(format!("version {} available", state.update_version))
                .with_icon("mdi-package-down")
                .color(COLOR_UPDATE)
        } else {
            Segment::text("up to date").with_icon("mdi-package-down")
        };

        Output::empty()
            .with(summary)
            .with(update)
            .with(
                Segment::text(format!("{:.0}% used", state.disk_utilization()))
                    .with_icon("mdi-harddisk"),
            )
            .with(
                Segment::text(format!("{:.0}% RAM usage", state.memory_utilization()))
                    .with_icon("mdi-memory"),
            )
    }
}

pub type ShellyModule = PollingModule<Degrading<ShellyDevice>, ShellyDevice, Output>;

/// A relay module named `name` for `device`, refreshed every five minutes.
pub fn from_device(name: impl Into<String>, device: ShellyDevice, icon: impl Into<String>) -> ShellyModule {
    PollingModule::new(name, Degrading::new(device.clone()), device, render(icon))
        .every(DEFAULT_INTERVAL)
}
