//! systemd user service toggle.
//!
//! State comes from `systemctl --user is-active <service>`; a click stops an
//! active service, starts an inactive one and restarts anything else.

use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::module::{ActionTrigger, Degrading, PollingModule, TryFetch};
use crate::output::{Color, Output, Segment};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
/// Upper bound on one systemctl invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

const ICON: &str = "mdi-arrow-decision";
const ACTIVE: Color = Color::rgb(0x23, 0x85, 0x55);
const INACTIVE: Color = Color::rgb(0x97, 0x28, 0x22);
const OTHER: Color = Color::rgb(0xff, 0x77, 0x00);

/// State reported by `systemctl is-active`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ServiceState {
    Active,
    Inactive,
    /// Any other reported state, e.g. `failed` or `activating`.
    Other(String),
    /// systemctl could not be run.
    #[default]
    Unknown,
}

impl ServiceState {
    pub fn parse(output: &str) -> Self {
        match output.trim() {
            "active" => Self::Active,
            "inactive" => Self::Inactive,
            "" => Self::Unknown,
            other => Self::Other(other.to_string()),
        }
    }

    /// The systemctl verb that toggles a service out of this state.
    pub fn toggle_verb(&self) -> &'static str {
        match self {
            Self::Active => "stop",
            Self::Inactive => "start",
            Self::Other(_) | Self::Unknown => "restart",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Active => ACTIVE,
            Self::Inactive => INACTIVE,
            Self::Other(_) | Self::Unknown => OTHER,
        }
    }
}

/// A systemd user unit. Serves as both the fetcher and the click action.
#[derive(Debug, Clone)]
pub struct UserService {
    service: String,
    program: String,
    timeout: Duration,
}

impl UserService {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            program: "systemctl".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Use a different systemctl binary.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Bound every systemctl call; a call that takes longer is killed.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    async fn systemctl(&self, verb: &str) -> Result<String, FetchError> {
        let command = || format!("{} --user {verb} {}", self.program, self.service);
        let mut systemctl = Command::new(&self.program);
        systemctl
            .args(["--user", verb, self.service.as_str()])
            .kill_on_drop(true);
        let output = timeout(self.timeout, systemctl.output())
            .await
            .map_err(|_| FetchError::Timeout {
                command: command(),
                after: self.timeout,
            })?
            .map_err(|source| FetchError::Command {
                command: command(),
                source,
            })?;
        // `is-active` exits non-zero for inactive units; stdout still
        // carries the state.
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl TryFetch for UserService {
    type State = ServiceState;
    type Error = FetchError;

    async fn try_fetch(&self) -> Result<ServiceState, FetchError> {
        let stdout = self.systemctl("is-active").await?;
        Ok(ServiceState::parse(&stdout))
    }

    fn degraded(&self) -> ServiceState {
        ServiceState::Unknown
    }
}

impl ActionTrigger for UserService {
    async fn invoke(&self) {
        let state = match self.try_fetch().await {
            Ok(state) => state,
            Err(error) => {
                warn!(service = %self.service, %error, "could not query service before toggling");
                ServiceState::Unknown
            }
        };
        let verb = state.toggle_verb();
        debug!(service = %self.service, verb, "toggling service");
        if let Err(error) = self.systemctl(verb).await {
            warn!(service = %self.service, %error, "service toggle failed");
        }
    }
}

/// Default rendering: icon plus the service name colored by state.
pub fn render(service: impl Into<String>) -> impl Fn(&ServiceState) -> Output + Send + Sync + 'static {
    let service = service.into();
    move |state: &ServiceState| {
        Output::from(
            Segment::text(service.clone())
                .with_icon(ICON)
                .alpha(0.6)
                .color(state.color()),
        )
    }
}

pub type UserServiceModule = PollingModule<Degrading<UserService>, UserService, Output>;

/// A toggle module for a systemd user service, refreshed every five
/// seconds.
pub fn user_service(service: impl Into<String>) -> UserServiceModule {
    from_unit(UserService::new(service))
}

pub fn from_unit(unit: UserService) -> UserServiceModule {
    let name = unit.service().to_string();
    PollingModule::new(
        name.clone(),
        Degrading::new(unit.clone()),
        unit,
        render(name),
    )
    .every(DEFAULT_INTERVAL)
}
