//! Minimal pulsebar host.
//!
//! Runs the configured modules and writes one JSON line to stdout whenever
//! any module output or the active mode changes. Each module shows its
//! summary segment, or all of its segments while its mode is active. Modules
//! with empty output are left out.
//!
//! Events are read from stdin, one per line:
//!
//! - `click <module>` invokes the module's action and refreshes it
//! - `mode <module>` expands or collapses the module's detail

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use futures_util::future::select_all;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pulsebar_core::adapters::{self, BarModule};
use pulsebar_core::config::{BarConfig, DEFAULT_PATH};
use pulsebar_core::modal::ModeController;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the bar configuration.
    #[arg(short, long, default_value = DEFAULT_PATH)]
    config: PathBuf,
}

type Modules = Arc<Vec<Box<dyn BarModule>>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries bar output, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = BarConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    let modules = config
        .modules
        .iter()
        .map(adapters::build)
        .collect::<Result<Vec<_>, _>>()
        .context("building modules")?;
    if modules.is_empty() {
        warn!(config = %cli.config.display(), "no modules configured");
    }

    let modes = ModeController::new();
    for module in &modules {
        modes.add_mode(module.name());
    }

    let _tasks: Vec<_> = modules.iter().map(|module| module.spawn()).collect();
    info!(count = modules.len(), "modules started");

    let modules: Modules = Arc::new(modules);
    tokio::spawn(read_events(Arc::clone(&modules), modes.clone()));

    draw(&modules, &modes).await
}

async fn draw(modules: &Modules, modes: &ModeController) -> anyhow::Result<()> {
    let mut subscriptions: Vec<_> = modules.iter().map(|m| m.output().subscribe()).collect();
    subscriptions.push(modes.subscribe());

    let stdout = std::io::stdout();
    loop {
        let line = render_line(modules, modes);
        {
            let mut out = stdout.lock();
            writeln!(out, "{line}").context("writing to stdout")?;
            out.flush().context("flushing stdout")?;
        }

        let changed = subscriptions.iter_mut().map(|sub| Box::pin(sub.changed()));
        let (alive, _, _) = select_all(changed).await;
        if !alive {
            anyhow::bail!("output subscription closed");
        }
    }
}

fn render_line(modules: &Modules, modes: &ModeController) -> String {
    let blocks: Vec<_> = modules
        .iter()
        .filter_map(|module| {
            let output = module.output().get();
            if output.is_empty() {
                return None;
            }
            let segments = if modes.is_active(module.name()) {
                output.segments()
            } else {
                output.segments().get(..1).unwrap_or(&[])
            };
            Some(json!({ "name": module.name(), "segments": segments }))
        })
        .collect();
    serde_json::Value::Array(blocks).to_string()
}

async fn read_events(modules: Modules, modes: ModeController) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(error) => {
                warn!(%error, "reading events failed");
                return;
            }
        };

        match line.trim().split_once(' ') {
            Some(("click", name)) => match modules.iter().find(|m| m.name() == name) {
                Some(module) => module.click().await,
                None => warn!(module = name, "click for unknown module"),
            },
            Some(("mode", name)) => {
                if !modes.toggle(name) {
                    warn!(mode = name, "unknown mode");
                }
            }
            _ => warn!(event = %line, "unrecognized event"),
        }
    }
}
