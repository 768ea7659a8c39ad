use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use tokio::runtime::Handle;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

use bridge_core::agent::{Bridge, TickOutcome};
use bridge_core::config::BridgeConfig;
use bridge_core::service::HttpDecisionService;
use bridge_core::world::table::TableSim;

fn scenario_path(arg: Option<String>) -> Option<PathBuf> {
    arg.or_else(|| std::env::var("BRIDGE_SCENARIO").ok())
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
}

fn load_table(path: Option<&Path>) -> anyhow::Result<TableSim> {
    match path {
        Some(path) => TableSim::load(path),
        None => {
            tracing::warn!(target: "bridge.runner", "no scenario given, starting from an empty table");
            Ok(TableSim::default())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = BridgeConfig::load().context("load bridge config")?;
    let scenario = scenario_path(std::env::args().nth(1));
    let mut sim = load_table(scenario.as_deref())?;

    let service = HttpDecisionService::new(&cfg.base_url, cfg.http_timeout(), Handle::current())
        .context("build decision service client")?;
    tracing::info!(
        target: "bridge.runner",
        base_url = %service.base_url(),
        scenario = ?scenario,
        tick_ms = cfg.tick_ms,
        "bridge starting"
    );
    let mut bridge = Bridge::new(service, &cfg);

    let mut tick = tokio::time::interval(cfg.tick());
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                sim.settle();
                let outcome = bridge.tick(&mut sim, Instant::now());
                match outcome {
                    TickOutcome::Idle | TickOutcome::Waiting | TickOutcome::PollPending => {}
                    other => tracing::debug!(target: "bridge.runner", outcome = ?other, "tick"),
                }
            }
            _ = &mut shutdown => {
                tracing::info!(target: "bridge.runner", journal = sim.journal.len(), "shutting down");
                break;
            }
        }
    }
    Ok(())
}
