//! `webq probe` – check connectivity the way the scheduler does.

use anyhow::{Context, Result};
use webq_core::config::WebqConfig;
use webq_core::probe::ConnectivityProbe;

pub async fn run_probe(cfg: &WebqConfig) -> Result<()> {
    let probe = cfg.probe.to_probe();
    let reachable = tokio::task::spawn_blocking(move || probe.is_reachable())
        .await
        .context("probe task join")?;
    if reachable {
        println!("online ({}:{} reachable)", cfg.probe.host, cfg.probe.port);
    } else {
        println!("offline ({}:{} unreachable)", cfg.probe.host, cfg.probe.port);
    }
    Ok(())
}
