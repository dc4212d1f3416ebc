//! `webq batch` – submit requests from a TOML file.
//!
//! ```toml
//! [[request]]
//! verb = "get"
//! base = "weather"          # URL or [endpoints] alias
//! endpoint = "weather"
//! priority = "high"
//! max_retries = 2
//! params = { q = "london" }
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use webq_core::config::WebqConfig;
use webq_core::{CachePolicy, Priority, RequestDescriptor, Verb};

use super::run::{run_requests, PendingRequest};

#[derive(Debug, Deserialize)]
pub(super) struct BatchFile {
    #[serde(default, rename = "request")]
    pub requests: Vec<BatchRequest>,
}

#[derive(Debug, Deserialize)]
pub(super) struct BatchRequest {
    /// Label for printed events; defaults to `#<index> <endpoint>`.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub verb: Verb,
    pub base: String,
    pub endpoint: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub max_retries: i64,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub cache_policy: CachePolicy,
}

pub(super) fn parse_batch(text: &str) -> Result<BatchFile> {
    Ok(toml::from_str(text)?)
}

pub(super) fn to_pending(cfg: &WebqConfig, file: BatchFile) -> Result<Vec<PendingRequest>> {
    file.requests
        .into_iter()
        .enumerate()
        .map(|(i, r)| {
            let label = r
                .name
                .unwrap_or_else(|| format!("#{} {}", i + 1, r.endpoint));
            // curl reads a zero timeout as "no timeout".
            if r.timeout_secs == Some(0) {
                bail!("request {}: timeout_secs must be at least 1", label);
            }
            let timeout = r
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or_else(|| cfg.default_timeout());
            let mut desc = RequestDescriptor::new(r.verb, cfg.target(&r.base, &r.endpoint), |_| {})
                .with_priority(r.priority)
                .with_max_retries(r.max_retries)
                .with_timeout(timeout)
                .with_params(r.params)
                .with_cache_policy(r.cache_policy);
            for (k, v) in r.headers {
                desc = desc.with_header(k, v);
            }
            Ok(PendingRequest { label, desc })
        })
        .collect()
}

pub async fn run_batch(cfg: &WebqConfig, path: &Path, assume_online: bool) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read batch file {}", path.display()))?;
    let file = parse_batch(&text).with_context(|| format!("parse batch file {}", path.display()))?;
    if file.requests.is_empty() {
        println!("No requests in batch file.");
        return Ok(());
    }
    let total = file.requests.len();
    let pending = to_pending(cfg, file)?;
    let failed = run_requests(cfg, pending, assume_online).await?;
    tracing::info!(total, failed, "batch finished");
    if failed > 0 {
        bail!("{} of {} request(s) failed", failed, total);
    }
    Ok(())
}
