//! `webq send` – submit one request.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::time::Duration;
use webq_core::config::WebqConfig;
use webq_core::{Priority, RequestDescriptor, Verb};

use super::run::{run_requests, PendingRequest};

#[derive(Debug)]
pub struct SendArgs {
    pub verb: Verb,
    pub base: String,
    pub endpoint: String,
    pub params: Vec<String>,
    pub json_params: Vec<String>,
    pub headers: Vec<String>,
    pub priority: Priority,
    pub retries: i64,
    pub timeout: Option<u64>,
}

/// Split `key=value`; the key must be non-empty.
pub(super) fn split_param(raw: &str) -> Result<(String, String)> {
    let Some((k, v)) = raw.split_once('=') else {
        bail!("parameter {:?} is not key=value", raw);
    };
    if k.trim().is_empty() {
        bail!("parameter {:?} has an empty key", raw);
    }
    Ok((k.trim().to_string(), v.to_string()))
}

/// Split `Name: value`.
pub(super) fn split_header(raw: &str) -> Result<(String, String)> {
    let Some((k, v)) = raw.split_once(':') else {
        bail!("header {:?} is not Name: value", raw);
    };
    if k.trim().is_empty() {
        bail!("header {:?} has an empty name", raw);
    }
    Ok((k.trim().to_string(), v.trim().to_string()))
}

pub(super) fn build_descriptor(cfg: &WebqConfig, args: SendArgs) -> Result<RequestDescriptor> {
    let target = cfg.target(&args.base, &args.endpoint);
    let timeout = args
        .timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| cfg.default_timeout());
    let mut desc = RequestDescriptor::new(args.verb, target, |_| {})
        .with_priority(args.priority)
        .with_max_retries(args.retries)
        .with_timeout(timeout);
    for raw in &args.params {
        let (k, v) = split_param(raw)?;
        desc = desc.with_param(k, v);
    }
    for raw in &args.json_params {
        let (k, v) = split_param(raw)?;
        let value: Value =
            serde_json::from_str(&v).with_context(|| format!("parameter {:?} is not valid JSON", k))?;
        desc = desc.with_param(k, value);
    }
    for raw in &args.headers {
        let (k, v) = split_header(raw)?;
        desc = desc.with_header(k, v);
    }
    Ok(desc)
}

pub async fn run_send(cfg: &WebqConfig, args: SendArgs, assume_online: bool) -> Result<()> {
    let label = format!("{} {}", args.verb, args.endpoint);
    let desc = build_descriptor(cfg, args)?;
    let failed = run_requests(cfg, vec![PendingRequest { label, desc }], assume_online).await?;
    if failed > 0 {
        bail!("request failed");
    }
    Ok(())
}
