//! Shared driver: submit descriptors to a scheduler and print events until
//! every request has ended.

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use webq_core::config::WebqConfig;
use webq_core::probe::{ConnectivityProbe, StaticProbe};
use webq_core::transport::CurlTransport;
use webq_core::{Outcome, RequestDescriptor, RequestEvent, Scheduler};

/// A descriptor plus the label its events are printed under. The driver
/// replaces the descriptor's callback with its own event sink.
pub(super) struct PendingRequest {
    pub label: String,
    pub desc: RequestDescriptor,
}

fn build_scheduler(cfg: &WebqConfig, assume_online: bool) -> Scheduler {
    let probe: Box<dyn ConnectivityProbe> = if assume_online {
        Box::new(StaticProbe::new(true))
    } else {
        Box::new(cfg.probe.to_probe())
    };
    let mut transport = CurlTransport::new();
    if let Some(ua) = &cfg.user_agent {
        transport = transport.with_user_agent(ua.clone());
    }
    Scheduler::spawn(probe, transport, cfg.scheduler_options())
}

pub(super) fn format_event(label: &str, event: &RequestEvent) -> String {
    match event {
        RequestEvent::Start => format!("[{}] start", label),
        RequestEvent::Retry {
            attempt,
            reason,
            code,
        } => format!("[{}] retry #{} (code {}): {}", label, attempt, code, reason),
        RequestEvent::End {
            outcome: Outcome::Success { data, status },
        } => format!(
            "[{}] end: HTTP {}\n{}",
            label,
            status,
            String::from_utf8_lossy(data)
        ),
        RequestEvent::End {
            outcome:
                Outcome::Failure {
                    kind,
                    message,
                    status,
                },
        } => match status {
            Some(code) => format!("[{}] end: {} failure (code {}): {}", label, kind, code, message),
            None => format!("[{}] end: {} failure: {}", label, kind, message),
        },
    }
}

/// Runs all requests; returns how many did not end in success.
pub(super) async fn run_requests(
    cfg: &WebqConfig,
    requests: Vec<PendingRequest>,
    assume_online: bool,
) -> Result<usize> {
    let scheduler = build_scheduler(cfg, assume_online);
    let (tx, mut rx) = mpsc::unbounded_channel::<(usize, RequestEvent)>();
    let labels: Vec<String> = requests.iter().map(|r| r.label.clone()).collect();

    for (i, req) in requests.into_iter().enumerate() {
        let tx = tx.clone();
        let desc = req.desc.with_callback(move |event| {
            let _ = tx.send((i, event));
        });
        scheduler.submit(desc).context("submit request")?;
    }
    drop(tx);

    let mut remaining = labels.len();
    let mut failed = 0usize;
    while remaining > 0 {
        let Some((i, event)) = rx.recv().await else {
            break;
        };
        println!("{}", format_event(&labels[i], &event));
        if let RequestEvent::End { outcome } = &event {
            remaining -= 1;
            if !outcome.is_success() {
                failed += 1;
            }
        }
    }

    scheduler.shutdown().await;
    Ok(failed)
}
