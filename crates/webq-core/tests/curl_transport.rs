//! Integration test: scheduler + libcurl transport against a local HTTP server.

mod common;

use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use webq_core::probe::StaticProbe;
use webq_core::transport::CurlTransport;
use webq_core::{
    FailureKind, Outcome, Priority, RequestDescriptor, RequestEvent, Scheduler, SchedulerOptions,
    Target, Verb,
};

fn scheduler() -> Scheduler {
    Scheduler::spawn(
        StaticProbe::new(true),
        CurlTransport::new().with_user_agent("webq-test"),
        SchedulerOptions::default(),
    )
}

/// Collect events until END; returns them all.
async fn collect(rx: &mut mpsc::UnboundedReceiver<RequestEvent>) -> Vec<RequestEvent> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(20), rx.recv())
            .await
            .expect("request should finish")
            .expect("event channel open");
        let terminal = event.is_terminal();
        events.push(event);
        if terminal {
            return events;
        }
    }
}

fn outcome(events: &[RequestEvent]) -> Outcome {
    match events.last() {
        Some(RequestEvent::End { outcome }) => outcome.clone(),
        other => panic!("expected END, got {:?}", other),
    }
}

fn echo(outcome: &Outcome) -> Value {
    match outcome {
        Outcome::Success { data, status } => {
            assert_eq!(*status, 200);
            serde_json::from_slice(data).expect("echo body is JSON")
        }
        other => panic!("expected success, got {:?}", other),
    }
}

#[tokio::test]
async fn get_sends_string_params_as_query() {
    let base = common::echo_server::start();
    let sched = scheduler();
    let (desc, mut rx) = RequestDescriptor::with_channel(Verb::Get, Target::new(&base, "echo"));
    sched
        .submit(desc.with_param("q", "paris").with_param("n", 2).with_header("X-Trace", "abc"))
        .unwrap();

    let events = collect(&mut rx).await;
    assert_eq!(events[0], RequestEvent::Start);
    let echo = echo(&outcome(&events));
    assert_eq!(echo["method"], "GET");
    assert_eq!(echo["path"], "/echo?q=paris");
    assert_eq!(echo["headers"]["x-trace"], "abc");
    assert_eq!(echo["headers"]["cache-control"], "no-cache");
    assert_eq!(echo["headers"]["user-agent"], "webq-test");
    assert_eq!(echo["body"], "");
}

#[tokio::test]
async fn post_and_put_send_json_body() {
    let base = common::echo_server::start();
    let sched = scheduler();

    for verb in [Verb::Post, Verb::Put] {
        let (desc, mut rx) = RequestDescriptor::with_channel(verb, Target::new(&base, "items"));
        sched
            .submit(desc.with_param("name", "lamp").with_param("count", 3))
            .unwrap();
        let echo = echo(&outcome(&collect(&mut rx).await));
        assert_eq!(echo["method"], verb.as_str());
        assert_eq!(echo["path"], "/items");
        assert_eq!(echo["headers"]["content-type"], "application/json");
        let body: Value = serde_json::from_str(echo["body"].as_str().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"name": "lamp", "count": 3}));
    }
}

#[tokio::test]
async fn delete_uses_query_string() {
    let base = common::echo_server::start();
    let sched = scheduler();
    let (desc, mut rx) = RequestDescriptor::with_channel(Verb::Delete, Target::new(&base, "items"));
    sched.submit(desc.with_param("id", "7")).unwrap();
    let echo = echo(&outcome(&collect(&mut rx).await));
    assert_eq!(echo["method"], "DELETE");
    assert_eq!(echo["path"], "/items?id=7");
}

#[tokio::test]
async fn http_error_status_is_reported_not_retried() {
    let base = common::echo_server::start();
    let sched = scheduler();
    let (desc, mut rx) = RequestDescriptor::with_channel(Verb::Get, Target::new(&base, "status/404"));
    sched.submit(desc.with_max_retries(3)).unwrap();
    let events = collect(&mut rx).await;
    assert_eq!(events.len(), 2);
    assert_eq!(
        outcome(&events),
        Outcome::Success {
            data: b"status".to_vec(),
            status: 404,
        }
    );
}

#[tokio::test]
async fn connection_refused_is_transport_failure() {
    let sched = scheduler();
    let (desc, mut rx) =
        RequestDescriptor::with_channel(Verb::Get, Target::new(common::echo_server::closed_base(), "x"));
    sched.submit(desc.with_max_retries(2)).unwrap();
    let events = collect(&mut rx).await;
    assert_eq!(events.len(), 2, "transport failures are never retried");
    assert_eq!(outcome(&events).failure_kind(), Some(FailureKind::Transport));
}

#[tokio::test]
async fn descriptor_timeout_is_enforced_by_transport() {
    let base = common::echo_server::start();
    let sched = scheduler();
    let (desc, mut rx) = RequestDescriptor::with_channel(Verb::Get, Target::new(&base, "hang"));
    sched.submit(desc.with_timeout(Duration::from_secs(1))).unwrap();
    let events = collect(&mut rx).await;
    assert_eq!(outcome(&events).failure_kind(), Some(FailureKind::Transport));
}

#[tokio::test]
async fn high_priority_preempts_slow_low_request() {
    let base = common::echo_server::start();
    let sched = scheduler();

    let (low, mut low_rx) = RequestDescriptor::with_channel(Verb::Get, Target::new(&base, "hang"));
    sched.submit(low.with_timeout(Duration::from_secs(30))).unwrap();
    assert_eq!(low_rx.recv().await.unwrap(), RequestEvent::Start);
    tokio::time::sleep(Duration::from_millis(300)).await;

    let (high, mut high_rx) = RequestDescriptor::with_channel(Verb::Get, Target::new(&base, "echo"));
    sched.submit(high.with_priority(Priority::High)).unwrap();

    let low_events = collect(&mut low_rx).await;
    assert_eq!(outcome(&low_events).failure_kind(), Some(FailureKind::Cancelled));

    let high_events = collect(&mut high_rx).await;
    assert_eq!(high_events[0], RequestEvent::Start);
    assert_eq!(echo(&outcome(&high_events))["path"], "/echo");

    sched.shutdown().await;
}
