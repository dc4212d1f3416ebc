//! Request descriptors: what a caller submits to the scheduler.
//!
//! A descriptor is immutable once submitted. The scheduler owns it while it
//! sits in a queue and reports its lifecycle through the callback.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::event::RequestEvent;

/// Default per-request timeout handed to the transport.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// HTTP verb. GET/DELETE carry parameters in the query string,
/// POST/PUT carry them as a JSON body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    #[default]
    Get,
    Delete,
    Post,
    Put,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Delete => "DELETE",
            Verb::Post => "POST",
            Verb::Put => "PUT",
        }
    }

    /// True for verbs whose parameters are encoded into the query string.
    pub fn is_read_style(self) -> bool {
        matches!(self, Verb::Get | Verb::Delete)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheduling priority. High requests are always served first and preempt
/// an in-flight low request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Low,
}

/// How the request should treat intermediate caches. There is no local cache
/// in this crate; the policy only shapes the outgoing cache headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    UseProtocol,
    ReloadIgnoringLocalCache,
    #[default]
    ReloadIgnoringLocalAndRemoteCache,
    ReturnCacheDataElseLoad,
}

/// Base location plus logical endpoint name, e.g.
/// `https://api.openweathermap.org/data/2.5` + `weather`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub base: String,
    pub endpoint: String,
}

impl Target {
    pub fn new(base: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            endpoint: endpoint.into(),
        }
    }

    /// `base/endpoint` joined with exactly one slash.
    pub fn location(&self) -> String {
        let base = self.base.trim_end_matches('/');
        let endpoint = self.endpoint.trim_start_matches('/');
        if endpoint.is_empty() {
            return base.to_string();
        }
        format!("{}/{}", base, endpoint)
    }
}

/// Completion callback, invoked from the scheduler task.
pub type Callback = Arc<dyn Fn(RequestEvent) + Send + Sync>;

/// What to send, how to schedule it, and where to report events.
#[derive(Clone)]
pub struct RequestDescriptor {
    pub verb: Verb,
    pub target: Target,
    pub priority: Priority,
    pub timeout: Duration,
    pub max_retries: u32,
    pub params: BTreeMap<String, Value>,
    pub headers: BTreeMap<String, String>,
    pub cache_policy: CachePolicy,
    callback: Callback,
}

impl RequestDescriptor {
    pub fn new<F>(verb: Verb, target: Target, callback: F) -> Self
    where
        F: Fn(RequestEvent) + Send + Sync + 'static,
    {
        Self {
            verb,
            target,
            priority: Priority::default(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: 0,
            params: BTreeMap::new(),
            headers: BTreeMap::new(),
            cache_policy: CachePolicy::default(),
            callback: Arc::new(callback),
        }
    }

    /// Descriptor whose events are delivered on an unbounded channel.
    pub fn with_channel(
        verb: Verb,
        target: Target,
    ) -> (Self, mpsc::UnboundedReceiver<RequestEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let desc = Self::new(verb, target, move |event| {
            // Receiver gone means the caller stopped listening.
            let _ = tx.send(event);
        });
        (desc, rx)
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Bound on the whole transport call. `CurlTransport` treats zero as
    /// "no timeout", so callers taking user input should reject it.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Negative limits are clamped to 0.
    pub fn with_max_retries(mut self, max_retries: i64) -> Self {
        self.max_retries = max_retries.clamp(0, u32::MAX as i64) as u32;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_params(mut self, params: BTreeMap<String, Value>) -> Self {
        self.params = params;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_cache_policy(mut self, cache_policy: CachePolicy) -> Self {
        self.cache_policy = cache_policy;
        self
    }

    /// Replace the completion callback.
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(RequestEvent) + Send + Sync + 'static,
    {
        self.callback = Arc::new(callback);
        self
    }

    pub(crate) fn emit(&self, event: RequestEvent) {
        (self.callback)(event);
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("verb", &self.verb)
            .field("target", &self.target)
            .field("priority", &self.priority)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("params", &self.params)
            .field("headers", &self.headers)
            .field("cache_policy", &self.cache_policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> impl Fn(RequestEvent) + Send + Sync + 'static {
        |_| {}
    }

    #[test]
    fn defaults_match_documented_values() {
        let d = RequestDescriptor::new(Verb::Get, Target::new("http://h", "e"), noop());
        assert_eq!(d.timeout, Duration::from_secs(3));
        assert_eq!(d.max_retries, 0);
        assert_eq!(d.priority, Priority::Low);
        assert_eq!(d.cache_policy, CachePolicy::ReloadIgnoringLocalAndRemoteCache);
    }

    #[test]
    fn negative_retry_limit_clamps_to_zero() {
        let d = RequestDescriptor::new(Verb::Get, Target::new("http://h", "e"), noop())
            .with_max_retries(-1);
        assert_eq!(d.max_retries, 0);
        let d = d.with_max_retries(4);
        assert_eq!(d.max_retries, 4);
    }

    #[test]
    fn target_location_joins_with_single_slash() {
        assert_eq!(Target::new("http://h/api/", "/weather").location(), "http://h/api/weather");
        assert_eq!(Target::new("http://h/api", "weather").location(), "http://h/api/weather");
        assert_eq!(Target::new("http://h/api", "").location(), "http://h/api");
    }

    #[test]
    fn verb_styles() {
        assert!(Verb::Get.is_read_style());
        assert!(Verb::Delete.is_read_style());
        assert!(!Verb::Post.is_read_style());
        assert!(!Verb::Put.is_read_style());
        assert_eq!(Verb::Put.as_str(), "PUT");
    }

    #[test]
    fn channel_descriptor_forwards_events() {
        let (d, mut rx) = RequestDescriptor::with_channel(Verb::Get, Target::new("http://h", "e"));
        d.emit(RequestEvent::Start);
        assert_eq!(rx.try_recv().unwrap(), RequestEvent::Start);
    }
}
