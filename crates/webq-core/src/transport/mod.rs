//! Wire transport: performs one built request and reports one outcome.
//!
//! The scheduler only depends on the [`Transport`] trait; [`CurlTransport`]
//! is the libcurl-backed implementation used by the CLI.

mod cancel;
mod http;

pub use cancel::CancelToken;
pub use http::CurlTransport;

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use crate::event::{FailureKind, Outcome};
use crate::request::Verb;

/// Fully-built request, ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    pub method: Verb,
    pub url: String,
    pub body: Option<Vec<u8>>,
    pub headers: BTreeMap<String, String>,
    pub timeout: Duration,
}

/// The single terminal result of a transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOutcome {
    /// A response was received (any status).
    Completed { data: Vec<u8>, status: u16 },
    /// No usable response: connection error, timeout, bad response.
    Failed { message: String, status: Option<u16> },
    /// The call observed its cancel token and stopped.
    Cancelled,
}

impl From<TransportOutcome> for Outcome {
    fn from(t: TransportOutcome) -> Self {
        match t {
            TransportOutcome::Completed { data, status } => Outcome::Success { data, status },
            TransportOutcome::Failed { message, status } => Outcome::Failure {
                kind: FailureKind::Transport,
                message,
                status,
            },
            TransportOutcome::Cancelled => Outcome::cancelled(),
        }
    }
}

/// Performs requests asynchronously.
///
/// Implementations must resolve exactly once and should watch `cancel`,
/// resolving with [`TransportOutcome::Cancelled`] once it is set.
pub trait Transport: Send + Sync + 'static {
    fn execute(
        &self,
        request: WireRequest,
        cancel: CancelToken,
    ) -> impl Future<Output = TransportOutcome> + Send;
}
