//! libcurl transport.
//!
//! Uses the curl crate's Easy interface on tokio's blocking pool. The cancel
//! token is polled from curl's progress callback, which aborts the transfer.

use std::str;
use std::time::Duration;

use super::{CancelToken, Transport, TransportOutcome, WireRequest};
use crate::event::FailureKind;
use crate::retry::classify_curl_error;

/// Connect timeout cap; the descriptor timeout still bounds the whole call.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Default)]
pub struct CurlTransport {
    user_agent: Option<String>,
}

impl CurlTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

impl Transport for CurlTransport {
    fn execute(
        &self,
        request: WireRequest,
        cancel: CancelToken,
    ) -> impl std::future::Future<Output = TransportOutcome> + Send {
        let user_agent = self.user_agent.clone();
        async move {
            let url = request.url.clone();
            match tokio::task::spawn_blocking(move || perform(&request, user_agent.as_deref(), &cancel))
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(url = %url, "transport task failed: {}", e);
                    TransportOutcome::Failed {
                        message: format!("transport task failed: {}", e),
                        status: None,
                    }
                }
            }
        }
    }
}

/// Runs one request in the current thread.
fn perform(request: &WireRequest, user_agent: Option<&str>, cancel: &CancelToken) -> TransportOutcome {
    let mut data = Vec::new();
    let result = run_easy(request, user_agent, cancel, &mut data);
    match result {
        Ok(status) => TransportOutcome::Completed { data, status },
        Err(e) => match classify_curl_error(&e) {
            FailureKind::Cancelled => TransportOutcome::Cancelled,
            _ => TransportOutcome::Failed {
                message: e.description().to_string(),
                status: None,
            },
        },
    }
}

fn run_easy(
    request: &WireRequest,
    user_agent: Option<&str>,
    cancel: &CancelToken,
    data: &mut Vec<u8>,
) -> Result<u16, curl::Error> {
    let mut easy = curl::easy::Easy::new();
    easy.url(&request.url)?;
    easy.custom_request(request.method.as_str())?;
    easy.connect_timeout(CONNECT_TIMEOUT.min(request.timeout))?;
    easy.timeout(request.timeout)?;
    easy.progress(true)?;
    if let Some(ua) = user_agent {
        easy.useragent(ua)?;
    }
    if let Some(body) = &request.body {
        easy.post_fields_copy(body)?;
    }

    // Build curl list for headers ("Name: value").
    let mut list = curl::easy::List::new();
    for (k, v) in &request.headers {
        list.append(&format!("{}: {}", k.trim(), v.trim()))?;
    }
    if !request.headers.is_empty() {
        easy.http_headers(list)?;
    }

    {
        let mut transfer = easy.transfer();
        transfer.write_function(|chunk| {
            data.extend_from_slice(chunk);
            Ok(chunk.len())
        })?;
        // Returning false aborts with CURLE_ABORTED_BY_CALLBACK.
        transfer.progress_function(|_, _, _, _| !cancel.is_cancelled())?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    Ok(code as u16)
}
