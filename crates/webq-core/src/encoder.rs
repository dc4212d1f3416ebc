//! Turn a descriptor into a wire request.
//!
//! Read-style verbs carry string parameters in the query string; write-style
//! verbs carry the whole parameter map as a JSON object body.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::request::{CachePolicy, RequestDescriptor};
use crate::transport::WireRequest;

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("invalid request URL {url:?}: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("URL {0:?} is not http(s)")]
    Scheme(String),
    #[error("cannot encode request body: {0}")]
    Body(#[from] serde_json::Error),
}

/// `?k=v&k2=v2` from the string-valued parameters, in key order.
/// Non-string values are dropped; no string values yields an empty string.
pub fn build_query(params: &BTreeMap<String, Value>) -> String {
    let pairs: Vec<String> = params
        .iter()
        .filter_map(|(k, v)| v.as_str().map(|s| format!("{}={}", k, s)))
        .collect();
    if pairs.is_empty() {
        return String::new();
    }
    format!("?{}", pairs.join("&"))
}

/// JSON object body from the full parameter map.
pub fn build_body(params: &BTreeMap<String, Value>) -> Result<Vec<u8>, EncodeError> {
    Ok(serde_json::to_vec(params)?)
}

/// Headers implied by the cache policy.
pub fn cache_headers(policy: CachePolicy) -> &'static [(&'static str, &'static str)] {
    match policy {
        CachePolicy::UseProtocol => &[],
        CachePolicy::ReloadIgnoringLocalCache => &[("Cache-Control", "no-cache")],
        CachePolicy::ReloadIgnoringLocalAndRemoteCache => {
            &[("Cache-Control", "no-cache"), ("Pragma", "no-cache")]
        }
        CachePolicy::ReturnCacheDataElseLoad => &[("Cache-Control", "max-stale")],
    }
}

/// Build the full wire request for a descriptor.
///
/// Caller headers override headers implied by the cache policy or the body type.
pub fn build_request(desc: &RequestDescriptor) -> Result<WireRequest, EncodeError> {
    let mut location = desc.target.location();
    let mut body = None;
    if desc.verb.is_read_style() {
        location.push_str(&build_query(&desc.params));
    } else {
        body = Some(build_body(&desc.params)?);
    }

    let url = url::Url::parse(&location).map_err(|source| EncodeError::Url {
        url: location.clone(),
        source,
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(EncodeError::Scheme(location));
    }

    let mut headers: BTreeMap<String, String> = cache_headers(desc.cache_policy)
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    if body.is_some() {
        headers.insert("Content-Type".to_string(), "application/json".to_string());
    }
    for (k, v) in &desc.headers {
        headers.retain(|existing, _| !existing.eq_ignore_ascii_case(k));
        headers.insert(k.clone(), v.clone());
    }

    Ok(WireRequest {
        method: desc.verb,
        url: url.to_string(),
        body,
        headers,
        timeout: desc.timeout,
    })
}
