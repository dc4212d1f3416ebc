//! Connectivity probe: "is the network reachable right now?"
//!
//! Probes are synchronous and may block; the scheduler runs them on the
//! blocking pool.

use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

pub trait ConnectivityProbe: Send + Sync + 'static {
    fn is_reachable(&self) -> bool;
}

/// Reachable if a TCP connection to a well-known host succeeds.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::new("www.google.com", 443, Duration::from_secs(3))
    }
}

impl ConnectivityProbe for TcpProbe {
    fn is_reachable(&self) -> bool {
        let addrs = match (self.host.as_str(), self.port).to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(e) => {
                tracing::debug!(host = %self.host, "probe: resolve failed: {}", e);
                return false;
            }
        };
        if connect_any(addrs, self.timeout) {
            return true;
        }
        tracing::debug!(host = %self.host, port = self.port, "probe: no address reachable");
        false
    }
}

/// Try each address in turn; `timeout` bounds the whole sequence, not each try.
fn connect_any(addrs: impl IntoIterator<Item = SocketAddr>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    for addr in addrs {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        if TcpStream::connect_timeout(&addr, remaining).is_ok() {
            return true;
        }
    }
    false
}

/// Probe with a switchable answer (offline mode, tests).
#[derive(Debug)]
pub struct StaticProbe(AtomicBool);

impl StaticProbe {
    pub fn new(reachable: bool) -> Self {
        Self(AtomicBool::new(reachable))
    }

    pub fn set(&self, reachable: bool) {
        self.0.store(reachable, Ordering::Relaxed);
    }
}

impl ConnectivityProbe for StaticProbe {
    fn is_reachable(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl<P: ConnectivityProbe> ConnectivityProbe for std::sync::Arc<P> {
    fn is_reachable(&self) -> bool {
        (**self).is_reachable()
    }
}

impl ConnectivityProbe for Box<dyn ConnectivityProbe> {
    fn is_reachable(&self) -> bool {
        (**self).is_reachable()
    }
}
