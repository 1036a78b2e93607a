//! Single-shot reachability probe.
//!
//! # Responsibilities
//! - Attempt a TCP connect to a backend's host:port within a timeout
//! - Close the connection immediately on success
//! - Give up without a verdict when cancelled

use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::net::TcpStream;
use tokio::time;
use url::{Host, Url};

use crate::lifecycle::ShutdownSignal;

/// Checks whether a backend address is reachable.
pub trait HealthProbe: Send + Sync {
    /// Resolve to `true` if the backend answered within `timeout`.
    fn probe<'a>(&'a self, address: &'a Url, timeout: Duration) -> BoxFuture<'a, bool>;
}

/// Transport-level probe: a plain TCP connect.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpProbe;

impl HealthProbe for TcpProbe {
    fn probe<'a>(&'a self, address: &'a Url, timeout: Duration) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            let (Some(host), Some(port)) = (address.host(), address.port_or_known_default()) else {
                tracing::warn!(backend = %address, "Backend address has no host:port to probe");
                return false;
            };
            // `host_str` keeps the brackets around IPv6 literals, which connect() rejects.
            let host = match host {
                Host::Domain(domain) => domain.to_string(),
                Host::Ipv4(ip) => ip.to_string(),
                Host::Ipv6(ip) => ip.to_string(),
            };

            match time::timeout(timeout, TcpStream::connect((host.as_str(), port))).await {
                Ok(Ok(stream)) => {
                    drop(stream);
                    true
                }
                Ok(Err(e)) => {
                    tracing::debug!(backend = %address, error = %e, "Site unreachable");
                    false
                }
                Err(_) => {
                    tracing::debug!(
                        backend = %address,
                        timeout = ?timeout,
                        "Health probe timed out"
                    );
                    false
                }
            }
        })
    }
}

/// Run `probe` unless `shutdown` fires first.
///
/// Returns `None` when cancelled; callers treat that as "no update", never as
/// dead.
pub async fn probe_until_cancelled(
    probe: &dyn HealthProbe,
    address: &Url,
    timeout: Duration,
    shutdown: &mut ShutdownSignal,
) -> Option<bool> {
    tokio::select! {
        biased;
        _ = shutdown.recv() => None,
        alive = probe.probe(address, timeout) => Some(alive),
    }
}
