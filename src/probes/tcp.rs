//! TCP connection probe.
//!
//! A completed three-way handshake counts as reachable. Refused or reset
//! connections are network-layer failures.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::net::TcpStream;
use tokio::time::timeout_at;

use super::resolve::resolve_host;
use super::{Probe, ProbeFailure, ProbeOutcome};

/// Port used when none is configured.
pub const DEFAULT_PORT: u16 = 80;

/// TCP connect probe against a fixed port.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    port: u16,
}

impl TcpProbe {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::new(DEFAULT_PORT)
    }
}

#[async_trait::async_trait]
impl Probe for TcpProbe {
    async fn probe(&self, host: &str, timeout: Duration) -> ProbeOutcome {
        let deadline = tokio::time::Instant::now() + timeout;

        let ip = match timeout_at(deadline, resolve_host(host)).await {
            Ok(Ok(ip)) => ip,
            Ok(Err(failure)) => return ProbeOutcome::failed(failure),
            Err(_) => return ProbeOutcome::failed(ProbeFailure::timed_out(timeout)),
        };
        let addr = SocketAddr::new(ip, self.port);

        let start = Instant::now();
        let result = timeout_at(deadline, TcpStream::connect(addr)).await;
        let elapsed = start.elapsed();

        match result {
            Ok(Ok(_stream)) => {
                tracing::debug!(%host, %addr, elapsed_ms = elapsed.as_millis() as u64, "TCP connect succeeded");
                ProbeOutcome::Reachable { elapsed }
            }
            Ok(Err(e)) => {
                tracing::debug!(%host, %addr, error = %e, "TCP connect failed");
                ProbeOutcome::failed(ProbeFailure::from_io(&e))
            }
            Err(_) => ProbeOutcome::failed(ProbeFailure::timed_out(timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::ErrorKind;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_connect_to_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();

        let probe = TcpProbe::new(port);
        let outcome = probe.probe("127.0.0.1", Duration::from_secs(2)).await;
        assert!(outcome.is_reachable(), "expected reachable, got {:?}", outcome);
    }

    #[tokio::test]
    async fn test_refused_is_io_failure() {
        // Grab a free port, then close it so the connect is refused.
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        drop(listener);

        let probe = TcpProbe::new(port);
        match probe.probe("127.0.0.1", Duration::from_secs(2)).await {
            ProbeOutcome::Unreachable {
                failure: Some(failure),
            } => assert_eq!(failure.kind, ErrorKind::IoFailure),
            other => panic!("expected I/O failure, got {:?}", other),
        }
    }

    #[test]
    fn test_default_port() {
        assert_eq!(TcpProbe::default().port(), DEFAULT_PORT);
    }
}
