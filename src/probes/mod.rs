//! Reachability probes.
//!
//! A probe performs exactly one reachability check against a host and returns
//! a timed result or a classified failure. Probes hold no state across calls.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ProbeConfig;

pub mod icmp;
pub mod resolve;
pub mod tcp;

/// How a host's reachability is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ProbeMethod {
    /// TCP connect to a configured port.
    #[default]
    Tcp,
    /// One echo request via the system `ping` binary.
    Icmp,
}

impl std::fmt::Display for ProbeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeMethod::Tcp => write!(f, "tcp"),
            ProbeMethod::Icmp => write!(f, "icmp"),
        }
    }
}

/// Classification of a failed probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The host name could not be resolved to an address.
    HostUnresolvable,
    /// Network-layer failure: refused, reset, no route.
    IoFailure,
    /// No definitive answer before the deadline.
    Timeout,
    /// Anything else.
    Unknown,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::HostUnresolvable => write!(f, "unresolvable host"),
            ErrorKind::IoFailure => write!(f, "I/O failure"),
            ErrorKind::Timeout => write!(f, "timed out"),
            ErrorKind::Unknown => write!(f, "unknown error"),
        }
    }
}

/// A classified probe failure with the underlying cause preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl ProbeFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Deadline exceeded without an answer.
    pub fn timed_out(timeout: Duration) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("no answer within {} ms", timeout.as_millis()),
        )
    }

    /// Classify an I/O error raised by a connect or send.
    pub fn from_io(err: &io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::TimedOut => ErrorKind::Timeout,
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::AddrNotAvailable
            | io::ErrorKind::HostUnreachable
            | io::ErrorKind::NetworkUnreachable
            | io::ErrorKind::NetworkDown => ErrorKind::IoFailure,
            _ => ErrorKind::Unknown,
        };
        Self::new(kind, err.to_string())
    }
}

impl std::fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

/// Result of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The host answered. `elapsed` covers only the reachability operation.
    Reachable { elapsed: Duration },
    /// The host did not answer. `failure` is `None` for a plain negative
    /// answer (e.g. ping got no echo reply) that carried no error.
    Unreachable { failure: Option<ProbeFailure> },
}

impl ProbeOutcome {
    pub fn failed(failure: ProbeFailure) -> Self {
        ProbeOutcome::Unreachable {
            failure: Some(failure),
        }
    }

    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeOutcome::Reachable { .. })
    }

    /// Error detail of a failed probe, if any.
    pub fn failure(&self) -> Option<&ProbeFailure> {
        match self {
            ProbeOutcome::Unreachable { failure } => failure.as_ref(),
            ProbeOutcome::Reachable { .. } => None,
        }
    }
}

/// Trait for all reachability probes.
#[async_trait::async_trait]
pub trait Probe: Send + Sync {
    /// Check once whether `host` answers within `timeout`.
    ///
    /// Never retries. Failures are returned as [`ProbeOutcome::Unreachable`],
    /// never as a panic or error.
    async fn probe(&self, host: &str, timeout: Duration) -> ProbeOutcome;
}

/// Build the probe selected by the configuration.
pub fn build_probe(config: &ProbeConfig) -> Arc<dyn Probe> {
    match config.method {
        ProbeMethod::Tcp => Arc::new(tcp::TcpProbe::new(config.port)),
        ProbeMethod::Icmp => Arc::new(icmp::IcmpProbe::default()),
    }
}
