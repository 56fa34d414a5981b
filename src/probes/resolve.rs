//! Host name resolution shared by the probes.

use std::net::IpAddr;

use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::TokioAsyncResolver;

use super::{ErrorKind, ProbeFailure};

/// Resolve `host` to the first address it maps to.
///
/// IP literals are returned as-is. A fresh resolver is built from the system
/// configuration on every call so no answers are carried between probes.
pub async fn resolve_host(host: &str) -> Result<IpAddr, ProbeFailure> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    let resolver = TokioAsyncResolver::tokio_from_system_conf().map_err(|e| {
        ProbeFailure::new(
            ErrorKind::Unknown,
            format!("failed to load resolver configuration: {e}"),
        )
    })?;

    let lookup = resolver
        .lookup_ip(host)
        .await
        .map_err(|e| classify_resolve_error(host, &e))?;

    lookup.iter().next().ok_or_else(|| {
        ProbeFailure::new(
            ErrorKind::HostUnresolvable,
            format!("no addresses found for {host}"),
        )
    })
}

fn classify_resolve_error(host: &str, err: &ResolveError) -> ProbeFailure {
    match err.kind() {
        ResolveErrorKind::Timeout => ProbeFailure::new(
            ErrorKind::Timeout,
            format!("name resolution for {host} timed out"),
        ),
        _ => ProbeFailure::new(
            ErrorKind::HostUnresolvable,
            format!("could not resolve {host}: {err}"),
        ),
    }
}
