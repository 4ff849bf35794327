//! Realm endpoint resolution

use crate::error::EndpointError;
use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;
use tokio::net::lookup_host;
use tracing::debug;

/// Upper bound on a single host name lookup
const RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Network endpoints advertised for a realm
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RealmEndpoints {
    pub external: SocketAddr,
    pub local: SocketAddr,
    pub local_subnet_mask: Ipv4Addr,
}

impl RealmEndpoints {
    /// Resolve the stored address strings of a realm row.
    ///
    /// Host names are resolved through the system resolver and the first
    /// IPv4 address wins. The subnet mask must be a dotted-quad literal.
    pub async fn resolve(
        address: &str,
        local_address: &str,
        local_subnet_mask: &str,
        port: u16,
    ) -> Result<Self, EndpointError> {
        let external = resolve_host("address", address, port).await?;
        let local = resolve_host("localAddress", local_address, port).await?;
        let local_subnet_mask = local_subnet_mask.trim().parse::<Ipv4Addr>().map_err(|_| {
            EndpointError::InvalidAddress {
                field: "localSubnetMask",
                value: local_subnet_mask.to_string(),
            }
        })?;

        Ok(Self {
            external,
            local,
            local_subnet_mask,
        })
    }
}

async fn resolve_host(
    field: &'static str,
    host: &str,
    port: u16,
) -> Result<SocketAddr, EndpointError> {
    let host = host.trim();
    if host.is_empty() {
        return Err(EndpointError::InvalidAddress {
            field,
            value: host.to_string(),
        });
    }

    if let Ok(ip) = host.parse::<Ipv4Addr>() {
        return Ok(SocketAddr::V4(SocketAddrV4::new(ip, port)));
    }

    let addrs = lookup_within(field, host, lookup_host((host, port)), RESOLVE_TIMEOUT).await?;

    let resolved = addrs
        .into_iter()
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| EndpointError::Unresolved {
            field,
            value: host.to_string(),
            reason: "no IPv4 address".to_string(),
        })?;

    debug!("Resolved {} '{}' to {}", field, host, resolved);
    Ok(resolved)
}

async fn lookup_within<I>(
    field: &'static str,
    host: &str,
    lookup: impl Future<Output = io::Result<I>>,
    limit: Duration,
) -> Result<I, EndpointError> {
    let unresolved = |reason: String| EndpointError::Unresolved {
        field,
        value: host.to_string(),
        reason,
    };

    match tokio::time::timeout(limit, lookup).await {
        Ok(Ok(addrs)) => Ok(addrs),
        Ok(Err(e)) => Err(unresolved(e.to_string())),
        Err(_) => Err(unresolved(format!("lookup timed out after {:?}", limit))),
    }
}
