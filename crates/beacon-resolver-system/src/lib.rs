// # System Identity Resolver
//
// This crate provides the default identity resolver: the OS hostname plus
// the primary outbound IP address.
//
// ## How the outbound IP is found
//
// A UDP socket is `connect`ed to a well-known external address (Google
// DNS by default). Connecting a datagram socket sends nothing; it only
// asks the kernel to pick the route, and the socket's local address is
// then the address the host would use for outbound traffic. This finds
// the primary non-loopback address without enumerating interfaces and
// without any packet leaving the machine.
//
// ## Failure Modes
//
// - Hostname unavailable or not valid UTF-8
// - No route to the probe address (network down)
//
// Both surface as resolution errors; the engine retries them at the
// retry interval without touching its send-retry state.

use async_trait::async_trait;
use beacon_core::traits::{IdentityResolver, ObservedIdentity};
use beacon_core::{Error, Result};
use std::net::SocketAddr;
use tokio::net::UdpSocket;

/// Probe address used to select the outbound route (no data is sent)
const DEFAULT_PROBE_ADDR: &str = "8.8.8.8:53";

/// Identity resolver backed by the OS hostname and a UDP route probe
pub struct SystemIdentityResolver {
    /// External address the route probe connects to
    probe_addr: SocketAddr,
}

impl SystemIdentityResolver {
    /// Create a resolver probing the default external address
    pub fn new() -> Self {
        Self {
            probe_addr: DEFAULT_PROBE_ADDR
                .parse()
                .expect("default probe address is valid"),
        }
    }

    /// Create a resolver probing a custom external address
    ///
    /// Useful on networks where the default probe target is filtered;
    /// any routable address works since no datagram is sent.
    pub fn with_probe_addr(probe_addr: SocketAddr) -> Self {
        Self { probe_addr }
    }

    /// Determine the system hostname
    fn resolve_hostname(&self) -> Result<String> {
        let raw = hostname::get()
            .map_err(|e| Error::resolution(format!("could not determine hostname: {}", e)))?;

        let name = raw.to_str().ok_or_else(|| {
            Error::resolution(format!("hostname is not valid UTF-8: {:?}", raw))
        })?;

        if name.is_empty() {
            return Err(Error::resolution("system returned an empty hostname"));
        }

        Ok(name.to_string())
    }

    /// Determine the primary outbound IP via the route probe
    async fn resolve_outbound_ip(&self) -> Result<std::net::IpAddr> {
        let socket = UdpSocket::bind("0.0.0.0:0").await.map_err(|e| {
            Error::resolution(format!("could not bind probe socket: {}", e))
        })?;

        socket.connect(self.probe_addr).await.map_err(|e| {
            Error::resolution(format!(
                "could not determine outbound IP (network may be down): {}",
                e
            ))
        })?;

        let local = socket.local_addr().map_err(|e| {
            Error::resolution(format!("could not read probe socket address: {}", e))
        })?;

        Ok(local.ip())
    }
}

impl Default for SystemIdentityResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityResolver for SystemIdentityResolver {
    async fn resolve(&self) -> Result<ObservedIdentity> {
        let hostname = self.resolve_hostname()?;
        let ip = self.resolve_outbound_ip().await?;

        tracing::debug!("resolved local identity {}/{}", hostname, ip);
        Ok(ObservedIdentity::new(hostname, ip))
    }
}
