// # Identity Resolver Trait
//
// Defines the interface for discovering the local host's identity: its
// hostname and its current outbound IP address.
//
// ## Implementations
//
// - System resolver (UDP probe): `beacon-resolver-system` crate
// - Future: interface enumeration, HTTP echo services
//
// ## Usage
//
// ```rust,ignore
// use beacon_core::IdentityResolver;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let resolver = /* IdentityResolver implementation */;
//
//     let identity = resolver.resolve().await?;
//     println!("{} reports from {}", identity.hostname, identity.ip);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;

/// A freshly observed (hostname, outbound IP) pair
///
/// Produced anew on every reporting cycle; the engine compares it against
/// the last adopted identity to decide whether data has changed. It is
/// never persisted by the engine itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedIdentity {
    /// The system hostname
    pub hostname: String,
    /// The current outbound IP address
    pub ip: IpAddr,
}

impl ObservedIdentity {
    /// Create a new observed identity
    pub fn new(hostname: impl Into<String>, ip: IpAddr) -> Self {
        Self {
            hostname: hostname.into(),
            ip,
        }
    }
}

impl std::fmt::Display for ObservedIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.hostname, self.ip)
    }
}

/// Trait for identity resolver implementations
///
/// Resolvers are observers: they perform whatever local I/O is needed to
/// determine the host's identity, and nothing else. Scheduling, retry,
/// and change detection are owned by the reporting engine.
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve the current local identity
    ///
    /// A failure here means the local environment could not produce a
    /// usable (hostname, ip) pair, e.g. the network is down or the
    /// hostname is unavailable. The engine treats this as transient
    /// and independent of the send-retry state machine.
    ///
    /// # Returns
    ///
    /// - `Ok(ObservedIdentity)`: the current identity
    /// - `Err(Error)`: if hostname or IP could not be determined
    async fn resolve(&self) -> Result<ObservedIdentity, crate::Error>;
}
