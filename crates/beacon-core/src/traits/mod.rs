//! Core traits for the beacon system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IdentityResolver`]: Discover the local hostname and outbound IP
//! - [`ReportTransport`]: Deliver reports to the collector
//! - [`ClientStore`]: Persist the latest known address per host

pub mod client_store;
pub mod identity_resolver;
pub mod transport;

pub use client_store::{ClientRecord, ClientStore, validate_report};
pub use identity_resolver::{IdentityResolver, ObservedIdentity};
pub use transport::{DeliveryOutcome, ReportTransport};
