// # beacon-core
//
// Core library for the beacon host-reporting system.
//
// ## Architecture Overview
//
// A fleet of hosts periodically self-report their hostname and current
// outbound IP address to a central collector, which keeps the latest known
// address per host. This library provides both halves:
//
// - **IdentityResolver**: Trait for discovering the local (hostname, ip) pair
// - **ReportTransport**: Trait for delivering reports to the collector
// - **ReportingEngine**: The reporter's change-detection + retry/backoff
//   state machine (resolve → compare → send → wait)
// - **ClientStore**: Trait for the collector's per-host record storage,
//   with in-memory and durable file implementations
// - **Clock**: Injected wall-clock capability so tests simulate time
//
// ## Design Principles
//
// 1. **Separation of Concerns**: The cycle/retry logic is separate from
//    the leaf implementations that touch the network
// 2. **Single Writer**: Reporting state is one plain struct owned by one
//    task; the collector store owns all cross-request locking
// 3. **Idempotency**: Repeated reports upsert to the same final state
// 4. **Forward Progress**: No failure is fatal; every error path adjusts
//    state, picks a pause, and continues

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use clock::{Clock, SystemClock};
pub use config::{CollectorConfig, IntervalConfig, ReporterConfig, StoreConfig};
pub use engine::{EngineEvent, ReportingEngine, ReportingState};
pub use error::{Error, Result};
pub use store::{FileClientStore, MemoryClientStore};
pub use traits::{
    ClientRecord, ClientStore, DeliveryOutcome, IdentityResolver, ObservedIdentity,
    ReportTransport,
};
