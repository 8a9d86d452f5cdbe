//! segbridge analytics listener
//!
//! Bridges the content platform's post-commit event bus to a Segment-compatible
//! analytics API. For each committed batch it selects the events that have
//! mapping rules, builds a per-event context bag, maps it to a flat payload and
//! sends one `identify` or `track` call per rule.
//!
//! ## Architecture
//!
//! ```text
//! host event bus ──▶ AnalyticsListener ──▶ AnalyticsSink (SegmentClient)
//!                     │   │    │
//!                     │   │    └── MapperRegistry (event name → mappers)
//!                     │   └─────── IdentityResolver (user directory)
//!                     └─────────── PrivilegeElevator (system login)
//! ```
//!
//! Host systems are injected as traits; nothing is looked up globally.
//!
//! ## Modules
//!
//! - `listener`: batch processing and failure policy
//! - `mapping`: mapper trait, registry, built-in mappers, mapping file
//! - `context`: per-event context bag
//! - `analytics`: Segment HTTP client and in-memory sink
//! - `identity`, `privilege`: host capabilities
//! - `config`, `telemetry`: environment configuration and tracing setup

pub mod analytics;
pub mod config;
pub mod context;
pub mod error;
pub mod identity;
pub mod listener;
pub mod mapping;
pub mod privilege;
pub mod telemetry;

// Re-export commonly used types
pub use analytics::{AnalyticsSink, DryRunSink, RecordingSink, SegmentClient, SinkCall, SinkError};
pub use config::Config;
pub use context::ContextBag;
pub use error::{ListenerError, ListenerResult};
pub use identity::{IdentityError, IdentityResolver, InMemoryDirectory};
pub use listener::{
    AnalyticsListener, BatchReport, DispatchFailure, FailurePolicy, PostCommitListener,
};
pub use mapping::{MappedData, Mapper, MapperRegistry, MappingError};
pub use privilege::{
    AuthError, PrivilegeElevator, PrivilegedScope, StaticElevator, SystemCredential,
};
