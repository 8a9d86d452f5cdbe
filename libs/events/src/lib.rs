//! # segbridge-events
//!
//! Event model for batches delivered by the content platform's event bus.
//!
//! ## Design Principles
//!
//! - Events are committed, immutable notifications; listeners never mutate them
//! - Every event carries the principal it happened under
//! - Document events carry the source document, repository, session and
//!   destination; other events carry none of these
//! - Everything is serde-serializable so hosts can hand batches over as JSON
//!
//! ## Batches
//!
//! Events are delivered in an [`EventBatch`], in commit order. A batch may
//! contain the same event name several times.
//!
//! ## Event Names
//!
//! Well-known names live in [`event_names`]:
//! - Document lifecycle (`documentCreated`, `documentModified`, ...)
//! - Authentication (`loginSuccess`, `logout`)
//! - Directory (`user_created`)

mod envelope;
mod error;
mod types;

pub use envelope::*;
pub use error::EventError;
pub use types::*;
