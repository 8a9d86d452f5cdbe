//! Outbound analytics calls.
//!
//! The listener only ever issues two calls: `identify` (associate traits with
//! a user) and `track` (record a named action for a user).
//!
//! - [`SegmentClient`] posts them to a Segment-compatible HTTP API
//! - [`DryRunSink`] logs and drops them (dry-run mode)
//! - [`RecordingSink`] keeps them in memory (tests and embedding hosts)

mod recording;
mod segment;

pub use recording::{DryRunSink, RecordingSink, SinkCall};
pub use segment::{SegmentClient, SegmentConfig};

use std::sync::Arc;

use async_trait::async_trait;
use segbridge_events::IdentityRecord;
use thiserror::Error;

use crate::config::Config;
use crate::mapping::MappedData;

/// Errors raised by an analytics backend.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The client could not be set up.
    #[error("client setup failed: {0}")]
    Setup(String),
}

impl From<reqwest::Error> for SinkError {
    fn from(err: reqwest::Error) -> Self {
        SinkError::Transport(err.to_string())
    }
}

/// Destination for identify and track calls.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    /// Associates `traits` with `principal`.
    async fn identify(
        &self,
        principal: &IdentityRecord,
        traits: &MappedData,
    ) -> Result<(), SinkError>;

    /// Records that `event` happened for `principal`.
    async fn track(
        &self,
        principal: &IdentityRecord,
        event: &str,
        properties: &MappedData,
    ) -> Result<(), SinkError>;
}

/// Builds the sink selected by configuration.
pub fn build_sink(config: &Config) -> Result<Arc<dyn AnalyticsSink>, SinkError> {
    if config.dry_run {
        return Ok(Arc::new(DryRunSink));
    }

    let write_key = config
        .write_key
        .clone()
        .ok_or_else(|| SinkError::Setup("no write key configured".to_string()))?;

    let client = SegmentClient::new(SegmentConfig {
        endpoint: config.endpoint.clone(),
        write_key,
        timeout: config.http_timeout,
    })?;
    Ok(Arc::new(client))
}
