//! Sinks that never leave the process: an in-memory recorder and a log-only
//! dry-run sink.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use segbridge_events::IdentityRecord;
use tracing::info;

use crate::mapping::MappedData;

use super::{AnalyticsSink, SinkError};

/// A call received by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Identify {
        user_id: String,
        traits: MappedData,
    },
    Track {
        user_id: String,
        event: String,
        properties: MappedData,
    },
}

impl SinkCall {
    pub fn user_id(&self) -> &str {
        match self {
            SinkCall::Identify { user_id, .. } | SinkCall::Track { user_id, .. } => user_id,
        }
    }

    pub fn is_identify(&self) -> bool {
        matches!(self, SinkCall::Identify { .. })
    }
}

/// Records every call instead of sending it anywhere.
///
/// Calls accumulate until [`RecordingSink::clear`]; hold on to the sink to
/// read them back.
#[derive(Debug, Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<SinkCall>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SinkCall>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.lock().clone()
    }

    pub fn identify_count(&self) -> usize {
        self.lock().iter().filter(|c| c.is_identify()).count()
    }

    pub fn track_count(&self) -> usize {
        self.lock().iter().filter(|c| !c.is_identify()).count()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[async_trait]
impl AnalyticsSink for RecordingSink {
    async fn identify(
        &self,
        principal: &IdentityRecord,
        traits: &MappedData,
    ) -> Result<(), SinkError> {
        self.lock().push(SinkCall::Identify {
            user_id: principal.name.clone(),
            traits: traits.clone(),
        });
        Ok(())
    }

    async fn track(
        &self,
        principal: &IdentityRecord,
        event: &str,
        properties: &MappedData,
    ) -> Result<(), SinkError> {
        self.lock().push(SinkCall::Track {
            user_id: principal.name.clone(),
            event: event.to_string(),
            properties: properties.clone(),
        });
        Ok(())
    }
}

/// Logs each call and drops it (dry-run mode). Holds no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunSink;

#[async_trait]
impl AnalyticsSink for DryRunSink {
    async fn identify(
        &self,
        principal: &IdentityRecord,
        traits: &MappedData,
    ) -> Result<(), SinkError> {
        info!(user_id = %principal.name, traits = %serde_json::Value::Object(traits.clone()), "[DRY RUN] identify");
        Ok(())
    }

    async fn track(
        &self,
        principal: &IdentityRecord,
        event: &str,
        properties: &MappedData,
    ) -> Result<(), SinkError> {
        info!(user_id = %principal.name, event = event, properties = %serde_json::Value::Object(properties.clone()), "[DRY RUN] track");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_recording_sink_counts_calls() {
        let sink = RecordingSink::new();
        let principal = IdentityRecord::new("jdoe");
        let mut data = MappedData::new();
        data.insert("k".into(), json!(1));

        sink.identify(&principal, &data).await.unwrap();
        sink.track(&principal, "documentCreated", &data).await.unwrap();
        sink.track(&principal, "documentModified", &data).await.unwrap();

        assert_eq!(sink.identify_count(), 1);
        assert_eq!(sink.track_count(), 2);
        assert_eq!(sink.calls()[1].user_id(), "jdoe");

        sink.clear();
        assert!(sink.calls().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_sink_keeps_nothing() {
        let sink = DryRunSink;
        let principal = IdentityRecord::new("jdoe");
        let data = MappedData::new();

        for _ in 0..10_000 {
            sink.track(&principal, "documentCreated", &data).await.unwrap();
        }
        sink.identify(&principal, &data).await.unwrap();

        assert_eq!(std::mem::size_of::<DryRunSink>(), 0);
    }
}
