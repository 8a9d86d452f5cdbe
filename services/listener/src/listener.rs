//! Post-commit listener forwarding event batches to the analytics sink.
//!
//! For every delivered batch the listener:
//! 1. Picks the event names that have mappers and are present in the batch
//! 2. Logs in as the system principal (released on every exit path)
//! 3. For each matching event, resolves the acting identity once
//! 4. Runs each of the event's mappers in order and sends one identify or
//!    track call per mapper
//!
//! Everything runs on the caller's task; there is no internal parallelism and
//! no retry.

use std::borrow::Cow;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use segbridge_events::{Event, EventBatch, EventPrincipal, IdentityRecord};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::analytics::{build_sink, AnalyticsSink};
use crate::config::Config;
use crate::context::ContextBag;
use crate::error::{ListenerError, ListenerResult};
use crate::identity::IdentityResolver;
use crate::mapping::{Mapper, MapperRegistry};
use crate::privilege::{PrivilegeElevator, PrivilegedScope};

/// How a failing mapper, identity lookup or analytics call affects the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Record the failure, skip the affected rule (or event, for identity
    /// failures) and keep processing the batch.
    #[default]
    Isolate,
    /// Abort the batch on the first failure.
    FailFast,
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailurePolicy::Isolate => write!(f, "isolate"),
            FailurePolicy::FailFast => write!(f, "fail_fast"),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown failure policy: {0}")]
pub struct ParseFailurePolicyError(String);

impl FromStr for FailurePolicy {
    type Err = ParseFailurePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "isolate" => Ok(FailurePolicy::Isolate),
            "fail_fast" | "fail-fast" => Ok(FailurePolicy::FailFast),
            other => Err(ParseFailurePolicyError(other.to_string())),
        }
    }
}

/// A rule (or event) skipped under [`FailurePolicy::Isolate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchFailure {
    pub event: String,

    /// `None` when the event failed before any mapper ran (identity lookup).
    pub mapper: Option<String>,

    pub error: String,
}

/// Outcome of one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Events in the batch.
    pub events_seen: usize,

    /// Events with at least one mapper.
    pub events_matched: usize,

    pub identify_calls: usize,

    pub track_calls: usize,

    pub failures: Vec<DispatchFailure>,
}

impl BatchReport {
    /// Total outbound calls made.
    pub fn calls(&self) -> usize {
        self.identify_calls + self.track_calls
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Entry point the host event bus calls with each committed batch.
#[async_trait]
pub trait PostCommitListener: Send + Sync {
    async fn handle_batch(&self, batch: &EventBatch) -> ListenerResult<BatchReport>;
}

enum CallKind {
    Identify,
    Track,
}

/// Forwards mapped events to an [`AnalyticsSink`].
pub struct AnalyticsListener {
    registry: Arc<MapperRegistry>,
    identities: Arc<dyn IdentityResolver>,
    elevator: Arc<dyn PrivilegeElevator>,
    sink: Arc<dyn AnalyticsSink>,
    policy: FailurePolicy,
}

impl AnalyticsListener {
    /// Create a listener with the default failure policy.
    pub fn new(
        registry: Arc<MapperRegistry>,
        identities: Arc<dyn IdentityResolver>,
        elevator: Arc<dyn PrivilegeElevator>,
        sink: Arc<dyn AnalyticsSink>,
    ) -> Self {
        Self {
            registry,
            identities,
            elevator,
            sink,
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Create a listener whose mappers, sink and failure policy come from
    /// `config`. The host still supplies its directory and login mechanism.
    pub fn from_config(
        config: &Config,
        identities: Arc<dyn IdentityResolver>,
        elevator: Arc<dyn PrivilegeElevator>,
    ) -> anyhow::Result<Self> {
        let registry = Arc::new(config.mapper_registry()?);
        let sink = build_sink(config)?;
        info!(
            mappers = registry.mapper_count(),
            events = ?registry.mapped_events(),
            dry_run = config.dry_run,
            failure_policy = %config.failure_policy,
            "Analytics listener configured"
        );
        Ok(Self::new(registry, identities, elevator, sink).with_failure_policy(config.failure_policy))
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn registry(&self) -> &MapperRegistry {
        &self.registry
    }

    /// Process one committed batch.
    #[instrument(skip(self, batch), fields(batch_size = batch.len(), policy = %self.policy))]
    pub async fn process(&self, batch: &EventBatch) -> ListenerResult<BatchReport> {
        let mut report = BatchReport {
            events_seen: batch.len(),
            ..Default::default()
        };

        let watched: Vec<&str> = self
            .registry
            .mapped_events()
            .into_iter()
            .filter(|name| batch.contains_event_name(name))
            .collect();

        if watched.is_empty() {
            debug!("No mapped events in batch");
            return Ok(report);
        }

        let event_mappers = self.registry.mappers_for(&watched);

        let _scope = PrivilegedScope::enter(self.elevator.as_ref()).map_err(|err| {
            error!(error = %err, "Failed to acquire system credentials, dropping batch");
            ListenerError::from(err)
        })?;

        for event in batch {
            let Some(mappers) = event_mappers.get(&event.name).filter(|m| !m.is_empty()) else {
                continue;
            };
            report.events_matched += 1;

            let principal = match self.resolve_principal(event).await {
                Ok(principal) => principal,
                Err(err) => {
                    self.record_failure(&mut report, event, None, err)?;
                    continue;
                }
            };

            for mapper in mappers {
                match self.dispatch(event, &principal, mapper.as_ref()).await {
                    Ok(CallKind::Identify) => report.identify_calls += 1,
                    Ok(CallKind::Track) => report.track_calls += 1,
                    Err(err) => {
                        self.record_failure(&mut report, event, Some(mapper.name()), err)?
                    }
                }
            }
        }

        info!(
            events_matched = report.events_matched,
            identify_calls = report.identify_calls,
            track_calls = report.track_calls,
            failures = report.failures.len(),
            "Processed event batch"
        );

        Ok(report)
    }

    /// Returns the principal's identity record, asking the directory when the
    /// event only carries a name.
    async fn resolve_principal<'e>(
        &self,
        event: &'e Event,
    ) -> ListenerResult<Cow<'e, IdentityRecord>> {
        match event.principal() {
            EventPrincipal::Extended(record) => Ok(Cow::Borrowed(record)),
            EventPrincipal::Bare { name } => {
                let record = self
                    .identities
                    .resolve(name)
                    .await?
                    .ok_or_else(|| ListenerError::UnknownPrincipal(name.clone()))?;
                Ok(Cow::Owned(record))
            }
        }
    }

    async fn dispatch(
        &self,
        event: &Event,
        principal: &IdentityRecord,
        mapper: &dyn Mapper,
    ) -> ListenerResult<CallKind> {
        let ctx = ContextBag::new(event, principal);
        let data = mapper
            .map(&ctx)
            .map_err(|source| ListenerError::Mapping {
                mapper: mapper.name().to_string(),
                source,
            })?;

        if mapper.is_identify() {
            debug!(event = %event.name, mapper = mapper.name(), user_id = %principal.name, "identify");
            self.sink.identify(principal, &data).await?;
            Ok(CallKind::Identify)
        } else {
            debug!(event = %event.name, mapper = mapper.name(), user_id = %principal.name, "track");
            self.sink.track(principal, &event.name, &data).await?;
            Ok(CallKind::Track)
        }
    }

    fn record_failure(
        &self,
        report: &mut BatchReport,
        event: &Event,
        mapper: Option<&str>,
        err: ListenerError,
    ) -> ListenerResult<()> {
        match self.policy {
            FailurePolicy::FailFast => {
                error!(error = %err, event = %event.name, mapper = ?mapper, "Aborting batch");
                Err(err)
            }
            FailurePolicy::Isolate => {
                warn!(error = %err, event = %event.name, mapper = ?mapper, "Skipping failed dispatch");
                report.failures.push(DispatchFailure {
                    event: event.name.clone(),
                    mapper: mapper.map(str::to_string),
                    error: err.to_string(),
                });
                Ok(())
            }
        }
    }
}

#[async_trait]
impl PostCommitListener for AnalyticsListener {
    async fn handle_batch(&self, batch: &EventBatch) -> ListenerResult<BatchReport> {
        self.process(batch).await
    }
}
