//! Shared fakes for listener integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use segbridge_events::{
    DocumentEventContext, DocumentRef, DocumentSnapshot, Event, EventContext, EventPrincipal,
    IdentityRecord, SessionHandle,
};
use segbridge_listener::{
    AnalyticsListener, AnalyticsSink, AuthError, ContextBag, IdentityError, IdentityResolver,
    InMemoryDirectory, MappedData, Mapper, MapperRegistry, MappingError, PrivilegeElevator,
    RecordingSink, SinkError, SystemCredential,
};
use serde_json::{json, Value};

// =============================================================================
// Events
// =============================================================================

pub fn document_event(name: &str, principal: EventPrincipal) -> Event {
    let doc = DocumentSnapshot::new("doc-1", "File", "/default-domain/workspaces/ws/report.pdf")
        .with_title("Report");
    let doc_ctx = DocumentEventContext::new("default")
        .with_document(doc)
        .with_session(SessionHandle {
            session_id: "session-1".into(),
            repository_name: "default".into(),
            principal_name: principal.name().to_string(),
        })
        .with_destination(DocumentRef::Path("/default-domain/workspaces/archive".into()));

    Event::builder()
        .name(name)
        .context(EventContext::for_document(principal, doc_ctx))
        .build()
        .unwrap()
}

pub fn plain_event(name: &str, principal: EventPrincipal) -> Event {
    Event::builder()
        .name(name)
        .context(EventContext::new(principal))
        .build()
        .unwrap()
}

pub fn jdoe() -> IdentityRecord {
    IdentityRecord::new("jdoe")
        .with_email("jdoe@example.com")
        .with_full_name("John", "Doe")
}

// =============================================================================
// Identity
// =============================================================================

/// Directory that records every lookup.
pub struct CountingDirectory {
    inner: InMemoryDirectory,
    lookups: Mutex<Vec<String>>,
    unavailable: bool,
}

impl CountingDirectory {
    pub fn new(records: Vec<IdentityRecord>) -> Self {
        Self {
            inner: records.into_iter().collect(),
            lookups: Mutex::new(Vec::new()),
            unavailable: false,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityResolver for CountingDirectory {
    async fn resolve(&self, name: &str) -> Result<Option<IdentityRecord>, IdentityError> {
        self.lookups.lock().unwrap().push(name.to_string());
        if self.unavailable {
            return Err(IdentityError::Unavailable("ldap down".into()));
        }
        self.inner.resolve(name).await
    }
}

// =============================================================================
// Privilege
// =============================================================================

/// Elevator counting logins and logouts, optionally refusing to log in.
#[derive(Default)]
pub struct CountingElevator {
    pub logins: AtomicUsize,
    pub logouts: AtomicUsize,
    deny: bool,
}

impl CountingElevator {
    pub fn denying() -> Self {
        Self {
            deny: true,
            ..Default::default()
        }
    }

    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }
}

impl PrivilegeElevator for CountingElevator {
    fn login(&self) -> Result<SystemCredential, AuthError> {
        if self.deny {
            return Err(AuthError::new("login module refused system login"));
        }
        self.logins.fetch_add(1, Ordering::SeqCst);
        Ok(SystemCredential {
            principal: "system".into(),
            token: "test".into(),
        })
    }

    fn logout(&self, _credential: &SystemCredential) {
        self.logouts.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// Mappers
// =============================================================================

/// Mapper that captures every context bag it sees and returns `{"mapper": name}`.
pub struct CapturingMapper {
    name: String,
    identify: bool,
    fail: bool,
    seen: Mutex<Vec<Value>>,
}

impl CapturingMapper {
    pub fn track(name: &str) -> Arc<Self> {
        Arc::new(Self::build(name, false, false))
    }

    pub fn identify(name: &str) -> Arc<Self> {
        Arc::new(Self::build(name, true, false))
    }

    pub fn failing(name: &str) -> Arc<Self> {
        Arc::new(Self::build(name, false, true))
    }

    fn build(name: &str, identify: bool, fail: bool) -> Self {
        Self {
            name: name.to_string(),
            identify,
            fail,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<Value> {
        self.seen.lock().unwrap().clone()
    }

    pub fn expected_data(&self) -> MappedData {
        let mut data = MappedData::new();
        data.insert("mapper".into(), json!(self.name));
        data
    }
}

impl Mapper for CapturingMapper {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_identify(&self) -> bool {
        self.identify
    }

    fn map(&self, ctx: &ContextBag<'_>) -> Result<MappedData, MappingError> {
        self.seen.lock().unwrap().push(ctx.to_value()?);
        if self.fail {
            return Err(MappingError::MissingField {
                field: "title".into(),
                path: "doc.title".into(),
            });
        }
        Ok(self.expected_data())
    }
}

// =============================================================================
// Sinks
// =============================================================================

/// Sink that rejects track calls for one event name and records the rest.
pub struct RejectingSink {
    pub inner: RecordingSink,
    reject_event: String,
}

impl RejectingSink {
    pub fn rejecting(event: &str) -> Self {
        Self {
            inner: RecordingSink::new(),
            reject_event: event.to_string(),
        }
    }
}

#[async_trait]
impl AnalyticsSink for RejectingSink {
    async fn identify(
        &self,
        principal: &IdentityRecord,
        traits: &MappedData,
    ) -> Result<(), SinkError> {
        self.inner.identify(principal, traits).await
    }

    async fn track(
        &self,
        principal: &IdentityRecord,
        event: &str,
        properties: &MappedData,
    ) -> Result<(), SinkError> {
        if event == self.reject_event {
            return Err(SinkError::Rejected {
                status: 400,
                body: "invalid payload".into(),
            });
        }
        self.inner.track(principal, event, properties).await
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub directory: Arc<CountingDirectory>,
    pub elevator: Arc<CountingElevator>,
    pub sink: Arc<RecordingSink>,
    pub listener: AnalyticsListener,
}

impl Harness {
    pub fn new(registry: MapperRegistry) -> Self {
        Self::with(
            registry,
            CountingDirectory::new(vec![jdoe()]),
            CountingElevator::default(),
        )
    }

    pub fn with(
        registry: MapperRegistry,
        directory: CountingDirectory,
        elevator: CountingElevator,
    ) -> Self {
        let directory = Arc::new(directory);
        let elevator = Arc::new(elevator);
        let sink = Arc::new(RecordingSink::new());
        let listener = AnalyticsListener::new(
            Arc::new(registry),
            directory.clone(),
            elevator.clone(),
            sink.clone(),
        );
        Self {
            directory,
            elevator,
            sink,
            listener,
        }
    }
}
