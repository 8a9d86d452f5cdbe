//! Per-event context bag handed to mappers.
//!
//! A bag is built fresh for every (event, mapper) pair and borrows from the
//! event; nothing outlives the dispatch it was built for.

use segbridge_events::{
    DocumentRef, DocumentSnapshot, Event, EventContext, IdentityRecord, SessionHandle,
};
use serde_json::{json, Map, Value};

/// Document-centric fields, present only for document events.
#[derive(Debug, Clone, Copy)]
pub struct DocumentFields<'a> {
    pub doc: Option<&'a DocumentSnapshot>,
    pub repository: &'a str,
    pub session: Option<&'a SessionHandle>,
    pub destination: Option<&'a DocumentRef>,
}

/// Everything a mapper may read about one event.
#[derive(Debug, Clone, Copy)]
pub struct ContextBag<'a> {
    pub event: &'a Event,
    pub event_context: &'a EventContext,
    pub principal: &'a IdentityRecord,
    document: Option<DocumentFields<'a>>,
}

impl<'a> ContextBag<'a> {
    /// Builds the bag for `event`, acting as the resolved `principal`.
    pub fn new(event: &'a Event, principal: &'a IdentityRecord) -> Self {
        let document = event
            .context
            .document
            .as_ref()
            .map(|doc_ctx| DocumentFields {
                doc: doc_ctx.source_document.as_ref(),
                repository: &doc_ctx.repository_name,
                session: doc_ctx.session.as_ref(),
                destination: doc_ctx.destination.as_ref(),
            });

        Self {
            event,
            event_context: &event.context,
            principal,
            document,
        }
    }

    pub fn event_name(&self) -> &'a str {
        &self.event.name
    }

    pub fn document_fields(&self) -> Option<&DocumentFields<'a>> {
        self.document.as_ref()
    }

    pub fn doc(&self) -> Option<&'a DocumentSnapshot> {
        self.document.and_then(|d| d.doc)
    }

    pub fn repository(&self) -> Option<&'a str> {
        self.document.map(|d| d.repository)
    }

    pub fn session(&self) -> Option<&'a SessionHandle> {
        self.document.and_then(|d| d.session)
    }

    pub fn destination(&self) -> Option<&'a DocumentRef> {
        self.document.and_then(|d| d.destination)
    }

    /// Renders the bag as a JSON object.
    ///
    /// Keys: `event`, `event_context`, `principal`, and for document events
    /// `doc`, `repository`, `session`, `destination`. `eventContext` and
    /// `dest` are accepted as aliases so older mapping paths keep resolving.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        let mut root = Map::new();
        root.insert(
            "event".to_string(),
            json!({
                "name": self.event.name,
                "occurred_at": self.event.occurred_at.to_rfc3339(),
            }),
        );
        let event_context = json!({
            "principal": self.event_context.principal.name(),
            "properties": self.event_context.properties,
        });
        root.insert("eventContext".to_string(), event_context.clone());
        root.insert("event_context".to_string(), event_context);
        root.insert("principal".to_string(), serde_json::to_value(self.principal)?);

        if let Some(fields) = &self.document {
            root.insert("doc".to_string(), serde_json::to_value(fields.doc)?);
            root.insert("repository".to_string(), json!(fields.repository));
            root.insert("session".to_string(), serde_json::to_value(fields.session)?);
            let destination = json!(fields.destination.map(|d| d.to_string()));
            root.insert("dest".to_string(), destination.clone());
            root.insert("destination".to_string(), destination);
        }

        Ok(Value::Object(root))
    }

    /// Looks up a dotted path (e.g. `doc.properties.dc:title`) in the bag.
    pub fn lookup(&self, path: &str) -> Result<Option<Value>, serde_json::Error> {
        let root = self.to_value()?;
        Ok(resolve_path(&root, path).cloned())
    }
}

/// Walks a dotted path through nested JSON objects. Null leaves count as absent.
pub fn resolve_path<'v>(root: &'v Value, path: &str) -> Option<&'v Value> {
    let mut current = root;
    for segment in path.split('.') {
        if segment.is_empty() {
            return None;
        }
        current = current.as_object()?.get(segment)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}
