//! Event, event context and batch.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EventError;
use crate::types::{DocumentRef, DocumentSnapshot, EventPrincipal, SessionHandle};

/// Document-centric part of an event context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEventContext {
    /// The document the event was raised on. Absent for removals that
    /// happened before the snapshot could be taken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_document: Option<DocumentSnapshot>,

    pub repository_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionHandle>,

    /// Target of a move or copy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<DocumentRef>,
}

impl DocumentEventContext {
    pub fn new(repository_name: impl Into<String>) -> Self {
        Self {
            source_document: None,
            repository_name: repository_name.into(),
            session: None,
            destination: None,
        }
    }

    pub fn with_document(mut self, doc: DocumentSnapshot) -> Self {
        self.source_document = Some(doc);
        self
    }

    pub fn with_session(mut self, session: SessionHandle) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_destination(mut self, dest: DocumentRef) -> Self {
        self.destination = Some(dest);
        self
    }
}

/// Context an event was raised in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventContext {
    /// The principal the event happened under.
    pub principal: EventPrincipal,

    /// Free-form context properties (e.g. "comment", "category").
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Value>,

    /// Present only for document events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentEventContext>,
}

impl EventContext {
    pub fn new(principal: EventPrincipal) -> Self {
        Self {
            principal,
            properties: BTreeMap::new(),
            document: None,
        }
    }

    pub fn for_document(principal: EventPrincipal, document: DocumentEventContext) -> Self {
        Self {
            principal,
            properties: BTreeMap::new(),
            document: Some(document),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Whether this context carries document-centric fields.
    pub fn is_document_context(&self) -> bool {
        self.document.is_some()
    }
}

/// A committed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event name (e.g. "documentCreated").
    pub name: String,

    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,

    pub context: EventContext,
}

impl Event {
    /// Creates a new event builder.
    pub fn builder() -> EventBuilder {
        EventBuilder::new()
    }

    /// The principal the event happened under.
    pub fn principal(&self) -> &EventPrincipal {
        &self.context.principal
    }
}

/// Builder for constructing events.
#[derive(Debug, Default)]
pub struct EventBuilder {
    name: Option<String>,
    occurred_at: Option<DateTime<Utc>>,
    context: Option<EventContext>,
}

impl EventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn occurred_at(mut self, ts: DateTime<Utc>) -> Self {
        self.occurred_at = Some(ts);
        self
    }

    pub fn context(mut self, context: EventContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Builds the event. `occurred_at` defaults to now.
    pub fn build(self) -> Result<Event, EventError> {
        Ok(Event {
            name: self.name.ok_or(EventError::MissingField("name"))?,
            occurred_at: self.occurred_at.unwrap_or_else(Utc::now),
            context: self.context.ok_or(EventError::MissingField("context"))?,
        })
    }
}

/// Events committed together and delivered to listeners as one unit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventBatch {
    events: Vec<Event>,
}

impl EventBatch {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    /// Decodes a batch handed over by the host as a JSON array.
    ///
    /// A top-level value that is not an array is `InvalidBatch`; any other
    /// decode failure is `Serialization`. Both keep serde's line and column.
    pub fn from_json(raw: &str) -> Result<Self, EventError> {
        serde_json::from_str::<Vec<Event>>(raw)
            .map(Self::new)
            .map_err(|err| {
                if err.is_data() && !raw.trim_start().starts_with('[') {
                    EventError::InvalidBatch(err.to_string())
                } else {
                    err.into()
                }
            })
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Whether at least one event in the batch has the given name.
    pub fn contains_event_name(&self, name: &str) -> bool {
        self.events.iter().any(|e| e.name == name)
    }

    /// Distinct event names, in first-seen order.
    pub fn event_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.events
            .iter()
            .map(|e| e.name.as_str())
            .filter(|name| seen.insert(*name))
            .collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl<'a> IntoIterator for &'a EventBatch {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

impl FromIterator<Event> for EventBatch {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        Self {
            events: iter.into_iter().collect(),
        }
    }
}
