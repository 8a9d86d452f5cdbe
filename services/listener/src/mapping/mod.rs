//! Mapping rules and the registry that selects them by event name.
//!
//! A mapper turns a [`ContextBag`] into a flat payload and says whether the
//! payload is an identify call or a track call. The registry keeps, per event
//! name, the mappers in registration order.

mod builtin;
mod field;
mod file;

pub use builtin::{DocumentMapper, PrincipalTraitsMapper};
pub use field::{FieldMapper, FieldSource};
pub use file::{MapperDefinition, MapperKind, MappingFile};

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use thiserror::Error;

use crate::context::ContextBag;

/// Flat, string-keyed payload sent as traits or properties.
pub type MappedData = serde_json::Map<String, serde_json::Value>;

/// Errors that can occur while mapping a context bag.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("required field {field} has no value at {path}")]
    MissingField { field: String, path: String },

    #[error("field {field} resolved to a nested value")]
    NotFlat { field: String },

    #[error("invalid mapper definition: {0}")]
    InvalidDefinition(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for MappingError {
    fn from(err: serde_json::Error) -> Self {
        MappingError::Serialization(err.to_string())
    }
}

/// A rule turning an event context into an analytics payload.
pub trait Mapper: Send + Sync {
    /// Name used in logs and failure reports.
    fn name(&self) -> &str;

    /// Whether the payload is sent as an identify call rather than a track call.
    fn is_identify(&self) -> bool;

    /// Builds the payload for one event.
    fn map(&self, ctx: &ContextBag<'_>) -> Result<MappedData, MappingError>;
}

/// Mappers indexed by the event names they apply to.
#[derive(Default, Clone)]
pub struct MapperRegistry {
    by_event: HashMap<String, Vec<Arc<dyn Mapper>>>,
    mapper_count: usize,
}

impl MapperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `mapper` for each of `events`. Order of registration is the
    /// order mappers run in. A mapper with no events is not registered.
    pub fn register<I, S>(&mut self, events: I, mapper: Arc<dyn Mapper>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registered = false;
        for event in events {
            self.by_event
                .entry(event.into())
                .or_default()
                .push(Arc::clone(&mapper));
            registered = true;
        }
        if registered {
            self.mapper_count += 1;
        }
    }

    /// Event names with at least one mapper, sorted.
    pub fn mapped_events(&self) -> Vec<&str> {
        let names: BTreeSet<&str> = self
            .by_event
            .iter()
            .filter(|(_, mappers)| !mappers.is_empty())
            .map(|(name, _)| name.as_str())
            .collect();
        names.into_iter().collect()
    }

    /// Mappers for one event name, empty if none are registered.
    pub fn mappers_for_event(&self, name: &str) -> &[Arc<dyn Mapper>] {
        self.by_event.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Mappers for each of `names`. Names without mappers are left out.
    pub fn mappers_for(&self, names: &[&str]) -> HashMap<String, Vec<Arc<dyn Mapper>>> {
        names
            .iter()
            .filter_map(|name| {
                let mappers = self.mappers_for_event(name);
                (!mappers.is_empty()).then(|| (name.to_string(), mappers.to_vec()))
            })
            .collect()
    }

    /// Number of registered mappers (a mapper registered for several events counts once).
    pub fn mapper_count(&self) -> usize {
        self.mapper_count
    }

    pub fn is_empty(&self) -> bool {
        self.mapper_count == 0
    }
}

impl std::fmt::Debug for MapperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapperRegistry")
            .field("events", &self.mapped_events())
            .field("mapper_count", &self.mapper_count)
            .finish()
    }
}
