//! Mapping file: TOML definitions of which mappers run for which events.
//!
//! ```toml
//! [[mapper]]
//! name = "doc_created"
//! events = ["documentCreated"]
//! kind = "fields"
//!
//! [mapper.fields]
//! title = "doc.title"
//! email = { path = "principal.email", required = true }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use segbridge_events::event_names;
use serde::{Deserialize, Serialize};

use super::{
    DocumentMapper, FieldMapper, FieldSource, Mapper, MapperRegistry, MappingError,
    PrincipalTraitsMapper,
};

/// Kind of mapper a definition instantiates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MapperKind {
    #[default]
    Fields,
    PrincipalTraits,
    Document,
}

/// One `[[mapper]]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapperDefinition {
    pub name: String,

    pub events: Vec<String>,

    #[serde(default)]
    pub kind: MapperKind,

    /// Only meaningful for `fields` mappers; built-in kinds have a fixed call type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identify: Option<bool>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldSource>,
}

impl MapperDefinition {
    fn build(&self) -> Result<Arc<dyn Mapper>, MappingError> {
        if self.name.trim().is_empty() {
            return Err(MappingError::InvalidDefinition(
                "mapper name must not be empty".to_string(),
            ));
        }
        if self.events.is_empty() {
            return Err(MappingError::InvalidDefinition(format!(
                "mapper {} has no events",
                self.name
            )));
        }

        match self.kind {
            MapperKind::Fields => {
                if self.fields.is_empty() {
                    return Err(MappingError::InvalidDefinition(format!(
                        "fields mapper {} defines no fields",
                        self.name
                    )));
                }
                Ok(Arc::new(
                    FieldMapper::new(&self.name, self.identify.unwrap_or(false))
                        .with_fields(self.fields.clone()),
                ))
            }
            MapperKind::PrincipalTraits => {
                self.check_builtin(true)?;
                Ok(Arc::new(PrincipalTraitsMapper::new(&self.name)))
            }
            MapperKind::Document => {
                self.check_builtin(false)?;
                Ok(Arc::new(DocumentMapper::new(&self.name)))
            }
        }
    }

    fn check_builtin(&self, identify: bool) -> Result<(), MappingError> {
        if self.identify.is_some_and(|flag| flag != identify) {
            return Err(MappingError::InvalidDefinition(format!(
                "mapper {} cannot override the call type of a {:?} mapper",
                self.name, self.kind
            )));
        }
        if !self.fields.is_empty() {
            return Err(MappingError::InvalidDefinition(format!(
                "mapper {} is built-in and takes no fields",
                self.name
            )));
        }
        Ok(())
    }
}

/// Parsed mapping file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MappingFile {
    #[serde(default, rename = "mapper")]
    pub mappers: Vec<MapperDefinition>,
}

impl MappingFile {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("invalid mapping file TOML")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read mapping file {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("failed to parse mapping file {}", path.display()))
    }

    /// Mappings used when no file is configured: principal traits on login,
    /// document details on create/modify/remove.
    pub fn defaults() -> Self {
        Self {
            mappers: vec![
                MapperDefinition {
                    name: "principal_traits".to_string(),
                    events: vec![event_names::LOGIN_SUCCESS.to_string()],
                    kind: MapperKind::PrincipalTraits,
                    identify: None,
                    fields: BTreeMap::new(),
                },
                MapperDefinition {
                    name: "document".to_string(),
                    events: vec![
                        event_names::DOCUMENT_CREATED.to_string(),
                        event_names::DOCUMENT_MODIFIED.to_string(),
                        event_names::DOCUMENT_REMOVED.to_string(),
                    ],
                    kind: MapperKind::Document,
                    identify: None,
                    fields: BTreeMap::new(),
                },
            ],
        }
    }

    /// Instantiates every definition into a registry, in file order.
    pub fn to_registry(&self) -> Result<MapperRegistry, MappingError> {
        let mut registry = MapperRegistry::new();
        for definition in &self.mappers {
            let mapper = definition.build()?;
            registry.register(definition.events.iter().cloned(), mapper);
        }
        Ok(registry)
    }
}
