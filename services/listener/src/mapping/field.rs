//! Mapper driven by a table of field sources.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::{resolve_path, ContextBag};

use super::{MappedData, Mapper, MappingError};

/// Where a payload field takes its value from.
///
/// In a mapping file: `title = "doc.title"` for a path, `source = { value = "web" }`
/// for a literal, `email = { path = "principal.email", required = true }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldSource {
    Path(String),
    Literal {
        value: Value,
    },
    Detailed {
        path: String,
        #[serde(default)]
        required: bool,
    },
}

impl FieldSource {
    pub fn path(path: impl Into<String>) -> Self {
        FieldSource::Path(path.into())
    }

    pub fn required(path: impl Into<String>) -> Self {
        FieldSource::Detailed {
            path: path.into(),
            required: true,
        }
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        FieldSource::Literal {
            value: value.into(),
        }
    }
}

/// Copies selected context values into a flat payload.
#[derive(Debug, Clone)]
pub struct FieldMapper {
    name: String,
    identify: bool,
    fields: BTreeMap<String, FieldSource>,
}

impl FieldMapper {
    pub fn new(name: impl Into<String>, identify: bool) -> Self {
        Self {
            name: name.into(),
            identify,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_fields(mut self, fields: BTreeMap<String, FieldSource>) -> Self {
        self.fields = fields;
        self
    }

    pub fn field(mut self, key: impl Into<String>, source: FieldSource) -> Self {
        self.fields.insert(key.into(), source);
        self
    }
}

impl Mapper for FieldMapper {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_identify(&self) -> bool {
        self.identify
    }

    fn map(&self, ctx: &ContextBag<'_>) -> Result<MappedData, MappingError> {
        let root = ctx.to_value()?;
        let mut data = MappedData::new();

        for (key, source) in &self.fields {
            let value = match source {
                FieldSource::Literal { value } => Some(value.clone()),
                FieldSource::Path(path) => resolve_path(&root, path).cloned(),
                FieldSource::Detailed { path, required } => {
                    let found = resolve_path(&root, path).cloned();
                    if found.is_none() && *required {
                        return Err(MappingError::MissingField {
                            field: key.clone(),
                            path: path.clone(),
                        });
                    }
                    found
                }
            };

            let Some(value) = value else { continue };
            if value.is_object() || value.is_array() {
                return Err(MappingError::NotFlat { field: key.clone() });
            }
            data.insert(key.clone(), value);
        }

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use segbridge_events::{
        DocumentEventContext, DocumentSnapshot, Event, EventContext, EventPrincipal,
        IdentityRecord,
    };
    use serde_json::json;

    fn doc_event() -> Event {
        let doc = DocumentSnapshot::new("d1", "Note", "/ws/note").with_title("Minutes");
        Event::builder()
            .name("documentCreated")
            .context(EventContext::for_document(
                EventPrincipal::bare("jdoe"),
                DocumentEventContext::new("default").with_document(doc),
            ))
            .build()
            .unwrap()
    }

    #[test]
    fn test_field_mapper_copies_paths_and_literals() {
        let event = doc_event();
        let principal = IdentityRecord::new("jdoe");
        let mapper = FieldMapper::new("docs", false)
            .field("title", FieldSource::path("doc.title"))
            .field("repo", FieldSource::path("repository"))
            .field("source", FieldSource::literal("server"))
            .field("missing", FieldSource::path("doc.lifecycle_state"));

        let data = mapper.map(&ContextBag::new(&event, &principal)).unwrap();
        assert_eq!(data["title"], json!("Minutes"));
        assert_eq!(data["repo"], json!("default"));
        assert_eq!(data["source"], json!("server"));
        assert!(!data.contains_key("missing"));
    }

    #[test]
    fn test_field_mapper_required_missing() {
        let event = doc_event();
        let principal = IdentityRecord::new("jdoe");
        let mapper =
            FieldMapper::new("traits", true).field("email", FieldSource::required("principal.email"));

        let err = mapper.map(&ContextBag::new(&event, &principal)).unwrap_err();
        assert!(matches!(err, MappingError::MissingField { ref field, .. } if field == "email"));
    }

    #[test]
    fn test_field_mapper_rejects_nested_values() {
        let event = doc_event();
        let principal = IdentityRecord::new("jdoe");
        let mapper = FieldMapper::new("docs", false).field("doc", FieldSource::path("doc"));

        let err = mapper.map(&ContextBag::new(&event, &principal)).unwrap_err();
        assert!(matches!(err, MappingError::NotFlat { .. }));
    }

    #[test]
    fn test_field_source_deserialize_forms() {
        let fields: BTreeMap<String, FieldSource> = serde_json::from_value(json!({
            "title": "doc.title",
            "channel": {"value": "web"},
            "email": {"path": "principal.email", "required": true}
        }))
        .unwrap();

        assert_eq!(fields["title"], FieldSource::path("doc.title"));
        assert_eq!(fields["channel"], FieldSource::literal("web"));
        assert_eq!(fields["email"], FieldSource::required("principal.email"));
    }
}
