//! Built-in mappers used when no mapping file is configured.

use serde_json::{json, Value};

use crate::context::ContextBag;

use super::{MappedData, Mapper, MappingError};

fn insert_opt(data: &mut MappedData, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        data.insert(key.to_string(), Value::String(value.to_string()));
    }
}

/// Identify mapper sending the principal's directory attributes as traits.
#[derive(Debug, Clone)]
pub struct PrincipalTraitsMapper {
    name: String,
}

impl PrincipalTraitsMapper {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for PrincipalTraitsMapper {
    fn default() -> Self {
        Self::new("principal_traits")
    }
}

impl Mapper for PrincipalTraitsMapper {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_identify(&self) -> bool {
        true
    }

    fn map(&self, ctx: &ContextBag<'_>) -> Result<MappedData, MappingError> {
        let principal = ctx.principal;
        let mut data = MappedData::new();

        data.insert("username".to_string(), json!(principal.name));
        insert_opt(&mut data, "email", principal.email.as_deref());
        insert_opt(&mut data, "firstName", principal.first_name.as_deref());
        insert_opt(&mut data, "lastName", principal.last_name.as_deref());
        insert_opt(&mut data, "company", principal.company.as_deref());
        if !principal.groups.is_empty() {
            data.insert("groups".to_string(), json!(principal.groups.join(",")));
        }

        Ok(data)
    }
}

/// Track mapper describing the document an event was raised on.
#[derive(Debug, Clone)]
pub struct DocumentMapper {
    name: String,
}

impl DocumentMapper {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for DocumentMapper {
    fn default() -> Self {
        Self::new("document")
    }
}

impl Mapper for DocumentMapper {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_identify(&self) -> bool {
        false
    }

    fn map(&self, ctx: &ContextBag<'_>) -> Result<MappedData, MappingError> {
        let mut data = MappedData::new();

        // Scalar context properties first so document fields win on collision.
        for (key, value) in &ctx.event_context.properties {
            if !value.is_object() && !value.is_array() {
                data.insert(key.clone(), value.clone());
            }
        }

        insert_opt(&mut data, "repository", ctx.repository());
        if let Some(doc) = ctx.doc() {
            data.insert("id".to_string(), json!(doc.id));
            data.insert("type".to_string(), json!(doc.doc_type));
            data.insert("path".to_string(), json!(doc.path));
            insert_opt(&mut data, "title", doc.title.as_deref());
            insert_opt(&mut data, "lifecycleState", doc.lifecycle_state.as_deref());
        }
        if let Some(dest) = ctx.destination() {
            data.insert("destination".to_string(), json!(dest.to_string()));
        }

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use segbridge_events::{
        DocumentEventContext, DocumentRef, DocumentSnapshot, Event, EventContext,
        EventPrincipal, IdentityRecord,
    };

    #[test]
    fn test_principal_traits() {
        let event = Event::builder()
            .name("loginSuccess")
            .context(EventContext::new(EventPrincipal::bare("jdoe")))
            .build()
            .unwrap();
        let principal = IdentityRecord::new("jdoe")
            .with_email("jdoe@example.com")
            .with_full_name("John", "Doe")
            .with_group("members")
            .with_group("editors");

        let data = PrincipalTraitsMapper::default()
            .map(&ContextBag::new(&event, &principal))
            .unwrap();

        assert_eq!(data["username"], json!("jdoe"));
        assert_eq!(data["email"], json!("jdoe@example.com"));
        assert_eq!(data["firstName"], json!("John"));
        assert_eq!(data["lastName"], json!("Doe"));
        assert_eq!(data["groups"], json!("members,editors"));
        assert!(!data.contains_key("company"));
    }

    #[test]
    fn test_document_mapper_document_event() {
        let doc = DocumentSnapshot::new("d1", "File", "/ws/a.pdf")
            .with_title("A")
            .with_lifecycle_state("project");
        let event = Event::builder()
            .name("documentMoved")
            .context(
                EventContext::for_document(
                    EventPrincipal::bare("jdoe"),
                    DocumentEventContext::new("default")
                        .with_document(doc)
                        .with_destination(DocumentRef::Path("/archive".into())),
                )
                .with_property("comment", "moved to archive")
                .with_property("type", "ignored"),
            )
            .build()
            .unwrap();
        let principal = IdentityRecord::new("jdoe");

        let data = DocumentMapper::default()
            .map(&ContextBag::new(&event, &principal))
            .unwrap();

        assert_eq!(data["id"], json!("d1"));
        assert_eq!(data["type"], json!("File"));
        assert_eq!(data["title"], json!("A"));
        assert_eq!(data["lifecycleState"], json!("project"));
        assert_eq!(data["repository"], json!("default"));
        assert_eq!(data["destination"], json!("/archive"));
        assert_eq!(data["comment"], json!("moved to archive"));
    }

    #[test]
    fn test_document_mapper_plain_event() {
        let event = Event::builder()
            .name("download")
            .context(EventContext::new(EventPrincipal::bare("jdoe")).with_property("blob", "file:content"))
            .build()
            .unwrap();
        let principal = IdentityRecord::new("jdoe");

        let data = DocumentMapper::default()
            .map(&ContextBag::new(&event, &principal))
            .unwrap();

        assert_eq!(data.len(), 1);
        assert_eq!(data["blob"], json!("file:content"));
    }
}
