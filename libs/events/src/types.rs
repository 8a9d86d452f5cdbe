//! Principal, document and session types referenced by event contexts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Event Name Constants
// =============================================================================

/// Well-known event names emitted by the content platform.
pub mod event_names {
    // Document lifecycle
    pub const DOCUMENT_CREATED: &str = "documentCreated";
    pub const DOCUMENT_MODIFIED: &str = "documentModified";
    pub const DOCUMENT_REMOVED: &str = "documentRemoved";
    pub const DOCUMENT_MOVED: &str = "documentMoved";
    pub const DOCUMENT_CHECKED_IN: &str = "documentCheckedIn";
    pub const LIFECYCLE_TRANSITION: &str = "lifecycle_transition_event";
    pub const DOWNLOAD: &str = "download";

    // Authentication
    pub const LOGIN_SUCCESS: &str = "loginSuccess";
    pub const LOGOUT: &str = "logout";

    // Directory
    pub const USER_CREATED: &str = "user_created";
}

// =============================================================================
// Principals
// =============================================================================

/// Extended identity attributes for a principal, as held by the user directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IdentityRecord {
    /// Login name; used as the analytics user id.
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    #[serde(default)]
    pub groups: Vec<String>,

    #[serde(default)]
    pub administrator: bool,

    /// Additional directory attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Value>,
}

impl IdentityRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_full_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = Some(first.into());
        self.last_name = Some(last.into());
        self
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }
}

/// The principal an event was raised under.
///
/// The bus may deliver either a bare name or a principal that already carries
/// its directory attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPrincipal {
    /// Only the principal name is known.
    Bare { name: String },
    /// The principal carries extended identity attributes.
    Extended(IdentityRecord),
}

impl EventPrincipal {
    pub fn bare(name: impl Into<String>) -> Self {
        EventPrincipal::Bare { name: name.into() }
    }

    /// Returns the principal name.
    pub fn name(&self) -> &str {
        match self {
            EventPrincipal::Bare { name } => name,
            EventPrincipal::Extended(record) => &record.name,
        }
    }

    /// Returns the identity record when the principal is already extended.
    pub fn as_extended(&self) -> Option<&IdentityRecord> {
        match self {
            EventPrincipal::Bare { .. } => None,
            EventPrincipal::Extended(record) => Some(record),
        }
    }
}

impl From<IdentityRecord> for EventPrincipal {
    fn from(record: IdentityRecord) -> Self {
        EventPrincipal::Extended(record)
    }
}

// =============================================================================
// Documents
// =============================================================================

/// Reference to a document, by id or by path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentRef {
    Id(String),
    Path(String),
}

impl std::fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentRef::Id(id) => write!(f, "{}", id),
            DocumentRef::Path(path) => write!(f, "{}", path),
        }
    }
}

/// Snapshot of the document an event was raised on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub id: String,

    /// Document type (e.g. "File", "Folder", "Note").
    #[serde(rename = "type")]
    pub doc_type: String,

    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle_state: Option<String>,

    #[serde(default)]
    pub facets: Vec<String>,

    /// Schema-prefixed properties (e.g. "dc:description").
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

impl DocumentSnapshot {
    pub fn new(
        id: impl Into<String>,
        doc_type: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            doc_type: doc_type.into(),
            path: path.into(),
            title: None,
            lifecycle_state: None,
            facets: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_lifecycle_state(mut self, state: impl Into<String>) -> Self {
        self.lifecycle_state = Some(state.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Handle to the repository session an event was raised in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle {
    pub session_id: String,
    pub repository_name: String,
    pub principal_name: String,
}
