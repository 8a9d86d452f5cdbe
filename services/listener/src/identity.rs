//! Identity resolution against the platform's user directory.
//!
//! Events delivered by the bus sometimes carry only a principal name. The
//! listener resolves those names to full identity records before mapping.

use std::collections::HashMap;

use async_trait::async_trait;
use segbridge_events::IdentityRecord;
use thiserror::Error;
use tracing::debug;

/// Errors raised by a directory backend.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),

    #[error("directory returned an invalid record for {name}: {reason}")]
    InvalidRecord { name: String, reason: String },
}

/// Looks up extended identity records by principal name.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Returns the record for `name`, or `None` if the directory has no such principal.
    async fn resolve(&self, name: &str) -> Result<Option<IdentityRecord>, IdentityError>;
}

/// Directory backed by a preloaded map of records.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    records: HashMap<String, IdentityRecord>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, record: IdentityRecord) -> Self {
        self.insert(record);
        self
    }

    pub fn insert(&mut self, record: IdentityRecord) {
        self.records.insert(record.name.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<IdentityRecord> for InMemoryDirectory {
    fn from_iter<I: IntoIterator<Item = IdentityRecord>>(iter: I) -> Self {
        let mut directory = Self::new();
        for record in iter {
            directory.insert(record);
        }
        directory
    }
}

#[async_trait]
impl IdentityResolver for InMemoryDirectory {
    async fn resolve(&self, name: &str) -> Result<Option<IdentityRecord>, IdentityError> {
        let record = self.records.get(name).cloned();
        debug!(principal = %name, found = record.is_some(), "Resolved principal");
        Ok(record)
    }
}
