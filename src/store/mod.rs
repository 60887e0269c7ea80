use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use thiserror::Error;

use crate::model::{
    HostContext, Location, Mode, NoteAttachment, RecordMetadata, RemoteDocument, View,
};
use crate::query::{QueryTemplate, RecordLink, RemoteQuery};

mod memory;
mod schema;
mod sqlite;

pub use memory::{
    MemoryNoteStore, MemoryPreferenceStore, MemoryRemoteStore, StaticMetadataResolver,
};
pub use sqlite::SqlitePreferenceStore;

/// All-zero location id that deletes under a custom location must submit in
/// place of the real one.
pub const SENTINEL_LOCATION_ID: &str = "00000000-0000-0000-0000-000000000000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    NotFound,
    Rejected,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::NotFound, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Rejected, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Unavailable, message)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub regarding: RecordLink,
    pub filename: String,
    pub subject: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub payload: String,
    pub body_text: Option<String>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePatch {
    pub filename: Option<String>,
    pub subject: Option<String>,
    pub body_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRemoteDocument {
    pub regarding: RecordLink,
    pub location_id: String,
    pub folder_path: String,
    pub file_name: String,
    pub mime_type: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRemoteFolder {
    pub regarding: RecordLink,
    pub location_id: String,
    pub parent_path: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLocation {
    pub regarding: RecordLink,
    pub display_name: String,
    pub folder_name: String,
    pub parent_site_id: Option<String>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preference {
    pub preferred_mode: Mode,
    pub preferred_location_id: Option<String>,
    pub preferred_location_name: Option<String>,
}

#[async_trait]
pub trait MetadataResolver: Send + Sync {
    /// `None` means the record does not exist yet or metadata is unavailable.
    async fn resolve(&self, host: &HostContext) -> StoreResult<Option<RecordMetadata>>;
}

#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn list(
        &self,
        record_id: &str,
        query: &QueryTemplate,
    ) -> StoreResult<Vec<NoteAttachment>>;

    async fn views(&self, record_type: &str) -> StoreResult<Vec<View>>;

    async fn create(&self, note: NewNote) -> StoreResult<String>;

    async fn update(&self, id: &str, patch: NotePatch) -> StoreResult<()>;

    async fn delete(&self, id: &str) -> StoreResult<()>;
}

#[async_trait]
pub trait RemoteDocumentStore: Send + Sync {
    async fn list_folder(&self, query: &RemoteQuery) -> StoreResult<Vec<RemoteDocument>>;

    async fn create_document(&self, document: NewRemoteDocument) -> StoreResult<String>;

    async fn create_folder(&self, folder: NewRemoteFolder) -> StoreResult<String>;

    async fn rename_document(&self, id: &str, location_id: &str, new_name: &str)
        -> StoreResult<()>;

    async fn delete_document(&self, id: &str, location_id: &str) -> StoreResult<()>;

    async fn resolve_locations(&self, regarding: &RecordLink) -> StoreResult<Vec<Location>>;

    async fn create_location(&self, location: NewLocation) -> StoreResult<String>;
}

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn load(&self, record_type: &str) -> StoreResult<Option<Preference>>;

    async fn save(&self, record_type: &str, preference: &Preference) -> StoreResult<()>;

    async fn clear(&self, record_type: &str) -> StoreResult<()>;
}

#[derive(Clone)]
pub struct Collaborators {
    pub metadata: Arc<dyn MetadataResolver>,
    pub notes: Arc<dyn NoteStore>,
    pub remote: Arc<dyn RemoteDocumentStore>,
    pub preferences: Arc<dyn PreferenceStore>,
}
