use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    MetadataResolver, NewLocation, NewNote, NewRemoteDocument, NewRemoteFolder, NotePatch,
    NoteStore, Preference, PreferenceStore, RemoteDocumentStore, StoreError, StoreResult,
    SENTINEL_LOCATION_ID,
};
use crate::model::mime::decode_payload;
use crate::model::{
    join_path, HostContext, Location, NoteAttachment, RecordMetadata, RemoteDocument, View,
};
use crate::query::{
    sort_by_orders, ConditionValue, QueryTemplate, RecordLink, RemoteQuery, DIRECT_SERVICE_TYPE,
};

fn micros(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000) as i64
}

#[derive(Debug, Default)]
pub struct StaticMetadataResolver {
    records: Mutex<HashMap<String, RecordMetadata>>,
}

impl StaticMetadataResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, record: RecordMetadata) -> Self {
        self.insert(record);
        self
    }

    pub fn insert(&self, record: RecordMetadata) {
        self.records
            .lock()
            .insert(record.record_id.to_lowercase(), record);
    }
}

#[async_trait]
impl MetadataResolver for StaticMetadataResolver {
    async fn resolve(&self, host: &HostContext) -> StoreResult<Option<RecordMetadata>> {
        let Some(record_id) = host.record_id.as_deref() else {
            return Ok(None);
        };
        let records = self.records.lock();
        Ok(records
            .get(&record_id.to_lowercase())
            .filter(|record| record.record_type.eq_ignore_ascii_case(&host.record_type))
            .cloned())
    }
}

#[derive(Debug, Clone)]
struct StoredNote {
    owner_id: String,
    owner_entity: String,
    owner_bind: String,
    note: NoteAttachment,
}

impl StoredNote {
    fn attribute(&self, attribute: &str) -> Option<ConditionValue> {
        let note = &self.note;
        match attribute {
            "objectid" => Some(self.owner_id.clone().into()),
            "objecttypecode" => Some(self.owner_entity.clone().into()),
            "annotationid" => Some(note.id.clone().into()),
            "filename" => Some(note.filename.clone().into()),
            "filesize" => Some(ConditionValue::Int(note.size_bytes as i64)),
            "mimetype" => Some(note.mime_type.clone().into()),
            "isdocument" => Some(ConditionValue::Bool(note.payload.is_some())),
            "subject" => note.subject.clone().map(Into::into),
            "notetext" => note.body_text.clone().map(Into::into),
            "createdon" => Some(ConditionValue::Int(micros(note.created_at))),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct NoteState {
    notes: Vec<StoredNote>,
    views: Vec<(String, View)>,
    outage: Option<String>,
    queries: Vec<QueryTemplate>,
}

#[derive(Debug, Default)]
pub struct MemoryNoteStore {
    state: Mutex<NoteState>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, owner: &RecordLink, note: NoteAttachment) {
        self.state.lock().notes.push(StoredNote {
            owner_id: owner.record_id.clone(),
            owner_entity: owner.entity.clone(),
            owner_bind: owner.bind_value(),
            note,
        });
    }

    pub fn add_view(&self, record_type: &str, view: View) {
        self.state.lock().views.push((record_type.to_string(), view));
    }

    /// While set, every call fails with this message.
    pub fn set_outage(&self, message: Option<&str>) {
        self.state.lock().outage = message.map(str::to_string);
    }

    pub fn queries(&self) -> Vec<QueryTemplate> {
        self.state.lock().queries.clone()
    }

    pub fn notes_for(&self, owner_id: &str) -> Vec<NoteAttachment> {
        self.state
            .lock()
            .notes
            .iter()
            .filter(|stored| stored.owner_id.eq_ignore_ascii_case(owner_id))
            .map(|stored| stored.note.clone())
            .collect()
    }

    /// `(owner entity, bound owner path)` of a stored note.
    pub fn owner_of(&self, note_id: &str) -> Option<(String, String)> {
        self.state
            .lock()
            .notes
            .iter()
            .find(|stored| stored.note.id == note_id)
            .map(|stored| (stored.owner_entity.clone(), stored.owner_bind.clone()))
    }

    fn check_outage(state: &NoteState) -> StoreResult<()> {
        match &state.outage {
            Some(message) => Err(StoreError::unavailable(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl NoteStore for MemoryNoteStore {
    async fn list(
        &self,
        record_id: &str,
        query: &QueryTemplate,
    ) -> StoreResult<Vec<NoteAttachment>> {
        let mut state = self.state.lock();
        Self::check_outage(&state)?;
        state.queries.push(query.clone());

        let mut rows: Vec<StoredNote> = state
            .notes
            .iter()
            .filter(|stored| stored.owner_id.eq_ignore_ascii_case(record_id))
            .filter(|stored| query.matches(|attribute| stored.attribute(attribute)))
            .cloned()
            .collect();
        sort_by_orders(&mut rows, &query.orders, |stored, attribute| {
            stored.attribute(attribute)
        });

        let with_body =
            query.attributes.is_empty() || query.attributes.iter().any(|a| a == "documentbody");
        Ok(rows
            .into_iter()
            .map(|stored| {
                let mut note = stored.note;
                if !with_body {
                    note.payload = None;
                }
                note
            })
            .collect())
    }

    async fn views(&self, record_type: &str) -> StoreResult<Vec<View>> {
        let state = self.state.lock();
        Self::check_outage(&state)?;
        Ok(state
            .views
            .iter()
            .filter(|(owner_type, _)| owner_type.eq_ignore_ascii_case(record_type))
            .map(|(_, view)| view.clone())
            .collect())
    }

    async fn create(&self, note: NewNote) -> StoreResult<String> {
        let mut state = self.state.lock();
        Self::check_outage(&state)?;
        let id = Uuid::new_v4().to_string();
        tracing::debug!(
            bind = %note.regarding.bind_key(),
            owner = %note.regarding.bind_value(),
            "creating note"
        );
        state.notes.push(StoredNote {
            owner_id: note.regarding.record_id.clone(),
            owner_entity: note.regarding.entity.clone(),
            owner_bind: note.regarding.bind_value(),
            note: NoteAttachment {
                id: id.clone(),
                filename: note.filename,
                size_bytes: note.size_bytes,
                mime_type: note.mime_type,
                payload: Some(note.payload),
                created_at: OffsetDateTime::now_utc(),
                subject: Some(note.subject),
                body_text: note.body_text,
            },
        });
        Ok(id)
    }

    async fn update(&self, id: &str, patch: NotePatch) -> StoreResult<()> {
        let mut state = self.state.lock();
        Self::check_outage(&state)?;
        let stored = state
            .notes
            .iter_mut()
            .find(|stored| stored.note.id == id)
            .ok_or_else(|| StoreError::not_found(format!("note {id} not found")))?;
        if let Some(filename) = patch.filename {
            stored.note.filename = filename;
        }
        if let Some(subject) = patch.subject {
            stored.note.subject = Some(subject);
        }
        if let Some(body_text) = patch.body_text {
            stored.note.body_text = Some(body_text);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let mut state = self.state.lock();
        Self::check_outage(&state)?;
        let before = state.notes.len();
        state.notes.retain(|stored| stored.note.id != id);
        if state.notes.len() == before {
            return Err(StoreError::not_found(format!("note {id} not found")));
        }
        Ok(())
    }
}

fn document_attribute(doc: &RemoteDocument, attribute: &str) -> Option<ConditionValue> {
    match attribute {
        "sharepointdocumentid" => Some(doc.id.clone().into()),
        "fullname" => Some(doc.full_name.clone().into()),
        "relativelocation" => Some(doc.relative_path.clone().into()),
        "isfolder" => Some(ConditionValue::Bool(doc.is_folder)),
        "filesize" => Some(ConditionValue::Int(doc.size_bytes as i64)),
        "filetype" => Some(doc.mime_type.clone().into()),
        "locationid" => Some(doc.location_id.clone().into()),
        "locationname" => Some(doc.location_name.clone().into()),
        "servicetype" => Some(ConditionValue::Int(DIRECT_SERVICE_TYPE)),
        "isrecursivefetch" => Some(ConditionValue::Bool(false)),
        "sharepointcreatedon" => Some(ConditionValue::Int(micros(doc.created_at))),
        "modified" => Some(ConditionValue::Int(micros(doc.modified_at))),
        "author" => Some(doc.author.clone().into()),
        _ => None,
    }
}

#[derive(Debug, Clone)]
struct LocationOwner {
    id_attribute: String,
    record_id: String,
}

impl LocationOwner {
    fn of(link: &RecordLink) -> Self {
        Self {
            id_attribute: link.id_attribute.clone(),
            record_id: link.record_id.clone(),
        }
    }

    fn owns(&self, link: &RecordLink) -> bool {
        self.id_attribute == link.id_attribute
            && self.record_id.eq_ignore_ascii_case(&link.record_id)
    }
}

#[derive(Debug, Default)]
struct RemoteState {
    documents: Vec<RemoteDocument>,
    locations: Vec<(Option<LocationOwner>, Location)>,
    outage: Option<String>,
    list_calls: Vec<RemoteQuery>,
    deletes: Vec<(String, String)>,
}

impl RemoteState {
    fn location(&self, id: &str) -> Option<&Location> {
        self.locations
            .iter()
            .map(|(_, location)| location)
            .find(|location| location.id.eq_ignore_ascii_case(id))
    }

    fn accepts_location(&self, doc: &RemoteDocument, location_id: &str) -> bool {
        if doc.location_id.eq_ignore_ascii_case(location_id) {
            return true;
        }
        let custom = self
            .location(&doc.location_id)
            .map(|location| !location.is_default_site)
            .unwrap_or(false);
        custom && location_id == SENTINEL_LOCATION_ID
    }
}

#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    state: Mutex<RemoteState>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_location(&self, owner: Option<&RecordLink>, location: Location) {
        self.state
            .lock()
            .locations
            .push((owner.map(LocationOwner::of), location));
    }

    pub fn insert(&self, document: RemoteDocument) {
        self.state.lock().documents.push(document);
    }

    pub fn set_outage(&self, message: Option<&str>) {
        self.state.lock().outage = message.map(str::to_string);
    }

    pub fn list_calls(&self) -> Vec<RemoteQuery> {
        self.state.lock().list_calls.clone()
    }

    /// `(document id, submitted location id)` of every delete request.
    pub fn deletes(&self) -> Vec<(String, String)> {
        self.state.lock().deletes.clone()
    }

    pub fn documents(&self) -> Vec<RemoteDocument> {
        self.state.lock().documents.clone()
    }

    fn check_outage(state: &RemoteState) -> StoreResult<()> {
        match &state.outage {
            Some(message) => Err(StoreError::unavailable(message.clone())),
            None => Ok(()),
        }
    }

    fn new_document(
        state: &RemoteState,
        location_id: &str,
        folder_path: &str,
        name: &str,
        is_folder: bool,
    ) -> StoreResult<RemoteDocument> {
        let location = state
            .location(location_id)
            .ok_or_else(|| StoreError::not_found(format!("location {location_id} not found")))?;
        let duplicate = state.documents.iter().any(|doc| {
            doc.location_id.eq_ignore_ascii_case(location_id)
                && doc.relative_path == folder_path
                && doc.full_name.eq_ignore_ascii_case(name)
        });
        if duplicate {
            return Err(StoreError::rejected(format!(
                "{name} already exists in this folder"
            )));
        }
        let now = OffsetDateTime::now_utc();
        let url = format!("memory://{}/{}", location.name, join_path(folder_path, name));
        Ok(RemoteDocument {
            id: Uuid::new_v4().to_string(),
            full_name: name.to_string(),
            relative_path: folder_path.to_string(),
            is_folder,
            size_bytes: 0,
            mime_type: String::new(),
            created_at: now,
            modified_at: now,
            modified_by: String::new(),
            author: String::new(),
            absolute_url: url.clone(),
            read_url: url.clone(),
            edit_url: url,
            location_id: location.id.clone(),
            location_name: location.name.clone(),
        })
    }
}

#[async_trait]
impl RemoteDocumentStore for MemoryRemoteStore {
    async fn list_folder(&self, query: &RemoteQuery) -> StoreResult<Vec<RemoteDocument>> {
        let mut state = self.state.lock();
        Self::check_outage(&state)?;
        state.list_calls.push(query.clone());

        let mut rows: Vec<RemoteDocument> = state
            .documents
            .iter()
            .filter(|doc| doc.location_id.eq_ignore_ascii_case(&query.location_id))
            // an empty path lists the location root, not the whole tree
            .filter(|doc| doc.relative_path.trim_matches('/') == query.path.trim_matches('/'))
            .filter(|doc| {
                query
                    .template
                    .matches(|attribute| document_attribute(doc, attribute))
            })
            .cloned()
            .collect();
        sort_by_orders(&mut rows, &query.template.orders, document_attribute);
        Ok(rows)
    }

    async fn create_document(&self, document: NewRemoteDocument) -> StoreResult<String> {
        let mut state = self.state.lock();
        Self::check_outage(&state)?;
        let bytes = decode_payload(&document.content)
            .map_err(|err| StoreError::rejected(format!("invalid document content: {err}")))?;
        let mut created = Self::new_document(
            &state,
            &document.location_id,
            &document.folder_path,
            &document.file_name,
            false,
        )?;
        created.size_bytes = bytes.len() as u64;
        created.mime_type = document.mime_type;
        let id = created.id.clone();
        state.documents.push(created);
        Ok(id)
    }

    async fn create_folder(&self, folder: NewRemoteFolder) -> StoreResult<String> {
        let mut state = self.state.lock();
        Self::check_outage(&state)?;
        let created = Self::new_document(
            &state,
            &folder.location_id,
            &folder.parent_path,
            &folder.name,
            true,
        )?;
        let id = created.id.clone();
        state.documents.push(created);
        Ok(id)
    }

    async fn rename_document(
        &self,
        id: &str,
        location_id: &str,
        new_name: &str,
    ) -> StoreResult<()> {
        let mut state = self.state.lock();
        Self::check_outage(&state)?;
        let index = state
            .documents
            .iter()
            .position(|doc| doc.id == id)
            .ok_or_else(|| StoreError::not_found(format!("document {id} not found")))?;
        if !state.accepts_location(&state.documents[index], location_id) {
            return Err(StoreError::rejected(format!(
                "document {id} is not in location {location_id}"
            )));
        }
        let doc = &mut state.documents[index];
        doc.full_name = new_name.to_string();
        doc.modified_at = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn delete_document(&self, id: &str, location_id: &str) -> StoreResult<()> {
        let mut state = self.state.lock();
        Self::check_outage(&state)?;
        state.deletes.push((id.to_string(), location_id.to_string()));
        let doc = state
            .documents
            .iter()
            .find(|doc| doc.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("document {id} not found")))?;
        if !state.accepts_location(&doc, location_id) {
            return Err(StoreError::rejected(format!(
                "document {id} is not in location {location_id}"
            )));
        }
        let folder_path = doc.folder_path();
        let nested = format!("{folder_path}/");
        state.documents.retain(|other| {
            if other.id == doc.id {
                return false;
            }
            let inside = doc.is_folder
                && other.location_id == doc.location_id
                && (other.relative_path == folder_path
                    || other.relative_path.starts_with(&nested));
            !inside
        });
        Ok(())
    }

    async fn resolve_locations(&self, regarding: &RecordLink) -> StoreResult<Vec<Location>> {
        let state = self.state.lock();
        Self::check_outage(&state)?;
        Ok(state
            .locations
            .iter()
            .filter(|(owner, _)| match owner {
                Some(owner) => owner.owns(regarding),
                None => true,
            })
            .map(|(_, location)| location.clone())
            .collect())
    }

    async fn create_location(&self, location: NewLocation) -> StoreResult<String> {
        let mut state = self.state.lock();
        Self::check_outage(&state)?;
        let duplicate = state.locations.iter().any(|(_, existing)| {
            existing.name.eq_ignore_ascii_case(&location.display_name)
        });
        if duplicate {
            return Err(StoreError::rejected(format!(
                "location {} already exists",
                location.display_name
            )));
        }
        let id = Uuid::new_v4().to_string();
        state.locations.push((
            Some(LocationOwner::of(&location.regarding)),
            Location {
                id: id.clone(),
                name: location.display_name,
                parent_site_id: location.parent_site_id,
                is_default_site: false,
            },
        ));
        Ok(id)
    }
}

#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    entries: Mutex<HashMap<String, Preference>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, record_type: &str) -> Option<Preference> {
        self.entries.lock().get(record_type).cloned()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn load(&self, record_type: &str) -> StoreResult<Option<Preference>> {
        Ok(self.get(record_type))
    }

    async fn save(&self, record_type: &str, preference: &Preference) -> StoreResult<()> {
        self.entries
            .lock()
            .insert(record_type.to_string(), preference.clone());
        Ok(())
    }

    async fn clear(&self, record_type: &str) -> StoreResult<()> {
        self.entries.lock().remove(record_type);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::build_remote_query;
    use crate::store::StoreErrorKind;

    fn link() -> RecordLink {
        RecordLink {
            entity: "account".into(),
            id_attribute: "accountid".into(),
            collection_name: "accounts".into(),
            record_id: "rec-1".into(),
        }
    }

    fn store_with_location(is_default_site: bool) -> MemoryRemoteStore {
        let store = MemoryRemoteStore::new();
        store.add_location(
            None,
            Location {
                id: "loc-1".into(),
                name: "Docs".into(),
                parent_site_id: None,
                is_default_site,
            },
        );
        store
    }

    #[tokio::test]
    async fn folders_list_only_their_children() {
        let store = store_with_location(true);
        let folder = store
            .create_folder(NewRemoteFolder {
                regarding: link(),
                location_id: "loc-1".into(),
                parent_path: String::new(),
                name: "Reports".into(),
            })
            .await
            .unwrap();
        store
            .create_document(NewRemoteDocument {
                regarding: link(),
                location_id: "loc-1".into(),
                folder_path: "Reports".into(),
                file_name: "q1.pdf".into(),
                mime_type: "application/pdf".into(),
                content: "data:application/pdf;base64,aGVsbG8=".into(),
            })
            .await
            .unwrap();

        let root = store
            .list_folder(&build_remote_query("", "loc-1", "Docs", true))
            .await
            .unwrap();
        assert_eq!(root.len(), 1);
        assert_eq!(root[0].id, folder);

        let inside = store
            .list_folder(&build_remote_query("Reports", "loc-1", "Docs", true))
            .await
            .unwrap();
        assert_eq!(inside.len(), 1);
        assert_eq!(inside[0].full_name, "q1.pdf");
        assert_eq!(inside[0].size_bytes, 5);
    }

    #[tokio::test]
    async fn custom_locations_accept_the_sentinel_id_on_delete() {
        let store = store_with_location(false);
        let id = store
            .create_folder(NewRemoteFolder {
                regarding: link(),
                location_id: "loc-1".into(),
                parent_path: String::new(),
                name: "Archive".into(),
            })
            .await
            .unwrap();
        store
            .delete_document(&id, SENTINEL_LOCATION_ID)
            .await
            .unwrap();
        assert!(store.documents().is_empty());
    }

    #[tokio::test]
    async fn default_sites_reject_the_sentinel_id() {
        let store = store_with_location(true);
        let id = store
            .create_folder(NewRemoteFolder {
                regarding: link(),
                location_id: "loc-1".into(),
                parent_path: String::new(),
                name: "Archive".into(),
            })
            .await
            .unwrap();
        let err = store
            .delete_document(&id, SENTINEL_LOCATION_ID)
            .await
            .unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::Rejected);
    }

    #[tokio::test]
    async fn outage_fails_every_listing() {
        let store = MemoryNoteStore::new();
        store.set_outage(Some("offline"));
        let err = store
            .list("rec-1", &QueryTemplate::new("annotation"))
            .await
            .unwrap_err();
        assert_eq!(err.message, "offline");
    }
}
