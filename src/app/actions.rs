use bitflags::bitflags;

use crate::error::{BrowseError, BrowseResult};
use crate::model::mime::{create_data_uri, decode_payload, is_previewable, strip_data_uri};
use crate::model::{DocumentItem, Location, NoteAttachment, RemoteDocument};
use crate::query::RecordLink;
use crate::store::{NewNote, NotePatch, NoteStore, RemoteDocumentStore, SENTINEL_LOCATION_ID};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Rename { new_name: String },
    Download,
    Delete,
    Preview,
    Duplicate,
    Attach { target: RecordLink },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Rename { .. } => "rename",
            Action::Download => "download",
            Action::Delete => "delete",
            Action::Preview => "preview",
            Action::Duplicate => "duplicate",
            Action::Attach { .. } => "attach",
        }
    }

    pub fn mutates_listing(&self) -> bool {
        matches!(
            self,
            Action::Rename { .. } | Action::Delete | Action::Duplicate
        )
    }

    fn flag(&self) -> AvailableActions {
        match self {
            Action::Rename { .. } => AvailableActions::RENAME,
            Action::Download => AvailableActions::DOWNLOAD,
            Action::Delete => AvailableActions::DELETE,
            Action::Preview => AvailableActions::PREVIEW,
            Action::Duplicate => AvailableActions::DUPLICATE,
            Action::Attach { .. } => AvailableActions::ATTACH,
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AvailableActions: u8 {
        const RENAME = 1 << 0;
        const DOWNLOAD = 1 << 1;
        const DELETE = 1 << 2;
        const PREVIEW = 1 << 3;
        const DUPLICATE = 1 << 4;
        const ATTACH = 1 << 5;
    }
}

impl AvailableActions {
    pub fn for_selection(items: &[&DocumentItem]) -> Self {
        let mut actions = AvailableActions::empty();
        if items.is_empty() {
            return actions;
        }
        actions |= AvailableActions::DOWNLOAD | AvailableActions::DELETE;
        if let [single] = items {
            if !single.is_folder() {
                actions |= AvailableActions::RENAME;
            }
            if is_previewable(single.mime_type()) {
                actions |= AvailableActions::PREVIEW;
            }
        }
        let all_notes = items
            .iter()
            .all(|item| matches!(item, DocumentItem::NoteAttachment(_)));
        if all_notes {
            actions |= AvailableActions::DUPLICATE | AvailableActions::ATTACH;
        }
        actions
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadArtifact {
    Blob {
        filename: String,
        mime_type: String,
        bytes: Vec<u8>,
    },
    OpenUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    DataUri(String),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemEffect {
    Done,
    Created { id: String },
    Download(DownloadArtifact),
    Preview(Preview),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub id: String,
    pub result: BrowseResult<ItemEffect>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub outcomes: Vec<ItemOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.result.is_ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &BrowseError)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match &outcome.result {
                Err(err) => Some((outcome.id.as_str(), err)),
                Ok(_) => None,
            })
    }

    pub fn success_count(&self) -> usize {
        self.succeeded().count()
    }

    pub fn is_clean(&self) -> bool {
        self.failed().next().is_none()
    }

    pub fn effects(&self) -> impl Iterator<Item = &ItemEffect> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().ok())
    }
}

/// Location id submitted when deleting a document. Custom locations take the
/// all-zero sentinel, the default site its real id.
pub fn delete_location_id(doc: &RemoteDocument, locations: &[Location]) -> String {
    let custom = locations
        .iter()
        .find(|location| location.id.eq_ignore_ascii_case(&doc.location_id))
        .map(|location| !location.is_default_site)
        .unwrap_or(false);
    if custom {
        SENTINEL_LOCATION_ID.to_string()
    } else {
        doc.location_id.clone()
    }
}

pub struct ActionDispatcher<'a> {
    notes: &'a dyn NoteStore,
    remote: &'a dyn RemoteDocumentStore,
    regarding: &'a RecordLink,
    locations: &'a [Location],
}

impl<'a> ActionDispatcher<'a> {
    pub fn new(
        notes: &'a dyn NoteStore,
        remote: &'a dyn RemoteDocumentStore,
        regarding: &'a RecordLink,
        locations: &'a [Location],
    ) -> Self {
        Self {
            notes,
            remote,
            regarding,
            locations,
        }
    }

    pub fn check(action: &Action, selected: &[&DocumentItem]) -> BrowseResult<()> {
        if selected.is_empty() {
            return Err(BrowseError::validation("no files selected"));
        }
        if let Action::Rename { new_name } = action {
            if new_name.trim().is_empty() {
                return Err(BrowseError::validation("new name must not be empty"));
            }
        }
        if !AvailableActions::for_selection(selected).contains(action.flag()) {
            return Err(BrowseError::validation(format!(
                "{} is not available for this selection",
                action.name()
            )));
        }
        Ok(())
    }

    /// Runs `action` for each id, resolving ids against `listing`. A failing
    /// item never stops the rest of the batch.
    pub async fn dispatch(
        &self,
        action: &Action,
        ids: &[String],
        listing: &[DocumentItem],
    ) -> BatchReport {
        let mut report = BatchReport::default();
        for id in ids {
            let result = match listing.iter().find(|item| item.id() == id) {
                Some(item) => self.apply(action, item).await,
                None => Err(BrowseError::NotFound { id: id.clone() }),
            };
            if let Err(err) = &result {
                tracing::warn!(%id, action = action.name(), error = %err, "item action failed");
            }
            report.outcomes.push(ItemOutcome {
                id: id.clone(),
                result,
            });
        }
        report
    }

    async fn apply(&self, action: &Action, item: &DocumentItem) -> BrowseResult<ItemEffect> {
        match item {
            DocumentItem::NoteAttachment(note) => self.apply_to_note(action, note).await,
            DocumentItem::RemoteDocument(doc) => self.apply_to_document(action, doc).await,
        }
    }

    async fn apply_to_note(
        &self,
        action: &Action,
        note: &NoteAttachment,
    ) -> BrowseResult<ItemEffect> {
        match action {
            Action::Rename { new_name } => {
                let patch = NotePatch {
                    filename: Some(new_name.trim().to_string()),
                    ..NotePatch::default()
                };
                self.notes.update(&note.id, patch).await?;
                Ok(ItemEffect::Done)
            }
            Action::Download => {
                let payload = loaded_payload(note)?;
                let bytes = decode_payload(payload).map_err(|err| {
                    BrowseError::validation(format!("{} has a malformed body: {err}", note.filename))
                })?;
                Ok(ItemEffect::Download(DownloadArtifact::Blob {
                    filename: note.filename.clone(),
                    mime_type: note.mime_type.clone(),
                    bytes,
                }))
            }
            Action::Delete => {
                self.notes.delete(&note.id).await?;
                Ok(ItemEffect::Done)
            }
            Action::Preview => {
                let payload = loaded_payload(note)?;
                Ok(ItemEffect::Preview(Preview::DataUri(create_data_uri(
                    &note.mime_type,
                    strip_data_uri(payload),
                ))))
            }
            Action::Duplicate => self.copy_note(note, self.regarding).await,
            Action::Attach { target } => self.copy_note(note, target).await,
        }
    }

    async fn copy_note(
        &self,
        note: &NoteAttachment,
        regarding: &RecordLink,
    ) -> BrowseResult<ItemEffect> {
        let payload = loaded_payload(note)?;
        let id = self
            .notes
            .create(NewNote {
                regarding: regarding.clone(),
                filename: note.filename.clone(),
                subject: note.subject.clone().unwrap_or_else(|| note.filename.clone()),
                mime_type: note.mime_type.clone(),
                size_bytes: note.size_bytes,
                payload: strip_data_uri(payload).to_string(),
                body_text: note.body_text.clone(),
            })
            .await?;
        Ok(ItemEffect::Created { id })
    }

    async fn apply_to_document(
        &self,
        action: &Action,
        doc: &RemoteDocument,
    ) -> BrowseResult<ItemEffect> {
        match action {
            Action::Rename { new_name } => {
                self.remote
                    .rename_document(&doc.id, &doc.location_id, new_name.trim())
                    .await?;
                Ok(ItemEffect::Done)
            }
            Action::Download if doc.is_folder => Err(BrowseError::validation(format!(
                "{} is a folder and cannot be downloaded",
                doc.full_name
            ))),
            Action::Download => Ok(ItemEffect::Download(DownloadArtifact::OpenUrl(
                doc.absolute_url.clone(),
            ))),
            Action::Delete if doc.is_folder => Err(BrowseError::ConfirmationRequired {
                id: doc.id.clone(),
                name: doc.full_name.clone(),
            }),
            Action::Delete => {
                let location_id = delete_location_id(doc, self.locations);
                self.remote.delete_document(&doc.id, &location_id).await?;
                Ok(ItemEffect::Done)
            }
            Action::Preview => Ok(ItemEffect::Preview(Preview::Url(doc.read_url.clone()))),
            Action::Duplicate | Action::Attach { .. } => Err(BrowseError::validation(format!(
                "{} lives in a document library and cannot be copied as a note",
                doc.full_name
            ))),
        }
    }
}

fn loaded_payload(note: &NoteAttachment) -> BrowseResult<&str> {
    note.payload.as_deref().ok_or_else(|| {
        BrowseError::validation(format!("{} has no body loaded", note.filename))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn note(id: &str, mime: &str) -> DocumentItem {
        DocumentItem::NoteAttachment(NoteAttachment {
            id: id.into(),
            filename: format!("{id}.bin"),
            size_bytes: 5,
            mime_type: mime.into(),
            payload: Some("aGVsbG8=".into()),
            created_at: OffsetDateTime::UNIX_EPOCH,
            subject: None,
            body_text: None,
        })
    }

    fn doc(id: &str, location_id: &str, is_folder: bool) -> RemoteDocument {
        RemoteDocument {
            id: id.into(),
            full_name: id.into(),
            relative_path: String::new(),
            is_folder,
            size_bytes: 0,
            mime_type: String::new(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            modified_at: OffsetDateTime::UNIX_EPOCH,
            modified_by: String::new(),
            author: String::new(),
            absolute_url: String::new(),
            read_url: String::new(),
            edit_url: String::new(),
            location_id: location_id.into(),
            location_name: String::new(),
        }
    }

    fn location(id: &str, is_default_site: bool) -> Location {
        Location {
            id: id.into(),
            name: id.into(),
            parent_site_id: None,
            is_default_site,
        }
    }

    #[test]
    fn single_image_allows_preview_and_rename() {
        let image = note("1", "image/png");
        let actions = AvailableActions::for_selection(&[&image]);
        assert!(actions.contains(AvailableActions::PREVIEW | AvailableActions::RENAME));
        assert!(actions.contains(AvailableActions::ATTACH));
    }

    #[test]
    fn multi_selection_disables_rename_and_preview() {
        let a = note("1", "application/pdf");
        let b = note("2", "application/pdf");
        let actions = AvailableActions::for_selection(&[&a, &b]);
        assert!(!actions.intersects(AvailableActions::PREVIEW | AvailableActions::RENAME));
        assert!(actions.contains(AvailableActions::DELETE | AvailableActions::DOWNLOAD));
    }

    #[test]
    fn text_files_cannot_be_previewed() {
        let text = note("1", "text/plain");
        assert!(ActionDispatcher::check(&Action::Preview, &[&text]).is_err());
        assert!(ActionDispatcher::check(&Action::Download, &[&text]).is_ok());
    }

    #[test]
    fn blank_rename_is_rejected() {
        let text = note("1", "text/plain");
        let action = Action::Rename {
            new_name: "  ".into(),
        };
        assert!(matches!(
            ActionDispatcher::check(&action, &[&text]),
            Err(BrowseError::Validation(_))
        ));
    }

    #[test]
    fn custom_locations_delete_with_the_sentinel() {
        let locations = vec![location("site", true), location("custom", false)];
        assert_eq!(
            delete_location_id(&doc("a", "custom", false), &locations),
            SENTINEL_LOCATION_ID
        );
        assert_eq!(delete_location_id(&doc("b", "site", false), &locations), "site");
        assert_eq!(delete_location_id(&doc("c", "unknown", false), &locations), "unknown");
    }
}
