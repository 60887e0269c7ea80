use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use strum::{Display, EnumString};
use time::OffsetDateTime;

use crate::query::QueryTemplate;

pub mod mime;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Mode {
    #[default]
    Notes,
    Remote,
}

/// Record types whose documents hang off the generic activity id instead of
/// a type-specific key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ActivityType {
    Email,
    Task,
    PhoneCall,
    Appointment,
    Letter,
    Fax,
    ServiceAppointment,
    CampaignActivity,
    CampaignResponse,
    RecurringAppointmentMaster,
    SocialActivity,
}

impl ActivityType {
    pub fn matches(record_type: &str) -> bool {
        ActivityType::from_str(record_type.trim()).is_ok()
    }
}

/// Raw context handed over by the host page. The record id is absent until
/// the host record has been saved for the first time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostContext {
    pub record_type: String,
    pub record_id: Option<String>,
}

impl HostContext {
    pub fn new(record_type: impl Into<String>, record_id: Option<String>) -> Self {
        Self {
            record_type: record_type.into(),
            record_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub record_type: String,
    pub collection_name: String,
    pub record_id: String,
    pub base_url: String,
}

impl RecordMetadata {
    pub fn is_activity(&self) -> bool {
        ActivityType::matches(&self.record_type)
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteAttachment {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub payload: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteDocument {
    pub id: String,
    pub full_name: String,
    #[serde(default)]
    pub relative_path: String,
    #[serde(default)]
    pub is_folder: bool,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub mime_type: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub modified_at: OffsetDateTime,
    #[serde(default)]
    pub modified_by: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub absolute_url: String,
    #[serde(default)]
    pub read_url: String,
    #[serde(default)]
    pub edit_url: String,
    pub location_id: String,
    #[serde(default)]
    pub location_name: String,
}

impl RemoteDocument {
    pub fn folder_path(&self) -> String {
        join_path(&self.relative_path, &self.full_name)
    }
}

pub fn join_path(parent: &str, name: &str) -> String {
    let parent = parent.trim_matches('/');
    let name = name.trim_matches('/');
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DocumentItem {
    NoteAttachment(NoteAttachment),
    RemoteDocument(RemoteDocument),
}

impl DocumentItem {
    pub fn id(&self) -> &str {
        match self {
            DocumentItem::NoteAttachment(note) => &note.id,
            DocumentItem::RemoteDocument(doc) => &doc.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            DocumentItem::NoteAttachment(note) => &note.filename,
            DocumentItem::RemoteDocument(doc) => &doc.full_name,
        }
    }

    pub fn mime_type(&self) -> &str {
        match self {
            DocumentItem::NoteAttachment(note) => &note.mime_type,
            DocumentItem::RemoteDocument(doc) => &doc.mime_type,
        }
    }

    pub fn size_bytes(&self) -> u64 {
        match self {
            DocumentItem::NoteAttachment(note) => note.size_bytes,
            DocumentItem::RemoteDocument(doc) => doc.size_bytes,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, DocumentItem::RemoteDocument(doc) if doc.is_folder)
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parent_site_id: Option<String>,
    #[serde(default)]
    pub is_default_site: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub id: String,
    pub name: String,
    pub query: QueryTemplate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_types_match_case_insensitively() {
        assert!(ActivityType::matches("email"));
        assert!(ActivityType::matches("PhoneCall"));
        assert!(ActivityType::matches("recurringappointmentmaster"));
        assert!(!ActivityType::matches("account"));
        assert!(!ActivityType::matches(""));
    }

    #[test]
    fn folder_path_joins_parent_and_name() {
        let doc = RemoteDocument {
            id: "1".into(),
            full_name: "Reports".into(),
            relative_path: String::new(),
            is_folder: true,
            size_bytes: 0,
            mime_type: String::new(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            modified_at: OffsetDateTime::UNIX_EPOCH,
            modified_by: String::new(),
            author: String::new(),
            absolute_url: String::new(),
            read_url: String::new(),
            edit_url: String::new(),
            location_id: "loc".into(),
            location_name: "Docs".into(),
        };
        assert_eq!(doc.folder_path(), "Reports");
        assert_eq!(join_path("Reports/", "Q1"), "Reports/Q1");
    }

    #[test]
    fn mode_parses_from_cli_text() {
        assert_eq!("remote".parse::<Mode>().unwrap(), Mode::Remote);
        assert_eq!("Notes".parse::<Mode>().unwrap(), Mode::Notes);
        assert_eq!(Mode::Remote.to_string(), "remote");
    }
}
