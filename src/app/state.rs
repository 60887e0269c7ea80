use indexmap::IndexSet;

use crate::model::{DocumentItem, Location, Mode, RecordMetadata, View};
use crate::search::filter_items;

#[derive(Debug, Clone, Default)]
pub struct BrowseState {
    pub mode: Mode,
    pub current_path: String,
    pub folder_stack: Vec<String>,
    pub selected_location: Option<String>,
    pub selected_location_name: Option<String>,
    pub selected_location_is_default: bool,
    pub selected_view: Option<String>,
    pub selection: IndexSet<String>,
    pub notes_search_text: String,
    pub remote_search_text: String,
    pub loading: bool,
    pub listing: Vec<DocumentItem>,
    pub views: Vec<View>,
    pub locations: Vec<Location>,
    pub record: Option<RecordMetadata>,
    /// Blocking message while the record cannot be resolved.
    pub blocked: Option<String>,
    pub remember: bool,

    pub(crate) scope_epoch: u64,
    pub(crate) latest_issued: u64,
    pub(crate) applied_seq: u64,
}

impl BrowseState {
    pub fn search_text(&self) -> &str {
        match self.mode {
            Mode::Notes => &self.notes_search_text,
            Mode::Remote => &self.remote_search_text,
        }
    }

    pub(crate) fn set_search_text(&mut self, text: &str) {
        match self.mode {
            Mode::Notes => self.notes_search_text = text.to_string(),
            Mode::Remote => self.remote_search_text = text.to_string(),
        }
    }

    pub fn visible_items(&self) -> Vec<&DocumentItem> {
        filter_items(&self.listing, self.search_text())
    }

    pub fn visible_item(&self, id: &str) -> Option<&DocumentItem> {
        self.visible_items().into_iter().find(|item| item.id() == id)
    }

    pub fn selected_items(&self) -> Vec<&DocumentItem> {
        self.selection
            .iter()
            .filter_map(|id| self.listing.iter().find(|item| item.id() == id))
            .collect()
    }

    pub fn location(&self, id: &str) -> Option<&Location> {
        self.locations
            .iter()
            .find(|location| location.id.eq_ignore_ascii_case(id))
    }

    pub fn view(&self, id: &str) -> Option<&View> {
        self.views.iter().find(|view| view.id == id)
    }

    pub(crate) fn push_folder(&mut self, path: &str) {
        let previous = std::mem::replace(&mut self.current_path, path.to_string());
        self.folder_stack.push(previous);
    }

    pub(crate) fn pop_folder(&mut self) {
        self.current_path = self.folder_stack.pop().unwrap_or_default();
    }

    pub(crate) fn reset_navigation(&mut self) {
        self.current_path.clear();
        self.folder_stack.clear();
    }

    pub(crate) fn select_location(&mut self, location: &Location) {
        self.selected_location = Some(location.id.clone());
        self.selected_location_name = Some(location.name.clone());
        self.selected_location_is_default = location.is_default_site;
    }

    pub(crate) fn fallback_location(&self) -> Option<Location> {
        self.locations
            .iter()
            .find(|location| location.is_default_site)
            .or_else(|| self.locations.first())
            .cloned()
    }

    /// Marks the current scope as changed so in-flight listings are ignored.
    pub(crate) fn bump_scope(&mut self) {
        self.scope_epoch += 1;
        self.selection.clear();
    }

    pub(crate) fn prune_selection(&mut self) {
        let visible: Vec<String> = self
            .visible_items()
            .into_iter()
            .filter(|item| !item.is_folder())
            .map(|item| item.id().to_string())
            .collect();
        self.selection.retain(|id| visible.contains(id));
    }

    /// Fresh state for a new record identity. Request counters carry over so
    /// listings issued for the previous record stay stale.
    pub(crate) fn reset_for_record(&mut self) {
        let epoch = self.scope_epoch + 1;
        let latest_issued = self.latest_issued;
        let applied_seq = self.applied_seq;
        *self = BrowseState {
            scope_epoch: epoch,
            latest_issued,
            applied_seq,
            ..BrowseState::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NoteAttachment;
    use time::OffsetDateTime;

    fn note(id: &str, name: &str) -> DocumentItem {
        DocumentItem::NoteAttachment(NoteAttachment {
            id: id.into(),
            filename: name.into(),
            size_bytes: 1,
            mime_type: "text/plain".into(),
            payload: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            subject: None,
            body_text: None,
        })
    }

    #[test]
    fn push_then_pop_restores_previous_path() {
        let mut state = BrowseState::default();
        state.push_folder("A");
        state.push_folder("A/B");
        assert_eq!(state.folder_stack, vec!["", "A"]);
        state.pop_folder();
        assert_eq!(state.current_path, "A");
        assert_eq!(state.folder_stack, vec![""]);
        state.pop_folder();
        state.pop_folder();
        assert_eq!(state.current_path, "");
        assert!(state.folder_stack.is_empty());
    }

    #[test]
    fn search_text_is_kept_per_mode() {
        let mut state = BrowseState::default();
        state.set_search_text("invoice");
        state.mode = Mode::Remote;
        assert_eq!(state.search_text(), "");
        state.set_search_text("report");
        state.mode = Mode::Notes;
        assert_eq!(state.search_text(), "invoice");
    }

    #[test]
    fn pruning_keeps_only_visible_ids() {
        let mut state = BrowseState {
            listing: vec![note("1", "alpha.txt"), note("2", "beta.txt")],
            ..BrowseState::default()
        };
        state.selection.insert("1".into());
        state.selection.insert("2".into());
        state.selection.insert("gone".into());
        state.set_search_text("beta");
        state.prune_selection();
        assert_eq!(state.selection.iter().collect::<Vec<_>>(), vec!["2"]);
    }

    #[test]
    fn record_reset_keeps_request_counters() {
        let mut state = BrowseState {
            current_path: "A".into(),
            latest_issued: 7,
            applied_seq: 6,
            scope_epoch: 3,
            ..BrowseState::default()
        };
        state.reset_for_record();
        assert_eq!(state.current_path, "");
        assert_eq!(state.latest_issued, 7);
        assert_eq!(state.applied_seq, 6);
        assert_eq!(state.scope_epoch, 4);
    }
}
