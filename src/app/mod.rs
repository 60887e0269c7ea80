use crossbeam_channel::Receiver;
use parking_lot::Mutex;

use crate::error::{BrowseError, BrowseResult, RECORD_NOT_CREATED};
use crate::events::RecordSaved;
use crate::model::mime::{decode_payload, strip_data_uri};
use crate::model::{DocumentItem, FileUpload, HostContext, Mode, RecordMetadata};
use crate::notify::{Notification, Notifier};
use crate::query::{
    build_note_query, build_remote_query, record_link, render_fetch_xml, QueryTemplate,
    RecordLink, RemoteQuery,
};
use crate::search::sort_folders_first;
use crate::store::{
    Collaborators, NewLocation, NewNote, NewRemoteDocument, NewRemoteFolder, NotePatch,
    Preference, StoreError, StoreResult,
};

mod actions;
pub mod state;


pub use actions::{
    delete_location_id, Action, ActionDispatcher, AvailableActions, BatchReport,
    DownloadArtifact, ItemEffect, ItemOutcome, Preview,
};
pub use state::BrowseState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MountOptions {
    pub default_mode: Mode,
    pub remember_by_default: bool,
}

enum ListingRequest {
    Notes {
        record_id: String,
        query: QueryTemplate,
    },
    Remote(RemoteQuery),
    Nothing,
}

struct UploadTarget {
    mode: Mode,
    regarding: RecordLink,
    location_id: Option<String>,
    folder_path: String,
}

/// Clears `loading` for the latest reload even when its future is dropped
/// mid-fetch.
struct LoadingGuard<'a> {
    state: &'a Mutex<BrowseState>,
    seq: u64,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if self.seq == state.latest_issued {
            state.loading = false;
        }
    }
}

/// Owns the browse state for one host record.
pub struct BrowserController {
    host: Mutex<HostContext>,
    stores: Collaborators,
    options: MountOptions,
    state: Mutex<BrowseState>,
    notifier: Notifier,
}

impl BrowserController {
    /// Resolves the record, restores the remembered scope and loads the first
    /// listing. An unresolvable record leaves the controller blocked.
    pub async fn mount(host: HostContext, stores: Collaborators, options: MountOptions) -> Self {
        let controller = Self {
            host: Mutex::new(host),
            stores,
            options,
            state: Mutex::new(BrowseState::default()),
            notifier: Notifier::new(),
        };
        let result = controller.initialise().await;
        if let Err(err) = controller.surface(result) {
            tracing::warn!(error = %err, "browser mounted without a listing");
        }
        controller
    }

    pub fn state(&self) -> BrowseState {
        self.state.lock().clone()
    }

    pub fn host(&self) -> HostContext {
        self.host.lock().clone()
    }

    pub fn visible_items(&self) -> Vec<DocumentItem> {
        self.state
            .lock()
            .visible_items()
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn notifications(&self) -> Receiver<Notification> {
        self.notifier.subscribe()
    }

    pub fn drain_notifications(&self) -> Vec<Notification> {
        self.notifier.drain()
    }

    pub async fn reload(&self) -> BrowseResult<()> {
        let result = self.reload_inner().await;
        self.surface(result)
    }

    pub async fn set_mode(&self, mode: Mode) -> BrowseResult<()> {
        let result = self.set_mode_inner(mode).await;
        self.surface(result)
    }

    pub async fn navigate_into(&self, path: &str) -> BrowseResult<()> {
        let result = self.navigate_into_inner(path).await;
        self.surface(result)
    }

    pub async fn navigate_back(&self) -> BrowseResult<()> {
        let result = self.navigate_back_inner().await;
        self.surface(result)
    }

    pub async fn change_location(&self, id: &str, name: &str) -> BrowseResult<()> {
        let result = self.change_location_inner(id, name).await;
        self.surface(result)
    }

    pub async fn change_view(&self, id: &str) -> BrowseResult<()> {
        let result = self.change_view_inner(id).await;
        self.surface(result)
    }

    /// Filters the loaded listing for the active mode. Never queries a store.
    pub fn search(&self, text: &str) -> BrowseResult<()> {
        let result = self.update_ready(|state| {
            state.set_search_text(text);
            state.prune_selection();
        });
        self.surface(result)
    }

    pub async fn toggle_selection(&self, id: &str) -> BrowseResult<()> {
        let result = self.toggle_selection_inner(id).await;
        self.surface(result)
    }

    pub fn select_all(&self) -> BrowseResult<()> {
        let result = self.update_ready(|state| {
            let ids: Vec<String> = state
                .visible_items()
                .into_iter()
                .filter(|item| !item.is_folder())
                .map(|item| item.id().to_string())
                .collect();
            state.selection = ids.into_iter().collect();
        });
        self.surface(result)
    }

    pub fn clear_selection(&self) {
        self.state.lock().selection.clear();
    }

    pub fn available_actions(&self) -> AvailableActions {
        let state = self.state.lock();
        AvailableActions::for_selection(&state.selected_items())
    }

    pub async fn set_remember(&self, remember: bool) -> BrowseResult<()> {
        let result = self.set_remember_inner(remember).await;
        self.surface(result)
    }

    pub async fn upload(&self, files: Vec<FileUpload>) -> BrowseResult<BatchReport> {
        let result = self.upload_inner(files).await;
        self.surface(result)
    }

    pub async fn create_folder(&self, name: &str) -> BrowseResult<String> {
        let result = self.create_folder_inner(name).await;
        self.surface(result)
    }

    pub async fn add_location(
        &self,
        display_name: &str,
        folder_name: &str,
        parent_site_id: Option<&str>,
    ) -> BrowseResult<String> {
        let result = self
            .add_location_inner(display_name, folder_name, parent_site_id)
            .await;
        self.surface(result)
    }

    pub async fn edit_note(&self, id: &str, subject: &str, body_text: &str) -> BrowseResult<()> {
        let result = self.edit_note_inner(id, subject, body_text).await;
        self.surface(result)
    }

    /// Applies `action` to every selected item. Once dispatched the selection
    /// is cleared whatever the individual outcomes.
    pub async fn perform_action_on_selected_files(
        &self,
        action: Action,
    ) -> BrowseResult<BatchReport> {
        let result = self.perform_action_inner(action).await;
        self.surface(result)
    }

    /// The only path that removes a folder and its contents.
    pub async fn delete_folder(&self, id: &str, confirmed: bool) -> BrowseResult<()> {
        let result = self.delete_folder_inner(id, confirmed).await;
        self.surface(result)
    }

    pub async fn on_record_saved(&self, event: RecordSaved) -> BrowseResult<()> {
        {
            let mut host = self.host.lock();
            let unchanged = host
                .record_id
                .as_deref()
                .map(|id| id.eq_ignore_ascii_case(&event.record_id))
                .unwrap_or(false);
            if unchanged && self.state.lock().blocked.is_none() {
                return Ok(());
            }
            host.record_id = Some(event.record_id.clone());
        }
        tracing::info!(record_id = %event.record_id, "record identity changed");
        self.state.lock().reset_for_record();
        let result = self.initialise().await;
        self.surface(result)
    }

    async fn initialise(&self) -> BrowseResult<()> {
        let host = self.host();
        let record = match self.stores.metadata.resolve(&host).await {
            Ok(Some(record)) => record,
            Ok(None) => return Err(self.block(RECORD_NOT_CREATED.to_string())),
            Err(err) => return Err(self.block(format!("record metadata unavailable: {err}"))),
        };
        let link = record_link(&record);

        let preference = match self.stores.preferences.load(&record.record_type).await {
            Ok(preference) => preference,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring unreadable preference");
                None
            }
        };
        let views = self
            .stores
            .notes
            .views(&record.record_type)
            .await
            .unwrap_or_else(|err| {
                self.report_store_error("loading views", &err);
                Vec::new()
            });
        let locations = self
            .stores
            .remote
            .resolve_locations(&link)
            .await
            .unwrap_or_else(|err| {
                self.report_store_error("loading locations", &err);
                Vec::new()
            });

        {
            let mut state = self.state.lock();
            state.blocked = None;
            state.record = Some(record);
            state.views = views;
            state.locations = locations;
            state.remember = preference.is_some() || self.options.remember_by_default;
            self.restore_scope(&mut state, preference.as_ref());
            state.bump_scope();
            tracing::debug!(mode = %state.mode, location = ?state.selected_location, "browser mounted");
        }
        self.reload_inner().await
    }

    fn restore_scope(&self, state: &mut BrowseState, preference: Option<&Preference>) {
        let remembered = preference
            .and_then(|preference| preference.preferred_location_id.as_deref())
            .and_then(|id| state.location(id).cloned());
        let location = remembered.clone().or_else(|| state.fallback_location());
        if let Some(location) = &location {
            state.select_location(location);
        }
        state.mode = match preference {
            Some(preference) if preference.preferred_mode == Mode::Remote && remembered.is_some() => {
                Mode::Remote
            }
            Some(_) => Mode::Notes,
            None if self.options.default_mode == Mode::Remote && location.is_some() => Mode::Remote,
            None => Mode::Notes,
        };
    }

    fn block(&self, message: String) -> BrowseError {
        tracing::error!(%message, "record metadata unavailable, browser blocked");
        {
            let mut state = self.state.lock();
            state.blocked = Some(message.clone());
            state.record = None;
            state.listing.clear();
            state.selection.clear();
            state.loading = false;
        }
        self.notifier.error(message.clone());
        BrowseError::MetadataUnavailable(message)
    }

    async fn reload_inner(&self) -> BrowseResult<()> {
        let (request, seq, epoch) = {
            let mut state = self.state.lock();
            let request = plan_listing(&state)?;
            state.latest_issued += 1;
            state.loading = true;
            (request, state.latest_issued, state.scope_epoch)
        };

        let loading = LoadingGuard {
            state: &self.state,
            seq,
        };
        let fetched = self.fetch(&request).await;
        drop(loading);

        let mut state = self.state.lock();
        let stale = epoch != state.scope_epoch || seq < state.applied_seq;
        match fetched {
            Ok(_) if stale => {
                tracing::warn!(seq, "discarding listing for a superseded scope");
                Ok(())
            }
            Ok(items) => {
                tracing::debug!(seq, count = items.len(), "listing applied");
                state.applied_seq = seq;
                state.listing = items;
                state.prune_selection();
                Ok(())
            }
            Err(err) if stale => {
                tracing::debug!(seq, error = %err, "superseded listing failed");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn fetch(&self, request: &ListingRequest) -> StoreResult<Vec<DocumentItem>> {
        match request {
            ListingRequest::Notes { record_id, query } => {
                tracing::debug!(fetch = %render_fetch_xml(query), "listing notes");
                let notes = self.stores.notes.list(record_id, query).await?;
                Ok(notes.into_iter().map(DocumentItem::NoteAttachment).collect())
            }
            ListingRequest::Remote(query) => {
                tracing::debug!(
                    location = %query.location_id,
                    path = %query.path,
                    fetch = %render_fetch_xml(&query.template),
                    "listing folder"
                );
                let documents = self.stores.remote.list_folder(query).await?;
                let mut items: Vec<DocumentItem> = documents
                    .into_iter()
                    .map(DocumentItem::RemoteDocument)
                    .collect();
                sort_folders_first(&mut items);
                Ok(items)
            }
            ListingRequest::Nothing => Ok(Vec::new()),
        }
    }

    async fn set_mode_inner(&self, mode: Mode) -> BrowseResult<()> {
        let preference = {
            let mut state = self.state.lock();
            ready(&state)?;
            if state.mode != mode {
                state.mode = mode;
                state.listing.clear();
            }
            if mode == Mode::Remote && state.selected_location.is_none() {
                if let Some(location) = state.fallback_location() {
                    state.select_location(&location);
                }
            }
            state.bump_scope();
            pending_preference(&state)
        };
        self.persist(preference).await;
        self.reload_inner().await
    }

    async fn navigate_into_inner(&self, path: &str) -> BrowseResult<()> {
        {
            let mut state = self.state.lock();
            ready(&state)?;
            require_mode(&state, "navigate_into", Mode::Remote)?;
            state.push_folder(path);
            state.bump_scope();
        }
        self.reload_inner().await
    }

    async fn navigate_back_inner(&self) -> BrowseResult<()> {
        {
            let mut state = self.state.lock();
            ready(&state)?;
            require_mode(&state, "navigate_back", Mode::Remote)?;
            state.pop_folder();
            state.bump_scope();
        }
        self.reload_inner().await
    }

    async fn change_location_inner(&self, id: &str, name: &str) -> BrowseResult<()> {
        let preference = {
            let mut state = self.state.lock();
            ready(&state)?;
            require_mode(&state, "change_location", Mode::Remote)?;
            let is_default = state
                .location(id)
                .map(|location| location.is_default_site)
                .ok_or_else(|| BrowseError::validation(format!("unknown location {id}")))?;
            state.selected_location = Some(id.to_string());
            state.selected_location_name = Some(name.to_string());
            state.selected_location_is_default = is_default;
            state.reset_navigation();
            state.bump_scope();
            pending_preference(&state)
        };
        self.persist(preference).await;
        self.reload_inner().await
    }

    async fn change_view_inner(&self, id: &str) -> BrowseResult<()> {
        {
            let mut state = self.state.lock();
            ready(&state)?;
            require_mode(&state, "change_view", Mode::Notes)?;
            if state.view(id).is_none() {
                return Err(BrowseError::validation(format!("unknown view {id}")));
            }
            state.selected_view = Some(id.to_string());
            state.bump_scope();
        }
        self.reload_inner().await
    }

    async fn toggle_selection_inner(&self, id: &str) -> BrowseResult<()> {
        let folder = {
            let mut state = self.state.lock();
            ready(&state)?;
            let item = state
                .visible_item(id)
                .ok_or_else(|| BrowseError::NotFound { id: id.to_string() })?;
            let folder = match item {
                DocumentItem::RemoteDocument(doc) if doc.is_folder => Some(doc.folder_path()),
                _ => None,
            };
            if folder.is_none() && !state.selection.shift_remove(id) {
                state.selection.insert(id.to_string());
            }
            folder
        };
        match folder {
            Some(path) => self.navigate_into_inner(&path).await,
            None => Ok(()),
        }
    }

    async fn set_remember_inner(&self, remember: bool) -> BrowseResult<()> {
        let (record_type, preference) = {
            let mut state = self.state.lock();
            let record_type = ready(&state)?.record_type.clone();
            state.remember = remember;
            (record_type, preference_of(&state))
        };
        if remember {
            self.stores
                .preferences
                .save(&record_type, &preference)
                .await?;
        } else {
            self.stores.preferences.clear(&record_type).await?;
        }
        tracing::debug!(remember, %record_type, "preference updated");
        Ok(())
    }

    async fn persist(&self, pending: Option<(String, Preference)>) {
        let Some((record_type, preference)) = pending else {
            return;
        };
        if let Err(err) = self
            .stores
            .preferences
            .save(&record_type, &preference)
            .await
        {
            self.report_store_error("saving preference", &err);
        }
    }

    async fn upload_inner(&self, files: Vec<FileUpload>) -> BrowseResult<BatchReport> {
        if files.is_empty() {
            return Err(BrowseError::validation("no files to upload"));
        }
        let target = {
            let state = self.state.lock();
            let record = ready(&state)?;
            UploadTarget {
                mode: state.mode,
                regarding: record_link(record),
                location_id: state.selected_location.clone(),
                folder_path: state.current_path.clone(),
            }
        };

        let mut report = BatchReport::default();
        for file in files {
            let name = file.name.clone();
            let result = self.upload_one(&target, file).await;
            if let Err(err) = &result {
                tracing::warn!(file = %name, error = %err, "upload failed");
            }
            report.outcomes.push(ItemOutcome { id: name, result });
        }
        self.announce("upload", &report);
        self.reload_after_change().await;
        Ok(report)
    }

    async fn upload_one(&self, target: &UploadTarget, file: FileUpload) -> BrowseResult<ItemEffect> {
        let name = file.name.trim();
        if name.is_empty() {
            return Err(BrowseError::validation("file name must not be empty"));
        }
        let bytes = decode_payload(&file.content).map_err(|err| {
            BrowseError::validation(format!("{name} is not valid base64: {err}"))
        })?;
        let id = match target.mode {
            Mode::Notes => {
                self.stores
                    .notes
                    .create(NewNote {
                        regarding: target.regarding.clone(),
                        filename: name.to_string(),
                        subject: name.to_string(),
                        mime_type: file.mime_type.clone(),
                        size_bytes: bytes.len() as u64,
                        payload: strip_data_uri(&file.content).to_string(),
                        body_text: None,
                    })
                    .await?
            }
            Mode::Remote => {
                let location_id = target
                    .location_id
                    .clone()
                    .ok_or_else(|| BrowseError::validation("select a location before uploading"))?;
                self.stores
                    .remote
                    .create_document(NewRemoteDocument {
                        regarding: target.regarding.clone(),
                        location_id,
                        folder_path: target.folder_path.clone(),
                        file_name: name.to_string(),
                        mime_type: file.mime_type.clone(),
                        content: file.content,
                    })
                    .await?
            }
        };
        Ok(ItemEffect::Created { id })
    }

    async fn create_folder_inner(&self, name: &str) -> BrowseResult<String> {
        let name = name.trim();
        let folder = {
            let state = self.state.lock();
            let record = ready(&state)?;
            require_mode(&state, "create_folder", Mode::Remote)?;
            if name.is_empty() {
                return Err(BrowseError::validation("folder name must not be empty"));
            }
            let location_id = state
                .selected_location
                .clone()
                .ok_or_else(|| BrowseError::validation("select a location first"))?;
            NewRemoteFolder {
                regarding: record_link(record),
                location_id,
                parent_path: state.current_path.clone(),
                name: name.to_string(),
            }
        };
        let id = self.stores.remote.create_folder(folder).await?;
        self.notifier.success(format!("Folder {name} created"));
        self.reload_after_change().await;
        Ok(id)
    }

    async fn add_location_inner(
        &self,
        display_name: &str,
        folder_name: &str,
        parent_site_id: Option<&str>,
    ) -> BrowseResult<String> {
        let display_name = display_name.trim();
        let folder_name = folder_name.trim();
        let regarding = {
            let state = self.state.lock();
            let record = ready(&state)?;
            require_mode(&state, "add_location", Mode::Remote)?;
            if display_name.is_empty() || folder_name.is_empty() {
                return Err(BrowseError::validation(
                    "location display name and folder name are required",
                ));
            }
            record_link(record)
        };
        let id = self
            .stores
            .remote
            .create_location(NewLocation {
                regarding: regarding.clone(),
                display_name: display_name.to_string(),
                folder_name: folder_name.to_string(),
                parent_site_id: parent_site_id.map(str::to_string),
            })
            .await?;
        let locations = self.stores.remote.resolve_locations(&regarding).await?;
        self.state.lock().locations = locations;
        self.notifier.success(format!("Location {display_name} added"));
        self.change_location_inner(&id, display_name).await?;
        Ok(id)
    }

    async fn edit_note_inner(&self, id: &str, subject: &str, body_text: &str) -> BrowseResult<()> {
        let subject = subject.trim();
        {
            let state = self.state.lock();
            ready(&state)?;
            require_mode(&state, "edit_note", Mode::Notes)?;
            let known = state
                .listing
                .iter()
                .any(|item| matches!(item, DocumentItem::NoteAttachment(note) if note.id == id));
            if !known {
                return Err(BrowseError::NotFound { id: id.to_string() });
            }
            if subject.is_empty() {
                return Err(BrowseError::validation("note title must not be empty"));
            }
        }
        let patch = NotePatch {
            subject: Some(subject.to_string()),
            body_text: Some(body_text.to_string()),
            ..NotePatch::default()
        };
        self.stores.notes.update(id, patch).await?;
        self.notifier.success("Note updated");
        self.reload_after_change().await;
        Ok(())
    }

    async fn perform_action_inner(&self, action: Action) -> BrowseResult<BatchReport> {
        let (ids, listing, regarding, locations) = {
            let mut state = self.state.lock();
            let regarding = record_link(ready(&state)?);
            ActionDispatcher::check(&action, &state.selected_items())?;
            let ids: Vec<String> = state.selection.drain(..).collect();
            (ids, state.listing.clone(), regarding, state.locations.clone())
        };
        tracing::debug!(action = action.name(), items = ids.len(), "dispatching action");

        let dispatcher = ActionDispatcher::new(
            self.stores.notes.as_ref(),
            self.stores.remote.as_ref(),
            &regarding,
            &locations,
        );
        let report = dispatcher.dispatch(&action, &ids, &listing).await;
        self.announce(action.name(), &report);
        if action.mutates_listing() && report.success_count() > 0 {
            self.reload_after_change().await;
        }
        Ok(report)
    }

    async fn delete_folder_inner(&self, id: &str, confirmed: bool) -> BrowseResult<()> {
        let (doc_id, name, location_id) = {
            let mut state = self.state.lock();
            ready(&state)?;
            let doc = state
                .listing
                .iter()
                .find_map(|item| match item {
                    DocumentItem::RemoteDocument(doc) if doc.id == id => Some(doc),
                    _ => None,
                })
                .ok_or_else(|| BrowseError::NotFound { id: id.to_string() })?;
            if !doc.is_folder {
                return Err(BrowseError::validation(format!(
                    "{} is not a folder",
                    doc.full_name
                )));
            }
            if !confirmed {
                return Err(BrowseError::ConfirmationRequired {
                    id: doc.id.clone(),
                    name: doc.full_name.clone(),
                });
            }
            let target = (
                doc.id.clone(),
                doc.full_name.clone(),
                delete_location_id(doc, &state.locations),
            );
            state.selection.shift_remove(id);
            target
        };
        self.stores
            .remote
            .delete_document(&doc_id, &location_id)
            .await?;
        self.notifier.success(format!("Folder {name} deleted"));
        self.reload_after_change().await;
        Ok(())
    }

    async fn reload_after_change(&self) {
        if let Err(err) = self.reload_inner().await {
            self.report(&err);
        }
    }

    fn announce(&self, verb: &str, report: &BatchReport) {
        for (id, err) in report.failed() {
            self.notifier.error(format!("{verb} failed for {id}: {err}"));
        }
        let done = report.success_count();
        if done > 0 {
            self.notifier
                .success(format!("{verb} completed for {done} item(s)"));
        }
    }

    fn update_ready<T>(&self, apply: impl FnOnce(&mut BrowseState) -> T) -> BrowseResult<T> {
        let mut state = self.state.lock();
        ready(&state)?;
        Ok(apply(&mut state))
    }

    fn surface<T>(&self, result: BrowseResult<T>) -> BrowseResult<T> {
        if let Err(err) = &result {
            self.report(err);
        }
        result
    }

    fn report(&self, err: &BrowseError) {
        match err {
            // the blocking message is already on screen
            BrowseError::MetadataUnavailable(_) => {}
            BrowseError::Store(store) => {
                tracing::error!(kind = ?store.kind, error = %store, "store request failed");
                self.notifier.error(err.to_string());
            }
            other => {
                tracing::warn!(error = %other, "operation rejected");
                self.notifier.error(other.to_string());
            }
        }
    }

    fn report_store_error(&self, context: &str, err: &StoreError) {
        tracing::error!(kind = ?err.kind, error = %err, "{context} failed");
        self.notifier.error(format!("{context} failed: {err}"));
    }
}

fn ready(state: &BrowseState) -> BrowseResult<&RecordMetadata> {
    if let Some(message) = &state.blocked {
        return Err(BrowseError::MetadataUnavailable(message.clone()));
    }
    state
        .record
        .as_ref()
        .ok_or_else(|| BrowseError::MetadataUnavailable(RECORD_NOT_CREATED.to_string()))
}

fn require_mode(state: &BrowseState, operation: &'static str, required: Mode) -> BrowseResult<()> {
    if state.mode == required {
        Ok(())
    } else {
        Err(BrowseError::WrongMode {
            operation,
            required,
        })
    }
}

fn plan_listing(state: &BrowseState) -> BrowseResult<ListingRequest> {
    let record = ready(state)?;
    let request = match state.mode {
        Mode::Notes => {
            let view = state
                .selected_view
                .as_deref()
                .and_then(|id| state.view(id))
                .map(|view| &view.query);
            ListingRequest::Notes {
                record_id: record.record_id.clone(),
                query: build_note_query(&record.record_id, view),
            }
        }
        Mode::Remote => match &state.selected_location {
            Some(location_id) => ListingRequest::Remote(build_remote_query(
                &state.current_path,
                location_id,
                state.selected_location_name.as_deref().unwrap_or_default(),
                state.selected_location_is_default,
            )),
            None => ListingRequest::Nothing,
        },
    };
    Ok(request)
}

fn preference_of(state: &BrowseState) -> Preference {
    Preference {
        preferred_mode: state.mode,
        preferred_location_id: state.selected_location.clone(),
        preferred_location_name: state.selected_location_name.clone(),
    }
}

fn pending_preference(state: &BrowseState) -> Option<(String, Preference)> {
    if !state.remember {
        return None;
    }
    let record = state.record.as_ref()?;
    Some((record.record_type.clone(), preference_of(state)))
}
