use std::fmt::Write as _;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Deserialize;

use crate::app::{BrowseState, BrowserController};
use crate::config::AppConfig;
use crate::display::listing_row;
use crate::model::{
    DocumentItem, HostContext, Location, Mode, NoteAttachment, RecordMetadata, RemoteDocument,
    View,
};
use crate::notify::Level;
use crate::query::{build_note_query, build_remote_query, record_link, render_fetch_xml};
use crate::store::{
    Collaborators, MemoryNoteStore, MemoryRemoteStore, PreferenceStore, StaticMetadataResolver,
};

/// Scope flags shared by `ls` and `query`.
#[derive(Args, Debug, Clone, Default)]
pub struct ScopeArgs {
    /// Store to browse (notes or remote)
    #[arg(long)]
    pub mode: Option<Mode>,
    /// Location id to browse in remote mode
    #[arg(long)]
    pub location: Option<String>,
    /// View id to list notes with
    #[arg(long)]
    pub view: Option<String>,
    /// Folder path inside the location
    #[arg(long, default_value = "")]
    pub path: String,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,
    /// Case-insensitive filter over the listing
    #[arg(long)]
    pub search: Option<String>,
    /// Print the listing as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,
}

/// Seed data for the in-memory stores.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub record: Option<RecordMetadata>,
    pub notes: Vec<NoteAttachment>,
    pub views: Vec<View>,
    pub locations: Vec<Location>,
    pub documents: Vec<RemoteDocument>,
}

impl Fixture {
    pub fn host(&self) -> HostContext {
        match &self.record {
            Some(record) => HostContext::new(&record.record_type, Some(record.record_id.clone())),
            None => HostContext::default(),
        }
    }

    pub fn into_collaborators(self, preferences: Arc<dyn PreferenceStore>) -> Collaborators {
        let metadata = StaticMetadataResolver::new();
        let notes = MemoryNoteStore::new();
        let remote = MemoryRemoteStore::new();
        if let Some(record) = &self.record {
            let owner = record_link(record);
            for note in self.notes {
                notes.insert(&owner, note);
            }
            for view in self.views {
                notes.add_view(&record.record_type, view);
            }
            metadata.insert(record.clone());
        }
        for location in self.locations {
            remote.add_location(None, location);
        }
        for document in self.documents {
            remote.insert(document);
        }
        Collaborators {
            metadata: Arc::new(metadata),
            notes: Arc::new(notes),
            remote: Arc::new(remote),
            preferences,
        }
    }
}

/// Reads the fixture file, or stdin when it is piped in.
pub fn load_fixture(path: Option<&Path>) -> Result<Fixture> {
    let raw = match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("reading fixture {}", path.display()))?,
        None => match read_stdin()? {
            Some(raw) => raw,
            None => bail!("no fixture given; pass --fixture <json> or pipe one on stdin"),
        },
    };
    serde_json::from_str(&raw).context("parsing fixture json")
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(Some(buf))
}

pub async fn list(controller: &BrowserController, config: &AppConfig, args: ListArgs) -> Result<()> {
    apply_scope(controller, &args.scope).await?;
    if let Some(text) = &args.search {
        controller.search(text)?;
    }
    report_notifications(controller);

    let items = controller.visible_items();
    if args.json {
        let json = serde_json::to_string_pretty(&items).context("serializing listing")?;
        println!("{json}");
        return Ok(());
    }
    let header = atty::is(atty::Stream::Stdout);
    print!(
        "{}",
        format_listing(&controller.state(), &items, config, header)
    );
    Ok(())
}

async fn apply_scope(controller: &BrowserController, scope: &ScopeArgs) -> Result<()> {
    if let Some(state) = controller.state().blocked {
        bail!("{state}");
    }
    if let Some(mode) = scope.mode {
        controller.set_mode(mode).await?;
    }
    match controller.state().mode {
        Mode::Remote => {
            if let Some(id) = &scope.location {
                let name = location_name(&controller.state(), id)?;
                controller.change_location(id, &name).await?;
            }
            if !scope.path.is_empty() {
                controller.navigate_into(&scope.path).await?;
            }
        }
        Mode::Notes => {
            if let Some(view) = &scope.view {
                controller.change_view(view).await?;
            }
        }
    }
    Ok(())
}

fn location_name(state: &BrowseState, id: &str) -> Result<String> {
    match state.location(id) {
        Some(location) => Ok(location.name.clone()),
        None => bail!("unknown location {id}"),
    }
}

fn report_notifications(controller: &BrowserController) {
    for notice in controller.drain_notifications() {
        if notice.level == Level::Error {
            eprintln!("error: {}", notice.message);
        }
    }
}

pub fn format_listing(
    state: &BrowseState,
    items: &[DocumentItem],
    config: &AppConfig,
    header: bool,
) -> String {
    let mut out = String::new();
    if header {
        let scope = match state.mode {
            Mode::Notes => format!(
                "notes  view: {}",
                state.selected_view.as_deref().unwrap_or("default")
            ),
            Mode::Remote => format!(
                "remote  {}:/{}",
                state.selected_location_name.as_deref().unwrap_or("-"),
                state.current_path
            ),
        };
        let _ = writeln!(&mut out, "{scope}");
    }
    if items.is_empty() {
        out.push_str("No documents.\n");
        return out;
    }
    for item in items {
        let _ = writeln!(
            &mut out,
            "{}",
            listing_row(
                item,
                config.display.name_width,
                config.display.size_precision
            )
        );
    }
    out
}

pub fn format_locations(state: &BrowseState) -> String {
    if state.locations.is_empty() {
        return "No locations.\n".to_string();
    }
    let mut out = String::new();
    for location in &state.locations {
        let marker = if state.selected_location.as_deref() == Some(location.id.as_str()) {
            "*"
        } else {
            " "
        };
        let kind = if location.is_default_site {
            "default"
        } else {
            "custom"
        };
        let _ = writeln!(&mut out, "{marker} {}  {}  ({kind})", location.id, location.name);
    }
    out
}

pub fn format_views(state: &BrowseState) -> String {
    if state.views.is_empty() {
        return "No views.\n".to_string();
    }
    let mut out = String::new();
    for view in &state.views {
        let _ = writeln!(&mut out, "{}  {}", view.id, view.name);
    }
    out
}

/// FetchXML the scope would send, without touching a store.
pub fn render_scope_query(fixture: &Fixture, scope: &ScopeArgs) -> Result<String> {
    let Some(record) = &fixture.record else {
        bail!("fixture has no record");
    };
    match scope.mode.unwrap_or_default() {
        Mode::Notes => {
            let view = match &scope.view {
                Some(id) => match fixture.views.iter().find(|view| &view.id == id) {
                    Some(view) => Some(&view.query),
                    None => bail!("unknown view {id}"),
                },
                None => None,
            };
            Ok(render_fetch_xml(&build_note_query(&record.record_id, view)))
        }
        Mode::Remote => {
            let location = match &scope.location {
                Some(id) => fixture.locations.iter().find(|location| &location.id == id),
                None => fixture
                    .locations
                    .iter()
                    .find(|location| location.is_default_site)
                    .or_else(|| fixture.locations.first()),
            };
            let Some(location) = location else {
                bail!("no matching location in fixture");
            };
            let query = build_remote_query(
                &scope.path,
                &location.id,
                &location.name,
                location.is_default_site,
            );
            Ok(render_fetch_xml(&query.template))
        }
    }
}
