pub mod app;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod events;
pub mod model;
pub mod notify;
pub mod query;
pub mod search;
pub mod store;

pub use app::{Action, BrowseState, BrowserController, MountOptions};
pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use error::{BrowseError, BrowseResult};
