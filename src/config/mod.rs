use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::app::MountOptions;
use crate::display::{DEFAULT_NAME_WIDTH, DEFAULT_SIZE_PRECISION};
use crate::model::Mode;

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "Docbrowse";
const APP_NAME: &str = "docbrowse";

pub const CONFIG_ENV: &str = "DOCBROWSE_CONFIG";
pub const DATA_ENV: &str = "DOCBROWSE_DATA";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn with_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let mut default_cfg = AppConfig::default();
            default_cfg.post_load(&self.paths);
            self.write_default_config(&default_cfg)?;
            return Ok(default_cfg);
        }

        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load(&self.paths);
        Ok(cfg)
    }

    fn write_default_config(&self, cfg: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing default config")?;
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&self.paths.config_file)
            .with_context(|| format!("creating config {}", self.paths.config_file.display()))?;
        file.write_all(toml.as_bytes())
            .context("writing default config")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    pub preferences_path: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var(CONFIG_ENV).ok().map(PathBuf::from);
        let override_data = env::var(DATA_ENV).ok().map(PathBuf::from);

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        let data_dir = override_data.unwrap_or_else(|| project_dirs.data_dir().to_path_buf());
        Ok(Self::under(config_dir, config_file, data_dir))
    }

    /// Layout rooted at explicit directories.
    pub fn under(config_dir: PathBuf, config_file: PathBuf, data_dir: PathBuf) -> Self {
        Self {
            preferences_path: data_dir.join("preferences.db"),
            config_dir,
            config_file,
            data_dir,
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.config_dir, &self.data_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub browser: BrowserOptions,
    pub preferences: PreferenceOptions,
    pub display: DisplayOptions,
}

impl AppConfig {
    fn post_load(&mut self, paths: &ConfigPaths) {
        self.preferences.resolve(paths);
        if self.display.name_width < DEFAULT_NAME_WIDTH / 2 {
            tracing::warn!(
                width = self.display.name_width,
                "name width too narrow, falling back to {DEFAULT_NAME_WIDTH}"
            );
            self.display.name_width = DEFAULT_NAME_WIDTH;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserOptions {
    pub default_mode: Mode,
    /// Initial state of the "remember" toggle when nothing is stored yet.
    pub remember_location: bool,
}

impl BrowserOptions {
    pub fn mount_options(&self) -> MountOptions {
        MountOptions {
            default_mode: self.default_mode,
            remember_by_default: self.remember_location,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PreferenceBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferenceOptions {
    pub backend: PreferenceBackend,
    #[serde(skip)]
    pub database_path: PathBuf,
}

impl PreferenceOptions {
    fn resolve(&mut self, paths: &ConfigPaths) {
        if self.database_path.as_os_str().is_empty() {
            self.database_path = paths.preferences_path.clone();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayOptions {
    pub name_width: usize,
    pub size_precision: usize,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            name_width: DEFAULT_NAME_WIDTH,
            size_precision: DEFAULT_SIZE_PRECISION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn loader(temp: &TempDir) -> ConfigLoader {
        let config_dir = temp.path().join("config");
        ConfigLoader::with_paths(ConfigPaths::under(
            config_dir.clone(),
            config_dir.join("config.toml"),
            temp.path().join("data"),
        ))
    }

    #[test]
    fn first_run_writes_defaults() -> Result<()> {
        let temp = TempDir::new()?;
        let loader = loader(&temp);
        let cfg = loader.load_or_init()?;
        assert!(loader.paths().config_file.exists());
        assert_eq!(cfg.browser.default_mode, Mode::Notes);
        assert_eq!(cfg.display.name_width, 19);
        assert_eq!(cfg.preferences.backend, PreferenceBackend::Sqlite);
        assert_eq!(
            cfg.preferences.database_path,
            temp.path().join("data").join("preferences.db")
        );
        Ok(())
    }

    #[test]
    fn partial_files_fill_in_defaults() -> Result<()> {
        let temp = TempDir::new()?;
        let loader = loader(&temp);
        loader.paths().ensure_directories()?;
        fs::write(
            &loader.paths().config_file,
            "[browser]\ndefault_mode = \"remote\"\n\n[display]\nname_width = 2\n",
        )?;
        let cfg = loader.load()?;
        assert_eq!(cfg.browser.default_mode, Mode::Remote);
        assert!(!cfg.browser.remember_location);
        assert_eq!(cfg.display.name_width, DEFAULT_NAME_WIDTH);
        assert_eq!(cfg.display.size_precision, 2);
        Ok(())
    }
}
