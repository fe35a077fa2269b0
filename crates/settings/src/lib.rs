//! Concord Settings
//!
//! JSON config file persistence. Each service defines its own config type
//! and wraps it in `Settings<T>`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write settings {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse settings {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to encode settings: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SettingsError>;

/// A config value together with the file it lives in.
///
/// ```ignore
/// let settings: Settings<CoordinatorConfig> = Settings::load_or_default("concord", None)?;
/// ```
pub struct Settings<T> {
    pub config: T,
    path: PathBuf,
}

impl<T: Serialize + DeserializeOwned + Default> Settings<T> {
    /// Load the service's settings, writing defaults first if the file does
    /// not exist yet. Fields missing from an existing file are up to `T`'s
    /// serde attributes.
    pub fn load_or_default(service: &str, custom_path: Option<&Path>) -> Result<Self> {
        let path = custom_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_settings_path(service));

        if path.exists() {
            return Self::load(path);
        }
        debug!(path = %path.display(), "writing default settings");
        let settings = Self {
            config: T::default(),
            path,
        };
        settings.save()?;
        Ok(settings)
    }

    /// Load an existing settings file. Missing files are an error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        debug!(path = %path.display(), "loading settings");
        let content = fs::read_to_string(&path).map_err(|source| SettingsError::Read {
            path: path.clone(),
            source,
        })?;
        let config = serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.clone(),
            source,
        })?;
        Ok(Self { config, path })
    }

    pub fn save(&self) -> Result<()> {
        let write_err = |source| SettingsError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let content = serde_json::to_string_pretty(&self.config)?;
        fs::write(&self.path, content).map_err(write_err)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// `settings.json` inside the service's config directory.
pub fn default_settings_path(service: &str) -> PathBuf {
    default_config_dir_for(service).join("settings.json")
}

/// Per-platform config directory for a service.
///
/// - Linux: `$XDG_CONFIG_HOME/<service>` or `~/.config/<service>`
/// - macOS: `~/Library/Application Support/<Service>`
/// - Windows: `%APPDATA%\<Service>`
pub fn default_config_dir_for(service: &str) -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        home_dir()
            .join("Library")
            .join("Application Support")
            .join(capitalize(service))
    }
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home_dir().join("AppData").join("Roaming"))
            .join(capitalize(service))
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home_dir().join(".config"))
            .join(service.to_lowercase())
    }
}

fn home_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

#[cfg(any(target_os = "macos", target_os = "windows"))]
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
