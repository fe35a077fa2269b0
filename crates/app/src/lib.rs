//! Concord App
//!
//! Unified initialization for a Concord coordinator process: logging,
//! settings and the store snapshot, wired into a ready [`Coordinator`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use concord_coordinator::{Coordinator, CoordinatorConfig, PaymentToken, Store};
use concord_core::{Clock, CoordinatorError, SystemClock};
use concord_logging::LogLevel;
use concord_settings::{Settings, SettingsError};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Settings error: {0}")]
    SettingsError(#[from] SettingsError),
    #[error("Coordinator error: {0}")]
    CoordinatorError(#[from] CoordinatorError),
    #[error("Snapshot I/O failed for {path}: {source}")]
    SnapshotIo {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Application type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppType {
    Cli,
    Daemon,
    Node,
}

impl AppType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cli => "CLI",
            Self::Daemon => "Daemon",
            Self::Node => "Node",
        }
    }
}

/// Initialized application context
pub struct App {
    pub service: String,
    pub app_type: AppType,
    pub settings: Settings<CoordinatorConfig>,
    pub coordinator: Coordinator,
}

impl App {
    /// Write the coordinator store to the configured snapshot path.
    ///
    /// Returns the path written, or `None` when no snapshot path is set.
    /// The snapshot is written next to the target and renamed over it, so
    /// a crash mid-write leaves the previous snapshot intact.
    pub fn persist(&self) -> Result<Option<PathBuf>, AppError> {
        let Some(path) = self.settings.config.snapshot_path.clone() else {
            return Ok(None);
        };
        write_snapshot(&path, self.coordinator.store())?;
        Ok(Some(path))
    }

    pub fn into_coordinator(self) -> Coordinator {
        self.coordinator
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> AppError + '_ {
    move |source| AppError::SnapshotIo {
        path: path.to_path_buf(),
        source,
    }
}

fn write_snapshot(path: &Path, store: &Store) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let bytes = store.to_bytes()?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &bytes).map_err(io_error(&tmp))?;
    fs::rename(&tmp, path).map_err(io_error(path))?;
    debug!(
        path = %path.display(),
        bytes = bytes.len(),
        "store snapshot written"
    );
    Ok(())
}

fn load_snapshot(path: &Path) -> Result<Option<Store>, AppError> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(path).map_err(io_error(path))?;
    Ok(Some(Store::from_bytes(&bytes)?))
}

/// Builder for constructing an App with configurable options.
pub struct AppBuilder {
    service: String,
    app_type: AppType,
    log_level: LogLevel,
    skip_logging: bool,
    skip_banner: bool,
    config_path: Option<PathBuf>,
    clock: Arc<dyn Clock>,
}

impl AppBuilder {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
            app_type: AppType::Daemon,
            log_level: LogLevel::Info,
            skip_logging: false,
            skip_banner: false,
            config_path: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn app_type(mut self, app_type: AppType) -> Self {
        self.app_type = app_type;
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.log_level = LogLevel::from_verbose(verbose);
        self
    }

    pub fn skip_logging(mut self) -> Self {
        self.skip_logging = true;
        self
    }

    pub fn skip_banner(mut self) -> Self {
        self.skip_banner = true;
        self
    }

    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Finish setup. `token` is the account the coordinator pays
    /// withdrawals from.
    pub fn build(self, token: Box<dyn PaymentToken>) -> Result<App, AppError> {
        if !self.skip_logging {
            let _ = concord_logging::try_init(self.log_level);
        }

        let settings: Settings<CoordinatorConfig> =
            Settings::load_or_default(&self.service, self.config_path.as_deref())?;

        let store = match settings.config.snapshot_path.as_deref() {
            Some(path) => match load_snapshot(path)? {
                Some(store) => {
                    info!(
                        path = %path.display(),
                        agreements = store.agreements.len(),
                        requests = store.requests.len(),
                        "restored store snapshot"
                    );
                    store
                }
                None => Store::new(),
            },
            None => Store::new(),
        };

        if !self.skip_banner {
            info!(
                "{} {} ({}) starting, funding source 0x{}",
                self.service,
                env!("CARGO_PKG_VERSION"),
                self.app_type.name(),
                hex::encode(settings.config.funding_source),
            );
        }

        let coordinator = Coordinator::new(settings.config.clone(), store, token, self.clock);
        Ok(App {
            service: self.service,
            app_type: self.app_type,
            settings,
            coordinator,
        })
    }
}
