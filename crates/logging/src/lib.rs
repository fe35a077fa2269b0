//! Concord Logging
//!
//! One place to install the tracing subscriber. `RUST_LOG`, when set, wins
//! over the level chosen in code.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Targets that follow the chosen level; everything else stays at warn.
const CONCORD_TARGETS: &[&str] = &[
    "concord_core",
    "concord_crypto",
    "concord_registry",
    "concord_settlement",
    "concord_aggregator",
    "concord_coordinator",
    "concord_settings",
    "concord_app",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Self::Debug
        } else {
            Self::Info
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    /// Filter directives used when `RUST_LOG` is absent.
    pub fn default_directives(&self) -> String {
        let mut directives = String::from("warn");
        for target in CONCORD_TARGETS {
            directives.push_str(&format!(",{}={}", target, self.as_str()));
        }
        directives
    }
}

fn filter_for(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.default_directives()))
}

/// Install the global fmt subscriber. Fails if one is already installed.
pub fn try_init(level: LogLevel) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(level))
        .with_target(true)
        .try_init()
}
