//! Configuration module for neurograph
//!
//! This module handles:
//! - Engine runtime settings (tick rate, logging, run duration)
//! - Session files describing a graph and a state machine
//! - Building a ready-to-run `Engine` from a session
//!
//! # Config Location
//!
//! Sessions are looked up in the platform-appropriate config directory when
//! a bare file name is given:
//! - **Linux**: `~/.config/neurograph/`
//! - **macOS**: `~/Library/Application Support/neurograph/`
//! - **Windows**: `%APPDATA%\neurograph\`
//!
//! # Example
//!
//! ```no_run
//! use neurograph::config::{SessionBuilder, SessionFile};
//!
//! let session = SessionFile::load("relaxation.toml")?;
//! let mut engine = SessionBuilder::build(&session)?;
//! engine.start(std::time::Duration::ZERO)?;
//! # Ok::<(), neurograph::error::EngineError>(())
//! ```

pub mod builder;
pub mod session;
pub mod settings;

pub use builder::SessionBuilder;
pub use session::{
    parse_endpoint, ConnectionDefinition, GraphDefinition, NodeDefinition, SessionFile,
    SessionFormat, StateDefinition, StateKindName, StateMachineDefinition, TransitionDefinition,
    SESSION_VERSION,
};
pub use settings::*;

use crate::error::{EngineError, Result};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "neurograph";

/// Get the application config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Ensure the config directory exists
pub fn ensure_config_dir() -> Result<PathBuf> {
    let dir = config_dir()
        .ok_or_else(|| EngineError::Config("Could not determine config directory".to_string()))?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            EngineError::Config(format!("Failed to create config directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Resolve a session path.
///
/// Existing paths are used as given. A bare file name that does not exist
/// in the working directory is looked up in the config directory.
pub fn resolve_session_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.exists() || path.components().count() > 1 {
        return path.to_path_buf();
    }
    config_dir()
        .map(|dir| dir.join(path))
        .filter(|candidate| candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}
