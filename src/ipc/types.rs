use std::path::{Path, PathBuf};
use std::sync::RwLock;

use rusqlite::Connection;
use serde::Deserialize;

use crate::config::DaemonConfig;
use crate::{db, seed};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Shared across request workers. Each worker opens its own connection via `connect`.
pub struct AppState {
    pub config: DaemonConfig,
    workspace: RwLock<Option<PathBuf>>,
}

impl AppState {
    pub fn new(config: DaemonConfig) -> Self {
        Self {
            config,
            workspace: RwLock::new(None),
        }
    }

    pub fn workspace(&self) -> Option<PathBuf> {
        self.workspace
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Opens (and migrates) the workspace database, seeds the default catalog when enabled, and
    /// makes the workspace current for subsequent requests.
    pub fn select_workspace(&self, path: &Path) -> anyhow::Result<seed::SeedSummary> {
        let conn = db::open_db(path, self.config.busy_timeout)?;
        let summary = if self.config.seed_catalog {
            seed::ensure_initial_data(&conn)?
        } else {
            seed::SeedSummary::default()
        };
        *self
            .workspace
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(path.to_path_buf());
        Ok(summary)
    }

    /// `Ok(None)` when no workspace has been selected yet.
    pub fn connect(&self) -> anyhow::Result<Option<Connection>> {
        match self.workspace() {
            Some(path) => Ok(Some(db::connect(&path, self.config.busy_timeout)?)),
            None => Ok(None),
        }
    }
}
