use std::path::PathBuf;

use serde::Deserialize;

use crate::config::Config;
use crate::store::EntityStore;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// The single store instance; created when a workspace is selected.
pub struct AppState {
    pub config: Config,
    pub workspace: Option<PathBuf>,
    pub store: Option<EntityStore>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            workspace: None,
            store: None,
        }
    }
}
