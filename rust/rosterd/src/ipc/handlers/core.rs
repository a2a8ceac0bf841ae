use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::store::EntityStore;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;

/// Opens (or creates) the workspace database and loads every collection
/// before the store is handed to any handler.
pub fn open_workspace(state: &mut AppState, path: &Path) -> anyhow::Result<()> {
    let conn = db::open_db(path, &state.config.db_file)?;
    let store = EntityStore::open(conn);
    info!(
        workspace = %path.to_string_lossy(),
        students = store.students().len(),
        classes = store.classes().len(),
        evaluations = store.evaluations().len(),
        "workspace opened"
    );
    state.workspace = Some(path.to_path_buf());
    state.store = Some(store);
    Ok(())
}

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "ready": state.store.as_ref().is_some_and(|s| s.is_ready()),
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    if let Err(e) = open_workspace(state, &path) {
        return err(&req.id, "db_open_failed", format!("{e:#}"), None);
    }
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "db_open_failed", "store unavailable", None);
    };
    ok(
        &req.id,
        json!({
            "workspacePath": path.to_string_lossy(),
            "students": store.students().len(),
            "classes": store.classes().len(),
            "evaluations": store.evaluations().len(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
