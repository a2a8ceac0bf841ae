pub mod classes;
pub mod core;
pub mod dashboard;
pub mod evaluations;
pub mod students;

use crate::error::RosterResult;
use crate::ipc::error::{err, reply};
use crate::ipc::types::{AppState, Request};
use crate::store::EntityStore;

/// Runs `f` against the open store, or reports that no workspace is selected.
pub(crate) fn with_store(
    state: &mut AppState,
    req: &Request,
    f: impl FnOnce(&mut EntityStore, &serde_json::Value) -> RosterResult<serde_json::Value>,
) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    reply(&req.id, f(store, &req.params))
}
