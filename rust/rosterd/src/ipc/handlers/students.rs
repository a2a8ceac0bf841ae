use serde_json::{json, Value};

use super::with_store;
use crate::error::RosterResult;
use crate::ipc::helpers::{opt_id, opt_status, opt_str, patch_id, req_id, req_str};
use crate::ipc::types::{AppState, Request};
use crate::model::{ClassId, StudentId};
use crate::relations::{self, NewStudent, StudentFilter, StudentPatch};
use crate::store::EntityStore;

fn students_list(store: &mut EntityStore, params: &Value) -> RosterResult<Value> {
    let filter = StudentFilter {
        query: opt_str(params, "query")?.map(str::to_string),
        class_id: opt_id(params, "classId", ClassId::parse)?,
        status: opt_status(params, "status")?,
    };
    let students = relations::list_students(store, &filter);
    Ok(json!({ "students": students }))
}

fn students_create(store: &mut EntityStore, params: &Value) -> RosterResult<Value> {
    let new = NewStudent {
        name: req_str(params, "name")?.to_string(),
        email: req_str(params, "email")?.to_string(),
        status: opt_status(params, "status")?.unwrap_or_default(),
        class_id: opt_id(params, "classId", ClassId::parse)?,
    };
    let id = relations::add_student(store, new)?;
    Ok(json!({ "student": store.student(&id)? }))
}

fn students_update(store: &mut EntityStore, params: &Value) -> RosterResult<Value> {
    let id = req_id(params, "studentId", StudentId::parse)?;
    let patch = StudentPatch {
        name: opt_str(params, "name")?.map(str::to_string),
        email: opt_str(params, "email")?.map(str::to_string),
        status: opt_status(params, "status")?,
        class_id: patch_id(params, "classId", ClassId::parse)?.into_option(),
    };
    relations::edit_student(store, &id, patch)?;
    Ok(json!({ "student": store.student(&id)? }))
}

fn students_delete(store: &mut EntityStore, params: &Value) -> RosterResult<Value> {
    let id = req_id(params, "studentId", StudentId::parse)?;
    relations::delete_student(store, &id)?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "students.list" => Some(with_store(state, req, students_list)),
        "students.create" => Some(with_store(state, req, students_create)),
        "students.update" => Some(with_store(state, req, students_update)),
        "students.delete" => Some(with_store(state, req, students_delete)),
        _ => None,
    }
}
