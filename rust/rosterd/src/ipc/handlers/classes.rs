use serde_json::{json, Value};

use super::with_store;
use crate::budget;
use crate::error::RosterResult;
use crate::evaluations;
use crate::ipc::helpers::{opt_count, opt_str, req_count, req_id, req_str};
use crate::ipc::types::{AppState, Request};
use crate::model::{ClassId, SchoolClass, StudentId};
use crate::relations::{self, ClassPatch};
use crate::store::EntityStore;

/// Class record plus the counts the list view shows.
fn class_view(store: &EntityStore, class: &SchoolClass) -> Value {
    let b = budget::summary(store.evaluations(), &class.id);
    json!({
        "id": class.id,
        "name": class.name,
        "capacity": class.capacity,
        "studentIds": class.student_ids,
        "studentCount": class.occupancy(),
        "weightSum": b.sum,
        "budgetComplete": b.complete,
    })
}

fn classes_list(store: &mut EntityStore, _params: &Value) -> RosterResult<Value> {
    let store = &*store;
    let classes: Vec<Value> = store
        .classes()
        .iter()
        .map(|c| class_view(store, c))
        .collect();
    Ok(json!({ "classes": classes }))
}

fn classes_get(store: &mut EntityStore, params: &Value) -> RosterResult<Value> {
    let store = &*store;
    let id = req_id(params, "classId", ClassId::parse)?;
    let class = store.class(&id)?;
    Ok(json!({
        "class": class_view(store, class),
        "students": relations::members(store, class),
        "evaluations": evaluations::list_evaluations(store, Some(&id)),
        "budget": budget::summary(store.evaluations(), &id),
    }))
}

fn classes_create(store: &mut EntityStore, params: &Value) -> RosterResult<Value> {
    let name = req_str(params, "name")?;
    let capacity = req_count(params, "capacity")?;
    let id = relations::add_class(store, name, capacity)?;
    let store = &*store;
    Ok(json!({ "class": class_view(store, store.class(&id)?) }))
}

fn classes_update(store: &mut EntityStore, params: &Value) -> RosterResult<Value> {
    let id = req_id(params, "classId", ClassId::parse)?;
    let patch = ClassPatch {
        name: opt_str(params, "name")?.map(str::to_string),
        capacity: opt_count(params, "capacity")?,
    };
    relations::rename_or_resize(store, &id, patch)?;
    let store = &*store;
    Ok(json!({ "class": class_view(store, store.class(&id)?) }))
}

fn classes_delete(store: &mut EntityStore, params: &Value) -> RosterResult<Value> {
    let id = req_id(params, "classId", ClassId::parse)?;
    let removal = relations::delete_class(store, &id)?;
    Ok(json!({
        "releasedStudents": removal.released_students,
        "removedEvaluations": removal.removed_evaluations,
    }))
}

fn membership_view(
    store: &EntityStore,
    class_id: &ClassId,
    student_id: &StudentId,
) -> RosterResult<Value> {
    Ok(json!({
        "class": class_view(store, store.class(class_id)?),
        "student": store.student(student_id)?,
    }))
}

fn classes_associate(store: &mut EntityStore, params: &Value) -> RosterResult<Value> {
    let class_id = req_id(params, "classId", ClassId::parse)?;
    let student_id = req_id(params, "studentId", StudentId::parse)?;
    relations::associate(store, &student_id, &class_id)?;
    membership_view(store, &class_id, &student_id)
}

fn classes_dissociate(store: &mut EntityStore, params: &Value) -> RosterResult<Value> {
    let class_id = req_id(params, "classId", ClassId::parse)?;
    let student_id = req_id(params, "studentId", StudentId::parse)?;
    relations::dissociate(store, &student_id, &class_id)?;
    membership_view(store, &class_id, &student_id)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "classes.list" => Some(with_store(state, req, classes_list)),
        "classes.get" => Some(with_store(state, req, classes_get)),
        "classes.create" => Some(with_store(state, req, classes_create)),
        "classes.update" => Some(with_store(state, req, classes_update)),
        "classes.delete" => Some(with_store(state, req, classes_delete)),
        "classes.associate" => Some(with_store(state, req, classes_associate)),
        "classes.dissociate" => Some(with_store(state, req, classes_dissociate)),
        _ => None,
    }
}
