use chrono::Local;
use serde_json::{json, Value};

use super::with_store;
use crate::budget;
use crate::error::RosterResult;
use crate::evaluations;
use crate::ipc::helpers::{opt_count, opt_date};
use crate::ipc::types::{AppState, Request};
use crate::model::StudentStatus;
use crate::store::EntityStore;

const DEFAULT_UPCOMING: u32 = 5;

fn dashboard_summary(store: &mut EntityStore, params: &Value) -> RosterResult<Value> {
    let store = &*store;
    let today = opt_date(params, "today")?.unwrap_or_else(|| Local::now().date_naive());
    let limit = opt_count(params, "limit")?.unwrap_or(DEFAULT_UPCOMING) as usize;

    let upcoming: Vec<Value> = evaluations::upcoming(store, today, limit)
        .into_iter()
        .map(|e| {
            json!({
                "id": e.id,
                "name": e.name,
                "date": e.date,
                "weight": e.weight,
                "classId": e.class_id,
                "className": store.class(&e.class_id).map(|c| c.name.clone()).ok(),
            })
        })
        .collect();

    let classes = store.classes();
    Ok(json!({
        "totals": {
            "students": store.students().len(),
            "activeStudents": store
                .students()
                .iter()
                .filter(|s| s.status == StudentStatus::Active)
                .count(),
            "unassignedStudents": store.students().iter().filter(|s| s.class_id.is_none()).count(),
            "classes": classes.len(),
            "seats": classes.iter().map(|c| c.capacity as u64).sum::<u64>(),
            "seatsTaken": classes.iter().map(|c| c.occupancy()).sum::<usize>(),
            "evaluations": store.evaluations().len(),
            "incompleteBudgets": classes
                .iter()
                .filter(|c| !budget::is_complete(store.evaluations(), &c.id))
                .count(),
        },
        "today": today,
        "upcoming": upcoming,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "dashboard.summary" => Some(with_store(state, req, dashboard_summary)),
        _ => None,
    }
}
