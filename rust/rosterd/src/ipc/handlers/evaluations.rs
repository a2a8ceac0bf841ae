use serde_json::{json, Value};

use super::with_store;
use crate::budget;
use crate::error::RosterResult;
use crate::evaluations::{self, EvaluationPatch, NewEvaluation};
use crate::ipc::helpers::{
    opt_date, opt_id, opt_number, opt_str, patch_date, req_id, req_number, req_str,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{ClassId, EvaluationId};
use crate::store::EntityStore;

fn evaluations_list(store: &mut EntityStore, params: &Value) -> RosterResult<Value> {
    let store = &*store;
    let class_id = opt_id(params, "classId", ClassId::parse)?;
    if let Some(id) = &class_id {
        store.class(id)?;
    }
    let budgets: Vec<budget::BudgetSummary> = store
        .classes()
        .iter()
        .filter(|c| class_id.map_or(true, |id| c.id == id))
        .map(|c| budget::summary(store.evaluations(), &c.id))
        .collect();
    Ok(json!({
        "evaluations": evaluations::list_evaluations(store, class_id.as_ref()),
        "budgets": budgets,
    }))
}

fn evaluations_create(store: &mut EntityStore, params: &Value) -> RosterResult<Value> {
    let new = NewEvaluation {
        class_id: req_id(params, "classId", ClassId::parse)?,
        name: req_str(params, "name")?.to_string(),
        weight: req_number(params, "weight")?,
        date: opt_date(params, "date")?,
    };
    let class_id = new.class_id;
    let id = evaluations::add_evaluation(store, new)?;
    let store = &*store;
    Ok(json!({
        "evaluation": store.evaluation(&id)?,
        "budget": budget::summary(store.evaluations(), &class_id),
    }))
}

fn evaluations_update(store: &mut EntityStore, params: &Value) -> RosterResult<Value> {
    let id = req_id(params, "evaluationId", EvaluationId::parse)?;
    let patch = EvaluationPatch {
        name: opt_str(params, "name")?.map(str::to_string),
        weight: opt_number(params, "weight")?,
        date: patch_date(params, "date")?.into_option(),
        class_id: opt_id(params, "classId", ClassId::parse)?,
    };
    evaluations::edit_evaluation(store, &id, patch)?;
    let store = &*store;
    let evaluation = store.evaluation(&id)?;
    Ok(json!({
        "evaluation": evaluation,
        "budget": budget::summary(store.evaluations(), &evaluation.class_id),
    }))
}

fn evaluations_delete(store: &mut EntityStore, params: &Value) -> RosterResult<Value> {
    let id = req_id(params, "evaluationId", EvaluationId::parse)?;
    evaluations::delete_evaluation(store, &id)?;
    Ok(json!({ "ok": true }))
}

fn evaluations_budget(store: &mut EntityStore, params: &Value) -> RosterResult<Value> {
    let id = req_id(params, "classId", ClassId::parse)?;
    store.class(&id)?;
    Ok(json!({ "budget": budget::summary(store.evaluations(), &id) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "evaluations.list" => Some(with_store(state, req, evaluations_list)),
        "evaluations.create" => Some(with_store(state, req, evaluations_create)),
        "evaluations.update" => Some(with_store(state, req, evaluations_update)),
        "evaluations.delete" => Some(with_store(state, req, evaluations_delete)),
        "evaluations.budget" => Some(with_store(state, req, evaluations_budget)),
        _ => None,
    }
}
