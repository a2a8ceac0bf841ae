use chrono::NaiveDate;
use tracing::debug;

use crate::budget;
use crate::error::RosterResult;
use crate::model::{ClassId, Evaluation, EvaluationId};
use crate::relations::require_text;
use crate::store::EntityStore;

#[derive(Debug, Clone)]
pub struct NewEvaluation {
    pub class_id: ClassId,
    pub name: String,
    pub weight: f64,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
pub struct EvaluationPatch {
    pub name: Option<String>,
    pub weight: Option<f64>,
    /// `Some(None)` clears the date.
    pub date: Option<Option<NaiveDate>>,
    pub class_id: Option<ClassId>,
}

pub fn add_evaluation(store: &mut EntityStore, new: NewEvaluation) -> RosterResult<EvaluationId> {
    let name = require_text("name", &new.name)?;
    let weight = budget::validate_weight(new.weight)?;
    store.class(&new.class_id)?;
    budget::can_add(store.evaluations(), &new.class_id, weight)?
        .into_result(&new.class_id, weight)?;

    let id = EvaluationId::new();
    let mut evaluations = store.evaluations().to_vec();
    evaluations.push(Evaluation {
        id,
        name,
        weight,
        class_id: new.class_id,
        date: new.date,
    });
    store.replace(evaluations)?;
    debug!(evaluation = %id, class = %new.class_id, weight, "evaluation added");
    Ok(id)
}

/// Moving a criterion to another class is checked against the target's
/// budget as if it were being added there.
pub fn edit_evaluation(
    store: &mut EntityStore,
    evaluation_id: &EvaluationId,
    patch: EvaluationPatch,
) -> RosterResult<()> {
    let current = store.evaluation(evaluation_id)?.clone();
    let target_class = patch.class_id.unwrap_or(current.class_id);
    let weight = match patch.weight {
        Some(w) => budget::validate_weight(w)?,
        None => current.weight,
    };

    let name = match &patch.name {
        Some(n) => require_text("name", n)?,
        None => current.name.clone(),
    };
    if target_class != current.class_id {
        store.class(&target_class)?;
    }
    // Unchanged weight in an unchanged class needs no budget check; stored
    // data written before a stricter rule may already sit at the limit.
    if target_class != current.class_id || patch.weight.is_some() {
        budget::can_edit(store.evaluations(), &target_class, evaluation_id, weight)?
            .into_result(&target_class, weight)?;
    }

    let mut evaluations = store.evaluations().to_vec();
    if let Some(e) = evaluations.iter_mut().find(|e| e.id == *evaluation_id) {
        e.name = name;
        e.weight = weight;
        e.class_id = target_class;
        if let Some(date) = patch.date {
            e.date = date;
        }
    }
    store.replace(evaluations)
}

pub fn delete_evaluation(store: &mut EntityStore, evaluation_id: &EvaluationId) -> RosterResult<()> {
    store.evaluation(evaluation_id)?;
    let mut evaluations = store.evaluations().to_vec();
    evaluations.retain(|e| e.id != *evaluation_id);
    store.replace(evaluations)
}

pub fn list_evaluations<'a>(
    store: &'a EntityStore,
    class_id: Option<&ClassId>,
) -> Vec<&'a Evaluation> {
    store
        .evaluations()
        .iter()
        .filter(|e| class_id.map_or(true, |c| e.class_id == *c))
        .collect()
}

/// Dated criteria on or after `from`, soonest first.
pub fn upcoming<'a>(store: &'a EntityStore, from: NaiveDate, limit: usize) -> Vec<&'a Evaluation> {
    let mut dated: Vec<&Evaluation> = store
        .evaluations()
        .iter()
        .filter(|e| e.date.is_some_and(|d| d >= from))
        .collect();
    dated.sort_by_key(|e| e.date);
    dated.truncate(limit);
    dated
}
