//! Per-class evaluation weight budget.
//!
//! The sum of a class's criterion weights may never exceed 100. Reaching
//! exactly 100 marks the configuration as complete, which is reported for
//! display only and never blocks edits below 100.
//!
//! Weights are kept to hundredths of a point and budget arithmetic runs on
//! whole hundredths, so sums like 33.3 + 33.3 + 33.4 land on 100 exactly and
//! nothing above 100 is ever admitted.

use serde::Serialize;

use crate::error::{RosterError, RosterResult};
use crate::model::{ClassId, Evaluation, EvaluationId};

pub const WEIGHT_BUDGET: f64 = 100.0;

const BUDGET_HUNDREDTHS: i64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BudgetCheck {
    Accept,
    Reject { current_sum: f64 },
}

impl BudgetCheck {
    pub fn into_result(self, class_id: &ClassId, candidate: f64) -> RosterResult<()> {
        match self {
            Self::Accept => Ok(()),
            Self::Reject { current_sum } => Err(RosterError::WeightBudgetExceeded {
                class_id: class_id.to_string(),
                current_sum,
                candidate,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSummary {
    pub class_id: ClassId,
    pub criteria: usize,
    pub sum: f64,
    pub remaining: f64,
    pub complete: bool,
}

// Saturates for absurd magnitudes; those are rejected by the budget anyway.
fn hundredths(weight: f64) -> i64 {
    (weight * 100.0).round() as i64
}

fn points(hundredths: i64) -> f64 {
    hundredths as f64 / 100.0
}

/// Rounds to hundredths; anything that does not round to a positive value is invalid.
pub fn validate_weight(weight: f64) -> RosterResult<f64> {
    if !weight.is_finite() || hundredths(weight) <= 0 {
        return Err(RosterError::InvalidWeight { weight });
    }
    Ok(points(hundredths(weight)))
}

fn sum_hundredths(
    evaluations: &[Evaluation],
    class_id: &ClassId,
    excluding: Option<&EvaluationId>,
) -> i64 {
    evaluations
        .iter()
        .filter(|e| e.class_id == *class_id)
        .filter(|e| excluding != Some(&e.id))
        .map(|e| hundredths(e.weight))
        .fold(0, i64::saturating_add)
}

pub fn weight_sum(
    evaluations: &[Evaluation],
    class_id: &ClassId,
    excluding: Option<&EvaluationId>,
) -> f64 {
    points(sum_hundredths(evaluations, class_id, excluding))
}

fn check(current: i64, candidate: f64) -> BudgetCheck {
    if current.saturating_add(hundredths(candidate)) <= BUDGET_HUNDREDTHS {
        BudgetCheck::Accept
    } else {
        BudgetCheck::Reject {
            current_sum: points(current),
        }
    }
}

pub fn can_add(
    evaluations: &[Evaluation],
    class_id: &ClassId,
    candidate: f64,
) -> RosterResult<BudgetCheck> {
    let candidate = validate_weight(candidate)?;
    Ok(check(sum_hundredths(evaluations, class_id, None), candidate))
}

/// The criterion being edited never counts against its own new weight.
pub fn can_edit(
    evaluations: &[Evaluation],
    class_id: &ClassId,
    criterion_id: &EvaluationId,
    new_weight: f64,
) -> RosterResult<BudgetCheck> {
    let new_weight = validate_weight(new_weight)?;
    Ok(check(
        sum_hundredths(evaluations, class_id, Some(criterion_id)),
        new_weight,
    ))
}

pub fn is_complete(evaluations: &[Evaluation], class_id: &ClassId) -> bool {
    sum_hundredths(evaluations, class_id, None) == BUDGET_HUNDREDTHS
}

pub fn summary(evaluations: &[Evaluation], class_id: &ClassId) -> BudgetSummary {
    let sum = sum_hundredths(evaluations, class_id, None);
    BudgetSummary {
        class_id: *class_id,
        criteria: evaluations.iter().filter(|e| e.class_id == *class_id).count(),
        sum: points(sum),
        remaining: points((BUDGET_HUNDREDTHS - sum).max(0)),
        complete: sum == BUDGET_HUNDREDTHS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criterion(class_id: ClassId, weight: f64) -> Evaluation {
        Evaluation {
            id: EvaluationId::new(),
            name: format!("w{weight}"),
            weight,
            class_id,
            date: None,
        }
    }

    #[test]
    fn add_rejects_overflow_and_accepts_exact_fill() {
        let class = ClassId::new();
        let evals = vec![criterion(class, 40.0), criterion(class, 30.0)];

        assert_eq!(
            can_add(&evals, &class, 40.0).unwrap(),
            BudgetCheck::Reject { current_sum: 70.0 }
        );
        assert_eq!(can_add(&evals, &class, 30.0).unwrap(), BudgetCheck::Accept);
    }

    #[test]
    fn edit_excludes_the_criterion_itself() {
        let class = ClassId::new();
        let forty = criterion(class, 40.0);
        let forty_id = forty.id;
        let evals = vec![forty, criterion(class, 30.0), criterion(class, 30.0)];

        assert_eq!(
            can_edit(&evals, &class, &forty_id, 50.0).unwrap(),
            BudgetCheck::Reject { current_sum: 60.0 }
        );
        assert_eq!(can_edit(&evals, &class, &forty_id, 20.0).unwrap(), BudgetCheck::Accept);
        assert_eq!(can_edit(&evals, &class, &forty_id, 40.0).unwrap(), BudgetCheck::Accept);
    }

    #[test]
    fn other_classes_do_not_count() {
        let a = ClassId::new();
        let b = ClassId::new();
        let evals = vec![criterion(a, 90.0), criterion(b, 10.0)];
        assert_eq!(can_add(&evals, &b, 90.0).unwrap(), BudgetCheck::Accept);
    }

    #[test]
    fn non_positive_weights_are_invalid() {
        let class = ClassId::new();
        for w in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let err = can_add(&[], &class, w).unwrap_err();
            assert_eq!(err.code(), "invalid_weight");
        }
    }

    #[test]
    fn complete_only_at_exactly_one_hundred() {
        let class = ClassId::new();
        let mut evals = vec![criterion(class, 33.3), criterion(class, 33.3)];
        assert!(!is_complete(&evals, &class));
        evals.push(criterion(class, 33.4));
        assert!(is_complete(&evals, &class));

        let s = summary(&evals, &class);
        assert_eq!(s.criteria, 3);
        assert!(s.complete);
        assert_eq!(s.sum, 100.0);
        assert_eq!(s.remaining, 0.0);
    }

    #[test]
    fn candidates_just_above_the_limit_are_rejected() {
        let class = ClassId::new();
        assert!(matches!(
            can_add(&[], &class, 100.01).unwrap(),
            BudgetCheck::Reject { .. }
        ));

        let evals = vec![criterion(class, 60.0)];
        assert!(matches!(
            can_add(&evals, &class, 40.01).unwrap(),
            BudgetCheck::Reject { .. }
        ));
        assert_eq!(can_add(&evals, &class, 40.0).unwrap(), BudgetCheck::Accept);
    }

    #[test]
    fn weights_are_kept_to_hundredths() {
        assert_eq!(validate_weight(100.0000000005).unwrap(), 100.0);
        assert_eq!(validate_weight(12.346).unwrap(), 12.35);
        assert_eq!(validate_weight(0.004).unwrap_err().code(), "invalid_weight");
    }
}
