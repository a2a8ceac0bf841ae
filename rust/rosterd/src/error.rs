use serde_json::json;
use thiserror::Error;

/// Reasons a roster operation is refused. None of these leave a partial
/// mutation behind; the store is unchanged whenever one is returned.
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("class {class_id} is full ({capacity} seats)")]
    CapacityExceeded { class_id: String, capacity: u32 },

    #[error("student {student_id} already belongs to class {class_id}")]
    AlreadyAssigned {
        student_id: String,
        class_id: String,
    },

    #[error("weights for class {class_id} would exceed 100 (current: {current_sum})")]
    WeightBudgetExceeded {
        class_id: String,
        current_sum: f64,
        candidate: f64,
    },

    #[error("weight must be a positive number, got {weight}")]
    InvalidWeight { weight: f64 },

    #[error("capacity {capacity} is below current occupancy {occupancy}")]
    CapacityBelowOccupancy { capacity: u32, occupancy: usize },

    #[error("collections are not loaded yet")]
    NotReady,

    #[error("storage write failed: {0:#}")]
    Storage(#[from] anyhow::Error),
}

pub type RosterResult<T> = Result<T, RosterError>;

impl RosterError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::NotFound { .. } => "not_found",
            Self::CapacityExceeded { .. } => "capacity_exceeded",
            Self::AlreadyAssigned { .. } => "already_assigned",
            Self::WeightBudgetExceeded { .. } => "weight_budget_exceeded",
            Self::InvalidWeight { .. } => "invalid_weight",
            Self::CapacityBelowOccupancy { .. } => "capacity_below_occupancy",
            Self::NotReady => "not_ready",
            Self::Storage(_) => "storage_failed",
        }
    }

    /// Structured reason for the caller to render.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Validation { field, .. } => Some(json!({ "field": field })),
            Self::NotFound { entity, id } => Some(json!({ "entity": entity, "id": id })),
            Self::CapacityExceeded { class_id, capacity } => {
                Some(json!({ "classId": class_id, "capacity": capacity }))
            }
            Self::AlreadyAssigned {
                student_id,
                class_id,
            } => Some(json!({ "studentId": student_id, "classId": class_id })),
            Self::WeightBudgetExceeded {
                class_id,
                current_sum,
                candidate,
            } => Some(json!({
                "classId": class_id,
                "currentSum": current_sum,
                "candidate": candidate,
            })),
            Self::InvalidWeight { weight } => Some(json!({ "weight": weight })),
            Self::CapacityBelowOccupancy {
                capacity,
                occupancy,
            } => Some(json!({ "capacity": capacity, "occupancy": occupancy })),
            Self::NotReady | Self::Storage(_) => None,
        }
    }
}
