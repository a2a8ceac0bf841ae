use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::RosterError;

macro_rules! entity_id {
    ($name:ident, $entity:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Only canonical UUID strings are accepted; numbers or names are not ids.
            pub fn parse(field: &str, raw: &str) -> Result<Self, RosterError> {
                Uuid::parse_str(raw.trim()).map(Self).map_err(|_| {
                    RosterError::validation(field, format!("not a valid {} id: {:?}", $entity, raw))
                })
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

entity_id!(StudentId, "student");
entity_id!(ClassId, "class");
entity_id!(EvaluationId, "evaluation");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StudentStatus {
    #[default]
    Active,
    Inactive,
}

impl StudentStatus {
    pub fn parse(raw: &str) -> Result<Self, RosterError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            _ => Err(RosterError::validation(
                "status",
                format!("expected Active or Inactive, got {:?}", raw),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub status: StudentStatus,
    #[serde(default)]
    pub class_id: Option<ClassId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolClass {
    pub id: ClassId,
    pub name: String,
    pub capacity: u32,
    #[serde(default)]
    pub student_ids: Vec<StudentId>,
}

impl SchoolClass {
    pub fn occupancy(&self) -> usize {
        self.student_ids.len()
    }

    pub fn is_full(&self) -> bool {
        self.occupancy() >= self.capacity as usize
    }

    pub fn has_member(&self, student_id: &StudentId) -> bool {
        self.student_ids.contains(student_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub id: EvaluationId,
    pub name: String,
    pub weight: f64,
    pub class_id: ClassId,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}
