//! Student and class lifecycle, and the student <-> class association.
//!
//! The class keeps the ordered set of member ids; the student keeps the id of
//! its single class. Every operation here either commits both sides together
//! or returns an error without touching the store.

use tracing::debug;

use crate::error::{RosterError, RosterResult};
use crate::model::{ClassId, SchoolClass, Student, StudentId, StudentStatus};
use crate::store::{Changeset, EntityStore};

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub status: StudentStatus,
    pub class_id: Option<ClassId>,
}

#[derive(Debug, Clone, Default)]
pub struct StudentPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub status: Option<StudentStatus>,
    /// `Some(None)` leaves the current class, `Some(Some(c))` moves to `c`.
    pub class_id: Option<Option<ClassId>>,
}

#[derive(Debug, Clone, Default)]
pub struct ClassPatch {
    pub name: Option<String>,
    pub capacity: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct StudentFilter {
    pub query: Option<String>,
    pub class_id: Option<ClassId>,
    pub status: Option<StudentStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassRemoval {
    pub released_students: usize,
    pub removed_evaluations: usize,
}

pub fn require_text(field: &str, raw: &str) -> RosterResult<String> {
    let v = raw.trim();
    if v.is_empty() {
        return Err(RosterError::validation(field, "must not be empty"));
    }
    Ok(v.to_string())
}

fn require_email(raw: &str) -> RosterResult<String> {
    let email = require_text("email", raw)?;
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !well_formed {
        return Err(RosterError::validation("email", "not a valid e-mail address"));
    }
    Ok(email)
}

fn require_capacity(capacity: u32) -> RosterResult<u32> {
    if capacity == 0 {
        return Err(RosterError::validation("capacity", "must be a positive integer"));
    }
    Ok(capacity)
}

fn position<T>(
    items: &[T],
    found: impl Fn(&T) -> bool,
    entity: &'static str,
    id: impl ToString,
) -> RosterResult<usize> {
    items
        .iter()
        .position(found)
        .ok_or_else(|| RosterError::not_found(entity, id))
}

/// Adds `student_id` to the class at `class_idx`, enforcing capacity.
fn seat(classes: &mut [SchoolClass], class_idx: usize, student_id: StudentId) -> RosterResult<()> {
    let class = &mut classes[class_idx];
    if class.has_member(&student_id) {
        return Ok(());
    }
    if class.is_full() {
        return Err(RosterError::CapacityExceeded {
            class_id: class.id.to_string(),
            capacity: class.capacity,
        });
    }
    class.student_ids.push(student_id);
    Ok(())
}

fn unseat(classes: &mut [SchoolClass], student_id: &StudentId) {
    for class in classes.iter_mut() {
        class.student_ids.retain(|id| id != student_id);
    }
}

pub fn add_student(store: &mut EntityStore, new: NewStudent) -> RosterResult<StudentId> {
    let name = require_text("name", &new.name)?;
    let email = require_email(&new.email)?;

    let id = StudentId::new();
    let mut students = store.students().to_vec();
    let mut changes = Changeset::new();

    if let Some(class_id) = new.class_id {
        let mut classes = store.classes().to_vec();
        let idx = position(&classes, |c| c.id == class_id, "class", class_id)?;
        seat(&mut classes, idx, id)?;
        changes = changes.with(classes);
    }

    students.push(Student {
        id,
        name,
        email,
        status: new.status,
        class_id: new.class_id,
    });
    store.commit(changes.with(students))?;
    debug!(student = %id, "student added");
    Ok(id)
}

/// Edits keep the id. A class change here is an explicit move: the old seat
/// is released and the new one claimed in the same commit.
pub fn edit_student(
    store: &mut EntityStore,
    student_id: &StudentId,
    patch: StudentPatch,
) -> RosterResult<()> {
    let mut students = store.students().to_vec();
    let idx = position(&students, |s| s.id == *student_id, "student", student_id)?;
    let mut changes = Changeset::new();

    {
        let student = &mut students[idx];
        if let Some(name) = &patch.name {
            student.name = require_text("name", name)?;
        }
        if let Some(email) = &patch.email {
            student.email = require_email(email)?;
        }
        if let Some(status) = patch.status {
            student.status = status;
        }
    }

    if let Some(target) = patch.class_id {
        if target != students[idx].class_id {
            let mut classes = store.classes().to_vec();
            unseat(&mut classes, student_id);
            if let Some(class_id) = target {
                let cidx = position(&classes, |c| c.id == class_id, "class", class_id)?;
                seat(&mut classes, cidx, *student_id)?;
            }
            students[idx].class_id = target;
            changes = changes.with(classes);
        }
    }

    store.commit(changes.with(students))
}

pub fn delete_student(store: &mut EntityStore, student_id: &StudentId) -> RosterResult<()> {
    let mut students = store.students().to_vec();
    let idx = position(&students, |s| s.id == *student_id, "student", student_id)?;
    students.remove(idx);

    let mut changes = Changeset::new();
    if store.classes().iter().any(|c| c.has_member(student_id)) {
        let mut classes = store.classes().to_vec();
        unseat(&mut classes, student_id);
        changes = changes.with(classes);
    }
    store.commit(changes.with(students))?;
    debug!(student = %student_id, "student deleted");
    Ok(())
}

pub fn associate(
    store: &mut EntityStore,
    student_id: &StudentId,
    class_id: &ClassId,
) -> RosterResult<()> {
    let mut students = store.students().to_vec();
    let mut classes = store.classes().to_vec();
    let sidx = position(&students, |s| s.id == *student_id, "student", student_id)?;
    let cidx = position(&classes, |c| c.id == *class_id, "class", class_id)?;

    if let Some(current) = students[sidx].class_id {
        return Err(RosterError::AlreadyAssigned {
            student_id: student_id.to_string(),
            class_id: current.to_string(),
        });
    }
    seat(&mut classes, cidx, *student_id)?;
    students[sidx].class_id = Some(*class_id);

    store.commit(Changeset::new().with(students).with(classes))?;
    debug!(student = %student_id, class = %class_id, "associated");
    Ok(())
}

/// Removing a membership that is already gone is a no-op.
pub fn dissociate(
    store: &mut EntityStore,
    student_id: &StudentId,
    class_id: &ClassId,
) -> RosterResult<()> {
    let listed = store.class(class_id)?.has_member(student_id);
    let pointing = store.student(student_id)?.class_id == Some(*class_id);
    if !listed && !pointing {
        return Ok(());
    }

    let mut students = store.students().to_vec();
    let mut classes = store.classes().to_vec();
    if let Some(s) = students.iter_mut().find(|s| s.id == *student_id) {
        if s.class_id == Some(*class_id) {
            s.class_id = None;
        }
    }
    if let Some(c) = classes.iter_mut().find(|c| c.id == *class_id) {
        c.student_ids.retain(|id| id != student_id);
    }

    store.commit(Changeset::new().with(students).with(classes))?;
    debug!(student = %student_id, class = %class_id, "dissociated");
    Ok(())
}

pub fn add_class(store: &mut EntityStore, name: &str, capacity: u32) -> RosterResult<ClassId> {
    let name = require_text("name", name)?;
    let capacity = require_capacity(capacity)?;

    let id = ClassId::new();
    let mut classes = store.classes().to_vec();
    classes.push(SchoolClass {
        id,
        name,
        capacity,
        student_ids: Vec::new(),
    });
    store.replace(classes)?;
    debug!(class = %id, capacity, "class added");
    Ok(id)
}

pub fn rename_or_resize(
    store: &mut EntityStore,
    class_id: &ClassId,
    patch: ClassPatch,
) -> RosterResult<()> {
    let mut classes = store.classes().to_vec();
    let idx = position(&classes, |c| c.id == *class_id, "class", class_id)?;
    let class = &mut classes[idx];

    if let Some(name) = &patch.name {
        class.name = require_text("name", name)?;
    }
    if let Some(capacity) = patch.capacity {
        let capacity = require_capacity(capacity)?;
        if (capacity as usize) < class.occupancy() {
            return Err(RosterError::CapacityBelowOccupancy {
                capacity,
                occupancy: class.occupancy(),
            });
        }
        class.capacity = capacity;
    }

    store.replace(classes)
}

/// Releases every member, drops the class's criteria, then the class itself.
pub fn delete_class(store: &mut EntityStore, class_id: &ClassId) -> RosterResult<ClassRemoval> {
    let mut classes = store.classes().to_vec();
    let idx = position(&classes, |c| c.id == *class_id, "class", class_id)?;
    classes.remove(idx);

    let mut students = store.students().to_vec();
    let mut released = 0;
    for s in students.iter_mut().filter(|s| s.class_id == Some(*class_id)) {
        s.class_id = None;
        released += 1;
    }

    let mut evaluations = store.evaluations().to_vec();
    let before = evaluations.len();
    evaluations.retain(|e| e.class_id != *class_id);
    let removed_evaluations = before - evaluations.len();

    store.commit(
        Changeset::new()
            .with(students)
            .with(classes)
            .with(evaluations),
    )?;
    debug!(class = %class_id, released, removed_evaluations, "class deleted");
    Ok(ClassRemoval {
        released_students: released,
        removed_evaluations,
    })
}

pub fn list_students<'a>(store: &'a EntityStore, filter: &StudentFilter) -> Vec<&'a Student> {
    let query = filter
        .query
        .as_deref()
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());
    store
        .students()
        .iter()
        .filter(|s| match &query {
            Some(q) => s.name.to_lowercase().contains(q.as_str()),
            None => true,
        })
        .filter(|s| filter.class_id.is_none() || s.class_id == filter.class_id)
        .filter(|s| filter.status.map_or(true, |st| s.status == st))
        .collect()
}

/// Member records in the class's own order, looked up from the student collection.
pub fn members<'a>(store: &'a EntityStore, class: &SchoolClass) -> Vec<&'a Student> {
    class
        .student_ids
        .iter()
        .filter_map(|id| store.students().iter().find(|s| s.id == *id))
        .collect()
}
