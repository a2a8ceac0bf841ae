use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{RosterError, RosterResult};
use crate::model::{ClassId, Evaluation, EvaluationId, SchoolClass, Student, StudentId};
use crate::sync::{BlobStore, PersistenceSync};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Students,
    Classes,
    Evaluations,
}

impl Collection {
    pub fn key(self) -> &'static str {
        match self {
            Self::Students => "students",
            Self::Classes => "classes",
            Self::Evaluations => "evaluations",
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct Collections {
    students: Vec<Student>,
    classes: Vec<SchoolClass>,
    evaluations: Vec<Evaluation>,
}

/// A record type stored as one whole collection.
pub trait Entity: Serialize + DeserializeOwned + Clone {
    const COLLECTION: Collection;

    fn slot(data: &Collections) -> &Vec<Self>;
    fn slot_mut(data: &mut Collections) -> &mut Vec<Self>;
    fn staged(changes: &mut Changeset) -> &mut Option<Vec<Self>>;
}

impl Entity for Student {
    const COLLECTION: Collection = Collection::Students;

    fn slot(data: &Collections) -> &Vec<Self> {
        &data.students
    }
    fn slot_mut(data: &mut Collections) -> &mut Vec<Self> {
        &mut data.students
    }
    fn staged(changes: &mut Changeset) -> &mut Option<Vec<Self>> {
        &mut changes.students
    }
}

impl Entity for SchoolClass {
    const COLLECTION: Collection = Collection::Classes;

    fn slot(data: &Collections) -> &Vec<Self> {
        &data.classes
    }
    fn slot_mut(data: &mut Collections) -> &mut Vec<Self> {
        &mut data.classes
    }
    fn staged(changes: &mut Changeset) -> &mut Option<Vec<Self>> {
        &mut changes.classes
    }
}

impl Entity for Evaluation {
    const COLLECTION: Collection = Collection::Evaluations;

    fn slot(data: &Collections) -> &Vec<Self> {
        &data.evaluations
    }
    fn slot_mut(data: &mut Collections) -> &mut Vec<Self> {
        &mut data.evaluations
    }
    fn staged(changes: &mut Changeset) -> &mut Option<Vec<Self>> {
        &mut changes.evaluations
    }
}

/// Whole-collection replacements applied as one transition.
#[derive(Debug, Default)]
pub struct Changeset {
    students: Option<Vec<Student>>,
    classes: Option<Vec<SchoolClass>>,
    evaluations: Option<Vec<Evaluation>>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: Entity>(mut self, items: Vec<T>) -> Self {
        *T::staged(&mut self) = Some(items);
        self
    }

    fn payloads(&self) -> anyhow::Result<Vec<(Collection, String)>> {
        let mut out = Vec::new();
        if let Some(v) = &self.students {
            out.push(encode(v)?);
        }
        if let Some(v) = &self.classes {
            out.push(encode(v)?);
        }
        if let Some(v) = &self.evaluations {
            out.push(encode(v)?);
        }
        Ok(out)
    }
}

fn encode<T: Entity>(items: &[T]) -> anyhow::Result<(Collection, String)> {
    let payload = serde_json::to_string(items)
        .with_context(|| format!("failed to serialize {}", T::COLLECTION.key()))?;
    Ok((T::COLLECTION, payload))
}

pub struct EntityStore {
    data: Collections,
    sync: PersistenceSync,
}

impl EntityStore {
    /// Empty and not yet loaded; writes stay suppressed until `load` runs.
    pub fn new(backend: impl BlobStore + 'static) -> Self {
        Self {
            data: Collections::default(),
            sync: PersistenceSync::new(Box::new(backend)),
        }
    }

    pub fn open(backend: impl BlobStore + 'static) -> Self {
        let mut store = Self::new(backend);
        store.load();
        store
    }

    pub fn load(&mut self) {
        if self.sync.is_ready() {
            return;
        }
        self.data = Collections {
            students: self.sync.read_collection(Collection::Students),
            classes: self.sync.read_collection(Collection::Classes),
            evaluations: self.sync.read_collection(Collection::Evaluations),
        };
        self.sync.mark_ready();
        info!(
            students = self.data.students.len(),
            classes = self.data.classes.len(),
            evaluations = self.data.evaluations.len(),
            "collections loaded"
        );
    }

    pub fn is_ready(&self) -> bool {
        self.sync.is_ready()
    }

    pub fn get<T: Entity>(&self) -> &[T] {
        T::slot(&self.data)
    }

    pub fn students(&self) -> &[Student] {
        self.get()
    }

    pub fn classes(&self) -> &[SchoolClass] {
        self.get()
    }

    pub fn evaluations(&self) -> &[Evaluation] {
        self.get()
    }

    pub fn student(&self, id: &StudentId) -> RosterResult<&Student> {
        self.data
            .students
            .iter()
            .find(|s| s.id == *id)
            .ok_or_else(|| RosterError::not_found("student", id))
    }

    pub fn class(&self, id: &ClassId) -> RosterResult<&SchoolClass> {
        self.data
            .classes
            .iter()
            .find(|c| c.id == *id)
            .ok_or_else(|| RosterError::not_found("class", id))
    }

    pub fn evaluation(&self, id: &EvaluationId) -> RosterResult<&Evaluation> {
        self.data
            .evaluations
            .iter()
            .find(|e| e.id == *id)
            .ok_or_else(|| RosterError::not_found("evaluation", id))
    }

    pub fn replace<T: Entity>(&mut self, items: Vec<T>) -> RosterResult<()> {
        self.commit(Changeset::new().with(items))
    }

    /// Serialize, write, then swap. If any step fails the in-memory
    /// collections are left exactly as they were. Nothing is accepted
    /// before `load`, since the load would discard it.
    pub fn commit(&mut self, changes: Changeset) -> RosterResult<()> {
        if !self.sync.is_ready() {
            return Err(RosterError::NotReady);
        }
        let payloads = changes.payloads()?;
        self.sync.write_through(&payloads)?;

        let Changeset {
            students,
            classes,
            evaluations,
        } = changes;
        if let Some(v) = students {
            *Student::slot_mut(&mut self.data) = v;
        }
        if let Some(v) = classes {
            *SchoolClass::slot_mut(&mut self.data) = v;
        }
        if let Some(v) = evaluations {
            *Evaluation::slot_mut(&mut self.data) = v;
        }
        debug!(collections = payloads.len(), "commit applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StudentStatus;
    use crate::sync::memory::{FailingBlobs, MemoryBlobs};

    fn student(name: &str) -> Student {
        Student {
            id: StudentId::new(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            status: StudentStatus::Active,
            class_id: None,
        }
    }

    #[test]
    fn replace_then_reload_preserves_order_and_fields() {
        let blobs = MemoryBlobs::default();
        let mut store = EntityStore::open(blobs.clone());
        let mut inactive = student("Bruno");
        inactive.status = StudentStatus::Inactive;
        let items = vec![student("Carla"), inactive, student("Ana")];
        store.replace(items.clone()).unwrap();

        let reloaded = EntityStore::open(blobs);
        assert_eq!(reloaded.students(), items.as_slice());
    }

    #[test]
    fn writes_before_initial_load_are_refused() {
        let durable = format!(
            "[{}]",
            serde_json::to_string(&student("Dora")).unwrap()
        );
        let blobs = MemoryBlobs::default().with_entry("students", &durable);
        let mut store = EntityStore::new(blobs.clone());
        assert!(!store.is_ready());

        let err = store.replace::<Student>(Vec::new()).unwrap_err();
        assert_eq!(err.code(), "not_ready");
        assert!(store.students().is_empty());
        assert_eq!(blobs.raw("students").as_deref(), Some(durable.as_str()));

        store.load();
        assert_eq!(store.students().len(), 1);
        assert_eq!(store.students()[0].name, "Dora");
    }

    #[test]
    fn relationship_changes_before_load_are_refused() {
        let mut store = EntityStore::new(MemoryBlobs::default());
        let err = crate::relations::add_class(&mut store, "10A", 3).unwrap_err();
        assert_eq!(err.code(), "not_ready");

        store.load();
        assert!(store.classes().is_empty());
        crate::relations::add_class(&mut store, "10A", 3).unwrap();
        assert_eq!(store.classes().len(), 1);
    }

    #[test]
    fn load_happens_once() {
        let blobs = MemoryBlobs::default();
        let mut store = EntityStore::open(blobs.clone());
        store.replace(vec![student("Eva")]).unwrap();

        // Someone else rewriting the blob is not picked up by a second load.
        let _ = blobs.clone().with_entry("students", "[]");
        store.load();
        assert_eq!(store.students().len(), 1);
    }

    #[test]
    fn malformed_payload_loads_as_empty() {
        let blobs = MemoryBlobs::default()
            .with_entry("students", "{not json")
            .with_entry("classes", "[{\"id\": 17}]");
        let store = EntityStore::open(blobs);
        assert!(store.is_ready());
        assert!(store.students().is_empty());
        assert!(store.classes().is_empty());
        assert!(store.evaluations().is_empty());
    }

    #[test]
    fn commit_writes_only_touched_collections() {
        let blobs = MemoryBlobs::default();
        let mut store = EntityStore::open(blobs.clone());
        store.replace(vec![student("Fabi")]).unwrap();
        assert!(blobs.raw("students").is_some());
        assert!(blobs.raw("classes").is_none());
        assert!(blobs.raw("evaluations").is_none());
    }

    #[test]
    fn failed_write_leaves_memory_unchanged() {
        let mut store = EntityStore::open(FailingBlobs);
        let err = store.replace(vec![student("Gil")]).unwrap_err();
        assert_eq!(err.code(), "storage_failed");
        assert!(store.students().is_empty());
    }

    #[test]
    fn failed_multi_collection_commits_change_nothing() {
        use crate::relations::{add_class, add_student, associate, delete_class, NewStudent};

        let blobs = MemoryBlobs::default();
        let mut store = EntityStore::open(blobs.clone());
        let class = add_class(&mut store, "10A", 3).unwrap();
        let seated = add_student(
            &mut store,
            NewStudent {
                name: "Hugo".into(),
                email: "hugo@example.com".into(),
                status: StudentStatus::Active,
                class_id: Some(class),
            },
        )
        .unwrap();
        let waiting = add_student(
            &mut store,
            NewStudent {
                name: "Iris".into(),
                email: "iris@example.com".into(),
                status: StudentStatus::Active,
                class_id: None,
            },
        )
        .unwrap();

        let students = store.students().to_vec();
        let classes = store.classes().to_vec();
        let raw_students = blobs.raw("students");
        let raw_classes = blobs.raw("classes");
        blobs.fail_writes();

        let err = associate(&mut store, &waiting, &class).unwrap_err();
        assert_eq!(err.code(), "storage_failed");
        let err = delete_class(&mut store, &class).unwrap_err();
        assert_eq!(err.code(), "storage_failed");

        assert_eq!(store.students(), students.as_slice());
        assert_eq!(store.classes(), classes.as_slice());
        assert!(store.class(&class).unwrap().has_member(&seated));
        assert_eq!(blobs.raw("students"), raw_students);
        assert_eq!(blobs.raw("classes"), raw_classes);
    }

    #[test]
    fn lookups_report_not_found() {
        let store = EntityStore::open(MemoryBlobs::default());
        let err = store.class(&ClassId::new()).unwrap_err();
        assert_eq!(err.code(), "not_found");
    }
}
