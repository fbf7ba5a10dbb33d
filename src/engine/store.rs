use std::fmt::Debug;
use std::hash::Hash;

use dashmap::DashMap;
use ulid::Ulid;

use crate::model::*;

use super::EngineError;

/// A record type held in its own [`Table`], with one declared unique key.
pub trait Record: Clone + Send + Sync + 'static {
    type Key: Eq + Hash + Clone + Debug + Send + Sync + 'static;

    const KIND: EntityKind;
    /// Field name reported when the unique key collides.
    const UNIQUE_FIELD: &'static str;

    fn id(&self) -> Ulid;
    fn unique_key(&self) -> Self::Key;

    /// Unique key as shown in duplicate errors.
    fn key_text(&self) -> String {
        format!("{:?}", self.unique_key())
    }
}

impl Record for Lab {
    type Key = String;
    const KIND: EntityKind = EntityKind::Lab;
    const UNIQUE_FIELD: &'static str = "code";

    fn id(&self) -> Ulid {
        self.id
    }
    fn unique_key(&self) -> String {
        self.code.clone()
    }
    fn key_text(&self) -> String {
        self.code.clone()
    }
}

impl Record for Faculty {
    type Key = String;
    const KIND: EntityKind = EntityKind::Faculty;
    const UNIQUE_FIELD: &'static str = "name";

    fn id(&self) -> Ulid {
        self.id
    }
    fn unique_key(&self) -> String {
        self.name.clone()
    }
    fn key_text(&self) -> String {
        self.name.clone()
    }
}

impl Record for Book {
    type Key = String;
    const KIND: EntityKind = EntityKind::Book;
    const UNIQUE_FIELD: &'static str = "title";

    fn id(&self) -> Ulid {
        self.id
    }
    fn unique_key(&self) -> String {
        self.title.clone()
    }
    fn key_text(&self) -> String {
        self.title.clone()
    }
}

impl Record for Batch {
    type Key = String;
    const KIND: EntityKind = EntityKind::Batch;
    const UNIQUE_FIELD: &'static str = "code";

    fn id(&self) -> Ulid {
        self.id
    }
    fn unique_key(&self) -> String {
        self.code.clone()
    }
    fn key_text(&self) -> String {
        self.code.clone()
    }
}

impl Record for TimeSlot {
    type Key = i64;
    const KIND: EntityKind = EntityKind::TimeSlot;
    const UNIQUE_FIELD: &'static str = "orderIndex";

    fn id(&self) -> Ulid {
        self.id
    }
    fn unique_key(&self) -> i64 {
        self.order_index
    }
}

/// The exact (lab, time slot, day pattern) triple. Semantic day overlap is
/// checked separately by the conflict checker.
impl Record for Allocation {
    type Key = (Ulid, Ulid, DayPattern);
    const KIND: EntityKind = EntityKind::Allocation;
    const UNIQUE_FIELD: &'static str = "(lab, timeSlot, dayPattern)";

    fn id(&self) -> Ulid {
        self.id
    }
    fn unique_key(&self) -> Self::Key {
        (self.lab_id, self.time_slot_id, self.day_pattern)
    }
    fn key_text(&self) -> String {
        format!("({}, {}, {})", self.lab_id, self.time_slot_id, self.day_pattern)
    }
}

/// Key-indexed collection of one record type plus its unique index.
pub struct Table<T: Record> {
    records: DashMap<Ulid, T>,
    unique: DashMap<T::Key, Ulid>,
}

impl<T: Record> Default for Table<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> Table<T> {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            unique: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &Ulid) -> bool {
        self.records.contains_key(id)
    }

    pub fn get(&self, id: &Ulid) -> Option<T> {
        self.records.get(id).map(|e| e.value().clone())
    }

    pub fn require(&self, id: &Ulid) -> Result<T, EngineError> {
        self.get(id).ok_or(EngineError::NotFound { kind: T::KIND, id: *id })
    }

    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.records
            .iter()
            .filter(|e| pred(e.value()))
            .map(|e| e.value().clone())
            .collect()
    }

    pub fn all(&self) -> Vec<T> {
        self.find(|_| true)
    }

    /// Id of the record currently owning `key`.
    pub fn owner_of(&self, key: &T::Key) -> Option<Ulid> {
        self.unique.get(key).map(|e| *e.value())
    }

    /// Fails if the record's unique key belongs to a different record.
    pub fn ensure_unique(&self, record: &T) -> Result<(), EngineError> {
        match self.owner_of(&record.unique_key()) {
            Some(owner) if owner != record.id() => Err(EngineError::Duplicate {
                kind: T::KIND,
                field: T::UNIQUE_FIELD,
                value: record.key_text(),
            }),
            _ => Ok(()),
        }
    }

    /// Insert or fully replace a record, keeping the unique index in step.
    pub fn put(&self, record: T) {
        let id = record.id();
        let key = record.unique_key();
        if let Some(old) = self.records.insert(id, record) {
            let old_key = old.unique_key();
            if old_key != key {
                self.unique.remove_if(&old_key, |_, owner| *owner == id);
            }
        }
        self.unique.insert(key, id);
    }

    pub fn remove(&self, id: &Ulid) -> Option<T> {
        let (_, old) = self.records.remove(id)?;
        self.unique.remove_if(&old.unique_key(), |_, owner| owner == id);
        Some(old)
    }
}

/// All collections of the lab-allocation graph.
#[derive(Default)]
pub struct Store {
    pub labs: Table<Lab>,
    pub faculties: Table<Faculty>,
    pub books: Table<Book>,
    pub batches: Table<Batch>,
    pub time_slots: Table<TimeSlot>,
    pub allocations: Table<Allocation>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, kind: EntityKind, id: &Ulid) -> bool {
        match kind {
            EntityKind::Lab => self.labs.contains(id),
            EntityKind::Faculty => self.faculties.contains(id),
            EntityKind::Book => self.books.contains(id),
            EntityKind::Batch => self.batches.contains(id),
            EntityKind::TimeSlot => self.time_slots.contains(id),
            EntityKind::Allocation => self.allocations.contains(id),
        }
    }

    /// Apply a logged event. Replay and live writes share this path; references
    /// are validated before the event is logged, never here.
    pub fn apply(&self, event: &Event) {
        match event {
            Event::LabSaved(lab) => self.labs.put(lab.clone()),
            Event::LabDeleted { id } => {
                self.labs.remove(id);
            }
            Event::FacultySaved(faculty) => self.faculties.put(faculty.clone()),
            Event::FacultyDeleted { id } => {
                self.faculties.remove(id);
            }
            Event::BookSaved(book) => self.books.put(book.clone()),
            Event::BookDeleted { id } => {
                self.books.remove(id);
            }
            Event::BatchSaved(batch) => self.batches.put(batch.clone()),
            Event::BatchDeleted { id } => {
                self.batches.remove(id);
            }
            Event::TimeSlotSaved(slot) => self.time_slots.put(slot.clone()),
            Event::TimeSlotDeleted { id } => {
                self.time_slots.remove(id);
            }
            Event::AllocationSaved(allocation) => self.allocations.put(allocation.clone()),
            Event::AllocationDeleted { id } => {
                self.allocations.remove(id);
            }
        }
    }

    /// Minimal event list that recreates the current state, referenced
    /// collections first, each sorted by id.
    pub fn snapshot(&self) -> Vec<Event> {
        fn sorted<T: Record>(table: &Table<T>) -> Vec<T> {
            let mut all = table.all();
            all.sort_by_key(|r| r.id());
            all
        }

        let mut events = Vec::new();
        events.extend(sorted(&self.faculties).into_iter().map(Event::FacultySaved));
        events.extend(sorted(&self.books).into_iter().map(Event::BookSaved));
        events.extend(sorted(&self.labs).into_iter().map(Event::LabSaved));
        events.extend(sorted(&self.time_slots).into_iter().map(Event::TimeSlotSaved));
        events.extend(sorted(&self.batches).into_iter().map(Event::BatchSaved));
        events.extend(sorted(&self.allocations).into_iter().map(Event::AllocationSaved));
        events
    }
}
