use ulid::Ulid;

use crate::model::*;

use super::availability::faculty_availability;
use super::dependents;
use super::{Engine, EngineError};

impl Engine {
    pub fn get_lab(&self, id: Ulid) -> Result<Lab, EngineError> {
        self.store.labs.require(&id)
    }

    pub fn get_faculty(&self, id: Ulid) -> Result<Faculty, EngineError> {
        self.store.faculties.require(&id)
    }

    pub fn get_book(&self, id: Ulid) -> Result<Book, EngineError> {
        self.store.books.require(&id)
    }

    pub fn get_batch(&self, id: Ulid) -> Result<Batch, EngineError> {
        self.store.batches.require(&id)
    }

    pub fn get_time_slot(&self, id: Ulid) -> Result<TimeSlot, EngineError> {
        self.store.time_slots.require(&id)
    }

    pub fn get_allocation(&self, id: Ulid) -> Result<Allocation, EngineError> {
        self.store.allocations.require(&id)
    }

    /// Ordered by code.
    pub fn list_labs(&self) -> Vec<Lab> {
        let mut labs = self.store.labs.all();
        labs.sort_by(|a, b| a.code.cmp(&b.code));
        labs
    }

    /// Ordered by name.
    pub fn list_faculties(&self) -> Vec<Faculty> {
        let mut faculties = self.store.faculties.all();
        faculties.sort_by(|a, b| a.name.cmp(&b.name));
        faculties
    }

    /// Ordered by title.
    pub fn list_books(&self) -> Vec<Book> {
        let mut books = self.store.books.all();
        books.sort_by(|a, b| a.title.cmp(&b.title));
        books
    }

    /// Ordered by code.
    pub fn list_batches(&self) -> Vec<Batch> {
        let mut batches = self.store.batches.all();
        batches.sort_by(|a, b| a.code.cmp(&b.code));
        batches
    }

    /// Ordered by `order_index`.
    pub fn list_time_slots(&self) -> Vec<TimeSlot> {
        let mut slots = self.store.time_slots.all();
        slots.sort_by_key(|s| s.order_index);
        slots
    }

    /// Ordered by id, which is creation order for engine-minted ids.
    pub fn list_allocations(&self) -> Vec<Allocation> {
        let mut allocations = self.store.allocations.all();
        allocations.sort_by_key(|a| a.id);
        allocations
    }

    pub fn allocations_for_lab(&self, lab_id: Ulid) -> Vec<Allocation> {
        let mut allocations = self.store.allocations.find(|a| a.lab_id == lab_id);
        allocations.sort_by_key(|a| a.id);
        allocations
    }

    pub fn allocations_for_batch(&self, batch_id: Ulid) -> Vec<Allocation> {
        let mut allocations = self.store.allocations.find(|a| a.batch_id == batch_id);
        allocations.sort_by_key(|a| a.id);
        allocations
    }

    fn view(&self, a: Allocation) -> AllocationView {
        AllocationView {
            id: a.id,
            day_pattern: a.day_pattern,
            lab: self.store.labs.get(&a.lab_id),
            batch: self.store.batches.get(&a.batch_id),
            time_slot: self.store.time_slots.get(&a.time_slot_id),
        }
    }

    /// Allocation with its lab, batch and time slot looked up.
    pub fn allocation_view(&self, id: Ulid) -> Result<AllocationView, EngineError> {
        self.get_allocation(id).map(|a| self.view(a))
    }

    pub fn allocation_views(&self) -> Vec<AllocationView> {
        self.list_allocations().into_iter().map(|a| self.view(a)).collect()
    }

    /// Everything that would block deleting `(kind, id)`.
    pub fn check_dependents(&self, kind: EntityKind, id: Ulid) -> Result<DependencyReport, EngineError> {
        if !self.store.contains(kind, &id) {
            return Err(EngineError::NotFound { kind, id });
        }
        Ok(dependents::scan(&self.store, kind, id))
    }

    /// Free/busy report for every time slot, faculties ordered by name.
    pub fn faculty_availability(&self) -> Vec<SlotAvailability> {
        let faculties = self.list_faculties();
        let slots = self.store.time_slots.all();
        let allocations = self.store.allocations.all();
        faculty_availability(&faculties, &slots, &allocations, |batch_id| {
            self.store.batches.get(batch_id).map(|b| b.faculty_id)
        })
    }

    /// Free/busy report for one time slot.
    pub fn slot_availability(&self, time_slot_id: Ulid) -> Result<SlotAvailability, EngineError> {
        let slot = self.store.time_slots.require(&time_slot_id)?;
        let faculties = self.list_faculties();
        let allocations = self
            .store
            .allocations
            .find(|a| a.time_slot_id == time_slot_id);
        let mut reports = faculty_availability(&faculties, &[slot], &allocations, |batch_id| {
            self.store.batches.get(batch_id).map(|b| b.faculty_id)
        });
        reports
            .pop()
            .ok_or(EngineError::NotFound { kind: EntityKind::TimeSlot, id: time_slot_id })
    }
}
