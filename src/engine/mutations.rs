use tracing::{info, warn};
use ulid::Ulid;

use crate::model::*;
use crate::observability;

use super::conflict::check_no_conflict;
use super::dependents;
use super::error::DependencyConflict;
use super::validate::{lab_capacity, optional_text, required_text, slot_times};
use super::{reference, timed, Engine, EngineError};

// ── Normalisation ────────────────────────────────────────────────

fn normalize_lab(lab: Lab) -> Result<Lab, EngineError> {
    Ok(Lab {
        id: lab.id,
        code: required_text("code", &lab.code)?.to_uppercase(),
        capacity: lab_capacity(lab.capacity)?,
        location: optional_text("location", lab.location.as_deref())?,
    })
}

fn normalize_faculty(faculty: Faculty) -> Result<Faculty, EngineError> {
    Ok(Faculty {
        id: faculty.id,
        name: required_text("name", &faculty.name)?,
    })
}

fn normalize_book(book: Book) -> Result<Book, EngineError> {
    Ok(Book {
        id: book.id,
        title: required_text("title", &book.title)?,
        isbn: optional_text("isbn", book.isbn.as_deref())?,
        author: optional_text("author", book.author.as_deref())?,
        edition: optional_text("edition", book.edition.as_deref())?,
    })
}

fn normalize_batch(batch: Batch) -> Result<Batch, EngineError> {
    Ok(Batch {
        code: required_text("code", &batch.code)?,
        current_semester: required_text("currentSemester", &batch.current_semester)?,
        ..batch
    })
}

fn normalize_time_slot(slot: TimeSlot) -> Result<TimeSlot, EngineError> {
    let (start_time, end_time) = slot_times(&slot.start_time, &slot.end_time)?;
    Ok(TimeSlot {
        id: slot.id,
        start_time,
        end_time,
        label: optional_text("label", slot.label.as_deref())?,
        order_index: slot.order_index,
    })
}

impl Engine {
    // ── Labs ─────────────────────────────────────────────────

    pub async fn create_lab(&self, lab: Lab) -> Result<Lab, EngineError> {
        timed("create_lab", async {
            let lab = normalize_lab(lab)?;
            let mut wal = self.write_gate().await;
            self.admit_new(&self.store.labs, &lab)?;
            self.commit(&mut wal, Event::LabSaved(lab.clone()))?;
            info!(id = %lab.id, code = %lab.code, "lab created");
            Ok(lab)
        })
        .await
    }

    pub async fn update_lab(&self, id: Ulid, patch: LabPatch) -> Result<Lab, EngineError> {
        timed("update_lab", async {
            let mut wal = self.write_gate().await;
            let current = self.store.labs.require(&id)?;
            let lab = normalize_lab(Lab {
                id,
                code: patch.code.unwrap_or(current.code),
                capacity: patch.capacity.unwrap_or(current.capacity),
                location: patch.location.or(current.location),
            })?;
            self.store.labs.ensure_unique(&lab)?;
            self.commit(&mut wal, Event::LabSaved(lab.clone()))?;
            info!(%id, "lab updated");
            Ok(lab)
        })
        .await
    }

    // ── Faculties ────────────────────────────────────────────

    pub async fn create_faculty(&self, faculty: Faculty) -> Result<Faculty, EngineError> {
        timed("create_faculty", async {
            let faculty = normalize_faculty(faculty)?;
            let mut wal = self.write_gate().await;
            self.admit_new(&self.store.faculties, &faculty)?;
            self.commit(&mut wal, Event::FacultySaved(faculty.clone()))?;
            info!(id = %faculty.id, name = %faculty.name, "faculty created");
            Ok(faculty)
        })
        .await
    }

    pub async fn update_faculty(&self, id: Ulid, patch: FacultyPatch) -> Result<Faculty, EngineError> {
        timed("update_faculty", async {
            let mut wal = self.write_gate().await;
            let current = self.store.faculties.require(&id)?;
            let faculty = normalize_faculty(Faculty {
                id,
                name: patch.name.unwrap_or(current.name),
            })?;
            self.store.faculties.ensure_unique(&faculty)?;
            self.commit(&mut wal, Event::FacultySaved(faculty.clone()))?;
            info!(%id, "faculty updated");
            Ok(faculty)
        })
        .await
    }

    // ── Books ────────────────────────────────────────────────

    pub async fn create_book(&self, book: Book) -> Result<Book, EngineError> {
        timed("create_book", async {
            let book = normalize_book(book)?;
            let mut wal = self.write_gate().await;
            self.admit_new(&self.store.books, &book)?;
            self.commit(&mut wal, Event::BookSaved(book.clone()))?;
            info!(id = %book.id, title = %book.title, "book created");
            Ok(book)
        })
        .await
    }

    pub async fn update_book(&self, id: Ulid, patch: BookPatch) -> Result<Book, EngineError> {
        timed("update_book", async {
            let mut wal = self.write_gate().await;
            let current = self.store.books.require(&id)?;
            let book = normalize_book(Book {
                id,
                title: patch.title.unwrap_or(current.title),
                isbn: patch.isbn.or(current.isbn),
                author: patch.author.or(current.author),
                edition: patch.edition.or(current.edition),
            })?;
            self.store.books.ensure_unique(&book)?;
            self.commit(&mut wal, Event::BookSaved(book.clone()))?;
            info!(%id, "book updated");
            Ok(book)
        })
        .await
    }

    // ── Batches ──────────────────────────────────────────────

    /// Faculty and book references must resolve while the write gate is held.
    fn check_batch_refs(&self, batch: &Batch) -> Result<(), EngineError> {
        reference(&self.store.faculties, &batch.faculty_id)?;
        for book_id in [batch.current_book_id, batch.upcoming_book_id].into_iter().flatten() {
            reference(&self.store.books, &book_id)?;
        }
        Ok(())
    }

    pub async fn create_batch(&self, batch: Batch) -> Result<Batch, EngineError> {
        timed("create_batch", async {
            let batch = normalize_batch(batch)?;
            let mut wal = self.write_gate().await;
            self.admit_new(&self.store.batches, &batch)?;
            self.check_batch_refs(&batch)?;
            self.commit(&mut wal, Event::BatchSaved(batch.clone()))?;
            info!(id = %batch.id, code = %batch.code, faculty = %batch.faculty_id, "batch created");
            Ok(batch)
        })
        .await
    }

    pub async fn update_batch(&self, id: Ulid, patch: BatchPatch) -> Result<Batch, EngineError> {
        timed("update_batch", async {
            let mut wal = self.write_gate().await;
            let current = self.store.batches.require(&id)?;
            let batch = normalize_batch(Batch {
                id,
                code: patch.code.unwrap_or(current.code),
                faculty_id: patch.faculty_id.unwrap_or(current.faculty_id),
                current_semester: patch.current_semester.unwrap_or(current.current_semester),
                current_book_id: patch.current_book_id.unwrap_or(current.current_book_id),
                upcoming_book_id: patch.upcoming_book_id.unwrap_or(current.upcoming_book_id),
                number_of_students: patch.number_of_students.unwrap_or(current.number_of_students),
            })?;
            self.store.batches.ensure_unique(&batch)?;
            self.check_batch_refs(&batch)?;
            self.commit(&mut wal, Event::BatchSaved(batch.clone()))?;
            info!(%id, "batch updated");
            Ok(batch)
        })
        .await
    }

    // ── Time slots ───────────────────────────────────────────

    pub async fn create_time_slot(&self, slot: TimeSlot) -> Result<TimeSlot, EngineError> {
        timed("create_time_slot", async {
            let slot = normalize_time_slot(slot)?;
            let mut wal = self.write_gate().await;
            self.admit_new(&self.store.time_slots, &slot)?;
            self.commit(&mut wal, Event::TimeSlotSaved(slot.clone()))?;
            info!(id = %slot.id, order_index = slot.order_index, "time slot created");
            Ok(slot)
        })
        .await
    }

    pub async fn update_time_slot(&self, id: Ulid, patch: TimeSlotPatch) -> Result<TimeSlot, EngineError> {
        timed("update_time_slot", async {
            let mut wal = self.write_gate().await;
            let current = self.store.time_slots.require(&id)?;
            let slot = normalize_time_slot(TimeSlot {
                id,
                start_time: patch.start_time.unwrap_or(current.start_time),
                end_time: patch.end_time.unwrap_or(current.end_time),
                label: patch.label.or(current.label),
                order_index: patch.order_index.unwrap_or(current.order_index),
            })?;
            self.store.time_slots.ensure_unique(&slot)?;
            self.commit(&mut wal, Event::TimeSlotSaved(slot.clone()))?;
            info!(%id, "time slot updated");
            Ok(slot)
        })
        .await
    }

    // ── Allocations ──────────────────────────────────────────

    /// References resolve, then no booking of the same lab and slot shares a
    /// weekday. `replacing` names the booking a replacement overwrites.
    fn check_allocation(
        &self,
        proposal: &Allocation,
        replacing: Option<Ulid>,
    ) -> Result<(), EngineError> {
        reference(&self.store.labs, &proposal.lab_id)?;
        reference(&self.store.batches, &proposal.batch_id)?;
        reference(&self.store.time_slots, &proposal.time_slot_id)?;

        let existing = self
            .store
            .allocations
            .find(|a| a.lab_id == proposal.lab_id && a.time_slot_id == proposal.time_slot_id);
        check_no_conflict(&existing, proposal, replacing).inspect_err(|e| {
            if let EngineError::Conflict(hits) = e {
                metrics::counter!(observability::ALLOCATION_CONFLICTS_TOTAL).increment(1);
                let shared = hits
                    .iter()
                    .fold(DaySet::EMPTY, |days, h| days.union(h.day_pattern.day_set()))
                    .intersection(proposal.day_pattern.day_set());
                warn!(
                    lab = %proposal.lab_id,
                    time_slot = %proposal.time_slot_id,
                    day_pattern = %proposal.day_pattern,
                    days = %shared,
                    colliding = hits.len(),
                    "allocation rejected"
                );
            }
        })
    }

    /// Check-only: would this booking be accepted right now? Nothing is persisted.
    pub async fn propose_allocation(
        &self,
        lab_id: Ulid,
        batch_id: Ulid,
        time_slot_id: Ulid,
        day_pattern: DayPattern,
    ) -> Result<(), EngineError> {
        timed("propose_allocation", async {
            let proposal = Allocation {
                id: Ulid::nil(),
                lab_id,
                batch_id,
                time_slot_id,
                day_pattern,
            };
            self.check_allocation(&proposal, None)
        })
        .await
    }

    pub async fn create_allocation(&self, allocation: Allocation) -> Result<Allocation, EngineError> {
        timed("create_allocation", async {
            let mut wal = self.write_gate().await;
            self.admit_id(&self.store.allocations, &allocation)?;
            self.check_allocation(&allocation, None)?;
            self.store.allocations.ensure_unique(&allocation)?;
            self.commit(&mut wal, Event::AllocationSaved(allocation.clone()))?;
            info!(
                id = %allocation.id,
                lab = %allocation.lab_id,
                batch = %allocation.batch_id,
                day_pattern = %allocation.day_pattern,
                "allocation created"
            );
            Ok(allocation)
        })
        .await
    }

    /// Rewrite every field of an allocation. The conflict check ignores the
    /// booking being replaced.
    pub async fn replace_allocation(
        &self,
        id: Ulid,
        lab_id: Ulid,
        batch_id: Ulid,
        time_slot_id: Ulid,
        day_pattern: DayPattern,
    ) -> Result<Allocation, EngineError> {
        timed("replace_allocation", async {
            let mut wal = self.write_gate().await;
            self.store.allocations.require(&id)?;
            let allocation = Allocation {
                id,
                lab_id,
                batch_id,
                time_slot_id,
                day_pattern,
            };
            self.check_allocation(&allocation, Some(id))?;
            self.store.allocations.ensure_unique(&allocation)?;
            self.commit(&mut wal, Event::AllocationSaved(allocation.clone()))?;
            info!(%id, day_pattern = %day_pattern, "allocation replaced");
            Ok(allocation)
        })
        .await
    }

    // ── Delete ───────────────────────────────────────────────

    /// Remove a record only if nothing references it. All or nothing: a
    /// blocked delete leaves the store untouched.
    pub async fn delete(&self, kind: EntityKind, id: Ulid) -> Result<(), EngineError> {
        timed("delete", async {
            let mut wal = self.write_gate().await;
            if !self.store.contains(kind, &id) {
                return Err(EngineError::NotFound { kind, id });
            }
            let report = dependents::scan(&self.store, kind, id);
            if report.has_dependencies {
                metrics::counter!(observability::DELETES_BLOCKED_TOTAL, "entity" => kind.as_str())
                    .increment(1);
                warn!(%kind, %id, dependents = report.count, "delete blocked");
                return Err(EngineError::DependencyConflict(DependencyConflict { kind, id, report }));
            }
            self.commit(&mut wal, Event::deleted(kind, id))?;
            info!(%kind, %id, "deleted");
            Ok(())
        })
        .await
    }
}
