//! Delete guard for the allocation graph.
//!
//! The store has no foreign keys, so before removing a referenced record the
//! engine scans every collection that can point at it. Edges (dependent →
//! referenced):
//!
//! - Allocation → Lab (`lab_id`)
//! - Allocation → Batch (`batch_id`)
//! - Batch → Faculty (`faculty_id`)
//! - Batch → Book (`current_book_id` or `upcoming_book_id`)
//!
//! Nothing references a TimeSlot or an Allocation through a guarded edge, so
//! both always report no dependents.

use ulid::Ulid;

use crate::model::*;

use super::store::Store;

const UNKNOWN: &str = "Unknown";

/// Every record that references `(kind, id)`, ordered by id.
pub fn scan(store: &Store, kind: EntityKind, id: Ulid) -> DependencyReport {
    let mut dependents: Vec<Dependent> = match kind {
        EntityKind::Lab => store
            .allocations
            .find(|a| a.lab_id == id)
            .into_iter()
            .map(|a| {
                let batch = store.batches.get(&a.batch_id).map(|b| b.code);
                allocation_dependent(store, &a, "Batch", batch)
            })
            .collect(),
        EntityKind::Batch => store
            .allocations
            .find(|a| a.batch_id == id)
            .into_iter()
            .map(|a| {
                let lab = store.labs.get(&a.lab_id).map(|l| l.code);
                allocation_dependent(store, &a, "Lab", lab)
            })
            .collect(),
        EntityKind::Faculty => store
            .batches
            .find(|b| b.faculty_id == id)
            .into_iter()
            .map(|b| Dependent {
                kind: EntityKind::Batch,
                id: b.id,
                details: format!(
                    "{} ({}, {} students)",
                    b.code, b.current_semester, b.number_of_students
                ),
            })
            .collect(),
        EntityKind::Book => store
            .batches
            .find(|b| b.current_book_id == Some(id) || b.upcoming_book_id == Some(id))
            .into_iter()
            .map(|b| {
                let mut details = format!("{} ({})", b.code, b.current_semester);
                if b.current_book_id == Some(id) {
                    details.push_str(" [current book]");
                }
                if b.upcoming_book_id == Some(id) {
                    details.push_str(" [upcoming book]");
                }
                Dependent { kind: EntityKind::Batch, id: b.id, details }
            })
            .collect(),
        EntityKind::TimeSlot | EntityKind::Allocation => Vec::new(),
    };
    dependents.sort_by_key(|d| d.id);
    DependencyReport::new(dependents)
}

/// `<Other> <code> at <slot label> (<pattern>)`, naming the side of the
/// allocation that is not being deleted.
fn allocation_dependent(
    store: &Store,
    allocation: &Allocation,
    other: &str,
    other_code: Option<String>,
) -> Dependent {
    let slot_label = store
        .time_slots
        .get(&allocation.time_slot_id)
        .and_then(|s| s.label);
    Dependent {
        kind: EntityKind::Allocation,
        id: allocation.id,
        details: format!(
            "{other} {} at {} ({})",
            other_code.as_deref().unwrap_or(UNKNOWN),
            slot_label.as_deref().unwrap_or(UNKNOWN),
            allocation.day_pattern
        ),
    }
}
