use ulid::Ulid;

use crate::model::*;

use super::EngineError;

/// Existing bookings of the proposal's lab and time slot whose day-set meets
/// the proposal's. Only `exclude`, the booking a replacement overwrites, is
/// skipped.
pub(crate) fn colliding<'a>(
    existing: impl IntoIterator<Item = &'a Allocation>,
    proposal: &Allocation,
    exclude: Option<Ulid>,
) -> Vec<CollidingAllocation> {
    let mut hits: Vec<CollidingAllocation> = existing
        .into_iter()
        .filter(|a| {
            Some(a.id) != exclude
                && a.lab_id == proposal.lab_id
                && a.time_slot_id == proposal.time_slot_id
                && a.day_pattern.overlaps(proposal.day_pattern)
        })
        .map(|a| CollidingAllocation {
            id: a.id,
            batch_id: a.batch_id,
            day_pattern: a.day_pattern,
        })
        .collect();
    hits.sort_by_key(|c| c.id);
    hits
}

/// First booking of a weekday wins: any later proposal sharing one of its days
/// in the same lab and slot is rejected, whatever the patterns' order.
pub(crate) fn check_no_conflict<'a>(
    existing: impl IntoIterator<Item = &'a Allocation>,
    proposal: &Allocation,
    exclude: Option<Ulid>,
) -> Result<(), EngineError> {
    let hits = colliding(existing, proposal, exclude);
    if hits.is_empty() {
        Ok(())
    } else {
        Err(EngineError::Conflict(hits))
    }
}
