use std::collections::HashMap;

use ulid::Ulid;

use crate::model::*;

// ── Faculty availability ──────────────────────────────────────────

/// Per-slot free/busy report for every faculty, ordered by `order_index`.
///
/// A faculty is busy on a weekday of a slot when any allocation in that slot
/// belongs to one of its batches and the allocation's pattern covers the day.
/// A pattern is then busy when it shares a weekday with the faculty's busy
/// days, which makes REGULAR busy as soon as either MWF or TTS is, and a
/// REGULAR booking busy on all three.
///
/// `faculty_of_batch` resolves the batch → faculty edge. Allocations whose
/// batch cannot be resolved are skipped. Faculties keep their input order.
pub(crate) fn faculty_availability(
    faculties: &[Faculty],
    time_slots: &[TimeSlot],
    allocations: &[Allocation],
    faculty_of_batch: impl Fn(&Ulid) -> Option<Ulid>,
) -> Vec<SlotAvailability> {
    let mut slots: Vec<&TimeSlot> = time_slots.iter().collect();
    slots.sort_by_key(|s| s.order_index);

    // Busy days per (slot, faculty), built in one pass over the allocations.
    let mut busy: HashMap<(Ulid, Ulid), DaySet> = HashMap::new();
    for a in allocations {
        let Some(faculty_id) = faculty_of_batch(&a.batch_id) else {
            continue;
        };
        let days = busy.entry((a.time_slot_id, faculty_id)).or_default();
        *days = days.union(a.day_pattern.day_set());
    }

    slots
        .into_iter()
        .map(|slot| {
            let statuses = faculties
                .iter()
                .map(|f| {
                    let days = busy.get(&(slot.id, f.id)).copied().unwrap_or_default();
                    faculty_status(f, days)
                })
                .collect();
            summarize(slot, statuses)
        })
        .collect()
}

/// Free/busy status of one faculty given the weekdays it is already teaching.
fn faculty_status(faculty: &Faculty, busy_days: DaySet) -> FacultyStatus {
    let (busy, free): (Vec<DayPattern>, Vec<DayPattern>) = DayPattern::ALL
        .into_iter()
        .partition(|p| p.day_set().intersects(busy_days));
    FacultyStatus {
        faculty: faculty.clone(),
        is_free_completely: busy.is_empty(),
        is_busy_completely: free.is_empty(),
        free_day_patterns: free,
        busy_day_patterns: busy,
    }
}

fn summarize(slot: &TimeSlot, statuses: Vec<FacultyStatus>) -> SlotAvailability {
    let mut free = Vec::new();
    let mut partial = Vec::new();
    let mut busy = Vec::new();
    for s in &statuses {
        let bucket = if s.is_free_completely {
            &mut free
        } else if s.is_busy_completely {
            &mut busy
        } else {
            &mut partial
        };
        bucket.push(s.faculty.clone());
    }

    let stats = SlotStats {
        total_faculties: statuses.len(),
        completely_free: free.len(),
        partially_free: partial.len(),
        busy: busy.len(),
    };
    SlotAvailability {
        time_slot: slot.clone(),
        faculty_summary: statuses,
        completely_free_faculties: free,
        partially_free_faculties: partial,
        busy_faculties: busy,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn faculty(name: &str) -> Faculty {
        Faculty { id: Ulid::new(), name: name.into() }
    }

    fn slot(order_index: i64) -> TimeSlot {
        TimeSlot {
            id: Ulid::new(),
            start_time: format!("{:02}:00", 8 + order_index * 2),
            end_time: format!("{:02}:00", 10 + order_index * 2),
            label: None,
            order_index,
        }
    }

    /// Batch ids double as the key of a batch → faculty map.
    fn alloc(slot: &TimeSlot, batch_id: Ulid, pattern: DayPattern) -> Allocation {
        Allocation {
            id: Ulid::new(),
            lab_id: Ulid::new(),
            batch_id,
            time_slot_id: slot.id,
            day_pattern: pattern,
        }
    }

    fn run(
        faculties: &[Faculty],
        slots: &[TimeSlot],
        allocations: &[Allocation],
        batches: &[(Ulid, Ulid)],
    ) -> Vec<SlotAvailability> {
        let map: HashMap<Ulid, Ulid> = batches.iter().copied().collect();
        faculty_availability(faculties, slots, allocations, |b| map.get(b).copied())
    }

    #[test]
    fn idle_faculty_is_free_everywhere() {
        let f = faculty("Computer Science");
        let report = run(std::slice::from_ref(&f), &[slot(1)], &[], &[]);
        let status = &report[0].faculty_summary[0];
        assert_eq!(status.free_day_patterns, DayPattern::ALL.to_vec());
        assert!(status.busy_day_patterns.is_empty());
        assert!(status.is_free_completely);
        assert!(!status.is_busy_completely);
        assert_eq!(report[0].completely_free_faculties, vec![f]);
    }

    #[test]
    fn mwf_booking_leaves_tts_free() {
        let f = faculty("Computer Science");
        let s1 = slot(1);
        let batch = Ulid::new();
        let report = run(
            std::slice::from_ref(&f),
            std::slice::from_ref(&s1),
            &[alloc(&s1, batch, DayPattern::Mwf)],
            &[(batch, f.id)],
        );
        let status = &report[0].faculty_summary[0];
        assert_eq!(status.busy_day_patterns, vec![DayPattern::Mwf, DayPattern::Regular]);
        assert_eq!(status.free_day_patterns, vec![DayPattern::Tts]);
        assert!(!status.is_free_completely);
        assert!(!status.is_busy_completely);
        assert_eq!(report[0].partially_free_faculties, vec![f]);
        assert_eq!(report[0].stats.partially_free, 1);
    }

    #[test]
    fn regular_booking_is_fully_busy() {
        let f = faculty("Information Technology");
        let s = slot(1);
        let batch = Ulid::new();
        let report = run(
            std::slice::from_ref(&f),
            std::slice::from_ref(&s),
            &[alloc(&s, batch, DayPattern::Regular)],
            &[(batch, f.id)],
        );
        let status = &report[0].faculty_summary[0];
        assert_eq!(status.busy_day_patterns, DayPattern::ALL.to_vec());
        assert!(status.is_busy_completely);
        assert_eq!(report[0].busy_faculties, vec![f]);
    }

    #[test]
    fn mwf_plus_tts_across_batches_is_fully_busy() {
        let f = faculty("Software Engineering");
        let s = slot(1);
        let (b1, b2) = (Ulid::new(), Ulid::new());
        let report = run(
            std::slice::from_ref(&f),
            std::slice::from_ref(&s),
            &[alloc(&s, b1, DayPattern::Mwf), alloc(&s, b2, DayPattern::Tts)],
            &[(b1, f.id), (b2, f.id)],
        );
        assert!(report[0].faculty_summary[0].is_busy_completely);
    }

    #[test]
    fn busy_in_one_slot_only() {
        let f = faculty("Computer Science");
        let (s1, s2) = (slot(1), slot(2));
        let batch = Ulid::new();
        let report = run(
            std::slice::from_ref(&f),
            &[s1.clone(), s2.clone()],
            &[alloc(&s1, batch, DayPattern::Regular)],
            &[(batch, f.id)],
        );
        assert!(report[0].faculty_summary[0].is_busy_completely);
        assert!(report[1].faculty_summary[0].is_free_completely);
    }

    #[test]
    fn slots_ordered_by_order_index() {
        let slots = vec![slot(3), slot(1), slot(2)];
        let report = run(&[], &slots, &[], &[]);
        let order: Vec<i64> = report.iter().map(|r| r.time_slot.order_index).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert_eq!(report[0].stats, SlotStats::default());
    }

    #[test]
    fn unresolved_batch_is_ignored() {
        let f = faculty("Computer Science");
        let s = slot(1);
        let report = run(
            std::slice::from_ref(&f),
            std::slice::from_ref(&s),
            &[alloc(&s, Ulid::new(), DayPattern::Regular)],
            &[],
        );
        assert!(report[0].faculty_summary[0].is_free_completely);
    }

    #[test]
    fn stats_partition_faculties() {
        let (free, partial, busy) = (faculty("A"), faculty("B"), faculty("C"));
        let s = slot(1);
        let (bp, bb) = (Ulid::new(), Ulid::new());
        let report = run(
            &[free.clone(), partial.clone(), busy.clone()],
            std::slice::from_ref(&s),
            &[alloc(&s, bp, DayPattern::Tts), alloc(&s, bb, DayPattern::Regular)],
            &[(bp, partial.id), (bb, busy.id)],
        );
        let r = &report[0];
        assert_eq!(
            r.stats,
            SlotStats { total_faculties: 3, completely_free: 1, partially_free: 1, busy: 1 }
        );
        assert_eq!(r.completely_free_faculties, vec![free]);
        assert_eq!(r.partially_free_faculties, vec![partial]);
        assert_eq!(r.busy_faculties, vec![busy]);
    }

    #[test]
    fn status_for_each_busy_set() {
        let f = faculty("X");
        let tts = faculty_status(&f, DayPattern::Tts.day_set());
        assert_eq!(tts.busy_day_patterns, vec![DayPattern::Tts, DayPattern::Regular]);
        assert_eq!(tts.free_day_patterns, vec![DayPattern::Mwf]);

        // A single weekday is enough to block the pattern covering it.
        let monday = faculty_status(&f, DaySet::MON);
        assert_eq!(monday.busy_day_patterns, vec![DayPattern::Mwf, DayPattern::Regular]);
    }
}
