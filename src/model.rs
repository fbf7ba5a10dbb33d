use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

// ── Days ─────────────────────────────────────────────────────────

static DAY_NAMES: [&str; 6] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Set of teaching weekdays as a bitmask. Bit 0 is Monday, bit 5 Saturday.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DaySet(u8);

impl DaySet {
    pub const EMPTY: DaySet = DaySet(0);
    pub const MON: DaySet = DaySet(1 << 0);
    pub const TUE: DaySet = DaySet(1 << 1);
    pub const WED: DaySet = DaySet(1 << 2);
    pub const THU: DaySet = DaySet(1 << 3);
    pub const FRI: DaySet = DaySet(1 << 4);
    pub const SAT: DaySet = DaySet(1 << 5);

    pub const fn union(self, other: DaySet) -> DaySet {
        DaySet(self.0 | other.0)
    }

    pub const fn intersection(self, other: DaySet) -> DaySet {
        DaySet(self.0 & other.0)
    }

    pub const fn intersects(self, other: DaySet) -> bool {
        self.0 & other.0 != 0
    }

    /// Short day names in calendar order.
    pub fn day_names(self) -> impl Iterator<Item = &'static str> {
        DAY_NAMES
            .iter()
            .enumerate()
            .filter(move |(bit, _)| self.0 & (1u8 << *bit) != 0)
            .map(|(_, name)| *name)
    }
}

impl fmt::Display for DaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.day_names().collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

/// Recurring weekly pattern a booking occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DayPattern {
    /// Monday, Wednesday, Friday.
    Mwf,
    /// Tuesday, Thursday, Saturday.
    Tts,
    /// Every day either of the other two patterns would occur.
    Regular,
}

impl DayPattern {
    /// Display and report order.
    pub const ALL: [DayPattern; 3] = [DayPattern::Mwf, DayPattern::Tts, DayPattern::Regular];

    pub const fn day_set(self) -> DaySet {
        const MWF: DaySet = DaySet::MON.union(DaySet::WED).union(DaySet::FRI);
        const TTS: DaySet = DaySet::TUE.union(DaySet::THU).union(DaySet::SAT);
        match self {
            DayPattern::Mwf => MWF,
            DayPattern::Tts => TTS,
            DayPattern::Regular => MWF.union(TTS),
        }
    }

    /// Two patterns overlap when they share at least one weekday.
    pub const fn overlaps(self, other: DayPattern) -> bool {
        self.day_set().intersects(other.day_set())
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            DayPattern::Mwf => "MWF",
            DayPattern::Tts => "TTS",
            DayPattern::Regular => "REGULAR",
        }
    }
}

impl fmt::Display for DayPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Only the exact upper-case literals are accepted.
impl FromStr for DayPattern {
    type Err = UnknownLiteral;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MWF" => Ok(DayPattern::Mwf),
            "TTS" => Ok(DayPattern::Tts),
            "REGULAR" => Ok(DayPattern::Regular),
            other => Err(UnknownLiteral {
                expected: "day pattern (MWF, TTS, or REGULAR)",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLiteral {
    pub expected: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {:?}", self.expected, self.value)
    }
}

impl std::error::Error for UnknownLiteral {}

// ── Entities ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Lab,
    Faculty,
    Book,
    Batch,
    TimeSlot,
    Allocation,
}

impl EntityKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            EntityKind::Lab => "Lab",
            EntityKind::Faculty => "Faculty",
            EntityKind::Book => "Book",
            EntityKind::Batch => "Batch",
            EntityKind::TimeSlot => "TimeSlot",
            EntityKind::Allocation => "Allocation",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive; `time-slot` and `time_slot` are accepted for TimeSlot.
impl FromStr for EntityKind {
    type Err = UnknownLiteral;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        match folded.as_str() {
            "lab" => Ok(EntityKind::Lab),
            "faculty" => Ok(EntityKind::Faculty),
            "book" => Ok(EntityKind::Book),
            "batch" => Ok(EntityKind::Batch),
            "timeslot" => Ok(EntityKind::TimeSlot),
            "allocation" => Ok(EntityKind::Allocation),
            _ => Err(UnknownLiteral {
                expected: "entity type",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lab {
    pub id: Ulid,
    /// Unique, stored upper-case.
    pub code: String,
    pub capacity: u32,
    pub location: Option<String>,
}

/// A teaching faculty (department); batches are taught under one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Faculty {
    pub id: Ulid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: Ulid,
    pub title: String,
    pub isbn: Option<String>,
    pub author: Option<String>,
    pub edition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: Ulid,
    pub code: String,
    pub faculty_id: Ulid,
    pub current_semester: String,
    pub current_book_id: Option<Ulid>,
    pub upcoming_book_id: Option<Ulid>,
    pub number_of_students: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub id: Ulid,
    /// `HH:MM`, 24-hour.
    pub start_time: String,
    pub end_time: String,
    pub label: Option<String>,
    /// Unique; defines display and iteration order.
    pub order_index: i64,
}

/// One lab booked by one batch in one slot on a recurring day pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub id: Ulid,
    pub lab_id: Ulid,
    pub batch_id: Ulid,
    pub time_slot_id: Ulid,
    pub day_pattern: DayPattern,
}

// ── Partial updates ──────────────────────────────────────────────
//
// `None` keeps the stored value. For optional text, `Some("")` clears it.

#[derive(Debug, Clone, Default)]
pub struct LabPatch {
    pub code: Option<String>,
    pub capacity: Option<u32>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FacultyPatch {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BookPatch {
    pub title: Option<String>,
    pub isbn: Option<String>,
    pub author: Option<String>,
    pub edition: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BatchPatch {
    pub code: Option<String>,
    pub faculty_id: Option<Ulid>,
    pub current_semester: Option<String>,
    /// `Some(None)` removes the reference.
    pub current_book_id: Option<Option<Ulid>>,
    pub upcoming_book_id: Option<Option<Ulid>>,
    pub number_of_students: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct TimeSlotPatch {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub label: Option<String>,
    pub order_index: Option<i64>,
}

/// WAL record format: one saved/deleted pair per collection.
/// `*Saved` is an upsert: it carries the full record after create or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    LabSaved(Lab),
    LabDeleted { id: Ulid },
    FacultySaved(Faculty),
    FacultyDeleted { id: Ulid },
    BookSaved(Book),
    BookDeleted { id: Ulid },
    BatchSaved(Batch),
    BatchDeleted { id: Ulid },
    TimeSlotSaved(TimeSlot),
    TimeSlotDeleted { id: Ulid },
    AllocationSaved(Allocation),
    AllocationDeleted { id: Ulid },
}

impl Event {
    pub fn deleted(kind: EntityKind, id: Ulid) -> Event {
        match kind {
            EntityKind::Lab => Event::LabDeleted { id },
            EntityKind::Faculty => Event::FacultyDeleted { id },
            EntityKind::Book => Event::BookDeleted { id },
            EntityKind::Batch => Event::BatchDeleted { id },
            EntityKind::TimeSlot => Event::TimeSlotDeleted { id },
            EntityKind::Allocation => Event::AllocationDeleted { id },
        }
    }
}

// ── Query result types ───────────────────────────────────────────

/// A record that references the entity being inspected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependent {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub id: Ulid,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyReport {
    pub has_dependencies: bool,
    pub count: usize,
    pub dependents: Vec<Dependent>,
}

impl DependencyReport {
    pub fn new(dependents: Vec<Dependent>) -> Self {
        Self {
            has_dependencies: !dependents.is_empty(),
            count: dependents.len(),
            dependents,
        }
    }
}

/// An existing allocation that a proposal collides with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollidingAllocation {
    pub id: Ulid,
    pub batch_id: Ulid,
    pub day_pattern: DayPattern,
}

/// Allocation with its references resolved. A dangling reference resolves to `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationView {
    pub id: Ulid,
    pub day_pattern: DayPattern,
    pub lab: Option<Lab>,
    pub batch: Option<Batch>,
    pub time_slot: Option<TimeSlot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultyStatus {
    pub faculty: Faculty,
    pub free_day_patterns: Vec<DayPattern>,
    pub busy_day_patterns: Vec<DayPattern>,
    pub is_free_completely: bool,
    pub is_busy_completely: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotStats {
    pub total_faculties: usize,
    pub completely_free: usize,
    pub partially_free: usize,
    pub busy: usize,
}

/// Free/busy picture of every faculty for one time slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotAvailability {
    pub time_slot: TimeSlot,
    pub faculty_summary: Vec<FacultyStatus>,
    pub completely_free_faculties: Vec<Faculty>,
    pub partially_free_faculties: Vec<Faculty>,
    pub busy_faculties: Vec<Faculty>,
    pub stats: SlotStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_is_union_of_mwf_and_tts() {
        let mwf = DayPattern::Mwf.day_set();
        let tts = DayPattern::Tts.day_set();
        assert_eq!(DayPattern::Regular.day_set(), mwf.union(tts));
        assert_eq!(mwf.intersection(tts), DaySet::EMPTY);
        assert_eq!(DayPattern::Regular.day_set().day_names().count(), 6);
    }

    #[test]
    fn pattern_overlap_matrix() {
        use DayPattern::*;
        assert!(Mwf.overlaps(Mwf));
        assert!(!Mwf.overlaps(Tts));
        assert!(!Tts.overlaps(Mwf));
        assert!(Mwf.overlaps(Regular));
        assert!(Regular.overlaps(Tts));
        assert!(Regular.overlaps(Regular));
    }

    #[test]
    fn day_names_in_calendar_order() {
        let names: Vec<_> = DayPattern::Tts.day_set().day_names().collect();
        assert_eq!(names, vec!["Tue", "Thu", "Sat"]);
        assert_eq!(DayPattern::Mwf.day_set().to_string(), "{Mon, Wed, Fri}");
    }

    #[test]
    fn pattern_parse_is_exact() {
        assert_eq!("MWF".parse::<DayPattern>().unwrap(), DayPattern::Mwf);
        assert_eq!("REGULAR".parse::<DayPattern>().unwrap(), DayPattern::Regular);
        assert!("mwf".parse::<DayPattern>().is_err());
        assert!("WEEKEND".parse::<DayPattern>().is_err());
        assert!(" TTS".parse::<DayPattern>().is_err());
    }

    #[test]
    fn pattern_serializes_as_literal() {
        assert_eq!(serde_json::to_string(&DayPattern::Tts).unwrap(), "\"TTS\"");
        let back: DayPattern = serde_json::from_str("\"REGULAR\"").unwrap();
        assert_eq!(back, DayPattern::Regular);
    }

    #[test]
    fn entity_kind_parse_is_lenient() {
        assert_eq!("lab".parse::<EntityKind>().unwrap(), EntityKind::Lab);
        assert_eq!("time-slot".parse::<EntityKind>().unwrap(), EntityKind::TimeSlot);
        assert_eq!("TimeSlot".parse::<EntityKind>().unwrap(), EntityKind::TimeSlot);
        assert!("room".parse::<EntityKind>().is_err());
    }

    #[test]
    fn dependency_report_counts() {
        let empty = DependencyReport::new(vec![]);
        assert!(!empty.has_dependencies);
        assert_eq!(empty.count, 0);

        let one = DependencyReport::new(vec![Dependent {
            kind: EntityKind::Batch,
            id: Ulid::new(),
            details: "CSE-A (5, 40 students)".into(),
        }]);
        assert!(one.has_dependencies);
        assert_eq!(one.count, 1);
    }

    #[test]
    fn event_serialization_roundtrip() {
        let event = Event::AllocationSaved(Allocation {
            id: Ulid::new(),
            lab_id: Ulid::new(),
            batch_id: Ulid::new(),
            time_slot_id: Ulid::new(),
            day_pattern: DayPattern::Regular,
        });
        let bytes = bincode::serialize(&event).unwrap();
        let decoded: Event = bincode::deserialize(&bytes).unwrap();
        assert_eq!(event, decoded);
    }
}
