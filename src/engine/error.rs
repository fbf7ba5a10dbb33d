use ulid::Ulid;

use crate::model::{CollidingAllocation, DependencyReport, EntityKind, UnknownLiteral};

#[derive(Debug)]
pub enum EngineError {
    /// Missing or malformed input.
    Validation(String),
    NotFound {
        kind: EntityKind,
        id: Ulid,
    },
    AlreadyExists(Ulid),
    /// A declared unique field already belongs to another record.
    Duplicate {
        kind: EntityKind,
        field: &'static str,
        value: String,
    },
    /// The proposed allocation shares a weekday with these bookings of the same lab and slot.
    Conflict(Vec<CollidingAllocation>),
    DependencyConflict(DependencyConflict),
    LimitExceeded(&'static str),
    WalError(String),
}

/// Delete refused because other records still reference the entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyConflict {
    pub kind: EntityKind,
    pub id: Ulid,
    pub report: DependencyReport,
}

impl DependencyConflict {
    pub fn message(&self) -> String {
        format!(
            "Cannot delete {} \"{}\" because it has {} dependent record(s)",
            self.kind, self.id, self.report.count
        )
    }

    /// Distinct dependent types in first-seen order.
    pub fn dependent_kinds(&self) -> Vec<EntityKind> {
        let mut kinds: Vec<EntityKind> = Vec::new();
        for d in &self.report.dependents {
            if !kinds.contains(&d.kind) {
                kinds.push(d.kind);
            }
        }
        kinds
    }

    pub fn reason(&self) -> String {
        let kinds: Vec<&str> = self.dependent_kinds().iter().map(|k| k.as_str()).collect();
        format!(
            "This {} is referenced by {}. Please delete or reassign these dependencies first.",
            self.kind.as_str().to_lowercase(),
            kinds.join(", ")
        )
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Validation(msg) => write!(f, "validation failed: {msg}"),
            EngineError::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            EngineError::AlreadyExists(id) => write!(f, "already exists: {id}"),
            EngineError::Duplicate { kind, field, value } => {
                write!(f, "{kind} with {field} {value} already exists")
            }
            EngineError::Conflict(colliding) => {
                write!(f, "allocation conflicts with")?;
                for (i, c) in colliding.iter().enumerate() {
                    let sep = if i == 0 { " " } else { ", " };
                    write!(f, "{sep}{} (batch {}, {})", c.id, c.batch_id, c.day_pattern)?;
                }
                Ok(())
            }
            EngineError::DependencyConflict(conflict) => f.write_str(&conflict.message()),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<UnknownLiteral> for EngineError {
    fn from(e: UnknownLiteral) -> Self {
        EngineError::Validation(e.to_string())
    }
}

impl EngineError {
    pub(crate) fn wal(e: std::io::Error) -> Self {
        EngineError::WalError(e.to_string())
    }

    /// Short status label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation",
            EngineError::NotFound { .. } => "not_found",
            EngineError::AlreadyExists(_) | EngineError::Duplicate { .. } => "duplicate",
            EngineError::Conflict(_) => "conflict",
            EngineError::DependencyConflict(_) => "dependency_conflict",
            EngineError::LimitExceeded(_) => "limit_exceeded",
            EngineError::WalError(_) => "store_error",
        }
    }
}
