//! Error envelope handed to whatever layer renders engine results.

use serde::Serialize;
use serde_json::{json, Value};

use crate::engine::EngineError;

pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
pub const NOT_FOUND: &str = "NOT_FOUND";
pub const DUPLICATE_KEY: &str = "DUPLICATE_KEY";
pub const ALLOCATION_CONFLICT: &str = "ALLOCATION_CONFLICT";
pub const DEPENDENCY_CONFLICT: &str = "DEPENDENCY_CONFLICT";
pub const LIMIT_EXCEEDED: &str = "LIMIT_EXCEEDED";
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorResponse {
    fn new(code: &'static str, message: String, details: Option<Value>) -> Self {
        Self { success: false, code, message, details }
    }
}

impl From<&EngineError> for ErrorResponse {
    fn from(err: &EngineError) -> Self {
        match err {
            EngineError::Validation(msg) => Self::new(VALIDATION_ERROR, msg.clone(), None),
            EngineError::NotFound { .. } => Self::new(NOT_FOUND, err.to_string(), None),
            EngineError::AlreadyExists(id) => Self::new(
                DUPLICATE_KEY,
                err.to_string(),
                Some(json!({ "field": "id", "value": id })),
            ),
            EngineError::Duplicate { field, value, .. } => Self::new(
                DUPLICATE_KEY,
                err.to_string(),
                Some(json!({ "field": field, "value": value })),
            ),
            EngineError::Conflict(colliding) => Self::new(
                ALLOCATION_CONFLICT,
                "Lab is already allocated for an overlapping day pattern in this time slot".into(),
                Some(json!({ "conflicts": colliding })),
            ),
            EngineError::DependencyConflict(c) => Self::new(
                DEPENDENCY_CONFLICT,
                c.message(),
                Some(json!({
                    "entityType": c.kind,
                    "entityName": c.id,
                    "dependencyCount": c.report.count,
                    "dependents": c.report.dependents,
                    "reason": c.reason(),
                })),
            ),
            EngineError::LimitExceeded(msg) => Self::new(LIMIT_EXCEEDED, (*msg).to_string(), None),
            // Detail stays in the log.
            EngineError::WalError(_) => Self::new(INTERNAL_ERROR, "Internal error".into(), None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    use crate::engine::DependencyConflict;
    use crate::model::*;

    fn render(err: EngineError) -> Value {
        serde_json::to_value(ErrorResponse::from(&err)).unwrap()
    }

    #[test]
    fn dependency_conflict_shape() {
        let lab = Ulid::new();
        let alloc = Ulid::new();
        let value = render(EngineError::DependencyConflict(DependencyConflict {
            kind: EntityKind::Lab,
            id: lab,
            report: DependencyReport::new(vec![Dependent {
                kind: EntityKind::Allocation,
                id: alloc,
                details: "Batch CSE-2023-A at 09:00 AM - 11:00 AM (MWF)".into(),
            }]),
        }));

        assert_eq!(
            value,
            json!({
                "success": false,
                "code": "DEPENDENCY_CONFLICT",
                "message": format!("Cannot delete Lab \"{lab}\" because it has 1 dependent record(s)"),
                "details": {
                    "entityType": "Lab",
                    "entityName": lab.to_string(),
                    "dependencyCount": 1,
                    "dependents": [{
                        "type": "Allocation",
                        "id": alloc.to_string(),
                        "details": "Batch CSE-2023-A at 09:00 AM - 11:00 AM (MWF)",
                    }],
                    "reason": "This lab is referenced by Allocation. Please delete or reassign these dependencies first.",
                }
            })
        );
    }

    #[test]
    fn reason_lists_distinct_kinds() {
        let dependents = [EntityKind::Batch, EntityKind::Batch]
            .into_iter()
            .map(|kind| Dependent { kind, id: Ulid::new(), details: String::new() })
            .collect();
        let c = DependencyConflict {
            kind: EntityKind::Faculty,
            id: Ulid::new(),
            report: DependencyReport::new(dependents),
        };
        assert_eq!(
            c.reason(),
            "This faculty is referenced by Batch. Please delete or reassign these dependencies first."
        );
    }

    #[test]
    fn allocation_conflict_names_collisions() {
        let hit = CollidingAllocation {
            id: Ulid::new(),
            batch_id: Ulid::new(),
            day_pattern: DayPattern::Mwf,
        };
        let value = render(EngineError::Conflict(vec![hit.clone()]));
        assert_eq!(value["code"], "ALLOCATION_CONFLICT");
        assert_eq!(value["details"]["conflicts"][0]["id"], hit.id.to_string());
        assert_eq!(value["details"]["conflicts"][0]["batchId"], hit.batch_id.to_string());
        assert_eq!(value["details"]["conflicts"][0]["dayPattern"], "MWF");
    }

    #[test]
    fn wal_errors_are_opaque() {
        let value = render(EngineError::WalError("disk full at /var/lib/labstat".into()));
        assert_eq!(
            value,
            json!({ "success": false, "code": "INTERNAL_ERROR", "message": "Internal error" })
        );
    }

    #[test]
    fn validation_and_not_found_codes() {
        let v = render(EngineError::Validation("name is required".into()));
        assert_eq!(v["code"], "VALIDATION_ERROR");
        assert_eq!(v["message"], "name is required");
        assert!(v.get("details").is_none());

        let id = Ulid::new();
        let v = render(EngineError::NotFound { kind: EntityKind::Batch, id });
        assert_eq!(v["code"], "NOT_FOUND");
        assert_eq!(v["message"], format!("Batch not found: {id}"));
    }
}
