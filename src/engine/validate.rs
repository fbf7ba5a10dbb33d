use crate::limits::MAX_TEXT_LEN;

use super::EngineError;

/// Trimmed, non-empty, bounded text.
pub(crate) fn required_text(field: &str, value: &str) -> Result<String, EngineError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!("{field} is required")));
    }
    bounded(field, trimmed)
}

/// Trimmed optional text; blank becomes `None`.
pub(crate) fn optional_text(field: &str, value: Option<&str>) -> Result<Option<String>, EngineError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => bounded(field, v).map(Some),
    }
}

fn bounded(field: &str, value: &str) -> Result<String, EngineError> {
    if value.len() > MAX_TEXT_LEN {
        return Err(EngineError::Validation(format!(
            "{field} exceeds {MAX_TEXT_LEN} bytes"
        )));
    }
    Ok(value.to_string())
}

pub(crate) fn lab_capacity(capacity: u32) -> Result<u32, EngineError> {
    if capacity < 1 {
        return Err(EngineError::Validation("Capacity must be at least 1".into()));
    }
    Ok(capacity)
}

/// Parse `HH:MM` (24-hour) into minutes since midnight.
pub(crate) fn clock_minutes(field: &str, value: &str) -> Result<u32, EngineError> {
    let invalid = || EngineError::Validation(format!("{field} must be HH:MM, got {value:?}"));
    let (h, m) = value.split_once(':').ok_or_else(invalid)?;
    if h.len() != 2 || m.len() != 2 {
        return Err(invalid());
    }
    let hours: u32 = h.parse().map_err(|_| invalid())?;
    let minutes: u32 = m.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    Ok(hours * 60 + minutes)
}

/// Normalised `(start, end)` of a time slot; start must precede end.
pub(crate) fn slot_times(start: &str, end: &str) -> Result<(String, String), EngineError> {
    let start = start.trim();
    let end = end.trim();
    if clock_minutes("startTime", start)? >= clock_minutes("endTime", end)? {
        return Err(EngineError::Validation(format!(
            "startTime {start} must be before endTime {end}"
        )));
    }
    Ok((start.to_string(), end.to_string()))
}
