//! Record shape validation for task files
//!
//! Validates a parsed JSON value against the task record shape before it is
//! deserialized or written. Pure functions, no I/O. The codec runs this on
//! every line it reads and on every record it writes; the store runs it on
//! merged records during `update`.

use serde_json::Value;

use crate::error::{Error, Result};

/// Statuses a task record may carry on the wire
pub const STATUSES: [&str; 5] = ["open", "in_progress", "blocked", "closed", "deleted"];

/// Task types a record may carry on the wire
pub const TASK_TYPES: [&str; 5] = ["task", "bug", "feature", "story", "chore"];

/// Relation types a record may carry on the wire
pub const RELATION_TYPES: [&str; 3] = ["blocked_by", "related", "discovered_during"];

/// First violation found in a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Path of the offending field, e.g. `relations[2].as_type`
    pub path: String,
    pub expected: String,
    pub actual: String,
}

impl Violation {
    fn wrong(path: impl Into<String>, expected: impl Into<String>, actual: &Value) -> Self {
        Violation {
            path: path.into(),
            expected: expected.into(),
            actual: render(actual),
        }
    }

    fn missing(path: impl Into<String>, expected: impl Into<String>) -> Self {
        Violation {
            path: path.into(),
            expected: expected.into(),
            actual: "missing".to_string(),
        }
    }
}

impl From<Violation> for Error {
    fn from(v: Violation) -> Self {
        Error::SchemaInvalid {
            path: v.path,
            expected: v.expected,
            actual: v.actual,
        }
    }
}

/// True iff the record is a valid task record
pub fn validate(record: &Value) -> bool {
    explain(record).is_none()
}

/// Validate a record, converting the first violation into an error
pub fn check(record: &Value) -> Result<()> {
    match explain(record) {
        Some(violation) => Err(violation.into()),
        None => Ok(()),
    }
}

/// Return the first violation in a record, or `None` if it is valid.
///
/// Required fields: `id`, `title`, `status`, `category`, `type`. Optional
/// fields are checked only when present. Unknown keys are ignored.
pub fn explain(record: &Value) -> Option<Violation> {
    let obj = match record.as_object() {
        Some(obj) => obj,
        None => return Some(Violation::wrong("", "object", record)),
    };

    match obj.get("id") {
        None => return Some(Violation::missing("id", "unsigned integer")),
        Some(v) if !v.is_u64() => return Some(Violation::wrong("id", "unsigned integer", v)),
        Some(_) => {}
    }

    // Absent and null both mean "no parent"
    if let Some(v) = obj.get("parent_id") {
        if !v.is_null() && !v.is_u64() {
            return Some(Violation::wrong("parent_id", "unsigned integer or null", v));
        }
    }

    if let Some(violation) = expect_enum(obj.get("status"), "status", &STATUSES) {
        return Some(violation);
    }

    if let Some(violation) = expect_string(obj.get("title"), "title", true) {
        return Some(violation);
    }
    if let Some(violation) = expect_string(obj.get("description"), "description", false) {
        return Some(violation);
    }
    if let Some(violation) = expect_string(obj.get("design"), "design", false) {
        return Some(violation);
    }
    if let Some(violation) = expect_string(obj.get("category"), "category", true) {
        return Some(violation);
    }

    if let Some(violation) = expect_enum(obj.get("type"), "type", &TASK_TYPES) {
        return Some(violation);
    }

    if let Some(v) = obj.get("meta") {
        let map = match v.as_object() {
            Some(map) => map,
            None => return Some(Violation::wrong("meta", "object of string values", v)),
        };
        for (key, value) in map {
            if !value.is_string() {
                return Some(Violation::wrong(format!("meta.{key}"), "string", value));
            }
        }
    }

    if let Some(v) = obj.get("relations") {
        let items = match v.as_array() {
            Some(items) => items,
            None => return Some(Violation::wrong("relations", "array", v)),
        };
        for (idx, item) in items.iter().enumerate() {
            if let Some(violation) = explain_relation(item, idx) {
                return Some(violation);
            }
        }
    }

    None
}

fn explain_relation(record: &Value, idx: usize) -> Option<Violation> {
    let base = format!("relations[{idx}]");

    let obj = match record.as_object() {
        Some(obj) => obj,
        None => return Some(Violation::wrong(base, "object", record)),
    };

    for field in ["id", "relates_to"] {
        match obj.get(field) {
            None => {
                return Some(Violation::missing(
                    format!("{base}.{field}"),
                    "unsigned integer",
                ))
            }
            Some(v) if !v.is_u64() => {
                return Some(Violation::wrong(
                    format!("{base}.{field}"),
                    "unsigned integer",
                    v,
                ))
            }
            Some(_) => {}
        }
    }

    expect_enum(obj.get("as_type"), format!("{base}.as_type"), &RELATION_TYPES)
}

fn expect_string(value: Option<&Value>, path: &str, required: bool) -> Option<Violation> {
    match value {
        None if required => Some(Violation::missing(path, "string")),
        None => None,
        Some(v) if v.is_string() => None,
        Some(v) => Some(Violation::wrong(path, "string", v)),
    }
}

fn expect_enum(value: Option<&Value>, path: impl Into<String>, allowed: &[&str]) -> Option<Violation> {
    let expected = format!("one of {}", allowed.join(", "));
    match value {
        None => Some(Violation::missing(path, expected)),
        Some(v) => match v.as_str() {
            Some(s) if allowed.contains(&s) => None,
            _ => Some(Violation::wrong(path, expected, v)),
        },
    }
}

/// Compact rendering of the offending value for error messages
fn render(value: &Value) -> String {
    match value {
        Value::Object(_) => "object".to_string(),
        Value::Array(_) => "array".to_string(),
        other => other.to_string(),
    }
}
