//! Core types shared by the element framework and the blueprint elements.

use std::fmt;

use serde_json::Value;

/// Intrinsic function name for input references.
pub const GET_INPUT: &str = "get_input";

/// The only string accepted for `max_instances`, meaning no upper bound.
pub const UNBOUNDED_LITERAL: &str = "UNBOUNDED";

/// Integer sentinel for an unbounded `max_instances`, on input and on the wire.
pub const UNBOUNDED: i64 = -1;

/// Returns the type name of a tree value for error messages.
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

/// Kind of a present tree value, as accepted by a leaf schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Integer,
    Float,
    String,
    Boolean,
    Mapping,
    Sequence,
}

impl Kind {
    /// Every kind; a leaf accepting these accepts any present value.
    pub const ANY: &'static [Kind] = &[
        Kind::Integer,
        Kind::Float,
        Kind::String,
        Kind::Boolean,
        Kind::Mapping,
        Kind::Sequence,
    ];

    /// Classify a value. Returns `None` for null, which is treated as absent.
    pub fn of(value: &Value) -> Option<Kind> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(Kind::Boolean),
            Value::Number(n) if n.is_f64() => Some(Kind::Float),
            Value::Number(_) => Some(Kind::Integer),
            Value::String(_) => Some(Kind::String),
            Value::Array(_) => Some(Kind::Sequence),
            Value::Object(_) => Some(Kind::Mapping),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Kind::Integer => "integer",
            Kind::Float => "float",
            Kind::String => "string",
            Kind::Boolean => "boolean",
            Kind::Mapping => "mapping",
            Kind::Sequence => "sequence",
        }
    }

    /// Human-readable list of kinds, e.g. "integer or string".
    pub fn describe(kinds: &[Kind]) -> String {
        if kinds == Kind::ANY {
            return "any value".to_string();
        }
        kinds
            .iter()
            .map(Kind::name)
            .collect::<Vec<_>>()
            .join(" or ")
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
