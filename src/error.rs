//! Error types for blueprint parsing, plan preparation, and loading.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Where an unknown input name was encountered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// A `get_input` reference at the given dotted path.
    Reference { path: String },
    /// An externally supplied input value.
    Supplied,
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Reference { path } => write!(f, "referenced at {}", path),
            InputSource::Supplied => f.write_str("supplied to deployment plan"),
        }
    }
}

/// Errors during blueprint parsing and deployment plan preparation.
///
/// Every variant carries the dotted path (or input name) of the offending
/// element. The first violation aborts the whole call.
#[derive(Debug, Error)]
pub enum DslError {
    #[error("{path}: expected {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("{path}: the only valid string for {field} is {literal}, got \"{value}\"")]
    InvalidLiteralInstances {
        path: String,
        field: String,
        literal: String,
        value: String,
    },

    #[error("{path}: {message}")]
    InvalidInstances { path: String, message: String },

    #[error("{path}: get_input expects exactly one input name string, got {actual}")]
    MalformedReference { path: String, actual: String },

    #[error("unknown input '{name}' {source_of}")]
    UnknownInput { name: String, source_of: InputSource },

    #[error("{path}: input '{name}' is required but no value was supplied and it has no default")]
    MissingRequiredInput { path: String, name: String },

    #[error("{path}: unknown field '{field}'")]
    UnknownField { path: String, field: String },

    #[error("{path}: missing required field '{field}'")]
    MissingField { path: String, field: String },

    #[error("{path}: unknown node type '{type_name}'")]
    UnknownNodeType { path: String, type_name: String },

    #[error("{path}: node type inheritance cycle: {}", .chain.join(" -> "))]
    CyclicNodeType { path: String, chain: Vec<String> },

    #[error("{path}: property '{property}' is not declared by node type '{type_name}'")]
    UnknownProperty {
        path: String,
        property: String,
        type_name: String,
    },

    #[error("{path}: property '{property}' of node type '{type_name}' has no default and was not set")]
    MissingProperty {
        path: String,
        property: String,
        type_name: String,
    },

    #[error("{path}: value conversion failed: {source}")]
    Encode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl DslError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }

    pub(crate) fn invalid_instances(path: &str, message: impl Into<String>) -> Self {
        DslError::InvalidInstances {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

/// Errors while loading blueprint or input documents.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid YAML: {source}")]
    InvalidYaml {
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid input assignment \"{assignment}\": expected key=value")]
    InvalidInputAssignment { assignment: String },

    #[error("inputs document {path} must be a mapping, got {actual}")]
    InvalidInputsFile { path: PathBuf, actual: String },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_exit_codes() {
        let err = LoadError::FileNotFound {
            path: PathBuf::from("blueprint.yaml"),
        };
        assert_eq!(err.exit_code(), 3);

        let err = LoadError::InvalidInputAssignment {
            assignment: "port".into(),
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn dsl_error_exit_code() {
        let err = DslError::MissingRequiredInput {
            path: "node_templates.web.properties.port".into(),
            name: "port".into(),
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn unknown_input_display() {
        let err = DslError::UnknownInput {
            name: "port".into(),
            source_of: InputSource::Reference {
                path: "node_templates.web.properties.port".into(),
            },
        };
        assert_eq!(
            err.to_string(),
            "unknown input 'port' referenced at node_templates.web.properties.port"
        );

        let err = DslError::UnknownInput {
            name: "a".into(),
            source_of: InputSource::Supplied,
        };
        assert_eq!(
            err.to_string(),
            "unknown input 'a' supplied to deployment plan"
        );
    }

    #[test]
    fn cyclic_node_type_display() {
        let err = DslError::CyclicNodeType {
            path: "node_types.a".into(),
            chain: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(
            err.to_string(),
            "node_types.a: node type inheritance cycle: a -> b -> a"
        );
    }
}
