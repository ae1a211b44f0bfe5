//! Blueprint and input loading.
//!
//! Handles loading YAML (or JSON) documents from files, strings, and HTTP
//! URLs into the generic tree.

use std::path::Path;

use serde_json::{Map, Value};

use crate::error::LoadError;
use crate::types::value_type_name;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a blueprint document from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidYaml` if the file isn't valid YAML.
pub fn load_blueprint(path: &Path) -> Result<Value, LoadError> {
    let content = read_file(path)?;
    load_blueprint_str(&content)
}

/// Load a blueprint document from a YAML string. JSON is valid YAML.
///
/// # Errors
///
/// Returns `LoadError::InvalidYaml` if the string isn't valid YAML.
pub fn load_blueprint_str(content: &str) -> Result<Value, LoadError> {
    serde_yaml::from_str(content).map_err(|source| LoadError::InvalidYaml { source })
}

/// Load a blueprint document from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails or the server
/// answers with an error status, or `LoadError::InvalidYaml` if the body
/// isn't valid YAML.
#[cfg(feature = "remote")]
pub fn load_blueprint_url(url: &str) -> Result<Value, LoadError> {
    let network_error = |source: reqwest::Error| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network_error)?;

    let body = client
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.text())
        .map_err(network_error)?;

    load_blueprint_str(&body)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a blueprint document from a file path or URL.
///
/// URL loading requires the `remote` feature.
///
/// # Errors
///
/// Returns appropriate errors based on the source type.
pub fn load_blueprint_auto(source: &str) -> Result<Value, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_blueprint_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_blueprint(Path::new(source))
    }
}

/// Parse a `key=value` input assignment. The value is read as YAML, so
/// `port=8080` yields an integer and `hosts=[a, b]` a sequence.
///
/// # Errors
///
/// Returns `LoadError::InvalidInputAssignment` if there is no `=` or the
/// key is empty.
pub fn parse_input_assignment(assignment: &str) -> Result<(String, Value), LoadError> {
    let invalid = || LoadError::InvalidInputAssignment {
        assignment: assignment.to_string(),
    };
    let (key, raw) = assignment.split_once('=').ok_or_else(invalid)?;
    let key = key.trim();
    if key.is_empty() {
        return Err(invalid());
    }

    let value = if raw.is_empty() {
        Value::String(String::new())
    } else {
        // Anything that isn't a YAML value on its own is taken as text
        serde_yaml::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    };
    Ok((key.to_string(), value))
}

/// Load input values from a YAML/JSON file whose root is a mapping. An empty
/// file yields no inputs.
///
/// # Errors
///
/// Returns the file errors of [`load_blueprint`], or
/// `LoadError::InvalidInputsFile` if the root is not a mapping.
pub fn load_inputs(path: &Path) -> Result<Map<String, Value>, LoadError> {
    let content = read_file(path)?;
    if content.trim().is_empty() {
        return Ok(Map::new());
    }
    match load_blueprint_str(&content)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(LoadError::InvalidInputsFile {
            path: path.to_path_buf(),
            actual: value_type_name(&other).to_string(),
        }),
    }
}

fn read_file(path: &Path) -> Result<String, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })
}
