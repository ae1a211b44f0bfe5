//! Input declarations and input reference resolution.
//!
//! Inputs are resolved in two passes:
//!
//! 1. Blueprint parse: every `get_input` reference must be well formed and
//!    name a declared input. No values are known yet.
//! 2. Plan preparation: supplied values are checked against the
//!    declarations once, up front; then each reference is substituted with
//!    the supplied value, else the declared default. A required input with
//!    neither fails only when a reference to it is actually visited.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::trace;

use crate::element::{AnyValue, Context, Element, Field, Node, Schema, Text};
use crate::error::{DslError, InputSource};
use crate::functions::{child_path, index_path, input_reference, visit_input_references};

/// A declared blueprint input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputDeclaration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl InputDeclaration {
    /// An input without a default must be supplied wherever it is used.
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Declared inputs keyed by name, in document order.
pub type Inputs = IndexMap<String, InputDeclaration>;

struct InputElement;

impl InputElement {
    const FIELDS: &'static [Field] = &[
        Field {
            name: "description",
            element: &Text,
        },
        Field {
            name: "default",
            element: &AnyValue,
        },
    ];
}

impl Element for InputElement {
    type Output = InputDeclaration;

    fn schema(&self) -> Schema {
        Schema::Dict(Self::FIELDS)
    }

    fn parse(&self, _node: &Node<'_>, cx: &Context<'_>) -> Result<InputDeclaration, DslError> {
        Ok(InputDeclaration {
            description: cx.get("description")?,
            default: cx.get("default")?,
        })
    }
}

/// The blueprint's `inputs` section.
pub struct InputsElement;

impl Element for InputsElement {
    type Output = Inputs;

    fn schema(&self) -> Schema {
        Schema::Map(&InputElement)
    }

    fn parse(&self, _node: &Node<'_>, cx: &Context<'_>) -> Result<Inputs, DslError> {
        Ok(cx.collect::<InputDeclaration>()?.into_iter().collect())
    }
}

/// Check that every input reference in `value` is well formed and names an
/// input declared in the parsed `inputs` section visible from `cx`.
///
/// # Errors
///
/// Returns `DslError::MalformedReference` or `DslError::UnknownInput`.
pub(crate) fn verify_references(value: &Value, path: &str, cx: &Context<'_>) -> Result<(), DslError> {
    let declared = cx.lookup("inputs").and_then(Value::as_object);
    visit_input_references(value, path, &mut |name, path| {
        if declared.is_some_and(|inputs| inputs.contains_key(name)) {
            Ok(())
        } else {
            Err(DslError::UnknownInput {
                name: name.to_string(),
                source_of: InputSource::Reference {
                    path: path.to_string(),
                },
            })
        }
    })
}

/// Substitutes input references with concrete values.
#[derive(Debug, Clone)]
pub struct InputResolver<'a> {
    declarations: &'a Inputs,
    supplied: &'a Map<String, Value>,
}

impl<'a> InputResolver<'a> {
    /// Create a resolver over `declarations` and externally `supplied` values.
    ///
    /// # Errors
    ///
    /// Returns `DslError::UnknownInput` for the first supplied name that is
    /// not declared.
    pub fn new(declarations: &'a Inputs, supplied: &'a Map<String, Value>) -> Result<Self, DslError> {
        if let Some(unknown) = supplied.keys().find(|name| !declarations.contains_key(*name)) {
            return Err(DslError::UnknownInput {
                name: unknown.clone(),
                source_of: InputSource::Supplied,
            });
        }
        Ok(Self {
            declarations,
            supplied,
        })
    }

    /// Value of input `name` for a reference at `path`.
    ///
    /// # Errors
    ///
    /// Returns `DslError::UnknownInput` if `name` is not declared, or
    /// `DslError::MissingRequiredInput` if it has neither a supplied value
    /// nor a default.
    pub fn value_of(&self, name: &str, path: &str) -> Result<Value, DslError> {
        let Some(declaration) = self.declarations.get(name) else {
            return Err(DslError::UnknownInput {
                name: name.to_string(),
                source_of: InputSource::Reference {
                    path: path.to_string(),
                },
            });
        };
        self.supplied
            .get(name)
            .or(declaration.default.as_ref())
            .cloned()
            .ok_or_else(|| DslError::MissingRequiredInput {
                path: path.to_string(),
                name: name.to_string(),
            })
    }

    /// Return a copy of `value` with every input reference substituted.
    ///
    /// Substituted values are inserted verbatim; they are not resolved again.
    ///
    /// # Errors
    ///
    /// Fails on the first reference that cannot be resolved.
    pub fn resolve(&self, value: &Value, path: &str) -> Result<Value, DslError> {
        if let Some(name) = input_reference(value, path)? {
            let resolved = self.value_of(name, path)?;
            trace!(input = name, path, "resolved input reference");
            return Ok(resolved);
        }
        match value {
            Value::Object(map) => self.resolve_object(map, path).map(Value::Object),
            Value::Array(items) => self.resolve_array(items, path),
            // Scalars pass through unchanged
            other => Ok(other.clone()),
        }
    }

    /// Resolve every entry of a mapping, keeping key order.
    ///
    /// # Errors
    ///
    /// Fails on the first reference that cannot be resolved.
    pub fn resolve_object(
        &self,
        map: &Map<String, Value>,
        path: &str,
    ) -> Result<Map<String, Value>, DslError> {
        let mut result = Map::new();
        for (key, value) in map {
            let resolved = self.resolve(value, &child_path(path, key))?;
            result.insert(key.clone(), resolved);
        }
        Ok(result)
    }

    fn resolve_array(&self, items: &[Value], path: &str) -> Result<Value, DslError> {
        let mut result = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            result.push(self.resolve(item, &index_path(path, i))?);
        }
        Ok(Value::Array(result))
    }

    /// Effective value of every declared input that has one, supplied values
    /// taking precedence over defaults. Required inputs without a supplied
    /// value are left out.
    pub fn resolved_inputs(&self) -> Map<String, Value> {
        self.declarations
            .iter()
            .filter_map(|(name, declaration)| {
                self.supplied
                    .get(name)
                    .or(declaration.default.as_ref())
                    .map(|value| (name.clone(), value.clone()))
            })
            .collect()
    }
}
