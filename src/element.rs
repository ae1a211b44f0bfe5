//! Element framework - schema-driven validation and normalization of the
//! generic document tree.
//!
//! An [`Element`] binds a [`Schema`] to one position of the tree. Processing
//! an element runs two ordered phases:
//!
//! 1. `validate` - local constraints (the kind check is done by the framework
//!    before this runs) and, for composites, cross-field constraints over the
//!    already-parsed children.
//! 2. `parse` - produce the normalized output, substituting the element's
//!    default when the source value is absent.
//!
//! Composite results are collected into a [`Context`]: an immutable
//! name -> value map chained to the enclosing scope. Later children of a
//! [`Schema::Dict`] see their earlier siblings through it, and any element
//! can look up a result computed by an ancestor's earlier sibling.
//!
//! The first violation aborts the whole traversal; nothing partial escapes.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::DslError;
use crate::types::{value_type_name, Kind};

static NULL: Value = Value::Null;

/// Shape of the source value an element accepts.
pub enum Schema {
    /// A single value of one of the listed kinds.
    Leaf(&'static [Kind]),
    /// A mapping with a fixed set of named fields, processed in order.
    Dict(&'static [Field]),
    /// A mapping with arbitrary keys, every entry processed by one element.
    Map(&'static dyn Child),
}

/// One named field of a [`Schema::Dict`].
pub struct Field {
    pub name: &'static str,
    pub element: &'static dyn Child,
}

/// A position in the source tree.
#[derive(Debug, Clone)]
pub struct Node<'a> {
    name: &'a str,
    path: String,
    value: Option<&'a Value>,
}

impl<'a> Node<'a> {
    /// The document root.
    pub fn root(value: &'a Value) -> Self {
        Self {
            name: "",
            path: String::new(),
            value: present(Some(value)),
        }
    }

    /// The entry `key` below this node. Absent if this node is absent or not
    /// a mapping.
    pub fn child(&self, key: &'a str) -> Node<'a> {
        let path = if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        };
        Node {
            name: key,
            path,
            value: present(self.value.and_then(|v| v.get(key))),
        }
    }

    /// Field name (the key under which this node sits in its parent).
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Dotted path from the document root.
    pub fn path(&self) -> &str {
        if self.path.is_empty() {
            "<root>"
        } else {
            &self.path
        }
    }

    /// Source value; `None` when the key is missing or explicitly null.
    pub fn value(&self) -> Option<&'a Value> {
        self.value
    }

    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }

    fn mapping(&self, expected: &[Kind]) -> Result<Option<&'a Map<String, Value>>, DslError> {
        match self.value {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(other) => Err(self.type_mismatch(expected, other)),
        }
    }

    fn type_mismatch(&self, expected: &[Kind], actual: &Value) -> DslError {
        DslError::TypeMismatch {
            path: self.path().to_string(),
            expected: Kind::describe(expected),
            actual: value_type_name(actual).to_string(),
        }
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// Parsed results visible to an element, chained to the enclosing scope.
#[derive(Debug, Default)]
pub struct Context<'p> {
    values: Map<String, Value>,
    parent: Option<&'p Context<'p>>,
}

impl<'p> Context<'p> {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty scope nested inside this one.
    pub fn scope(&'p self) -> Context<'p> {
        Context {
            values: Map::new(),
            parent: Some(self),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Look `name` up in this scope, then in each enclosing scope.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        match self.values.get(name) {
            Some(value) => Some(value),
            None => self.parent.and_then(|p| p.lookup(name)),
        }
    }

    /// Deserialize the value named `name`. A missing name reads as null, so
    /// `Option<T>` yields `None` for it.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, DslError> {
        let value = self.lookup(name).unwrap_or(&NULL);
        T::deserialize(value).map_err(|source| DslError::Encode {
            path: name.to_string(),
            source,
        })
    }

    /// Deserialize every entry of this scope, keeping insertion order.
    pub fn collect<T: DeserializeOwned>(&self) -> Result<Vec<(String, T)>, DslError> {
        self.values
            .iter()
            .map(|(name, value)| {
                T::deserialize(value)
                    .map(|parsed| (name.clone(), parsed))
                    .map_err(|source| DslError::Encode {
                        path: name.clone(),
                        source,
                    })
            })
            .collect()
    }
}

/// A schema-bound validator/normalizer.
pub trait Element {
    type Output: Serialize;

    fn schema(&self) -> Schema;

    /// Check constraints. For composite schemas `cx` holds the parsed
    /// children; for leaves it holds the parsed earlier siblings.
    fn validate(&self, _node: &Node<'_>, _cx: &Context<'_>) -> Result<(), DslError> {
        Ok(())
    }

    fn parse(&self, node: &Node<'_>, cx: &Context<'_>) -> Result<Self::Output, DslError>;
}

/// Object-safe view of an [`Element`] whose output is stored as a tree value.
pub trait Child: Sync {
    fn process_value(&self, node: &Node<'_>, cx: &Context<'_>) -> Result<Value, DslError>;
}

impl<E: Element + Sync> Child for E {
    fn process_value(&self, node: &Node<'_>, cx: &Context<'_>) -> Result<Value, DslError> {
        let output = process(self, node, cx)?;
        serde_json::to_value(output).map_err(|source| DslError::Encode {
            path: node.path().to_string(),
            source,
        })
    }
}

/// Run both phases of `element` over `node`.
pub fn process<E: Element + ?Sized>(
    element: &E,
    node: &Node<'_>,
    cx: &Context<'_>,
) -> Result<E::Output, DslError> {
    match element.schema() {
        Schema::Leaf(kinds) => {
            if let Some(value) = node.value() {
                let accepted = Kind::of(value).is_some_and(|kind| kinds.contains(&kind));
                if !accepted {
                    return Err(node.type_mismatch(kinds, value));
                }
            }
            element.validate(node, cx)?;
            element.parse(node, cx)
        }
        Schema::Dict(fields) => {
            if let Some(map) = node.mapping(&[Kind::Mapping])? {
                if let Some(unknown) = map
                    .keys()
                    .find(|key| !fields.iter().any(|f| f.name == key.as_str()))
                {
                    return Err(DslError::UnknownField {
                        path: node.path().to_string(),
                        field: unknown.clone(),
                    });
                }
            }

            let mut scope = cx.scope();
            for field in fields {
                let child = node.child(field.name);
                let value = field.element.process_value(&child, &scope)?;
                scope.insert(field.name, value);
            }
            element.validate(node, &scope)?;
            element.parse(node, &scope)
        }
        Schema::Map(entry) => {
            let mut entries = cx.scope();
            if let Some(map) = node.mapping(&[Kind::Mapping])? {
                for key in map.keys() {
                    let child = node.child(key);
                    let value = entry.process_value(&child, cx)?;
                    entries.insert(key.clone(), value);
                }
            }
            element.validate(node, &entries)?;
            element.parse(node, &entries)
        }
    }
}

/// Process `element` against a whole document.
pub fn parse_document<E: Element + ?Sized>(
    element: &E,
    document: &Value,
) -> Result<E::Output, DslError> {
    process(element, &Node::root(document), &Context::new())
}

// --- Reusable leaves ---

/// Optional string.
pub struct Text;

impl Element for Text {
    type Output = Option<String>;

    fn schema(&self) -> Schema {
        Schema::Leaf(&[Kind::String])
    }

    fn parse(&self, node: &Node<'_>, _cx: &Context<'_>) -> Result<Self::Output, DslError> {
        Ok(node.value().and_then(Value::as_str).map(String::from))
    }
}

/// String that must be present.
pub struct RequiredText;

impl Element for RequiredText {
    type Output = String;

    fn schema(&self) -> Schema {
        Schema::Leaf(&[Kind::String])
    }

    fn validate(&self, node: &Node<'_>, _cx: &Context<'_>) -> Result<(), DslError> {
        require(node)
    }

    fn parse(&self, node: &Node<'_>, _cx: &Context<'_>) -> Result<Self::Output, DslError> {
        Ok(node
            .value()
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_default())
    }
}

/// Optional value of any shape, kept verbatim.
pub struct AnyValue;

impl Element for AnyValue {
    type Output = Option<Value>;

    fn schema(&self) -> Schema {
        Schema::Leaf(Kind::ANY)
    }

    fn parse(&self, node: &Node<'_>, _cx: &Context<'_>) -> Result<Self::Output, DslError> {
        Ok(node.value().cloned())
    }
}

/// Value of any shape that must be present.
pub struct RequiredValue;

impl Element for RequiredValue {
    type Output = Value;

    fn schema(&self) -> Schema {
        Schema::Leaf(Kind::ANY)
    }

    fn validate(&self, node: &Node<'_>, _cx: &Context<'_>) -> Result<(), DslError> {
        require(node)
    }

    fn parse(&self, node: &Node<'_>, _cx: &Context<'_>) -> Result<Self::Output, DslError> {
        Ok(node.value().cloned().unwrap_or(Value::Null))
    }
}

/// Mapping of free-form values, empty when absent.
pub struct Mapping;

impl Element for Mapping {
    type Output = Map<String, Value>;

    fn schema(&self) -> Schema {
        Schema::Leaf(&[Kind::Mapping])
    }

    fn parse(&self, node: &Node<'_>, _cx: &Context<'_>) -> Result<Self::Output, DslError> {
        Ok(node
            .value()
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default())
    }
}

fn require(node: &Node<'_>) -> Result<(), DslError> {
    if node.is_present() {
        Ok(())
    } else {
        Err(DslError::MissingField {
            path: node.path().to_string(),
            field: node.name().to_string(),
        })
    }
}
