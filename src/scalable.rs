//! Scaling policy elements.
//!
//! A node template's `capabilities.scalable.properties` declares how many
//! instances the orchestrator may run:
//!
//! | Field | Accepts | Default |
//! |-------|---------|---------|
//! | `min_instances` | integer >= 0 | 1 |
//! | `default_instances` | integer >= 0 | 1 |
//! | `max_instances` | integer >= 1, `-1`, or `"UNBOUNDED"` | unbounded |
//!
//! After parsing, `current_instances` and `planned_instances` both equal
//! `default_instances`.

use std::fmt;

use serde::de::{self, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::element::{Context, Element, Field, Node, Schema};
use crate::error::DslError;
use crate::types::{Kind, UNBOUNDED, UNBOUNDED_LITERAL};

const DEFAULT_INSTANCES: u64 = 1;

/// Upper instance limit.
///
/// Serialized as the integer limit, or `-1` when unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MaxInstances {
    Bounded(u64),
    #[default]
    Unbounded,
}

impl MaxInstances {
    /// Whether `count` instances fit under this limit.
    pub fn admits(&self, count: u64) -> bool {
        match self {
            MaxInstances::Bounded(max) => count <= *max,
            MaxInstances::Unbounded => true,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, MaxInstances::Unbounded)
    }
}

impl Serialize for MaxInstances {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MaxInstances::Bounded(n) => serializer.serialize_u64(*n),
            MaxInstances::Unbounded => serializer.serialize_i64(UNBOUNDED),
        }
    }
}

impl<'de> Deserialize<'de> for MaxInstances {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_i64(MaxInstancesVisitor)
    }
}

struct MaxInstancesVisitor;

impl<'de> Visitor<'de> for MaxInstancesVisitor {
    type Value = MaxInstances;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a non-negative instance limit or {}", UNBOUNDED)
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<MaxInstances, E> {
        Ok(MaxInstances::Bounded(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<MaxInstances, E> {
        if value == UNBOUNDED {
            return Ok(MaxInstances::Unbounded);
        }
        u64::try_from(value)
            .map(MaxInstances::Bounded)
            .map_err(|_| E::invalid_value(Unexpected::Signed(value), &self))
    }
}

impl fmt::Display for MaxInstances {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxInstances::Bounded(n) => write!(f, "{}", n),
            MaxInstances::Unbounded => f.write_str(UNBOUNDED_LITERAL),
        }
    }
}

/// Normalized scaling properties of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingProperties {
    pub min_instances: u64,
    pub max_instances: MaxInstances,
    pub default_instances: u64,
    pub current_instances: u64,
    pub planned_instances: u64,
}

impl Default for ScalingProperties {
    fn default() -> Self {
        Self::new(DEFAULT_INSTANCES, MaxInstances::Unbounded, DEFAULT_INSTANCES)
    }
}

impl ScalingProperties {
    /// Build from the three declared fields; current and planned counts
    /// start at `default_instances`.
    pub fn new(min_instances: u64, max_instances: MaxInstances, default_instances: u64) -> Self {
        Self {
            min_instances,
            max_instances,
            default_instances,
            current_instances: default_instances,
            planned_instances: default_instances,
        }
    }
}

/// The `scalable` capability of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScalableCapability {
    pub properties: ScalingProperties,
}

/// `min_instances` / `default_instances`: non-negative, default 1.
struct NonNegativeInstances;

impl Element for NonNegativeInstances {
    type Output = u64;

    fn schema(&self) -> Schema {
        Schema::Leaf(&[Kind::Integer])
    }

    fn validate(&self, node: &Node<'_>, _cx: &Context<'_>) -> Result<(), DslError> {
        match node.value().and_then(Value::as_i64) {
            Some(n) if n < 0 => Err(DslError::invalid_instances(
                node.path(),
                format!("{} should be a non negative value, got {}", node.name(), n),
            )),
            _ => Ok(()),
        }
    }

    fn parse(&self, node: &Node<'_>, _cx: &Context<'_>) -> Result<u64, DslError> {
        Ok(node
            .value()
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_INSTANCES))
    }
}

/// `max_instances`: positive integer or the unbounded literal/sentinel.
struct MaxInstancesElement;

impl Element for MaxInstancesElement {
    type Output = MaxInstances;

    fn schema(&self) -> Schema {
        Schema::Leaf(&[Kind::Integer, Kind::String])
    }

    fn validate(&self, node: &Node<'_>, _cx: &Context<'_>) -> Result<(), DslError> {
        match node.value() {
            Some(Value::String(s)) if s != UNBOUNDED_LITERAL => {
                Err(DslError::InvalidLiteralInstances {
                    path: node.path().to_string(),
                    field: node.name().to_string(),
                    literal: UNBOUNDED_LITERAL.to_string(),
                    value: s.clone(),
                })
            }
            Some(Value::Number(n)) => match n.as_i64() {
                Some(UNBOUNDED) => Ok(()),
                Some(v) if v < 1 => Err(DslError::invalid_instances(
                    node.path(),
                    format!("{} should be a positive value, got {}", node.name(), v),
                )),
                _ => Ok(()),
            },
            _ => Ok(()),
        }
    }

    fn parse(&self, node: &Node<'_>, _cx: &Context<'_>) -> Result<MaxInstances, DslError> {
        Ok(match node.value() {
            Some(Value::Number(n)) => match n.as_u64() {
                Some(max) => MaxInstances::Bounded(max),
                None => MaxInstances::Unbounded,
            },
            _ => MaxInstances::Unbounded,
        })
    }
}

/// The `properties` block of the `scalable` capability.
pub struct ScalingPropertiesElement;

impl ScalingPropertiesElement {
    const FIELDS: &'static [Field] = &[
        Field {
            name: "min_instances",
            element: &NonNegativeInstances,
        },
        Field {
            name: "max_instances",
            element: &MaxInstancesElement,
        },
        Field {
            name: "default_instances",
            element: &NonNegativeInstances,
        },
    ];

    fn declared(cx: &Context<'_>) -> Result<(u64, MaxInstances, u64), DslError> {
        Ok((
            cx.get("min_instances")?,
            cx.get("max_instances")?,
            cx.get("default_instances")?,
        ))
    }
}

impl Element for ScalingPropertiesElement {
    type Output = ScalingProperties;

    fn schema(&self) -> Schema {
        Schema::Dict(Self::FIELDS)
    }

    fn validate(&self, node: &Node<'_>, cx: &Context<'_>) -> Result<(), DslError> {
        let (min, max, default) = Self::declared(cx)?;

        if default < min {
            return Err(DslError::invalid_instances(
                node.path(),
                format!(
                    "default_instances ({}) cannot be smaller than min_instances ({})",
                    default, min
                ),
            ));
        }
        if max.is_unbounded() {
            return Ok(());
        }
        if !max.admits(min) {
            return Err(DslError::invalid_instances(
                node.path(),
                format!(
                    "min_instances ({}) cannot be greater than max_instances ({})",
                    min, max
                ),
            ));
        }
        if !max.admits(default) {
            return Err(DslError::invalid_instances(
                node.path(),
                format!(
                    "default_instances ({}) cannot be greater than max_instances ({})",
                    default, max
                ),
            ));
        }
        Ok(())
    }

    fn parse(&self, _node: &Node<'_>, cx: &Context<'_>) -> Result<ScalingProperties, DslError> {
        let (min, max, default) = Self::declared(cx)?;
        Ok(ScalingProperties::new(min, max, default))
    }
}

/// `scalable` capability.
pub struct ScalableElement;

impl ScalableElement {
    const FIELDS: &'static [Field] = &[Field {
        name: "properties",
        element: &ScalingPropertiesElement,
    }];
}

impl Element for ScalableElement {
    type Output = ScalableCapability;

    fn schema(&self) -> Schema {
        Schema::Dict(Self::FIELDS)
    }

    fn parse(&self, _node: &Node<'_>, cx: &Context<'_>) -> Result<ScalableCapability, DslError> {
        Ok(ScalableCapability {
            properties: cx.get("properties")?,
        })
    }
}

/// Parse a standalone scaling properties mapping.
///
/// # Errors
///
/// Returns `DslError::TypeMismatch`, `DslError::InvalidLiteralInstances`, or
/// `DslError::InvalidInstances` when the mapping violates the scaling policy.
pub fn parse_scaling_properties(value: &Value) -> Result<ScalingProperties, DslError> {
    crate::element::parse_document(&ScalingPropertiesElement, value)
}
