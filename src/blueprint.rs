//! Blueprint elements - the element tree for a whole blueprint document.
//!
//! ```yaml
//! inputs:
//!   port: { default: 8080 }
//! node_types:
//!   webserver_type:
//!     properties:
//!       port: {}
//! node_templates:
//!   webserver:
//!     type: webserver_type
//!     properties:
//!       port: { get_input: port }
//!     capabilities:
//!       scalable:
//!         properties: { min_instances: 1, max_instances: 3 }
//! ```
//!
//! Sections are parsed in the order above, so node templates can check
//! their type and their input references against the already-parsed
//! `node_types` and `inputs`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::element::{
    parse_document, AnyValue, Context, Element, Field, Mapping, Node, RequiredText,
    RequiredValue, Schema, Text,
};
use crate::error::DslError;
use crate::functions::child_path;
use crate::inputs::{verify_references, Inputs, InputsElement};
use crate::scalable::{ScalableCapability, ScalableElement};

/// Schema of one node type property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// A node type with its inherited property schema flattened in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_from: Option<String>,
    /// Type names from the root ancestor down to this type.
    pub type_hierarchy: Vec<String>,
    /// Effective property schema: ancestors first, overridden by descendants.
    pub properties: IndexMap<String, PropertySchema>,
}

/// Node capabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub scalable: ScalableCapability,
}

/// A parsed node template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTemplate {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub type_hierarchy: Vec<String>,
    /// Template properties with type defaults filled in. Input references
    /// are still unresolved.
    pub properties: Map<String, Value>,
    pub capabilities: Capabilities,
}

/// A blueprint output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub value: Value,
}

/// A parsed, validated blueprint. Input references are checked but not yet
/// resolved; see [`crate::prepare_deployment_plan`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tosca_definitions_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub inputs: Inputs,
    pub node_types: IndexMap<String, NodeType>,
    pub node_templates: Vec<NodeTemplate>,
    pub outputs: IndexMap<String, Output>,
}

impl Blueprint {
    /// Look up a node template by name.
    pub fn node_template(&self, name: &str) -> Option<&NodeTemplate> {
        self.node_templates.iter().find(|t| t.name == name)
    }
}

/// Parse and validate a blueprint document.
///
/// # Errors
///
/// Returns the first `DslError` found. Input references are checked for
/// shape and declared names only; missing values surface at plan
/// preparation.
pub fn parse_blueprint(document: &Value) -> Result<Blueprint, DslError> {
    debug!("parsing blueprint");
    let blueprint = parse_document(&BlueprintElement, document)?;
    debug!(
        inputs = blueprint.inputs.len(),
        node_types = blueprint.node_types.len(),
        node_templates = blueprint.node_templates.len(),
        outputs = blueprint.outputs.len(),
        "parsed blueprint"
    );
    Ok(blueprint)
}

// --- Node types ---

struct PropertySchemaElement;

impl PropertySchemaElement {
    const FIELDS: &'static [Field] = &[
        Field {
            name: "description",
            element: &Text,
        },
        Field {
            name: "type",
            element: &Text,
        },
        Field {
            name: "default",
            element: &AnyValue,
        },
    ];
}

impl Element for PropertySchemaElement {
    type Output = PropertySchema;

    fn schema(&self) -> Schema {
        Schema::Dict(Self::FIELDS)
    }

    fn parse(&self, _node: &Node<'_>, cx: &Context<'_>) -> Result<PropertySchema, DslError> {
        Ok(PropertySchema {
            description: cx.get("description")?,
            type_name: cx.get("type")?,
            default: cx.get("default")?,
        })
    }
}

struct PropertySchemasElement;

impl Element for PropertySchemasElement {
    type Output = IndexMap<String, PropertySchema>;

    fn schema(&self) -> Schema {
        Schema::Map(&PropertySchemaElement)
    }

    fn parse(&self, _node: &Node<'_>, cx: &Context<'_>) -> Result<Self::Output, DslError> {
        Ok(cx.collect::<PropertySchema>()?.into_iter().collect())
    }
}

/// A node type as declared, before inheritance is applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DeclaredNodeType {
    derived_from: Option<String>,
    properties: IndexMap<String, PropertySchema>,
}

struct NodeTypeElement;

impl NodeTypeElement {
    const FIELDS: &'static [Field] = &[
        Field {
            name: "derived_from",
            element: &Text,
        },
        Field {
            name: "properties",
            element: &PropertySchemasElement,
        },
    ];
}

impl Element for NodeTypeElement {
    type Output = DeclaredNodeType;

    fn schema(&self) -> Schema {
        Schema::Dict(Self::FIELDS)
    }

    fn parse(&self, _node: &Node<'_>, cx: &Context<'_>) -> Result<DeclaredNodeType, DslError> {
        Ok(DeclaredNodeType {
            derived_from: cx.get("derived_from")?,
            properties: cx.get("properties")?,
        })
    }
}

struct NodeTypesElement;

impl NodeTypesElement {
    fn declared(cx: &Context<'_>) -> Result<IndexMap<String, DeclaredNodeType>, DslError> {
        Ok(cx.collect::<DeclaredNodeType>()?.into_iter().collect())
    }
}

/// Type names from the root ancestor down to `name`.
fn type_hierarchy(
    name: &str,
    declared: &IndexMap<String, DeclaredNodeType>,
    path: &str,
) -> Result<Vec<String>, DslError> {
    let mut chain = vec![name.to_string()];
    let mut current = name;
    while let Some(parent) = declared
        .get(current)
        .and_then(|t| t.derived_from.as_deref())
    {
        if !declared.contains_key(parent) {
            return Err(DslError::UnknownNodeType {
                path: child_path(&child_path(path, current), "derived_from"),
                type_name: parent.to_string(),
            });
        }
        let cycle = chain.iter().any(|seen| seen == parent);
        chain.push(parent.to_string());
        if cycle {
            return Err(DslError::CyclicNodeType {
                path: child_path(path, name),
                chain,
            });
        }
        current = parent;
    }
    chain.reverse();
    Ok(chain)
}

impl Element for NodeTypesElement {
    type Output = IndexMap<String, NodeType>;

    fn schema(&self) -> Schema {
        Schema::Map(&NodeTypeElement)
    }

    fn validate(&self, node: &Node<'_>, cx: &Context<'_>) -> Result<(), DslError> {
        let declared = Self::declared(cx)?;
        for name in declared.keys() {
            type_hierarchy(name, &declared, &node_path(node))?;
        }
        Ok(())
    }

    fn parse(&self, node: &Node<'_>, cx: &Context<'_>) -> Result<Self::Output, DslError> {
        let declared = Self::declared(cx)?;
        let mut types = IndexMap::with_capacity(declared.len());
        for (name, node_type) in &declared {
            let hierarchy = type_hierarchy(name, &declared, &node_path(node))?;
            let mut properties = IndexMap::new();
            for ancestor in &hierarchy {
                if let Some(ancestor_type) = declared.get(ancestor) {
                    for (property, schema) in &ancestor_type.properties {
                        properties.insert(property.clone(), schema.clone());
                    }
                }
            }
            types.insert(
                name.clone(),
                NodeType {
                    derived_from: node_type.derived_from.clone(),
                    type_hierarchy: hierarchy,
                    properties,
                },
            );
        }
        Ok(types)
    }
}

/// The node's path, or empty for the document root.
fn node_path(node: &Node<'_>) -> String {
    if node.name().is_empty() {
        String::new()
    } else {
        node.path().to_string()
    }
}

// --- Node templates ---

struct CapabilitiesElement;

impl CapabilitiesElement {
    const FIELDS: &'static [Field] = &[Field {
        name: "scalable",
        element: &ScalableElement,
    }];
}

impl Element for CapabilitiesElement {
    type Output = Capabilities;

    fn schema(&self) -> Schema {
        Schema::Dict(Self::FIELDS)
    }

    fn parse(&self, _node: &Node<'_>, cx: &Context<'_>) -> Result<Capabilities, DslError> {
        Ok(Capabilities {
            scalable: cx.get("scalable")?,
        })
    }
}

struct NodeTemplateElement;

impl NodeTemplateElement {
    const FIELDS: &'static [Field] = &[
        Field {
            name: "type",
            element: &RequiredText,
        },
        Field {
            name: "properties",
            element: &Mapping,
        },
        Field {
            name: "capabilities",
            element: &CapabilitiesElement,
        },
    ];

    /// The template's node type, looked up in the parsed `node_types`.
    fn node_type(node: &Node<'_>, cx: &Context<'_>) -> Result<(String, NodeType), DslError> {
        let type_name: String = cx.get("type")?;
        let Some(declared) = cx.lookup("node_types").and_then(|types| types.get(&type_name))
        else {
            return Err(DslError::UnknownNodeType {
                path: child_path(node.path(), "type"),
                type_name,
            });
        };
        let node_type = NodeType::deserialize(declared).map_err(|source| DslError::Encode {
            path: child_path(node.path(), "type"),
            source,
        })?;
        Ok((type_name, node_type))
    }

    /// Template properties followed by defaults of the type's properties the
    /// template leaves unset.
    fn effective_properties(
        node: &Node<'_>,
        type_name: &str,
        node_type: &NodeType,
        cx: &Context<'_>,
    ) -> Result<Map<String, Value>, DslError> {
        let properties_path = child_path(node.path(), "properties");
        let mut properties: Map<String, Value> = cx.get("properties")?;

        if let Some(unknown) = properties
            .keys()
            .find(|name| !node_type.properties.contains_key(name.as_str()))
        {
            return Err(DslError::UnknownProperty {
                path: child_path(&properties_path, unknown),
                property: unknown.clone(),
                type_name: type_name.to_string(),
            });
        }

        for (name, schema) in &node_type.properties {
            if properties.contains_key(name) {
                continue;
            }
            match &schema.default {
                Some(default) => {
                    properties.insert(name.clone(), default.clone());
                }
                None => {
                    return Err(DslError::MissingProperty {
                        path: properties_path,
                        property: name.clone(),
                        type_name: type_name.to_string(),
                    })
                }
            }
        }
        Ok(properties)
    }
}

impl Element for NodeTemplateElement {
    type Output = NodeTemplate;

    fn schema(&self) -> Schema {
        Schema::Dict(Self::FIELDS)
    }

    fn validate(&self, node: &Node<'_>, cx: &Context<'_>) -> Result<(), DslError> {
        let (type_name, node_type) = Self::node_type(node, cx)?;
        let properties = Self::effective_properties(node, &type_name, &node_type, cx)?;
        for (name, value) in &properties {
            let path = child_path(&child_path(node.path(), "properties"), name);
            verify_references(value, &path, cx)?;
        }
        Ok(())
    }

    fn parse(&self, node: &Node<'_>, cx: &Context<'_>) -> Result<NodeTemplate, DslError> {
        let (type_name, node_type) = Self::node_type(node, cx)?;
        let properties = Self::effective_properties(node, &type_name, &node_type, cx)?;
        Ok(NodeTemplate {
            name: node.name().to_string(),
            type_name,
            type_hierarchy: node_type.type_hierarchy,
            properties,
            capabilities: cx.get("capabilities")?,
        })
    }
}

struct NodeTemplatesElement;

impl Element for NodeTemplatesElement {
    type Output = Vec<NodeTemplate>;

    fn schema(&self) -> Schema {
        Schema::Map(&NodeTemplateElement)
    }

    fn parse(&self, _node: &Node<'_>, cx: &Context<'_>) -> Result<Vec<NodeTemplate>, DslError> {
        Ok(cx
            .collect::<NodeTemplate>()?
            .into_iter()
            .map(|(_, template)| template)
            .collect())
    }
}

// --- Outputs ---

struct OutputElement;

impl OutputElement {
    const FIELDS: &'static [Field] = &[
        Field {
            name: "description",
            element: &Text,
        },
        Field {
            name: "value",
            element: &RequiredValue,
        },
    ];
}

impl Element for OutputElement {
    type Output = Output;

    fn schema(&self) -> Schema {
        Schema::Dict(Self::FIELDS)
    }

    fn validate(&self, node: &Node<'_>, cx: &Context<'_>) -> Result<(), DslError> {
        let value: Value = cx.get("value")?;
        verify_references(&value, &child_path(node.path(), "value"), cx)
    }

    fn parse(&self, _node: &Node<'_>, cx: &Context<'_>) -> Result<Output, DslError> {
        Ok(Output {
            description: cx.get("description")?,
            value: cx.get("value")?,
        })
    }
}

struct OutputsElement;

impl Element for OutputsElement {
    type Output = IndexMap<String, Output>;

    fn schema(&self) -> Schema {
        Schema::Map(&OutputElement)
    }

    fn parse(&self, _node: &Node<'_>, cx: &Context<'_>) -> Result<Self::Output, DslError> {
        Ok(cx.collect::<Output>()?.into_iter().collect())
    }
}

// --- Document ---

struct BlueprintElement;

impl BlueprintElement {
    const FIELDS: &'static [Field] = &[
        Field {
            name: "tosca_definitions_version",
            element: &Text,
        },
        Field {
            name: "description",
            element: &Text,
        },
        Field {
            name: "inputs",
            element: &InputsElement,
        },
        Field {
            name: "node_types",
            element: &NodeTypesElement,
        },
        Field {
            name: "node_templates",
            element: &NodeTemplatesElement,
        },
        Field {
            name: "outputs",
            element: &OutputsElement,
        },
    ];
}

impl Element for BlueprintElement {
    type Output = Blueprint;

    fn schema(&self) -> Schema {
        Schema::Dict(Self::FIELDS)
    }

    fn parse(&self, _node: &Node<'_>, cx: &Context<'_>) -> Result<Blueprint, DslError> {
        Ok(Blueprint {
            tosca_definitions_version: cx.get("tosca_definitions_version")?,
            description: cx.get("description")?,
            inputs: cx.get("inputs")?,
            node_types: cx.get("node_types")?,
            node_templates: cx.get("node_templates")?,
            outputs: cx.get("outputs")?,
        })
    }
}
