//! Deployment plan preparation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::blueprint::{Blueprint, Capabilities, NodeTemplate};
use crate::error::DslError;
use crate::functions::child_path;
use crate::inputs::InputResolver;

/// A blueprint with every input reference substituted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentPlan {
    /// Effective input values: supplied, else declared default.
    pub inputs: Map<String, Value>,
    /// Node templates as parsed, references left in place.
    pub node_templates: Vec<NodeTemplate>,
    /// Node templates with resolved properties.
    pub nodes: Vec<PlanNode>,
    pub outputs: Map<String, Value>,
}

impl DeploymentPlan {
    /// Look up a resolved node by id.
    pub fn node(&self, id: &str) -> Option<&PlanNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// A node of the deployment plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub type_hierarchy: Vec<String>,
    pub properties: Map<String, Value>,
    pub capabilities: Capabilities,
}

/// Prepare a deployment plan for `blueprint` with externally supplied input
/// values.
///
/// # Errors
///
/// - `DslError::UnknownInput` if `inputs` names an undeclared input. This is
///   checked before any reference is resolved.
/// - `DslError::MissingRequiredInput` if a reference names a required input
///   with no supplied value.
pub fn prepare_deployment_plan(
    blueprint: &Blueprint,
    inputs: Option<&Map<String, Value>>,
) -> Result<DeploymentPlan, DslError> {
    let empty = Map::new();
    let supplied = inputs.unwrap_or(&empty);
    debug!(supplied = supplied.len(), "preparing deployment plan");

    let resolver = InputResolver::new(&blueprint.inputs, supplied)?;

    let mut nodes = Vec::with_capacity(blueprint.node_templates.len());
    for template in &blueprint.node_templates {
        nodes.push(resolve_node(&resolver, template)?);
    }

    let mut outputs = Map::new();
    for (name, output) in &blueprint.outputs {
        let path = child_path(&child_path("outputs", name), "value");
        outputs.insert(name.clone(), resolver.resolve(&output.value, &path)?);
    }

    let plan = DeploymentPlan {
        inputs: resolver.resolved_inputs(),
        node_templates: blueprint.node_templates.clone(),
        nodes,
        outputs,
    };
    debug!(
        nodes = plan.nodes.len(),
        outputs = plan.outputs.len(),
        "prepared deployment plan"
    );
    Ok(plan)
}

fn resolve_node(resolver: &InputResolver<'_>, template: &NodeTemplate) -> Result<PlanNode, DslError> {
    let path = child_path(&child_path("node_templates", &template.name), "properties");
    let properties = resolver.resolve_object(&template.properties, &path)?;
    Ok(PlanNode {
        id: template.name.clone(),
        name: template.name.clone(),
        type_name: template.type_name.clone(),
        type_hierarchy: template.type_hierarchy.clone(),
        properties,
        capabilities: template.capabilities,
    })
}
