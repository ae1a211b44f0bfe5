//! Blueprint DSL
//!
//! Validation and deployment-plan preparation for declarative
//! infrastructure blueprints.
//!
//! A blueprint declares inputs, node types, and node templates. Parsing
//! checks every section against its schema, applies defaults, and verifies
//! that every `get_input` reference names a declared input. Preparing a
//! deployment plan then substitutes each reference with a supplied value or
//! the input's default.
//!
//! # Example
//!
//! ```
//! use blueprint_dsl::{parse_blueprint, prepare_deployment_plan, MaxInstances};
//! use serde_json::json;
//!
//! let blueprint = parse_blueprint(&json!({
//!     "inputs": { "port": { "default": 8080 } },
//!     "node_types": {
//!         "webserver_type": { "properties": { "port": {} } }
//!     },
//!     "node_templates": {
//!         "webserver": {
//!             "type": "webserver_type",
//!             "properties": { "port": { "get_input": "port" } },
//!             "capabilities": {
//!                 "scalable": { "properties": { "max_instances": "UNBOUNDED" } }
//!             }
//!         }
//!     }
//! }))
//! .unwrap();
//!
//! let supplied = json!({ "port": 9000 });
//! let plan = prepare_deployment_plan(&blueprint, supplied.as_object()).unwrap();
//!
//! let node = plan.node("webserver").unwrap();
//! assert_eq!(node.properties["port"], 9000);
//! assert_eq!(
//!     node.capabilities.scalable.properties.max_instances,
//!     MaxInstances::Unbounded
//! );
//! ```
//!
//! # Scaling Rules
//!
//! | Field | Default | Constraint |
//! |-------|---------|------------|
//! | `min_instances` | 1 | >= 0 |
//! | `default_instances` | 1 | >= `min_instances`, <= `max_instances` |
//! | `max_instances` | `UNBOUNDED` | >= `min_instances`; `-1` means unbounded |

mod blueprint;
mod element;
mod error;
mod functions;
mod inputs;
mod loader;
mod plan;
mod scalable;
mod types;

pub use blueprint::{
    parse_blueprint, Blueprint, Capabilities, NodeTemplate, NodeType, Output, PropertySchema,
};
pub use element::{parse_document, process, Child, Context, Element, Field, Node, Schema};
pub use error::{DslError, InputSource, LoadError};
pub use functions::{input_reference, visit_input_references};
pub use inputs::{InputDeclaration, InputResolver, Inputs, InputsElement};
pub use loader::{
    is_url, load_blueprint, load_blueprint_auto, load_blueprint_str, load_inputs,
    parse_input_assignment,
};
pub use plan::{prepare_deployment_plan, DeploymentPlan, PlanNode};
pub use scalable::{
    parse_scaling_properties, MaxInstances, ScalableCapability, ScalableElement,
    ScalingProperties, ScalingPropertiesElement,
};
pub use types::{value_type_name, Kind, GET_INPUT, UNBOUNDED, UNBOUNDED_LITERAL};

#[cfg(feature = "remote")]
pub use loader::load_blueprint_url;
