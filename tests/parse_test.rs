//! Integration tests for blueprint parsing.

use blueprint_dsl::{load_blueprint_str, parse_blueprint, Blueprint, DslError, MaxInstances};
use serde_json::json;

fn parse(yaml: &str) -> Result<Blueprint, DslError> {
    let document = load_blueprint_str(yaml).unwrap();
    parse_blueprint(&document)
}

const WEBSERVER_TYPE: &str = "
node_types:
    webserver_type:
        properties:
            port: {}
";

// === Input Declarations ===

mod input_declarations {
    use super::*;

    #[test]
    fn empty_inputs_section() {
        let parsed = parse("inputs: {}\nnode_templates: {}\n").unwrap();
        assert!(parsed.inputs.is_empty());
    }

    #[test]
    fn input_with_description_and_default() {
        let parsed = parse(
            "
inputs:
    port:
        description: the port
        default: 8080
node_templates: {}
",
        )
        .unwrap();
        assert_eq!(parsed.inputs.len(), 1);
        assert_eq!(parsed.inputs["port"].default, Some(json!(8080)));
        assert_eq!(parsed.inputs["port"].description.as_deref(), Some("the port"));
    }

    #[test]
    fn two_inputs_one_empty() {
        let parsed = parse(
            "
inputs:
    port:
        description: the port
        default: 8080
    ip: {}
node_templates: {}
",
        )
        .unwrap();
        assert_eq!(parsed.inputs.len(), 2);
        assert!(parsed.inputs["ip"].is_required());

        // An empty declaration serializes with no keys
        let serialized = serde_json::to_value(&parsed).unwrap();
        assert_eq!(serialized["inputs"]["ip"], json!({}));
    }

    #[test]
    fn inputs_must_be_mapping() {
        let err = parse("inputs: [port]\n").unwrap_err();
        assert!(matches!(
            err,
            DslError::TypeMismatch { ref path, ref actual, .. }
                if path == "inputs" && actual == "sequence"
        ));
    }
}

// === Input References ===

mod input_references {
    use super::*;

    #[test]
    fn undeclared_input_rejected() {
        let yaml = format!(
            "{WEBSERVER_TYPE}
node_templates:
    webserver:
        type: webserver_type
        properties:
            port: {{ get_input: port }}
"
        );
        let err = parse(&yaml).unwrap_err();
        match err {
            DslError::UnknownInput { name, .. } => assert_eq!(name, "port"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_mapping_argument_is_malformed() {
        let yaml = format!(
            "{WEBSERVER_TYPE}
node_templates:
    webserver:
        type: webserver_type
        properties:
            port: {{ get_input: {{}} }}
"
        );
        let err = parse(&yaml).unwrap_err();
        assert!(matches!(
            err,
            DslError::MalformedReference { ref path, ref actual }
                if path == "node_templates.webserver.properties.port" && actual == "mapping"
        ));
    }

    #[test]
    fn declared_input_accepted() {
        let yaml = format!(
            "inputs:
    port: {{}}
{WEBSERVER_TYPE}
node_templates:
    webserver:
        type: webserver_type
        properties:
            port: {{ get_input: port }}
"
        );
        let parsed = parse(&yaml).unwrap();
        let template = parsed.node_template("webserver").unwrap();
        assert_eq!(template.properties["port"], json!({ "get_input": "port" }));
    }

    #[test]
    fn unknown_reference_in_nested_property() {
        let err = parse(
            "
inputs:
    port:
        default: 8080
node_types:
    webserver_type:
        properties:
            server: {}
node_templates:
    webserver:
        type: webserver_type
        properties:
            server:
                port: { get_input: port }
                some_prop: { get_input: unknown }
",
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown input 'unknown' referenced at node_templates.webserver.properties.server.some_prop"
        );
    }

    #[test]
    fn reference_inside_sequence_checked() {
        let err = parse(
            "
node_types:
    t:
        properties:
            hosts: {}
node_templates:
    web:
        type: t
        properties:
            hosts: [a, { get_input: host }]
",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DslError::UnknownInput { ref name, .. } if name == "host"
        ));
    }

    #[test]
    fn get_input_beside_other_keys_is_data() {
        let parsed = parse(
            "
node_types:
    t:
        properties:
            cfg: {}
node_templates:
    web:
        type: t
        properties:
            cfg: { get_input: nothing, other: 1 }
",
        )
        .unwrap();
        assert_eq!(
            parsed.node_templates[0].properties["cfg"],
            json!({ "get_input": "nothing", "other": 1 })
        );
    }
}

// === Scaling Capability ===

mod scaling {
    use super::*;

    fn with_scaling(properties: &str) -> String {
        format!(
            "
node_types:
    t: {{}}
node_templates:
    web:
        type: t
        capabilities:
            scalable:
                properties: {properties}
"
        )
    }

    #[test]
    fn defaults_applied() {
        let parsed = parse(&with_scaling("{}")).unwrap();
        let scaling = parsed.node_templates[0].capabilities.scalable.properties;
        assert_eq!(scaling.min_instances, 1);
        assert_eq!(scaling.default_instances, 1);
        assert_eq!(scaling.current_instances, 1);
        assert_eq!(scaling.planned_instances, 1);
        assert_eq!(scaling.max_instances, MaxInstances::Unbounded);
    }

    #[test]
    fn explicit_bounds() {
        let parsed = parse(&with_scaling(
            "{ min_instances: 2, default_instances: 3, max_instances: 5 }",
        ))
        .unwrap();
        let scaling = parsed.node_templates[0].capabilities.scalable.properties;
        assert_eq!(scaling.min_instances, 2);
        assert_eq!(scaling.planned_instances, 3);
        assert_eq!(scaling.max_instances, MaxInstances::Bounded(5));
    }

    #[test]
    fn default_below_min_rejected() {
        let err = parse(&with_scaling("{ min_instances: 2, default_instances: 1 }")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "node_templates.web.capabilities.scalable.properties: \
             default_instances (1) cannot be smaller than min_instances (2)"
        );
    }

    #[test]
    fn bad_literal_rejected() {
        let err = parse(&with_scaling("{ max_instances: infinite }")).unwrap_err();
        assert!(err
            .to_string()
            .contains("the only valid string for max_instances is UNBOUNDED"));
    }

    #[test]
    fn unknown_scaling_field_rejected() {
        let err = parse(&with_scaling("{ max_instance: 3 }")).unwrap_err();
        assert!(matches!(
            err,
            DslError::UnknownField { ref field, .. } if field == "max_instance"
        ));
    }
}

// === Node Types ===

mod node_types {
    use super::*;

    #[test]
    fn hierarchy_and_inherited_properties() {
        let parsed = parse(
            "
node_types:
    base:
        properties:
            port: { default: 80 }
    webserver_type:
        derived_from: base
        properties:
            root: { type: string, default: /var/www }
node_templates:
    webserver:
        type: webserver_type
",
        )
        .unwrap();
        let template = parsed.node_template("webserver").unwrap();
        assert_eq!(template.type_hierarchy, vec!["base", "webserver_type"]);
        assert_eq!(template.properties["port"], json!(80));
        assert_eq!(template.properties["root"], json!("/var/www"));

        let schema = &parsed.node_types["webserver_type"].properties["root"];
        assert_eq!(schema.type_name.as_deref(), Some("string"));
    }

    #[test]
    fn self_derivation_is_a_cycle() {
        let err = parse("node_types:\n    t: { derived_from: t }\n").unwrap_err();
        assert!(matches!(err, DslError::CyclicNodeType { .. }));
    }

    #[test]
    fn template_type_must_exist() {
        let err = parse("node_templates:\n    web: { type: nope }\n").unwrap_err();
        assert_eq!(err.to_string(), "node_templates.web.type: unknown node type 'nope'");
    }
}

#[test]
fn first_violation_wins() {
    // inputs are checked before node templates
    let err = parse(
        "
inputs:
    port: { default: 1, extra: 2 }
node_templates:
    web: { type: nope }
",
    )
    .unwrap_err();
    assert!(matches!(err, DslError::UnknownField { ref path, .. } if path == "inputs.port"));
}

#[test]
fn top_level_metadata_kept() {
    let parsed = parse(
        "
tosca_definitions_version: cloudify_dsl_1_0
description: a web tier
",
    )
    .unwrap();
    assert_eq!(
        parsed.tosca_definitions_version.as_deref(),
        Some("cloudify_dsl_1_0")
    );
    assert_eq!(parsed.description.as_deref(), Some("a web tier"));
}
