//! Integration tests for deployment plan preparation.

use blueprint_dsl::{
    load_blueprint_str, parse_blueprint, prepare_deployment_plan, Blueprint, DeploymentPlan,
    DslError, InputSource,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};

fn blueprint(yaml: &str) -> Blueprint {
    parse_blueprint(&load_blueprint_str(yaml).unwrap()).unwrap()
}

fn plan(yaml: &str, inputs: Value) -> Result<DeploymentPlan, DslError> {
    prepare_deployment_plan(&blueprint(yaml), inputs.as_object())
}

fn webserver(inputs: &str) -> String {
    format!(
        "
inputs:
{inputs}
node_types:
    webserver_type:
        properties:
            port: {{}}
node_templates:
    webserver:
        type: webserver_type
        properties:
            port: {{ get_input: port }}
"
    )
}

mod resolution {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn supplied_value_overrides_default() {
        let plan = plan(&webserver("    port: { default: 9000 }"), json!({ "port": 8000 })).unwrap();
        assert_eq!(plan.nodes[0].properties["port"], json!(8000));
    }

    #[test]
    fn default_used_when_not_supplied() {
        let plan = plan(&webserver("    port: { default: 8080 }"), Value::Null).unwrap();
        assert_eq!(plan.nodes[0].properties["port"], json!(8080));
    }

    #[test]
    fn nested_property_resolved() {
        let plan = plan(
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
                ports: [1, { get_input: port }]
",
            Value::Null,
        )
        .unwrap();
        assert_eq!(
            plan.nodes[0].properties["server"],
            json!({ "port": 8080, "ports": [1, 8080] })
        );
    }

    #[test]
    fn structured_values_substituted_whole() {
        let plan = plan(
            &webserver("    port: {}"),
            json!({ "port": { "number": 80, "protocol": "tcp" } }),
        )
        .unwrap();
        assert_eq!(
            plan.nodes[0].properties["port"],
            json!({ "number": 80, "protocol": "tcp" })
        );
    }

    #[test]
    fn outputs_resolved() {
        let plan = plan(
            "
inputs:
    host: {}
outputs:
    endpoint:
        description: where to connect
        value: { host: { get_input: host }, scheme: http }
",
            json!({ "host": "example.com" }),
        )
        .unwrap();
        assert_eq!(
            plan.outputs["endpoint"],
            json!({ "host": "example.com", "scheme": "http" })
        );
    }
}

mod failures {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_required_input() {
        let err = plan(&webserver("    port: {}"), Value::Null).unwrap_err();
        match err {
            DslError::MissingRequiredInput { path, name } => {
                assert_eq!(name, "port");
                assert_eq!(path, "node_templates.webserver.properties.port");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_supplied_input() {
        let err = plan(&webserver("    port: { default: 8080 }"), json!({ "a": "b" })).unwrap_err();
        assert!(matches!(
            err,
            DslError::UnknownInput { ref name, source_of: InputSource::Supplied } if name == "a"
        ));
    }

    #[test]
    fn unknown_supplied_checked_before_missing_required() {
        let err = plan(&webserver("    port: {}"), json!({ "a": "b" })).unwrap_err();
        assert!(matches!(err, DslError::UnknownInput { .. }));
    }

    #[test]
    fn unreferenced_required_input_may_stay_unset() {
        let plan = plan(
            "
inputs:
    port: { default: 8080 }
    unused: {}
",
            Value::Null,
        )
        .unwrap();
        assert_eq!(Value::Object(plan.inputs), json!({ "port": 8080 }));
    }
}

#[test]
fn supplying_nothing_equals_supplying_empty_map() {
    let bp = blueprint(&webserver("    port: { default: 8080 }"));
    let empty = Map::new();
    assert_eq!(
        prepare_deployment_plan(&bp, None).unwrap(),
        prepare_deployment_plan(&bp, Some(&empty)).unwrap()
    );
}

#[test]
fn preparing_twice_gives_identical_plans() {
    let bp = blueprint(&webserver("    port: { default: 8080 }"));
    let supplied = json!({ "port": 9000 });
    let first = prepare_deployment_plan(&bp, supplied.as_object()).unwrap();
    let second = prepare_deployment_plan(&bp, supplied.as_object()).unwrap();
    assert_eq!(first.nodes[0].properties["port"], json!(9000));
    assert_eq!(first, second);
}

#[test]
fn blueprint_is_not_modified() {
    let bp = blueprint(&webserver("    port: { default: 8080 }"));
    let before = bp.clone();
    let supplied = json!({ "port": 1 });
    prepare_deployment_plan(&bp, supplied.as_object()).unwrap();
    assert_eq!(bp, before);
}

#[test]
fn whole_plan_shape() {
    let plan = plan(
        "
inputs:
    port: { default: 8080 }
node_types:
    webserver_type:
        properties:
            port: {}
node_templates:
    webserver:
        type: webserver_type
        properties:
            port: { get_input: port }
        capabilities:
            scalable:
                properties: { min_instances: 2, default_instances: 2, max_instances: UNBOUNDED }
",
        json!({ "port": 9000 }),
    )
    .unwrap();

    let scalable = json!({
        "scalable": {
            "properties": {
                "min_instances": 2,
                "max_instances": -1,
                "default_instances": 2,
                "current_instances": 2,
                "planned_instances": 2
            }
        }
    });
    assert_eq!(
        serde_json::to_value(&plan).unwrap(),
        json!({
            "inputs": { "port": 9000 },
            "node_templates": [{
                "name": "webserver",
                "type": "webserver_type",
                "type_hierarchy": ["webserver_type"],
                "properties": { "port": { "get_input": "port" } },
                "capabilities": scalable.clone()
            }],
            "nodes": [{
                "id": "webserver",
                "name": "webserver",
                "type": "webserver_type",
                "type_hierarchy": ["webserver_type"],
                "properties": { "port": 9000 },
                "capabilities": scalable
            }],
            "outputs": {}
        })
    );
}
