// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(test)]

use anyhow::{anyhow, Result};
use formulus::*;

fn compile(definitions: &str, schema: &str) -> Result<Value> {
    let mut templates = TemplateRegistry::new();
    templates.register_all(&Value::from_json_str(definitions)?);
    templates
        .compile(&Value::from_json_str(schema)?)
        .map_err(|e| anyhow!("{e}"))
}

#[test]
fn instances_expand_with_params() -> Result<()> {
    let compiled = compile(
        r#"{
            "likert": {
                "structure": {
                    "kind": "interaction",
                    "domain_id": "$$INT",
                    "state": {"initial_value": {"param": "start"}},
                    "view": {"kind": "slider", "min": {"param": "low"}}
                }
            }
        }"#,
        r#"{
            "pages": [{
                "id": "p1",
                "blocks": [{
                    "kind": "template",
                    "template": "likert",
                    "id": "q1",
                    "params": {"start": 3, "low": 1}
                }]
            }]
        }"#,
    )?;

    let block = compiled.get_path("pages.0.blocks.0");
    assert_eq!(block.get_path("kind"), &Value::from("interaction"));
    assert_eq!(block.get_path("id"), &Value::from("q1"));
    assert_eq!(block.get_path("state.initial_value"), &Value::from(3));
    assert_eq!(block.get_path("view.min"), &Value::from(1));
    Ok(())
}

#[test]
fn compilation_leaves_the_input_alone() -> Result<()> {
    let mut templates = TemplateRegistry::new();
    templates.register("t", Value::from_json_str(r#"{"kind": "text", "text": "hi"}"#)?);

    let schema = Value::from_json_str(
        r#"{"pages": [{"id": "p1", "blocks": [{"kind": "template", "template": "t", "id": "b1"}]}]}"#,
    )?;
    let before = schema.clone();

    let compiled = templates.compile(&schema).map_err(|e| anyhow!("{e}"))?;
    assert_eq!(schema, before);
    assert_ne!(compiled, before);
    Ok(())
}

#[test]
fn missing_params_resolve_to_null() -> Result<()> {
    let compiled = compile(
        r#"{"t": {"kind": "text", "text": {"param": "label"}}}"#,
        r#"{"pages": [{"id": "p1", "blocks": [{"kind": "template", "template": "t", "id": "b1"}]}]}"#,
    )?;
    assert_eq!(
        compiled.get_path("pages.0.blocks.0.text"),
        &Value::Null
    );
    Ok(())
}

#[test]
fn runtime_vars_survive_expansion() -> Result<()> {
    // `var` is the runtime lookup operator; only loop variables introduced
    // by $$map may be substituted at compile time.
    let compiled = compile(
        r#"{
            "t": {
                "kind": "interaction",
                "domain_id": "$$ANY",
                "behavior": {"hidden": {"var": "other.value"}},
                "view": {"kind": "text"}
            }
        }"#,
        r#"{"pages": [{"id": "p1", "blocks": [{"kind": "template", "template": "t", "id": "q1"}]}]}"#,
    )?;
    assert_eq!(
        compiled.get_path("pages.0.blocks.0.behavior.hidden"),
        &Value::from_json_str(r#"{"var": "other.value"}"#)?
    );
    Ok(())
}

#[test]
fn map_directives_splice_into_arrays() -> Result<()> {
    let compiled = compile(
        r#"{
            "poll": {
                "kind": "container",
                "children": [
                    {"kind": "text", "id": "head"},
                    {"$$map": {
                        "source": {"param": "options"},
                        "as": "opt",
                        "template": {"kind": "text", "text": {"var": "opt.label"}}
                    }},
                    {"kind": "text", "id": "tail"}
                ]
            }
        }"#,
        r#"{
            "pages": [{
                "id": "p1",
                "blocks": [{
                    "kind": "template",
                    "template": "poll",
                    "id": "c1",
                    "params": {"options": [{"label": "A"}, {"label": "B"}]}
                }]
            }]
        }"#,
    )?;

    let children = compiled.get_path("pages.0.blocks.0.children");
    assert_eq!(children.as_array()?.len(), 4);
    assert_eq!(children.get_path("0.id"), &Value::from("head"));
    assert_eq!(children.get_path("1.text"), &Value::from("A"));
    assert_eq!(children.get_path("2.text"), &Value::from("B"));
    assert_eq!(children.get_path("3.id"), &Value::from("tail"));
    Ok(())
}

#[test]
fn switch_directives_compile_to_if_chains() -> Result<()> {
    let compiled = compile(
        r#"{
            "t": {
                "kind": "interaction",
                "domain_id": "$$ANY",
                "behavior": {
                    "hidden": {"$$switch": {
                        "on": {"param": "mode"},
                        "cases": [
                            {"match": "visible", "result": false},
                            {"match": "hidden", "result": true}
                        ],
                        "default": false
                    }}
                },
                "view": {"kind": "text"}
            }
        }"#,
        r#"{
            "pages": [{
                "id": "p1",
                "blocks": [
                    {"kind": "template", "template": "t", "id": "q1", "params": {"mode": "hidden"}},
                    {"kind": "template", "template": "t", "id": "q2", "params": {"mode": "other"}}
                ]
            }]
        }"#,
    )?;

    // The chain is ordinary logic; evaluating it proves the rewrite.
    let evaluator = Evaluator::new();
    let hidden_q1 = compiled.get_path("pages.0.blocks.0.behavior.hidden");
    let hidden_q2 = compiled.get_path("pages.0.blocks.1.behavior.hidden");
    assert_eq!(
        evaluator.evaluate(hidden_q1, &Value::new_object()),
        Value::Bool(true)
    );
    assert_eq!(
        evaluator.evaluate(hidden_q2, &Value::new_object()),
        Value::Bool(false)
    );
    Ok(())
}

#[test]
fn overlay_merges_instance_overrides() -> Result<()> {
    let compiled = compile(
        r#"{
            "q": {
                "structure": {
                    "kind": "interaction",
                    "domain_id": "$$INT",
                    "state": {"initial_value": 1},
                    "behavior": {
                        "listeners": {
                            "x.value": {"log": ["from-template"]},
                            "y.value": {"log": ["template-y"]}
                        },
                        "validators": [{"base": 1}]
                    },
                    "view": {"kind": "input"}
                }
            }
        }"#,
        r#"{
            "pages": [{
                "id": "p1",
                "blocks": [{
                    "kind": "template",
                    "template": "q",
                    "id": "q7",
                    "state": {"required": true},
                    "behavior": {
                        "listeners": {"y.value": {"log": ["instance-y"]}},
                        "validators": [{"extra": 2}]
                    }
                }]
            }]
        }"#,
    )?;

    let block = compiled.get_path("pages.0.blocks.0");
    assert_eq!(block.get_path("id"), &Value::from("q7"));

    // State merges shallowly; untouched keys survive.
    assert_eq!(block.get_path("state.initial_value"), &Value::from(1));
    assert_eq!(block.get_path("state.required"), &Value::Bool(true));

    // Listeners merge per trigger with the instance winning. The trigger
    // key itself contains a dot, so index it directly.
    let listeners = block.get_path("behavior.listeners");
    assert_eq!(
        &listeners["x.value"],
        &Value::from_json_str(r#"{"log": ["from-template"]}"#)?
    );
    assert_eq!(
        &listeners["y.value"],
        &Value::from_json_str(r#"{"log": ["instance-y"]}"#)?
    );

    // Validators concatenate, template's first.
    assert_eq!(
        block.get_path("behavior.validators"),
        &Value::from_json_str(r#"[{"base": 1}, {"extra": 2}]"#)?
    );
    Ok(())
}

#[test]
fn instances_nest_inside_expansions() -> Result<()> {
    let compiled = compile(
        r#"{
            "outer": {
                "kind": "container",
                "children": [{"kind": "template", "template": "inner", "id": "nested"}]
            },
            "inner": {"kind": "text", "text": "deep"}
        }"#,
        r#"{"pages": [{"id": "p1", "blocks": [{"kind": "template", "template": "outer", "id": "c1"}]}]}"#,
    )?;

    assert_eq!(
        compiled.get_path("pages.0.blocks.0.children.0.text"),
        &Value::from("deep")
    );
    assert_eq!(
        compiled.get_path("pages.0.blocks.0.children.0.id"),
        &Value::from("nested")
    );
    Ok(())
}

#[test]
fn unregistered_templates_are_errors() -> Result<()> {
    let templates = TemplateRegistry::new();
    let schema = Value::from_json_str(
        r#"{"pages": [{"id": "p1", "blocks": [{"kind": "template", "template": "ghost", "id": "b1"}]}]}"#,
    )?;
    assert!(matches!(
        templates.compile(&schema),
        Err(TemplateError::NotFound(_))
    ));
    Ok(())
}

#[test]
fn instances_must_name_a_template() -> Result<()> {
    let templates = TemplateRegistry::new();
    let schema = Value::from_json_str(
        r#"{"pages": [{"id": "p1", "blocks": [{"kind": "template", "id": "b1"}]}]}"#,
    )?;
    assert!(matches!(
        templates.compile(&schema),
        Err(TemplateError::MissingReference(_))
    ));
    Ok(())
}

#[test]
fn self_reference_hits_the_nesting_limit() -> Result<()> {
    let mut templates = TemplateRegistry::new();
    templates.register(
        "loop",
        Value::from_json_str(r#"{"kind": "template", "template": "loop"}"#)?,
    );
    let schema = Value::from_json_str(
        r#"{"pages": [{"id": "p1", "blocks": [{"kind": "template", "template": "loop", "id": "b1"}]}]}"#,
    )?;
    assert!(matches!(
        templates.compile(&schema),
        Err(TemplateError::RecursionLimit(_))
    ));
    Ok(())
}

#[test]
fn plain_schemas_compile_unchanged() -> Result<()> {
    let templates = TemplateRegistry::new();
    assert!(templates.is_empty());

    let schema = Value::from_json_str(
        r#"{"pages": [{"id": "p1", "blocks": [{"kind": "text", "id": "t1", "text": "hi"}]}]}"#,
    )?;
    let compiled = templates.compile(&schema).map_err(|e| anyhow!("{e}"))?;
    assert_eq!(compiled, schema);
    Ok(())
}
