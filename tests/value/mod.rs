// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(test)]

use anyhow::Result;
use formulus::*;

#[test]
fn undefined_round_trip() -> Result<()> {
    // Undefined has no JSON form; it serializes as a marker string.
    assert_eq!(serde_json::to_string(&Value::Undefined)?, "\"<undefined>\"");
    assert_eq!(Value::Undefined.to_string(), "\"<undefined>\"");

    let mut obj = Value::new_object();
    obj.as_object_mut()?
        .insert("absent".into(), Value::Undefined);
    assert_eq!(serde_json::to_string(&obj)?, r#"{"absent":"<undefined>"}"#);
    Ok(())
}

#[test]
fn serialize_number() -> Result<()> {
    // Check that integer values are serialized without fractional part
    assert_eq!(serde_json::to_string_pretty(&Value::from(1.0))?, "1");
    assert_eq!(serde_json::to_string_pretty(&Value::from(-1.0))?, "-1");

    // Ensure that fractional parts are also serialized.
    assert_eq!(serde_json::to_string_pretty(&Value::from(1.1))?, "1.1");
    assert_eq!(serde_json::to_string_pretty(&Value::from(-1.1))?, "-1.1");

    // Non-finite floats have no JSON representation.
    assert_eq!(serde_json::to_string(&Value::from(f64::NAN))?, "null");
    Ok(())
}

#[test]
fn parse_numbers_by_value() -> Result<()> {
    // Whole numbers compare equal across the int/float split.
    assert_eq!(Value::from_json_str("3")?, Value::from(3));
    assert_eq!(Value::from_json_str("3.0")?, Value::from(3));
    assert_ne!(Value::from_json_str("3.5")?, Value::from(3));
    Ok(())
}

#[test]
fn constructors() -> Result<()> {
    assert_eq!(Value::new_object(), Value::from_json_str("{}")?);
    assert_eq!(Value::new_array(), Value::from_json_str("[]")?);
    assert!(Value::new_object().as_object()?.is_empty());
    Ok(())
}

#[test]
fn usize_as_index() -> Result<()> {
    assert_eq!(&Value::from_json_str("[1, 2, 3]")?[0], &Value::from(1));
    assert_eq!(&Value::from_json_str("[1, 2, 3]")?[5], &Value::Undefined);

    // Non indexable values yield undefined rather than panicking.
    assert_eq!(&Value::Null[0], &Value::Undefined);
    assert_eq!(&Value::Bool(true)[1], &Value::Undefined);
    Ok(())
}

#[test]
fn string_as_index() -> Result<()> {
    let obj = Value::from_json_str(r#"{ "a" : 5, "b" : 6 }"#)?;
    assert_eq!(&obj["a"], &Value::from(5));
    assert_eq!(&obj["b".to_owned()], &Value::from(6));
    assert_eq!(&obj["missing"], &Value::Undefined);
    Ok(())
}

#[test]
fn get_path_walks_objects_and_arrays() -> Result<()> {
    let doc = Value::from_json_str(
        r#"{
            "answers": [
                { "text": "yes", "score": 1 },
                { "text": "no", "score": 0 }
            ]
        }"#,
    )?;

    assert_eq!(doc.get_path("answers.0.text"), &Value::from("yes"));
    assert_eq!(doc.get_path("answers.1.score"), &Value::from(0));
    assert_eq!(doc.get_path("answers.7.text"), &Value::Undefined);
    assert_eq!(doc.get_path("answers.0.missing"), &Value::Undefined);
    assert_eq!(doc.get_path("answers.text"), &Value::Undefined);
    assert_eq!(doc.get_path(""), &doc);
    Ok(())
}

#[test]
fn make_or_get_value_mut_builds_nesting() -> Result<()> {
    let mut doc = Value::new_object();
    *doc.make_or_get_value_mut(&["user", "name"])? = Value::from("ada");
    *doc.make_or_get_value_mut(&["user", "age"])? = Value::from(36);

    assert_eq!(doc.get_path("user.name"), &Value::from("ada"));
    assert_eq!(doc.get_path("user.age"), &Value::from(36));

    // Descending through a scalar is an error, not a silent overwrite.
    assert!(doc.make_or_get_value_mut(&["user", "name", "x"]).is_err());
    Ok(())
}

#[test]
fn truthiness() {
    assert!(!Value::Null.is_truthy());
    assert!(!Value::Undefined.is_truthy());
    assert!(!Value::Bool(false).is_truthy());
    assert!(!Value::from(0).is_truthy());
    assert!(!Value::from("").is_truthy());
    assert!(!Value::new_array().is_truthy());

    assert!(Value::Bool(true).is_truthy());
    assert!(Value::from(-1).is_truthy());
    assert!(Value::from("0").is_truthy());
    assert!(Value::new_object().is_truthy());
}

#[test]
fn numeric_coercion() -> Result<()> {
    assert_eq!(Value::from(" 42 ").to_number(), Some(Number::Int(42)));
    assert_eq!(Value::from("").to_number(), Some(Number::Int(0)));
    assert_eq!(Value::Null.to_number(), Some(Number::Int(0)));
    assert_eq!(Value::Bool(true).to_number(), Some(Number::Int(1)));
    assert_eq!(
        Value::from_json_str("[7]")?.to_number(),
        Some(Number::Int(7))
    );
    assert_eq!(Value::from_json_str("[1, 2]")?.to_number(), None);
    assert_eq!(Value::from("seven").to_number(), None);
    Ok(())
}

#[test]
fn display_string_coercion() -> Result<()> {
    assert_eq!(Value::Null.to_display_string(), "");
    assert_eq!(Value::from(3.0).to_display_string(), "3");
    assert_eq!(
        Value::from_json_str(r#"[1, "a", [2, 3]]"#)?.to_display_string(),
        "1,a,2,3"
    );
    Ok(())
}

#[test]
fn loose_equality() -> Result<()> {
    assert!(Value::from(1).loose_eq(&Value::from("1")));
    assert!(Value::Bool(true).loose_eq(&Value::from(1)));
    assert!(Value::Null.loose_eq(&Value::Undefined));
    assert!(!Value::Null.loose_eq(&Value::from(0)));

    // Arrays compare element-wise, not by identity.
    let a = Value::from_json_str("[1, [2, 3]]")?;
    let b = Value::from_json_str("[1, [2, 3]]")?;
    assert!(a.loose_eq(&b));
    assert!(!a.loose_eq(&Value::from_json_str("[1, [2, 4]]")?));
    Ok(())
}

#[test]
fn api() -> Result<()> {
    assert!(Value::from_json_str("{}")?.as_object()?.is_empty());

    let mut v = Value::new_object();
    v.as_object_mut()?.insert("a".into(), Value::from(3.145));
    assert_eq!(v["a"], Value::from(3.145));
    assert_eq!(v.as_object()?.len(), 1);

    // Check invalid api calls.
    assert!(Value::Undefined.as_object().is_err());
    assert!(Value::Undefined.as_object_mut().is_err());
    assert!(Value::Null.as_array().is_err());
    assert!(Value::from("anc").as_array_mut().is_err());
    assert!(Value::new_object().as_number().is_err());
    assert!(Value::from(5.6).as_bool().is_err());
    Ok(())
}

#[test]
fn shared_values_are_copy_on_write() -> Result<()> {
    let original = Value::from_json_str(r#"{"a": [1, 2]}"#)?;
    let mut copy = original.clone();
    copy.as_object_mut()?.insert("b".into(), Value::from(3));

    assert_eq!(original, Value::from_json_str(r#"{"a": [1, 2]}"#)?);
    assert_eq!(copy.get_path("b"), &Value::from(3));
    Ok(())
}
