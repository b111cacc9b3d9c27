// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(test)]

use anyhow::{anyhow, Result};
use formulus::*;

fn registry(definitions: &str) -> Result<DomainRegistry> {
    let mut domains = DomainRegistry::new();
    domains
        .register(&Value::from_json_str(definitions)?)
        .map_err(|e| anyhow!("{e}"))?;
    Ok(domains)
}

#[test]
fn primitives_check_types() -> Result<()> {
    let domains = DomainRegistry::new();
    let evaluator = Evaluator::new();

    assert!(domains.validate(&Value::from("hi"), "$$STRING", &evaluator));
    assert!(!domains.validate(&Value::from(1), "$$STRING", &evaluator));

    assert!(domains.validate(&Value::from(5), "$$INT", &evaluator));
    // A whole-number float still counts as an integer.
    assert!(domains.validate(&Value::from(5.0), "$$INT", &evaluator));
    assert!(!domains.validate(&Value::from(5.5), "$$INT", &evaluator));
    assert!(!domains.validate(&Value::from("5"), "$$INT", &evaluator));

    assert!(domains.validate(&Value::Bool(true), "$$BOOL", &evaluator));
    assert!(domains.validate(&Value::from(5.5), "$$FLOAT", &evaluator));
    assert!(domains.validate(&Value::from_json_str("[1]")?, "$$ARRAY", &evaluator));

    assert!(domains.validate(&Value::Null, "$$ANY", &evaluator));
    assert!(!domains.validate(&Value::Undefined, "$$ANY", &evaluator));
    Ok(())
}

#[test]
fn literal_sets_validate_by_membership() -> Result<()> {
    let domains = registry(r#"{"colors": ["red", "green", "blue"]}"#)?;
    let evaluator = Evaluator::new();

    let generated = domains
        .generate("colors", &evaluator)
        .map_err(|e| anyhow!("{e}"))?;
    assert_eq!(
        generated.as_ref(),
        Value::from_json_str(r#"["red", "green", "blue"]"#)?.as_array()?
    );

    // Validation agrees with the enumerated set, member by member.
    for color in generated.iter() {
        assert!(domains.validate(color, "colors", &evaluator));
    }
    assert!(!domains.validate(&Value::from("purple"), "colors", &evaluator));
    Ok(())
}

#[test]
fn filter_pipeline() -> Result<()> {
    let domains = registry(
        r#"{
            "scores": {
                "source": [1, 2, 3, 4, 5],
                "transforms": [{"filter": {">": [{"var": "x"}, 2]}}]
            }
        }"#,
    )?;
    let evaluator = Evaluator::new();

    let generated = domains
        .generate("scores", &evaluator)
        .map_err(|e| anyhow!("{e}"))?;
    assert_eq!(
        generated.as_ref(),
        Value::from_json_str("[3, 4, 5]")?.as_array()?
    );

    assert!(!domains.validate(&Value::from(2), "scores", &evaluator));
    assert!(domains.validate(&Value::from(4), "scores", &evaluator));
    assert!(!domains.validate(&Value::from(9), "scores", &evaluator));
    Ok(())
}

#[test]
fn map_pipelines_invert() -> Result<()> {
    let domains = registry(
        r#"{
            "doubled": {
                "source": [1, 2, 3],
                "transforms": [{"map": {"*": [{"var": "x"}, 2]}}]
            },
            "offset": {
                "source": [1, 2, 3],
                "transforms": [{"map": {"+": [{"var": "x"}, 10]}}]
            },
            "flipped": {
                "source": [1, 2, 3],
                "transforms": [{"map": {"-": [10, {"var": "x"}]}}]
            }
        }"#,
    )?;
    let evaluator = Evaluator::new();

    assert_eq!(
        domains
            .generate("doubled", &evaluator)
            .map_err(|e| anyhow!("{e}"))?
            .as_ref(),
        Value::from_json_str("[2, 4, 6]")?.as_array()?
    );
    assert!(domains.validate(&Value::from(4), "doubled", &evaluator));
    assert!(!domains.validate(&Value::from(5), "doubled", &evaluator));
    assert!(!domains.validate(&Value::from(8), "doubled", &evaluator));

    assert!(domains.validate(&Value::from(12), "offset", &evaluator));
    assert!(!domains.validate(&Value::from(2), "offset", &evaluator));

    // The bound variable may sit on the right of the constant.
    assert_eq!(
        domains
            .generate("flipped", &evaluator)
            .map_err(|e| anyhow!("{e}"))?
            .as_ref(),
        Value::from_json_str("[9, 8, 7]")?.as_array()?
    );
    assert!(domains.validate(&Value::from(8), "flipped", &evaluator));
    assert!(!domains.validate(&Value::from(11), "flipped", &evaluator));
    Ok(())
}

#[test]
fn division_maps_invert() -> Result<()> {
    let domains = registry(
        r#"{
            "halved": {
                "source": [1, 2, 3],
                "transforms": [{"map": {"/": [{"var": "x"}, 2]}}]
            },
            "reciprocal": {
                "source": [1, 2, 3],
                "transforms": [{"map": {"/": [6, {"var": "x"}]}}]
            }
        }"#,
    )?;
    let evaluator = Evaluator::new();

    assert!(domains.validate(&Value::from(1), "halved", &evaluator));
    assert!(domains.validate(&Value::from(1.5), "halved", &evaluator));
    assert!(!domains.validate(&Value::from(4), "halved", &evaluator));

    assert!(domains.validate(&Value::from(3), "reciprocal", &evaluator));
    assert!(!domains.validate(&Value::from(4), "reciprocal", &evaluator));
    // Zero has no preimage under division.
    assert!(!domains.validate(&Value::from(0), "reciprocal", &evaluator));
    Ok(())
}

#[test]
fn generated_values_always_validate() -> Result<()> {
    let domains = registry(
        r#"{
            "deciles": {
                "source": [1, 2, 3, 4, 5, 6],
                "transforms": [
                    {"filter": {">": [{"var": "x"}, 2]}},
                    {"map": {"*": [{"var": "x"}, 10]}}
                ]
            }
        }"#,
    )?;
    let evaluator = Evaluator::new();

    let generated = domains
        .generate("deciles", &evaluator)
        .map_err(|e| anyhow!("{e}"))?;
    assert_eq!(
        generated.as_ref(),
        Value::from_json_str("[30, 40, 50, 60]")?.as_array()?
    );
    for member in generated.iter() {
        assert!(domains.validate(member, "deciles", &evaluator));
    }

    // Filtered-out preimages and fractional preimages are rejected.
    assert!(!domains.validate(&Value::from(20), "deciles", &evaluator));
    assert!(!domains.validate(&Value::from(35), "deciles", &evaluator));
    Ok(())
}

#[test]
fn uninvertible_maps_fail_closed() -> Result<()> {
    let domains = registry(
        r#"{
            "squares": {
                "source": [1, 2, 3],
                "transforms": [{"map": {"*": [{"var": "x"}, {"var": "x"}]}}]
            },
            "parity": {
                "source": [1, 2, 3],
                "transforms": [{"map": {"%": [{"var": "x"}, 2]}}]
            }
        }"#,
    )?;
    let evaluator = Evaluator::new();

    // Generation is unaffected.
    assert_eq!(
        domains
            .generate("squares", &evaluator)
            .map_err(|e| anyhow!("{e}"))?
            .as_ref(),
        Value::from_json_str("[1, 4, 9]")?.as_array()?
    );

    // Membership refuses to guess at an inverse, even for actual members.
    assert!(matches!(
        domains.check(&Value::from(4), "squares", &evaluator),
        Err(DomainError::Uninvertible { .. })
    ));
    assert!(!domains.validate(&Value::from(4), "squares", &evaluator));
    assert!(matches!(
        domains.check(&Value::from(1), "parity", &evaluator),
        Err(DomainError::Uninvertible { .. })
    ));
    Ok(())
}

#[test]
fn union_accepts_either_branch() -> Result<()> {
    let domains = registry(
        r#"{
            "vowels": ["a", "e"],
            "letters": {
                "source": ["x", "y"],
                "transforms": [{"union": "vowels"}]
            }
        }"#,
    )?;
    let evaluator = Evaluator::new();

    assert_eq!(
        domains
            .generate("letters", &evaluator)
            .map_err(|e| anyhow!("{e}"))?
            .as_ref(),
        Value::from_json_str(r#"["x", "y", "a", "e"]"#)?.as_array()?
    );

    assert!(domains.validate(&Value::from("x"), "letters", &evaluator));
    assert!(domains.validate(&Value::from("e"), "letters", &evaluator));
    assert!(!domains.validate(&Value::from("q"), "letters", &evaluator));
    Ok(())
}

#[test]
fn union_keeps_overlapping_items() -> Result<()> {
    let domains = registry(
        r#"{
            "extra": [2, 3],
            "combined": {
                "source": [1, 2],
                "transforms": [{"union": "extra"}]
            }
        }"#,
    )?;
    let evaluator = Evaluator::new();

    // Concatenation, not a set merge: items present on both sides repeat.
    assert_eq!(
        domains
            .generate("combined", &evaluator)
            .map_err(|e| anyhow!("{e}"))?
            .as_ref(),
        Value::from_json_str("[1, 2, 2, 3]")?.as_array()?
    );

    assert!(domains.validate(&Value::from(2), "combined", &evaluator));
    assert!(!domains.validate(&Value::from(4), "combined", &evaluator));
    Ok(())
}

#[test]
fn combine_deconstructs_values() -> Result<()> {
    let domains = registry(
        r#"{
            "suffixes": ["a", "b"],
            "labels": {
                "source": ["x1", "x2"],
                "transforms": [{
                    "combine": {
                        "domain": "suffixes",
                        "expr": {"cat": [{"var": "x"}, "-", {"var": "y"}]}
                    }
                }]
            },
            "pairs": {
                "source": [1, 2],
                "transforms": [{
                    "combine": {
                        "domain": "suffixes",
                        "expr": [{"var": "x"}, {"var": "y"}]
                    }
                }]
            }
        }"#,
    )?;
    let evaluator = Evaluator::new();

    assert_eq!(
        domains
            .generate("labels", &evaluator)
            .map_err(|e| anyhow!("{e}"))?
            .as_ref(),
        Value::from_json_str(r#"["x1-a", "x1-b", "x2-a", "x2-b"]"#)?.as_array()?
    );
    assert!(domains.validate(&Value::from("x2-b"), "labels", &evaluator));
    assert!(!domains.validate(&Value::from("x2-z"), "labels", &evaluator));
    assert!(!domains.validate(&Value::from("x9-a"), "labels", &evaluator));
    assert!(!domains.validate(&Value::from("nodash"), "labels", &evaluator));

    assert!(domains.validate(&Value::from_json_str(r#"[2, "a"]"#)?, "pairs", &evaluator));
    assert!(!domains.validate(&Value::from_json_str(r#"[2, "z"]"#)?, "pairs", &evaluator));
    assert!(!domains.validate(&Value::from_json_str("[2]")?, "pairs", &evaluator));
    Ok(())
}

#[test]
fn construct_shapes() -> Result<()> {
    let domains = registry(
        r#"{
            "profile": {
                "construct": {
                    "shape": {"name": "$$STRING", "age": "$$INT"}
                }
            },
            "tagged": {
                "construct": {
                    "shape": {"name": "$$STRING"},
                    "default": "$$INT"
                }
            },
            "bounded": {
                "construct": {"min": 1, "max": 2, "default": "$$ANY"}
            },
            "choice": {
                "construct": {"shape": {"pick": ["a", "b"]}}
            }
        }"#,
    )?;
    let evaluator = Evaluator::new();

    let ok = Value::from_json_str(r#"{"name": "ada", "age": 36}"#)?;
    assert!(domains.validate(&ok, "profile", &evaluator));
    assert!(!domains.validate(
        &Value::from_json_str(r#"{"name": "ada", "age": "old"}"#)?,
        "profile",
        &evaluator
    ));
    // Fields outside the shape need a default slot.
    assert!(!domains.validate(
        &Value::from_json_str(r#"{"name": "ada", "extra": 1}"#)?,
        "profile",
        &evaluator
    ));
    assert!(!domains.validate(&Value::from(5), "profile", &evaluator));

    assert!(domains.validate(
        &Value::from_json_str(r#"{"name": "x", "n": 3}"#)?,
        "tagged",
        &evaluator
    ));
    assert!(!domains.validate(
        &Value::from_json_str(r#"{"name": "x", "n": "s"}"#)?,
        "tagged",
        &evaluator
    ));

    assert!(!domains.validate(&Value::from_json_str("{}")?, "bounded", &evaluator));
    assert!(domains.validate(&Value::from_json_str(r#"{"a": 1}"#)?, "bounded", &evaluator));
    assert!(!domains.validate(
        &Value::from_json_str(r#"{"a": 1, "b": 2, "c": 3}"#)?,
        "bounded",
        &evaluator
    ));

    // Shape slots accept inline literal domains.
    assert!(domains.validate(&Value::from_json_str(r#"{"pick": "a"}"#)?, "choice", &evaluator));
    assert!(!domains.validate(&Value::from_json_str(r#"{"pick": "z"}"#)?, "choice", &evaluator));
    Ok(())
}

#[test]
fn inline_refs() -> Result<()> {
    let domains = DomainRegistry::new();
    let evaluator = Evaluator::new();
    let inline = DomainRef::from_value(&Value::from_json_str(r#"["yes", "no"]"#)?)
        .ok_or_else(|| anyhow!("expected an inline domain"))?;

    assert!(domains.validate_ref(&Value::from("yes"), &inline, &evaluator));
    assert!(!domains.validate_ref(&Value::from("maybe"), &inline, &evaluator));
    Ok(())
}

#[test]
fn unknown_domains_and_cycles() -> Result<()> {
    let domains = registry(r#"{"a": {"source": "b"}, "b": {"source": "a"}}"#)?;
    let evaluator = Evaluator::new();

    assert!(matches!(
        domains.check(&Value::from(1), "$$NOPE", &evaluator),
        Err(DomainError::Unknown(_))
    ));
    assert!(matches!(
        domains.generate("a", &evaluator),
        Err(DomainError::Cycle(_))
    ));
    assert!(matches!(
        domains.generate("$$INT", &evaluator),
        Err(DomainError::NotGenerable(_))
    ));
    Ok(())
}

#[test]
fn domain_sources_chain() -> Result<()> {
    let domains = registry(
        r#"{
            "base": [1, 2],
            "wide": {
                "source": "base",
                "transforms": [{"map": {"+": [{"var": "x"}, 100]}}]
            }
        }"#,
    )?;
    let evaluator = Evaluator::new();

    assert_eq!(
        domains
            .generate("wide", &evaluator)
            .map_err(|e| anyhow!("{e}"))?
            .as_ref(),
        Value::from_json_str("[101, 102]")?.as_array()?
    );
    assert!(domains.validate(&Value::from(102), "wide", &evaluator));
    assert!(!domains.validate(&Value::from(103), "wide", &evaluator));
    Ok(())
}

#[test]
fn generation_is_memoized() -> Result<()> {
    let domains = registry(r#"{"colors": ["red", "green"]}"#)?;
    let evaluator = Evaluator::new();

    let first = domains
        .generate("colors", &evaluator)
        .map_err(|e| anyhow!("{e}"))?;
    let second = domains
        .generate("colors", &evaluator)
        .map_err(|e| anyhow!("{e}"))?;
    assert!(Rc::ptr_eq(&first, &second));
    Ok(())
}

#[test]
fn registration_is_all_or_nothing() -> Result<()> {
    let mut domains = DomainRegistry::new();
    let bad_batch = Value::from_json_str(
        r#"{
            "good": ["a"],
            "bad": {"source": [1], "transforms": [{"shuffle": {}}]}
        }"#,
    )?;

    assert!(domains.register(&bad_batch).is_err());
    assert!(!domains.contains("good"));

    assert!(domains.register(&Value::from(5)).is_err());
    assert!(domains
        .register(&Value::from_json_str(r#"{"bad": {"construct": 5}}"#)?)
        .is_err());
    assert!(domains
        .register(&Value::from_json_str(r#"{"bad": {"source": [1], "transforms": [{"combine": {"domain": "x"}}]}}"#)?)
        .is_err());
    Ok(())
}

#[test]
fn reregistration_replaces_and_invalidates() -> Result<()> {
    let mut domains = registry(r#"{"colors": ["red"]}"#)?;
    let evaluator = Evaluator::new();

    assert!(domains.validate(&Value::from("red"), "colors", &evaluator));
    assert_eq!(
        domains
            .generate("colors", &evaluator)
            .map_err(|e| anyhow!("{e}"))?
            .len(),
        1
    );

    domains
        .register(&Value::from_json_str(r#"{"colors": ["blue", "cyan"]}"#)?)
        .map_err(|e| anyhow!("{e}"))?;
    assert!(!domains.validate(&Value::from("red"), "colors", &evaluator));
    assert_eq!(
        domains
            .generate("colors", &evaluator)
            .map_err(|e| anyhow!("{e}"))?
            .len(),
        2
    );
    Ok(())
}
