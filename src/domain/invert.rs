// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Reverse pipeline evaluation.
//!
//! Membership of a derived domain is decided without enumerating it: the
//! candidate is pushed backwards through the transform list. Filters must
//! hold on the candidate, maps are inverted symbolically, unions accept as
//! soon as one branch matches and combines are deconstructed into their
//! parts. Whatever survives the walk must belong to the source.
//!
//! Only a small expression subset is invertible: the identity `{"var":"x"}`
//! and `+`, `-`, `*`, `/` with `x` on exactly one side of a constant.
//! Everything else reports `Uninvertible` instead of guessing.

use super::{not_member, scope, DerivedDef, DomainError, DomainRegistry, SourceDef, Transform};
use crate::logic::Evaluator;
use crate::number::Number;
use crate::value::Value;

impl DomainRegistry {
    pub(super) fn check_derived(
        &self,
        value: &Value,
        id: &str,
        def: &DerivedDef,
        eval: &Evaluator,
    ) -> Result<(), DomainError> {
        let mut current = value.clone();

        for step in def.transforms.iter().rev() {
            match step {
                Transform::Filter { expr } => {
                    let ctx = scope(&[("x", &current)]);
                    if !self.run_expr(id, eval, expr, &ctx)?.is_truthy() {
                        return Err(not_member(id, value, "filter predicate rejected the value"));
                    }
                }
                Transform::Map { expr } => {
                    current = invert_map(expr, &current, id, eval)?;
                }
                Transform::Union { domain } => {
                    // accept on the union branch, otherwise keep walking
                    if self.check(&current, domain, eval).is_ok() {
                        return Ok(());
                    }
                }
                Transform::Combine { domain, expr } => {
                    let (left, right) = deconstruct(expr, &current, id)?;
                    self.check(&right, domain, eval)?;
                    current = left;
                }
            }
        }

        match &def.source {
            SourceDef::Literal(items) => {
                if items.contains(&current) {
                    Ok(())
                } else {
                    Err(not_member(id, &current, "not in the source set"))
                }
            }
            SourceDef::Domain(source) => self.check(&current, source, eval),
        }
    }
}

fn is_bound_var(v: &Value, name: &str) -> bool {
    match v.as_object() {
        Ok(m) => {
            m.len() == 1 && matches!(m.get("var"), Some(Value::String(s)) if s.as_ref() == name)
        }
        Err(_) => false,
    }
}

fn uninvertible(domain: &str, expr: &Value) -> DomainError {
    DomainError::Uninvertible {
        domain: domain.into(),
        expr: expr.to_string().into(),
    }
}

// Solves `expr(x) == mapped` for x.
fn invert_map(
    expr: &Value,
    mapped: &Value,
    id: &str,
    eval: &Evaluator,
) -> Result<Value, DomainError> {
    if is_bound_var(expr, "x") {
        return Ok(mapped.clone());
    }

    let Ok(m) = expr.as_object() else {
        return Err(uninvertible(id, expr));
    };
    if m.len() != 1 {
        return Err(uninvertible(id, expr));
    }
    let Some((op, raw)) = m.iter().next() else {
        return Err(uninvertible(id, expr));
    };
    let args = match raw {
        Value::Array(items) if items.len() == 2 => items,
        _ => return Err(uninvertible(id, expr)),
    };

    let bound_left = is_bound_var(&args[0], "x");
    let bound_right = is_bound_var(&args[1], "x");
    if bound_left == bound_right {
        return Err(uninvertible(id, expr));
    }

    // the free side must evaluate to a numeric constant
    let constant_expr = if bound_left { &args[1] } else { &args[0] };
    let Some(c) = eval
        .try_evaluate(constant_expr, &Value::new_object())
        .ok()
        .and_then(|v| v.to_number())
    else {
        return Err(uninvertible(id, expr));
    };

    let Some(v) = mapped.to_number() else {
        return Err(not_member(id, mapped, "mapped values are numeric"));
    };

    let solved = match op.as_ref() {
        "+" => v.sub(&c),
        // x - c = v
        "-" if bound_left => v.add(&c),
        // c - x = v
        "-" => c.sub(&v),
        "*" => {
            if c == Number::Int(0) {
                return Err(uninvertible(id, expr));
            }
            v.divide(&c)
        }
        // x / c = v
        "/" if bound_left => {
            if c == Number::Int(0) {
                return Err(uninvertible(id, expr));
            }
            v.mul(&c)
        }
        // c / x = v
        "/" => {
            if v == Number::Int(0) {
                return Err(not_member(id, mapped, "no preimage under division"));
            }
            c.divide(&v)
        }
        _ => return Err(uninvertible(id, expr)),
    };

    match solved {
        Ok(n) => Ok(Value::from(n)),
        Err(e) => Err(DomainError::Expr {
            domain: id.into(),
            reason: e.to_string().into(),
        }),
    }
}

// Splits a combined value back into its (x, y) parts.
fn deconstruct(expr: &Value, value: &Value, id: &str) -> Result<(Value, Value), DomainError> {
    // [{"var":"x"}, {"var":"y"}] pairs
    if let Ok(parts) = expr.as_array() {
        if parts.len() == 2 && is_bound_var(&parts[0], "x") && is_bound_var(&parts[1], "y") {
            let Ok(items) = value.as_array() else {
                return Err(not_member(id, value, "expected a pair"));
            };
            if items.len() != 2 {
                return Err(not_member(id, value, "expected a pair"));
            }
            return Ok((items[0].clone(), items[1].clone()));
        }
        return Err(uninvertible(id, expr));
    }

    // {"cat": [{"var":"x"}, <separator>, {"var":"y"}]}
    let Ok(m) = expr.as_object() else {
        return Err(uninvertible(id, expr));
    };
    let parts = match m.get("cat") {
        Some(Value::Array(parts)) if m.len() == 1 && parts.len() == 3 => parts,
        _ => return Err(uninvertible(id, expr)),
    };
    let separator = match &parts[1] {
        Value::String(s) if !s.is_empty() => s,
        _ => return Err(uninvertible(id, expr)),
    };
    if !is_bound_var(&parts[0], "x") || !is_bound_var(&parts[2], "y") {
        return Err(uninvertible(id, expr));
    }

    let Value::String(s) = value else {
        return Err(not_member(id, value, "expected a string"));
    };
    match s.split_once(separator.as_ref()) {
        Some((left, right)) => Ok((Value::from(left), Value::from(right))),
        None => Err(not_member(id, value, "separator not found")),
    }
}
