// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ops::utils::ensure_args_count;
use crate::ops::OpFcn;
use crate::value::Value;

use core::cmp::Ordering;
use std::collections::HashMap;

use anyhow::{bail, Result};

pub fn register(m: &mut HashMap<&'static str, OpFcn>) {
    m.insert("==", loose_eq);
    m.insert("!=", loose_ne);
    m.insert("===", strict_eq);
    m.insert("!==", strict_ne);
    m.insert("<", lt);
    m.insert("<=", lte);
    m.insert(">", gt);
    m.insert(">=", gte);
    m.insert("!", not);
    m.insert("!!", truthy);
}

// Relational comparison: two strings compare lexicographically, anything
// else is coerced to numbers. Operands with no numeric reading make the
// comparison fail closed (false).
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Value::String(x), Value::String(y)) = (a, b) {
        return Some(x.cmp(y));
    }
    match (a.to_number(), b.to_number()) {
        (Some(x), Some(y)) => {
            if x.as_f64().is_nan() || y.as_f64().is_nan() {
                None
            } else {
                Some(x.cmp(&y))
            }
        }
        _ => None,
    }
}

fn loose_eq(args: &[Value]) -> Result<Value> {
    ensure_args_count("==", args, 2)?;
    Ok(Value::Bool(args[0].loose_eq(&args[1])))
}

fn loose_ne(args: &[Value]) -> Result<Value> {
    ensure_args_count("!=", args, 2)?;
    Ok(Value::Bool(!args[0].loose_eq(&args[1])))
}

fn strict_eq(args: &[Value]) -> Result<Value> {
    ensure_args_count("===", args, 2)?;
    Ok(Value::Bool(args[0] == args[1]))
}

fn strict_ne(args: &[Value]) -> Result<Value> {
    ensure_args_count("!==", args, 2)?;
    Ok(Value::Bool(args[0] != args[1]))
}

fn lt(args: &[Value]) -> Result<Value> {
    ordered("<", args, |ord| ord == Ordering::Less)
}

fn lte(args: &[Value]) -> Result<Value> {
    ordered("<=", args, |ord| ord != Ordering::Greater)
}

fn gt(args: &[Value]) -> Result<Value> {
    ensure_args_count(">", args, 2)?;
    Ok(Value::Bool(matches!(
        compare(&args[0], &args[1]),
        Some(Ordering::Greater)
    )))
}

fn gte(args: &[Value]) -> Result<Value> {
    ensure_args_count(">=", args, 2)?;
    Ok(Value::Bool(matches!(
        compare(&args[0], &args[1]),
        Some(Ordering::Greater | Ordering::Equal)
    )))
}

// `<` and `<=` additionally accept three operands for the between test.
fn ordered(fcn: &'static str, args: &[Value], accept: fn(Ordering) -> bool) -> Result<Value> {
    match args.len() {
        2 => Ok(Value::Bool(
            compare(&args[0], &args[1]).is_some_and(accept),
        )),
        3 => Ok(Value::Bool(
            compare(&args[0], &args[1]).is_some_and(accept)
                && compare(&args[1], &args[2]).is_some_and(accept),
        )),
        _ => bail!("`{fcn}` expects 2 or 3 operands"),
    }
}

fn not(args: &[Value]) -> Result<Value> {
    ensure_args_count("!", args, 1)?;
    Ok(Value::Bool(!args[0].is_truthy()))
}

fn truthy(args: &[Value]) -> Result<Value> {
    ensure_args_count("!!", args, 1)?;
    Ok(Value::Bool(args[0].is_truthy()))
}
