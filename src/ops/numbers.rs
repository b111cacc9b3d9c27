// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::number::Number;
use crate::ops::utils::{ensure_args_count, ensure_min_args_count, ensure_numeric};
use crate::ops::OpFcn;
use crate::value::Value;

use std::collections::HashMap;

use anyhow::{bail, Result};

pub fn register(m: &mut HashMap<&'static str, OpFcn>) {
    m.insert("+", add);
    m.insert("-", sub);
    m.insert("*", mul);
    m.insert("/", div);
    m.insert("%", modulo);
    m.insert("min", min);
    m.insert("max", max);
    m.insert("int", int);
}

fn add(args: &[Value]) -> Result<Value> {
    ensure_min_args_count("+", args, 1)?;
    let mut sum = ensure_numeric("+", &args[0])?;
    for v in &args[1..] {
        sum = sum.add(&ensure_numeric("+", v)?)?;
    }
    Ok(Value::from(sum))
}

fn sub(args: &[Value]) -> Result<Value> {
    match args.len() {
        // unary minus
        1 => Ok(Value::from(ensure_numeric("-", &args[0])?.neg())),
        2 => {
            let a = ensure_numeric("-", &args[0])?;
            let b = ensure_numeric("-", &args[1])?;
            Ok(Value::from(a.sub(&b)?))
        }
        _ => bail!("`-` expects 1 or 2 operands"),
    }
}

fn mul(args: &[Value]) -> Result<Value> {
    ensure_min_args_count("*", args, 1)?;
    let mut product = ensure_numeric("*", &args[0])?;
    for v in &args[1..] {
        product = product.mul(&ensure_numeric("*", v)?)?;
    }
    Ok(Value::from(product))
}

fn div(args: &[Value]) -> Result<Value> {
    ensure_args_count("/", args, 2)?;
    let a = ensure_numeric("/", &args[0])?;
    let b = ensure_numeric("/", &args[1])?;
    Ok(Value::from(a.divide(&b)?))
}

fn modulo(args: &[Value]) -> Result<Value> {
    ensure_args_count("%", args, 2)?;
    let a = ensure_numeric("%", &args[0])?;
    let b = ensure_numeric("%", &args[1])?;
    Ok(Value::from(a.modulo(&b)?))
}

fn min(args: &[Value]) -> Result<Value> {
    ensure_min_args_count("min", args, 1)?;
    let mut best = ensure_numeric("min", &args[0])?;
    for v in &args[1..] {
        let n = ensure_numeric("min", v)?;
        if n < best {
            best = n;
        }
    }
    Ok(Value::from(best))
}

fn max(args: &[Value]) -> Result<Value> {
    ensure_min_args_count("max", args, 1)?;
    let mut best = ensure_numeric("max", &args[0])?;
    for v in &args[1..] {
        let n = ensure_numeric("max", v)?;
        if n > best {
            best = n;
        }
    }
    Ok(Value::from(best))
}

// Best-effort integer coercion. Unlike the arithmetic operators this one
// never fails: values with no integer reading become null.
fn int(args: &[Value]) -> Result<Value> {
    ensure_args_count("int", args, 1)?;
    let out = match &args[0] {
        Value::Number(n) => n.truncate().map(Value::from),
        Value::Bool(b) => Some(Value::from(i64::from(*b))),
        Value::String(s) => match s.trim().parse::<Number>() {
            Ok(n) => n.truncate().map(Value::from),
            Err(_) => Some(Value::from(0)),
        },
        _ => None,
    };
    Ok(out.unwrap_or(Value::Null))
}
