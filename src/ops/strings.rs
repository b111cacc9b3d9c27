// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ops::utils::{ensure_args_count, ensure_numeric};
use crate::ops::OpFcn;
use crate::value::Value;

use std::collections::HashMap;

use anyhow::{bail, Result};

pub fn register(m: &mut HashMap<&'static str, OpFcn>) {
    m.insert("cat", cat);
    m.insert("substr", substr);
    m.insert("len", len);
    m.insert("is_empty", is_empty);
}

/// Polymorphic concatenation. When the first operand is an array the result
/// is an array: array operands are spread into it, scalars are appended.
/// Otherwise all operands are stringified and joined.
pub(crate) fn concat_values(args: &[Value]) -> Value {
    if let Some(Value::Array(_)) = args.first() {
        let mut out: Vec<Value> = vec![];
        for arg in args {
            match arg {
                Value::Array(items) => out.extend(items.iter().cloned()),
                v => out.push(v.clone()),
            }
        }
        return Value::from(out);
    }

    let mut out = String::new();
    for arg in args {
        out.push_str(&arg.to_display_string());
    }
    Value::from(out)
}

fn cat(args: &[Value]) -> Result<Value> {
    Ok(concat_values(args))
}

fn substr(args: &[Value]) -> Result<Value> {
    if args.len() != 2 && args.len() != 3 {
        bail!("`substr` expects 2 or 3 operands");
    }

    let chars: Vec<char> = args[0].to_display_string().chars().collect();
    let total = chars.len() as i64;

    let start = ensure_numeric("substr", &args[1])?
        .truncate()
        .unwrap_or(0);
    let begin = if start < 0 {
        (total + start).max(0)
    } else {
        start.min(total)
    } as usize;

    let tail = &chars[begin..];
    let keep = match args.get(2) {
        None => tail.len(),
        Some(v) => {
            let length = ensure_numeric("substr", v)?.truncate().unwrap_or(0);
            if length < 0 {
                // negative length trims from the end
                (tail.len() as i64 + length).max(0) as usize
            } else {
                (length as usize).min(tail.len())
            }
        }
    };

    Ok(Value::from(tail[..keep].iter().collect::<String>()))
}

fn len(args: &[Value]) -> Result<Value> {
    ensure_args_count("len", args, 1)?;
    let n = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::Array(a) => a.len(),
        _ => 0,
    };
    Ok(Value::from(n))
}

// Blank-aware emptiness: a string of whitespace counts as empty.
fn is_empty(args: &[Value]) -> Result<Value> {
    ensure_args_count("is_empty", args, 1)?;
    let empty = match &args[0] {
        Value::Null | Value::Undefined => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(m) => m.is_empty(),
        _ => false,
    };
    Ok(Value::Bool(empty))
}
