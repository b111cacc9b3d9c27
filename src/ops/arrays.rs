// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ops::utils::ensure_args_count;
use crate::ops::OpFcn;
use crate::value::Value;

use std::collections::HashMap;

use anyhow::Result;

pub fn register(m: &mut HashMap<&'static str, OpFcn>) {
    m.insert("in", membership);
    m.insert("merge", merge);
    m.insert("uncat", uncat);
}

fn membership(args: &[Value]) -> Result<Value> {
    ensure_args_count("in", args, 2)?;
    let found = match &args[1] {
        Value::Array(items) => items.iter().any(|v| v.loose_eq(&args[0])),
        Value::String(s) => s.contains(args[0].to_display_string().as_str()),
        _ => false,
    };
    Ok(Value::Bool(found))
}

// Flattens array operands one level, appends scalars.
fn merge(args: &[Value]) -> Result<Value> {
    let mut out: Vec<Value> = vec![];
    for arg in args {
        match arg {
            Value::Array(items) => out.extend(items.iter().cloned()),
            v => out.push(v.clone()),
        }
    }
    Ok(Value::from(out))
}

/// Inverse of `cat`: removes every occurrence of the needle from an array,
/// or every substring occurrence from a string. Other collection types pass
/// through unchanged.
pub(crate) fn remove_occurrences(collection: &Value, needle: &Value) -> Value {
    match collection {
        Value::Array(items) => Value::from(
            items
                .iter()
                .filter(|v| !v.loose_eq(needle))
                .cloned()
                .collect::<Vec<Value>>(),
        ),
        Value::String(s) => {
            let needle_str = needle.to_display_string();
            if needle_str.is_empty() {
                collection.clone()
            } else {
                Value::from(s.replace(needle_str.as_str(), ""))
            }
        }
        v => v.clone(),
    }
}

fn uncat(args: &[Value]) -> Result<Value> {
    ensure_args_count("uncat", args, 2)?;
    Ok(remove_occurrences(&args[0], &args[1]))
}
