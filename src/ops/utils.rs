// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::number::Number;
use crate::value::Value;
use crate::Rc;

use anyhow::{bail, Result};

pub fn ensure_args_count(fcn: &'static str, args: &[Value], expected: usize) -> Result<()> {
    if args.len() != expected {
        if expected == 1 {
            bail!("`{fcn}` expects 1 operand")
        } else {
            bail!("`{fcn}` expects {expected} operands")
        }
    }
    Ok(())
}

pub fn ensure_min_args_count(fcn: &'static str, args: &[Value], at_least: usize) -> Result<()> {
    if args.len() < at_least {
        bail!("`{fcn}` expects at least {at_least} operand(s)")
    }
    Ok(())
}

pub fn ensure_numeric(fcn: &str, v: &Value) -> Result<Number> {
    match v.to_number() {
        Some(n) => Ok(n),
        None => bail!("`{fcn}` expects numeric operand. Got `{v}` instead"),
    }
}

pub fn ensure_string(fcn: &str, v: &Value) -> Result<Rc<str>> {
    match &v {
        Value::String(s) => Ok(s.clone()),
        _ => bail!("`{fcn}` expects string operand. Got `{v}` instead"),
    }
}

pub fn ensure_array(fcn: &str, v: &Value) -> Result<Rc<Vec<Value>>> {
    match v {
        Value::Array(a) => Ok(a.clone()),
        _ => bail!("`{fcn}` expects array operand. Got `{v}` instead"),
    }
}
