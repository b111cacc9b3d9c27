// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::effect::{Effect, Pointer};
use crate::ops::utils::{ensure_args_count, ensure_string};
use crate::ops::OpFcn;
use crate::value::Value;

use std::collections::HashMap;

use anyhow::Result;
use log::warn;

pub fn register(m: &mut HashMap<&'static str, OpFcn>) {
    m.insert("ref", reference);
    m.insert("set", set);
    m.insert("navigate", navigate);
    m.insert("+=", add_assign);
    m.insert("-=", sub_assign);
    m.insert("*=", mul_assign);
    m.insert("/=", div_assign);
    m.insert("%=", mod_assign);
    m.insert("append", append);
    m.insert("remove", remove);
}

fn reference(args: &[Value]) -> Result<Value> {
    ensure_args_count("ref", args, 1)?;
    let path = ensure_string("ref", &args[0])?;
    Ok(Pointer::new(path).to_value())
}

// A write target must be a pointer produced by `ref`. A plain string would
// silently bind to whatever it happens to spell, so anything else is
// rejected: logged and evaluated to null.
fn ensure_pointer(fcn: &'static str, v: &Value) -> Option<Pointer> {
    match Pointer::from_value(v) {
        Some(p) => Some(p),
        None => {
            warn!("`{fcn}` target must be a pointer created with `ref`. Got `{v}` instead");
            None
        }
    }
}

fn set(args: &[Value]) -> Result<Value> {
    ensure_args_count("set", args, 2)?;
    let Some(pointer) = ensure_pointer("set", &args[0]) else {
        return Ok(Value::Null);
    };
    Ok(Effect::Set {
        target: pointer.path,
        value: args[1].clone(),
    }
    .to_value())
}

fn navigate(args: &[Value]) -> Result<Value> {
    ensure_args_count("navigate", args, 1)?;
    let target = ensure_string("navigate", &args[0])?;
    Ok(Effect::Navigate { target }.to_value())
}

fn compound(fcn: &'static str, operator: &'static str, args: &[Value]) -> Result<Value> {
    ensure_args_count(fcn, args, 2)?;
    let Some(pointer) = ensure_pointer(fcn, &args[0]) else {
        return Ok(Value::Null);
    };
    Ok(Effect::Compound {
        operator: operator.into(),
        target: pointer.path,
        amount: args[1].clone(),
    }
    .to_value())
}

fn add_assign(args: &[Value]) -> Result<Value> {
    compound("+=", "+", args)
}

fn sub_assign(args: &[Value]) -> Result<Value> {
    compound("-=", "-", args)
}

fn mul_assign(args: &[Value]) -> Result<Value> {
    compound("*=", "*", args)
}

fn div_assign(args: &[Value]) -> Result<Value> {
    compound("/=", "/", args)
}

fn mod_assign(args: &[Value]) -> Result<Value> {
    compound("%=", "%", args)
}

fn append(args: &[Value]) -> Result<Value> {
    compound("append", "cat", args)
}

fn remove(args: &[Value]) -> Result<Value> {
    compound("remove", "uncat", args)
}
