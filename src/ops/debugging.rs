// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ops::utils::ensure_args_count;
use crate::ops::OpFcn;
use crate::value::Value;

use std::collections::HashMap;

use anyhow::Result;
use log::info;

pub fn register(m: &mut HashMap<&'static str, OpFcn>) {
    m.insert("log", log_value);
}

// Logs the operand and passes it through so `log` can be spliced into any
// expression without changing its result.
fn log_value(args: &[Value]) -> Result<Value> {
    ensure_args_count("log", args, 1)?;
    info!("logic log: {}", args[0]);
    Ok(args[0].clone())
}
