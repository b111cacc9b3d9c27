// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

pub mod arrays;
pub mod comparison;
pub mod debugging;
pub mod effects;
pub mod numbers;
pub mod strings;
pub mod utils;

use crate::value::Value;

use std::collections::HashMap;

use anyhow::Result;
use lazy_static::lazy_static;

/// An eagerly evaluated operator: receives its already-evaluated operands.
/// Operators that need lazy operands or data access (`var`, `if`, `and`,
/// iteration) are special forms handled by the evaluator itself.
pub type OpFcn = fn(&[Value]) -> Result<Value>;

#[rustfmt::skip]
lazy_static! {
    pub static ref OPERATORS: HashMap<&'static str, OpFcn> = {
	let mut m : HashMap<&'static str, OpFcn> = HashMap::new();
	numbers::register(&mut m);
	comparison::register(&mut m);
	strings::register(&mut m);
	arrays::register(&mut m);
	effects::register(&mut m);
	debugging::register(&mut m);
	m
    };
}
