// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::value::Value;
use crate::Rc;

use std::collections::BTreeMap;

/// Expands a flat `"a.b.c" -> v` variable map into nested objects so path
/// lookup works in expressions. A dotted key whose prefix is already
/// occupied by a scalar is dropped.
pub fn unflatten_variables(variables: &BTreeMap<Rc<str>, Value>) -> Value {
    let mut root = Value::new_object();
    for (name, value) in variables.iter() {
        let segments: Vec<&str> = name.split('.').collect();
        if let Ok(slot) = root.make_or_get_value_mut(&segments) {
            *slot = value.clone();
        }
    }
    root
}
