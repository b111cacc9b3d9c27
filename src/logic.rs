// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The logic evaluator.
//!
//! Rules are plain JSON values: an object with exactly one key is an
//! operator application, arrays evaluate element-wise and every other value
//! is a literal. Evaluation is sandboxed (rules only see the data document
//! they are given) and total: failures are logged and collapse to null.

use crate::ops::{OpFcn, OPERATORS};
use crate::value::Value;
use crate::Rc;

use core::slice;
use std::collections::{BTreeMap, HashMap};

use anyhow::{bail, Result};
use log::warn;

/// Host-registered operator. Like built-in operators it receives its
/// operands already evaluated.
pub type CustomOp = Box<dyn Fn(&[Value]) -> Result<Value>>;

// Operators with lazy operands or data access; these can never be
// registered as custom operators.
const SPECIAL_FORMS: [&str; 13] = [
    "var",
    "missing",
    "missing_some",
    "if",
    "?:",
    "and",
    "or",
    "map",
    "filter",
    "reduce",
    "all",
    "some",
    "none",
];

#[derive(Default)]
pub struct Evaluator {
    custom: HashMap<Rc<str>, CustomOp>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a host operator under `name`. Fails if the name is taken
    /// by a built-in, a special form or a previous registration.
    pub fn add_operator(&mut self, name: &str, op: CustomOp) -> Result<()> {
        if SPECIAL_FORMS.contains(&name)
            || OPERATORS.contains_key(name)
            || self.custom.contains_key(name)
        {
            bail!("operator `{name}` is already defined");
        }
        self.custom.insert(name.into(), op);
        Ok(())
    }

    /// Evaluates `rule` against `data`. This entry point never fails:
    /// malformed rules, unknown operators and operand errors are logged
    /// and yield null.
    pub fn evaluate(&self, rule: &Value, data: &Value) -> Value {
        match self.try_evaluate(rule, data) {
            Ok(v) => v,
            Err(err) => {
                warn!("rule evaluation failed: {err}; rule: {rule}");
                Value::Null
            }
        }
    }

    /// Fallible evaluation, for callers that need to see why a rule failed.
    pub fn try_evaluate(&self, rule: &Value, data: &Value) -> Result<Value> {
        self.eval(rule, data)
    }

    fn eval(&self, rule: &Value, data: &Value) -> Result<Value> {
        match rule {
            Value::Array(items) => Ok(Value::from(
                items
                    .iter()
                    .map(|item| self.eval(item, data))
                    .collect::<Result<Vec<Value>>>()?,
            )),
            Value::Object(map) if map.len() == 1 => {
                let Some((op, raw)) = map.iter().next() else {
                    return Ok(rule.clone());
                };
                self.eval_operator(op.as_ref(), raw, data)
            }
            _ => Ok(rule.clone()),
        }
    }

    fn eval_operator(&self, op: &str, raw: &Value, data: &Value) -> Result<Value> {
        match op {
            "var" => self.eval_var(raw, data),
            "missing" => self.eval_missing(raw, data),
            "missing_some" => self.eval_missing_some(raw, data),
            "if" | "?:" => self.eval_if(raw, data),
            "and" => self.eval_and(raw, data),
            "or" => self.eval_or(raw, data),
            "map" => self.eval_map(raw, data),
            "filter" => self.eval_filter(raw, data),
            "reduce" => self.eval_reduce(raw, data),
            "all" => self.eval_all(raw, data),
            "some" => self.eval_some(raw, data),
            "none" => self.eval_none(raw, data),
            _ => {
                let args = self.eval_args(raw, data)?;
                if let Some(f) = OPERATORS.get(op) {
                    return f(&args);
                }
                if let Some(f) = self.custom.get(op) {
                    return f(&args);
                }
                bail!("unknown operator `{op}`")
            }
        }
    }

    // An operand position may hold a single raw value instead of a list.
    fn raw_args(raw: &Value) -> &[Value] {
        match raw {
            Value::Array(items) => items,
            single => slice::from_ref(single),
        }
    }

    fn eval_args(&self, raw: &Value, data: &Value) -> Result<Vec<Value>> {
        Self::raw_args(raw)
            .iter()
            .map(|arg| self.eval(arg, data))
            .collect()
    }

    fn lookup<'a>(path: &Value, data: &'a Value) -> &'a Value {
        match path {
            Value::Null => data,
            Value::String(s) if s.is_empty() => data,
            Value::String(s) => data.get_path(s),
            Value::Number(n) => match n.as_i64() {
                Some(i) if i >= 0 => &data[i as usize],
                _ => &Value::Undefined,
            },
            _ => &Value::Undefined,
        }
    }

    fn eval_var(&self, raw: &Value, data: &Value) -> Result<Value> {
        let args = self.eval_args(raw, data)?;
        let path = args.first().cloned().unwrap_or(Value::Null);
        let found = Self::lookup(&path, data);
        if found.is_undefined() {
            // fall back to the optional default
            Ok(args.get(1).cloned().unwrap_or(Value::Null))
        } else {
            Ok(found.clone())
        }
    }

    fn missing_keys(keys: &[Value], data: &Value) -> Vec<Value> {
        let mut missing = vec![];
        for key in keys {
            let found = Self::lookup(key, data);
            let absent = match found {
                Value::Undefined | Value::Null => true,
                Value::String(s) => s.is_empty(),
                _ => false,
            };
            if absent {
                missing.push(key.clone());
            }
        }
        missing
    }

    fn eval_missing(&self, raw: &Value, data: &Value) -> Result<Value> {
        let args = self.eval_args(raw, data)?;
        let keys = match args.as_slice() {
            [Value::Array(a)] => a.as_ref().clone(),
            _ => args,
        };
        Ok(Value::from(Self::missing_keys(&keys, data)))
    }

    fn eval_missing_some(&self, raw: &Value, data: &Value) -> Result<Value> {
        let args = self.eval_args(raw, data)?;
        if args.len() != 2 {
            bail!("`missing_some` expects 2 operands");
        }
        let need = match args[0].to_number().and_then(|n| n.as_i64()) {
            Some(n) => n,
            None => bail!("`missing_some` expects a numeric minimum"),
        };
        let keys = match &args[1] {
            Value::Array(a) => a.as_ref().clone(),
            _ => bail!("`missing_some` expects an array of keys"),
        };

        let missing = Self::missing_keys(&keys, data);
        if (keys.len() - missing.len()) as i64 >= need {
            Ok(Value::new_array())
        } else {
            Ok(Value::from(missing))
        }
    }

    // if/then pairs walked in order, with an optional trailing else.
    fn eval_if(&self, raw: &Value, data: &Value) -> Result<Value> {
        let items = Self::raw_args(raw);
        let mut i = 0;
        while i + 1 < items.len() {
            if self.eval(&items[i], data)?.is_truthy() {
                return self.eval(&items[i + 1], data);
            }
            i += 2;
        }
        match items.len() {
            n if n % 2 == 1 => self.eval(&items[n - 1], data),
            _ => Ok(Value::Null),
        }
    }

    // Short-circuiting; yields the deciding operand itself, not a boolean.
    fn eval_and(&self, raw: &Value, data: &Value) -> Result<Value> {
        let items = Self::raw_args(raw);
        if items.is_empty() {
            bail!("`and` expects at least 1 operand");
        }
        let mut last = Value::Null;
        for item in items {
            last = self.eval(item, data)?;
            if !last.is_truthy() {
                return Ok(last);
            }
        }
        Ok(last)
    }

    fn eval_or(&self, raw: &Value, data: &Value) -> Result<Value> {
        let items = Self::raw_args(raw);
        if items.is_empty() {
            bail!("`or` expects at least 1 operand");
        }
        let mut last = Value::Null;
        for item in items {
            last = self.eval(item, data)?;
            if last.is_truthy() {
                return Ok(last);
            }
        }
        Ok(last)
    }

    // Iteration forms evaluate their first operand with the outer data,
    // then run the second operand once per element with the element as the
    // whole data document.
    fn scoped_collection(
        &self,
        fcn: &'static str,
        raw: &Value,
        data: &Value,
    ) -> Result<(Vec<Value>, Value)> {
        let items = Self::raw_args(raw);
        if items.len() < 2 {
            bail!("`{fcn}` expects a collection and a rule");
        }
        let collection = self.eval(&items[0], data)?;
        let elements = match collection {
            Value::Array(a) => a.as_ref().clone(),
            _ => vec![],
        };
        Ok((elements, items[1].clone()))
    }

    fn eval_map(&self, raw: &Value, data: &Value) -> Result<Value> {
        let (elements, rule) = self.scoped_collection("map", raw, data)?;
        Ok(Value::from(
            elements
                .iter()
                .map(|element| self.eval(&rule, element))
                .collect::<Result<Vec<Value>>>()?,
        ))
    }

    fn eval_filter(&self, raw: &Value, data: &Value) -> Result<Value> {
        let (elements, rule) = self.scoped_collection("filter", raw, data)?;
        let mut out = vec![];
        for element in elements {
            if self.eval(&rule, &element)?.is_truthy() {
                out.push(element);
            }
        }
        Ok(Value::from(out))
    }

    fn eval_reduce(&self, raw: &Value, data: &Value) -> Result<Value> {
        let items = Self::raw_args(raw);
        let initial = match items.get(2) {
            Some(expr) => self.eval(expr, data)?,
            None => Value::Null,
        };
        let (elements, rule) = self.scoped_collection("reduce", raw, data)?;

        let mut accumulator = initial;
        for element in elements {
            let mut scope = BTreeMap::new();
            scope.insert(Rc::from("current"), element);
            scope.insert(Rc::from("accumulator"), accumulator);
            accumulator = self.eval(&rule, &Value::from(scope))?;
        }
        Ok(accumulator)
    }

    fn eval_all(&self, raw: &Value, data: &Value) -> Result<Value> {
        let (elements, rule) = self.scoped_collection("all", raw, data)?;
        if elements.is_empty() {
            return Ok(Value::Bool(false));
        }
        for element in elements {
            if !self.eval(&rule, &element)?.is_truthy() {
                return Ok(Value::Bool(false));
            }
        }
        Ok(Value::Bool(true))
    }

    fn eval_some(&self, raw: &Value, data: &Value) -> Result<Value> {
        let (elements, rule) = self.scoped_collection("some", raw, data)?;
        for element in elements {
            if self.eval(&rule, &element)?.is_truthy() {
                return Ok(Value::Bool(true));
            }
        }
        Ok(Value::Bool(false))
    }

    fn eval_none(&self, raw: &Value, data: &Value) -> Result<Value> {
        match self.eval_some(raw, data)? {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            _ => Ok(Value::Bool(true)),
        }
    }
}
