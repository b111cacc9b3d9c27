// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Effect descriptors.
//!
//! Logic rules are pure: an expression that wants to change the world
//! evaluates to a tagged JSON object describing the change instead of
//! performing it. The engine collects these descriptors after evaluation
//! and translates them into dispatched actions.

use crate::value::Value;
use crate::Rc;

use std::collections::BTreeMap;

const TYPE_TAG: &str = "__type";
const ACTION_TAG: &str = "__action";
const POINTER_TYPE: &str = "pointer";

/// A reference to a mutable slot in session state, e.g. `q1.value` or
/// `quiz.score`. Produced by the `ref` operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pointer {
    pub path: Rc<str>,
}

impl Pointer {
    pub fn new(path: impl Into<Rc<str>>) -> Pointer {
        Pointer { path: path.into() }
    }

    pub fn to_value(&self) -> Value {
        let mut m: BTreeMap<Rc<str>, Value> = BTreeMap::new();
        m.insert(TYPE_TAG.into(), Value::from(POINTER_TYPE));
        m.insert("path".into(), Value::String(self.path.clone()));
        Value::from(m)
    }

    pub fn from_value(v: &Value) -> Option<Pointer> {
        let m = v.as_object().ok()?;
        match (m.get(TYPE_TAG), m.get("path")) {
            (Some(Value::String(t)), Some(Value::String(path))) if t.as_ref() == POINTER_TYPE => {
                Some(Pointer { path: path.clone() })
            }
            _ => None,
        }
    }
}

/// A state change described as data.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Overwrite the slot at `target` with `value`.
    Set { target: Rc<str>, value: Value },
    /// Read the slot at `target`, combine it with `amount` using `operator`
    /// (`+`, `-`, `*`, `/`, `%`, `cat` or `uncat`) and write it back.
    Compound {
        operator: Rc<str>,
        target: Rc<str>,
        amount: Value,
    },
    /// Move the session to the page with id `target`.
    Navigate { target: Rc<str> },
}

impl Effect {
    pub fn to_value(&self) -> Value {
        let mut m: BTreeMap<Rc<str>, Value> = BTreeMap::new();
        match self {
            Effect::Set { target, value } => {
                m.insert(ACTION_TAG.into(), Value::from("SET"));
                m.insert("target".into(), Value::String(target.clone()));
                m.insert("value".into(), value.clone());
            }
            Effect::Compound {
                operator,
                target,
                amount,
            } => {
                m.insert(ACTION_TAG.into(), Value::from("COMPOUND"));
                m.insert("operator".into(), Value::String(operator.clone()));
                m.insert("target".into(), Value::String(target.clone()));
                m.insert("amount".into(), amount.clone());
            }
            Effect::Navigate { target } => {
                m.insert(ACTION_TAG.into(), Value::from("NAVIGATE"));
                m.insert("target".into(), Value::String(target.clone()));
            }
        }
        Value::from(m)
    }

    pub fn from_value(v: &Value) -> Option<Effect> {
        let m = v.as_object().ok()?;
        let action = match m.get(ACTION_TAG) {
            Some(Value::String(a)) => a.as_ref(),
            _ => return None,
        };
        let target = match m.get("target") {
            Some(Value::String(t)) => t.clone(),
            _ => return None,
        };
        match action {
            "SET" => Some(Effect::Set {
                target,
                value: m.get("value").cloned().unwrap_or(Value::Null),
            }),
            "COMPOUND" => match m.get("operator") {
                Some(Value::String(op)) => Some(Effect::Compound {
                    operator: op.clone(),
                    target,
                    amount: m.get("amount").cloned().unwrap_or(Value::Null),
                }),
                _ => None,
            },
            "NAVIGATE" => Some(Effect::Navigate { target }),
            _ => None,
        }
    }

    /// Normalizes an evaluation result into a list of effects. A single
    /// descriptor yields one effect, arrays are walked recursively and
    /// anything else is ignored.
    pub fn collect(result: &Value) -> Vec<Effect> {
        let mut effects = vec![];
        Self::collect_into(result, &mut effects);
        effects
    }

    fn collect_into(v: &Value, out: &mut Vec<Effect>) {
        match v {
            Value::Array(items) => {
                for item in items.iter() {
                    Self::collect_into(item, out);
                }
            }
            _ => {
                if let Some(effect) = Effect::from_value(v) {
                    out.push(effect);
                }
            }
        }
    }
}
