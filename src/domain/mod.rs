// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Answer domains.
//!
//! A domain is an enumerable set of values. Interaction units reference a
//! domain to say which answers are acceptable; option lists are produced by
//! enumerating the same definition, so generation and validation can never
//! drift apart.
//!
//! Three families exist: primitives (`$$STRING`, `$$INT`, ...), derived
//! domains (a source set piped through filter/map/union/combine transforms)
//! and constructs (object shapes with per-field domains). Derived domains
//! are validated by running their pipeline in reverse; see `invert.rs`.

mod error;
mod invert;

pub use error::DomainError;

use crate::logic::Evaluator;
use crate::value::Value;
use crate::Rc;

use core::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use log::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    String,
    Int,
    Bool,
    Float,
    Array,
    Any,
}

impl Primitive {
    pub fn from_id(id: &str) -> Option<Primitive> {
        match id {
            "$$STRING" => Some(Primitive::String),
            "$$INT" => Some(Primitive::Int),
            "$$BOOL" => Some(Primitive::Bool),
            "$$FLOAT" => Some(Primitive::Float),
            "$$ARRAY" => Some(Primitive::Array),
            "$$ANY" => Some(Primitive::Any),
            _ => None,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Primitive::String => "$$STRING",
            Primitive::Int => "$$INT",
            Primitive::Bool => "$$BOOL",
            Primitive::Float => "$$FLOAT",
            Primitive::Array => "$$ARRAY",
            Primitive::Any => "$$ANY",
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Primitive::String => matches!(value, Value::String(_)),
            Primitive::Int => match value {
                Value::Number(n) => n.is_integer(),
                _ => false,
            },
            Primitive::Bool => matches!(value, Value::Bool(_)),
            Primitive::Float => matches!(value, Value::Number(_)),
            Primitive::Array => matches!(value, Value::Array(_)),
            Primitive::Any => !value.is_undefined(),
        }
    }
}

/// A reference to a domain: by id, or an inline literal set.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainRef {
    Id(Rc<str>),
    Inline(Rc<Vec<Value>>),
}

impl DomainRef {
    pub fn from_value(v: &Value) -> Option<DomainRef> {
        match v {
            Value::String(id) => Some(DomainRef::Id(id.clone())),
            Value::Array(items) => Some(DomainRef::Inline(items.clone())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SourceDef {
    Literal(Rc<Vec<Value>>),
    Domain(Rc<str>),
}

/// One step of a derived-domain pipeline. Filter and map expressions see
/// the element as `x`; combine expressions see the pair as `x` and `y`.
#[derive(Debug, Clone)]
pub enum Transform {
    Filter { expr: Value },
    Map { expr: Value },
    Union { domain: Rc<str> },
    Combine { domain: Rc<str>, expr: Value },
}

#[derive(Debug, Clone)]
pub struct DerivedDef {
    pub source: SourceDef,
    pub transforms: Vec<Transform>,
}

#[derive(Debug, Clone)]
pub struct ConstructDef {
    pub min: Option<usize>,
    pub max: Option<usize>,
    pub shape: BTreeMap<Rc<str>, DomainRef>,
    pub default: Option<DomainRef>,
}

#[derive(Debug, Clone)]
pub enum DomainDef {
    Primitive(Primitive),
    Derived(DerivedDef),
    Construct(ConstructDef),
}

/// Registry of domain definitions with memoized enumeration.
pub struct DomainRegistry {
    defs: HashMap<Rc<str>, DomainDef>,
    generated: RefCell<HashMap<Rc<str>, Rc<Vec<Value>>>>,
    // ids currently being enumerated, for cycle detection
    generating: RefCell<Vec<Rc<str>>>,
}

impl Default for DomainRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainRegistry {
    pub fn new() -> Self {
        let mut defs = HashMap::new();
        for primitive in [
            Primitive::String,
            Primitive::Int,
            Primitive::Bool,
            Primitive::Float,
            Primitive::Array,
            Primitive::Any,
        ] {
            defs.insert(primitive.id().into(), DomainDef::Primitive(primitive));
        }
        DomainRegistry {
            defs,
            generated: RefCell::new(HashMap::new()),
            generating: RefCell::new(vec![]),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.defs.contains_key(id)
    }

    /// Registers every definition in a `{id: definition}` document.
    /// Re-registering an id replaces it and drops memoized enumerations.
    pub fn register(&mut self, definitions: &Value) -> Result<(), DomainError> {
        let map = definitions
            .as_object()
            .map_err(|_| bad("<definitions>", "expected an object of domain definitions"))?;

        let mut parsed = vec![];
        for (id, def) in map.iter() {
            parsed.push((id.clone(), Self::parse_def(id, def)?));
        }
        for (id, def) in parsed {
            self.defs.insert(id, def);
        }
        self.generated.borrow_mut().clear();
        Ok(())
    }

    pub fn register_def(&mut self, id: &str, def: DomainDef) {
        self.defs.insert(id.into(), def);
        self.generated.borrow_mut().clear();
    }

    fn parse_def(id: &str, v: &Value) -> Result<DomainDef, DomainError> {
        match v {
            Value::Array(items) => Ok(DomainDef::Derived(DerivedDef {
                source: SourceDef::Literal(items.clone()),
                transforms: vec![],
            })),
            Value::Object(m) if m.contains_key("construct") => Self::parse_construct(id, v),
            Value::Object(m) if m.contains_key("source") => Self::parse_derived(id, v),
            _ => Err(bad(
                id,
                "expected an array, a `source` pipeline or a `construct`",
            )),
        }
    }

    fn parse_derived(id: &str, v: &Value) -> Result<DomainDef, DomainError> {
        let source = match &v["source"] {
            Value::Array(items) => SourceDef::Literal(items.clone()),
            Value::String(other) => SourceDef::Domain(other.clone()),
            _ => return Err(bad(id, "`source` must be an array or a domain id")),
        };

        let mut transforms = vec![];
        match &v["transforms"] {
            Value::Undefined => {}
            Value::Array(steps) => {
                for step in steps.iter() {
                    transforms.push(Self::parse_transform(id, step)?);
                }
            }
            _ => return Err(bad(id, "`transforms` must be an array")),
        }

        Ok(DomainDef::Derived(DerivedDef { source, transforms }))
    }

    fn parse_transform(id: &str, step: &Value) -> Result<Transform, DomainError> {
        let m = step
            .as_object()
            .map_err(|_| bad(id, "transform steps must be single-key objects"))?;
        if m.len() != 1 {
            return Err(bad(id, "transform steps must be single-key objects"));
        }
        let Some((kind, config)) = m.iter().next() else {
            return Err(bad(id, "transform steps must be single-key objects"));
        };

        // filter/map accept either the expression directly or `{expr: ...}`
        let expr_of = |config: &Value| match config {
            Value::Object(c) if c.contains_key("expr") => config["expr"].clone(),
            other => other.clone(),
        };

        match kind.as_ref() {
            "filter" => Ok(Transform::Filter {
                expr: expr_of(config),
            }),
            "map" => Ok(Transform::Map {
                expr: expr_of(config),
            }),
            "union" => match config {
                Value::String(domain) => Ok(Transform::Union {
                    domain: domain.clone(),
                }),
                Value::Object(_) => match &config["domain"] {
                    Value::String(domain) => Ok(Transform::Union {
                        domain: domain.clone(),
                    }),
                    _ => Err(bad(id, "`union` needs a domain id")),
                },
                _ => Err(bad(id, "`union` needs a domain id")),
            },
            "combine" => match (&config["domain"], &config["expr"]) {
                (Value::String(domain), expr) if !expr.is_undefined() => Ok(Transform::Combine {
                    domain: domain.clone(),
                    expr: expr.clone(),
                }),
                _ => Err(bad(id, "`combine` needs a domain id and an expression")),
            },
            other => Err(bad(id, &format!("unknown transform `{other}`"))),
        }
    }

    fn parse_construct(id: &str, v: &Value) -> Result<DomainDef, DomainError> {
        let config = &v["construct"];
        if config.as_object().is_err() {
            return Err(bad(id, "`construct` must be an object"));
        }

        let count_of = |v: &Value| -> Option<usize> {
            v.to_number()
                .and_then(|n| n.as_i64())
                .and_then(|n| usize::try_from(n).ok())
        };

        let min = match &config["min"] {
            Value::Undefined => None,
            v => Some(count_of(v).ok_or_else(|| bad(id, "`min` must be a count"))?),
        };
        let max = match &config["max"] {
            Value::Undefined => None,
            v => Some(count_of(v).ok_or_else(|| bad(id, "`max` must be a count"))?),
        };

        let mut shape = BTreeMap::new();
        match &config["shape"] {
            Value::Undefined => {}
            Value::Object(fields) => {
                for (field, domain) in fields.iter() {
                    let slot = DomainRef::from_value(domain)
                        .ok_or_else(|| bad(id, &format!("bad domain for field `{field}`")))?;
                    shape.insert(field.clone(), slot);
                }
            }
            _ => return Err(bad(id, "`shape` must be an object")),
        }

        let default = match &config["default"] {
            Value::Undefined => None,
            v => Some(DomainRef::from_value(v).ok_or_else(|| bad(id, "bad `default` domain"))?),
        };

        Ok(DomainDef::Construct(ConstructDef {
            min,
            max,
            shape,
            default,
        }))
    }

    /// Enumerates a derived domain. Results are memoized per registry, so
    /// shuffling aside, every caller sees the same materialized set.
    pub fn generate(&self, id: &str, eval: &Evaluator) -> Result<Rc<Vec<Value>>, DomainError> {
        if let Some(hit) = self.generated.borrow().get(id) {
            return Ok(hit.clone());
        }

        let Some(def) = self.defs.get(id) else {
            return Err(DomainError::Unknown(id.into()));
        };
        let DomainDef::Derived(derived) = def else {
            return Err(DomainError::NotGenerable(id.into()));
        };

        if self.generating.borrow().iter().any(|a| a.as_ref() == id) {
            return Err(DomainError::Cycle(id.into()));
        }

        self.generating.borrow_mut().push(id.into());
        let result = self.run_pipeline(id, derived, eval);
        self.generating.borrow_mut().pop();

        let items = Rc::new(result?);
        self.generated.borrow_mut().insert(id.into(), items.clone());
        Ok(items)
    }

    fn run_pipeline(
        &self,
        id: &str,
        def: &DerivedDef,
        eval: &Evaluator,
    ) -> Result<Vec<Value>, DomainError> {
        let mut items: Vec<Value> = match &def.source {
            SourceDef::Literal(values) => values.as_ref().clone(),
            SourceDef::Domain(source) => self.generate(source, eval)?.as_ref().clone(),
        };

        for step in &def.transforms {
            items = match step {
                Transform::Filter { expr } => {
                    let mut kept = vec![];
                    for item in items {
                        let ctx = scope(&[("x", &item)]);
                        if self.run_expr(id, eval, expr, &ctx)?.is_truthy() {
                            kept.push(item);
                        }
                    }
                    kept
                }
                Transform::Map { expr } => {
                    let mut mapped = vec![];
                    for item in items {
                        let ctx = scope(&[("x", &item)]);
                        mapped.push(self.run_expr(id, eval, expr, &ctx)?);
                    }
                    mapped
                }
                Transform::Union { domain } => {
                    let other = self.generate(domain, eval)?;
                    let mut merged = items;
                    merged.extend(other.iter().cloned());
                    merged
                }
                Transform::Combine { domain, expr } => {
                    let other = self.generate(domain, eval)?;
                    let mut combined = vec![];
                    for x in &items {
                        for y in other.iter() {
                            let ctx = scope(&[("x", x), ("y", y)]);
                            combined.push(self.run_expr(id, eval, expr, &ctx)?);
                        }
                    }
                    combined
                }
            };
        }

        Ok(items)
    }

    fn run_expr(
        &self,
        id: &str,
        eval: &Evaluator,
        expr: &Value,
        ctx: &Value,
    ) -> Result<Value, DomainError> {
        eval.try_evaluate(expr, ctx).map_err(|e| DomainError::Expr {
            domain: id.into(),
            reason: e.to_string().into(),
        })
    }

    /// Membership test. Failures are logged and collapse to `false`; use
    /// [`DomainRegistry::check`] when the caller needs the reason.
    pub fn validate(&self, value: &Value, domain_id: &str, eval: &Evaluator) -> bool {
        self.log_check(value, domain_id, self.check(value, domain_id, eval))
    }

    pub fn validate_ref(&self, value: &Value, domain: &DomainRef, eval: &Evaluator) -> bool {
        let result = self.check_ref(value, domain, eval);
        let label = match domain {
            DomainRef::Id(id) => id.as_ref(),
            DomainRef::Inline(_) => "<inline>",
        };
        self.log_check(value, label, result)
    }

    fn log_check(&self, value: &Value, label: &str, result: Result<(), DomainError>) -> bool {
        match result {
            Ok(()) => true,
            Err(err @ DomainError::NotMember { .. }) => {
                info!("validation failed for `{label}`: {err}");
                false
            }
            Err(err) => {
                warn!("validation of `{value}` against `{label}` errored: {err}");
                false
            }
        }
    }

    pub fn check(
        &self,
        value: &Value,
        domain_id: &str,
        eval: &Evaluator,
    ) -> Result<(), DomainError> {
        let Some(def) = self.defs.get(domain_id) else {
            return Err(DomainError::Unknown(domain_id.into()));
        };
        match def {
            DomainDef::Primitive(p) => {
                if p.matches(value) {
                    Ok(())
                } else {
                    Err(not_member(domain_id, value, "type mismatch"))
                }
            }
            DomainDef::Construct(c) => self.check_construct(value, domain_id, c, eval),
            DomainDef::Derived(d) => self.check_derived(value, domain_id, d, eval),
        }
    }

    pub fn check_ref(
        &self,
        value: &Value,
        domain: &DomainRef,
        eval: &Evaluator,
    ) -> Result<(), DomainError> {
        match domain {
            DomainRef::Id(id) => self.check(value, id, eval),
            DomainRef::Inline(items) => {
                if items.contains(value) {
                    Ok(())
                } else {
                    Err(not_member("<inline>", value, "not in the literal set"))
                }
            }
        }
    }

    fn check_construct(
        &self,
        value: &Value,
        id: &str,
        def: &ConstructDef,
        eval: &Evaluator,
    ) -> Result<(), DomainError> {
        let Ok(fields) = value.as_object() else {
            return Err(not_member(id, value, "expected an object"));
        };

        if let Some(min) = def.min {
            if fields.len() < min {
                return Err(not_member(id, value, "too few fields"));
            }
        }
        if let Some(max) = def.max {
            if fields.len() > max {
                return Err(not_member(id, value, "too many fields"));
            }
        }

        for (field, field_value) in fields.iter() {
            let slot = match def.shape.get(field) {
                Some(slot) => slot,
                None => match &def.default {
                    Some(slot) => slot,
                    None => {
                        return Err(not_member(
                            id,
                            value,
                            &format!("unexpected field `{field}`"),
                        ))
                    }
                },
            };
            self.check_ref(field_value, slot, eval)?;
        }
        Ok(())
    }
}

fn scope(bindings: &[(&str, &Value)]) -> Value {
    let mut m: BTreeMap<Rc<str>, Value> = BTreeMap::new();
    for (name, value) in bindings {
        m.insert(Rc::from(*name), (*value).clone());
    }
    Value::from(m)
}

fn bad(domain: &str, reason: &str) -> DomainError {
    DomainError::BadDefinition {
        domain: domain.into(),
        reason: reason.into(),
    }
}

fn not_member(domain: &str, value: &Value, reason: &str) -> DomainError {
    DomainError::NotMember {
        domain: domain.into(),
        value: value.to_string().into(),
        reason: reason.into(),
    }
}
