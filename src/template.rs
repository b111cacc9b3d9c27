// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Template macro expansion.
//!
//! Reusable fragments are registered once and referenced from the schema by
//! instance blocks of kind `template`. Compilation replaces every instance
//! with a deep copy of the referenced definition, resolves the macro
//! directives (`param`, `$$map`, `$$switch`) against the instance's
//! parameters and then overlays the instance's own identity and overrides.
//! The input schema is never mutated.

use crate::value::Value;
use crate::Rc;

use std::collections::{BTreeMap, HashMap};

use log::warn;

type Str = Rc<str>;

/// Nesting bound for instance-in-expansion chains.
const MAX_DEPTH: u32 = 16;

/// Error type for schema compilation. Template problems are authoring
/// errors, so compilation fails instead of degrading.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TemplateError {
    /// Referenced template id has no registration
    #[error("template `{0}` is not registered")]
    NotFound(Str),
    /// Instance block does not name a template
    #[error("template instance `{0}` does not name a template")]
    MissingReference(Str),
    /// Expansion exceeded the nesting bound
    #[error("template `{0}` exceeds the expansion nesting limit")]
    RecursionLimit(Str),
}

/// Registry of reusable schema fragments, applied before hydration.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<Str, Value>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a definition under `id`, replacing any previous one.
    pub fn register(&mut self, id: &str, definition: Value) {
        self.templates.insert(id.into(), definition);
    }

    /// Registers every entry of an id to definition map.
    pub fn register_all(&mut self, definitions: &Value) {
        if let Ok(map) = definitions.as_object() {
            for (id, definition) in map.iter() {
                self.templates.insert(id.clone(), definition.clone());
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.templates.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Expands every template instance in `schema` and returns the new tree.
    pub fn compile(&self, schema: &Value) -> Result<Value, TemplateError> {
        let mut compiled = schema.clone();
        if let Ok(root) = compiled.as_object_mut() {
            if let Some(pages) = root.get_mut("pages") {
                if let Ok(items) = pages.as_array_mut() {
                    for page in items.iter_mut() {
                        self.compile_page(page)?;
                    }
                }
            }
        }
        Ok(compiled)
    }

    fn compile_page(&self, page: &mut Value) -> Result<(), TemplateError> {
        if let Ok(fields) = page.as_object_mut() {
            if let Some(blocks) = fields.get_mut("blocks") {
                *blocks = self.compile_blocks(blocks, 0)?;
            }
        }
        Ok(())
    }

    fn compile_blocks(&self, blocks: &Value, depth: u32) -> Result<Value, TemplateError> {
        let Ok(items) = blocks.as_array() else {
            return Ok(blocks.clone());
        };
        let mut out = Vec::with_capacity(items.len());
        for block in items.iter() {
            out.push(self.compile_block(block, depth)?);
        }
        Ok(Value::from(out))
    }

    fn compile_block(&self, block: &Value, depth: u32) -> Result<Value, TemplateError> {
        if matches!(block.get_path("kind"), Value::String(s) if s.as_ref() == "template") {
            return self.expand_instance(block, depth);
        }

        let mut compiled = block.clone();
        if let Ok(fields) = compiled.as_object_mut() {
            if let Some(children) = fields.get_mut("children") {
                *children = self.compile_blocks(children, depth)?;
            }
        }
        if let Ok(fields) = compiled.as_object_mut() {
            if let Some(view) = fields.get_mut("view") {
                *view = self.compile_block(view, depth)?;
            }
        }
        Ok(compiled)
    }

    fn expand_instance(&self, instance: &Value, depth: u32) -> Result<Value, TemplateError> {
        let name: Str = match instance.get_path("template") {
            Value::String(s) => s.clone(),
            _ => {
                let id = instance.get_path("id").to_display_string();
                return Err(TemplateError::MissingReference(id.into()));
            }
        };
        if depth >= MAX_DEPTH {
            return Err(TemplateError::RecursionLimit(name));
        }
        let Some(definition) = self.templates.get(&name) else {
            return Err(TemplateError::NotFound(name));
        };

        // definitions may wrap the block under `structure`
        let body = match definition.get_path("structure") {
            Value::Undefined => definition,
            structure => structure,
        };

        let params = instance.get_path("params");
        let mut expanded = resolve_macros(body, params, &Value::new_object());
        overlay(&mut expanded, instance);

        // the expansion may itself contain or be another instance
        self.compile_block(&expanded, depth + 1)
    }
}

/// Walks a cloned definition resolving macro directives. `params` is the
/// instance's parameter object; `locals` holds loop variables introduced by
/// enclosing `$$map` directives.
fn resolve_macros(value: &Value, params: &Value, locals: &Value) -> Value {
    match value {
        Value::Object(fields) => {
            if fields.len() == 1 {
                if let Some((key, config)) = fields.iter().next() {
                    match key.as_ref() {
                        "param" => return resolve_param(config, params),
                        "var" => {
                            // loop variables substitute here; anything else
                            // stays behind as a runtime expression
                            if let Some(bound) = resolve_local(config, locals) {
                                return bound;
                            }
                            return value.clone();
                        }
                        "$$map" => return expand_map(config, params, locals),
                        "$$switch" => return expand_switch(config, params, locals),
                        _ => {}
                    }
                }
            }
            let mut out: BTreeMap<Str, Value> = BTreeMap::new();
            for (k, v) in fields.iter() {
                out.insert(k.clone(), resolve_macros(v, params, locals));
            }
            Value::from(out)
        }
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items.iter() {
                // a $$map directive splices into the surrounding array
                if let Some(config) = map_directive(item) {
                    let expansion = expand_map(config, params, locals);
                    if let Ok(elements) = expansion.as_array() {
                        out.extend(elements.iter().cloned());
                        continue;
                    }
                }
                out.push(resolve_macros(item, params, locals));
            }
            Value::from(out)
        }
        _ => value.clone(),
    }
}

fn map_directive(value: &Value) -> Option<&Value> {
    let fields = value.as_object().ok()?;
    if fields.len() == 1 {
        fields.get("$$map")
    } else {
        None
    }
}

fn resolve_param(config: &Value, params: &Value) -> Value {
    let Value::String(path) = config else {
        warn!("`param` expects a path string. Got `{config}` instead.");
        return Value::Null;
    };
    match params.get_path(path) {
        Value::Undefined => {
            warn!("template parameter `{path}` was not supplied");
            Value::Null
        }
        v => v.clone(),
    }
}

fn resolve_local(config: &Value, locals: &Value) -> Option<Value> {
    let Value::String(path) = config else {
        return None;
    };
    let root = path.split('.').next()?;
    if locals.get_path(root).is_undefined() {
        return None;
    }
    match locals.get_path(path) {
        Value::Undefined => Some(Value::Null),
        v => Some(v.clone()),
    }
}

fn expand_map(config: &Value, params: &Value, locals: &Value) -> Value {
    let source = resolve_macros(config.get_path("source"), params, locals);
    let Ok(items) = source.as_array() else {
        warn!("`$$map` source must be an array. Got `{source}` instead.");
        return Value::new_array();
    };
    let template = config.get_path("template");
    if template.is_undefined() {
        warn!("`$$map` directive has no template");
        return Value::new_array();
    }
    let alias: Str = match config.get_path("as") {
        Value::String(s) => s.clone(),
        _ => Rc::from("item"),
    };

    let mut out = Vec::with_capacity(items.len());
    for item in items.iter() {
        let mut scope = match locals.as_object() {
            Ok(m) => m.clone(),
            Err(_) => BTreeMap::new(),
        };
        scope.insert(alias.clone(), item.clone());
        out.push(resolve_macros(template, params, &Value::from(scope)));
    }
    Value::from(out)
}

// Rewrites {on, cases, default} into a nested if/else equality chain.
fn expand_switch(config: &Value, params: &Value, locals: &Value) -> Value {
    let on = resolve_macros(config.get_path("on"), params, locals);
    let default = match config.get_path("default") {
        Value::Undefined => Value::Null,
        d => resolve_macros(d, params, locals),
    };

    let mut chain = default;
    if let Ok(cases) = config.get_path("cases").as_array() {
        for case in cases.iter().rev() {
            let matched = resolve_macros(case.get_path("match"), params, locals);
            let result = resolve_macros(case.get_path("result"), params, locals);
            let test = single("==", Value::from(vec![on.clone(), matched]));
            chain = single("if", Value::from(vec![test, result, chain]));
        }
    }
    chain
}

fn single(key: &str, value: Value) -> Value {
    let mut m: BTreeMap<Str, Value> = BTreeMap::new();
    m.insert(key.into(), value);
    Value::from(m)
}

/// Instance identity and overrides win over the expanded body: the id is
/// replaced, `state` merges shallowly, `behavior` merges key-wise with
/// listeners merged per trigger and validators concatenated.
fn overlay(expanded: &mut Value, instance: &Value) {
    let Ok(base) = expanded.as_object_mut() else {
        return;
    };

    match instance.get_path("id") {
        Value::Undefined => {}
        id => {
            base.insert("id".into(), id.clone());
        }
    }

    if let Ok(overrides) = instance.get_path("state").as_object() {
        let state = base.entry("state".into()).or_insert_with(Value::new_object);
        if let Ok(state) = state.as_object_mut() {
            for (k, v) in overrides.iter() {
                state.insert(k.clone(), v.clone());
            }
        }
    }

    if let Ok(overrides) = instance.get_path("behavior").as_object() {
        let behavior = base
            .entry("behavior".into())
            .or_insert_with(Value::new_object);
        merge_behavior(behavior, overrides);
    }
}

fn merge_behavior(behavior: &mut Value, overrides: &BTreeMap<Str, Value>) {
    let Ok(behavior) = behavior.as_object_mut() else {
        return;
    };
    for (key, incoming) in overrides.iter() {
        match key.as_ref() {
            "listeners" => {
                let slot = behavior.entry(key.clone()).or_insert_with(Value::new_object);
                if let (Ok(target), Ok(incoming)) = (slot.as_object_mut(), incoming.as_object()) {
                    for (trigger, logic) in incoming.iter() {
                        target.insert(trigger.clone(), logic.clone());
                    }
                }
            }
            "validators" => {
                let slot = behavior.entry(key.clone()).or_insert_with(Value::new_array);
                if let (Ok(target), Ok(incoming)) = (slot.as_array_mut(), incoming.as_array()) {
                    target.extend(incoming.iter().cloned());
                }
            }
            _ => {
                behavior.insert(key.clone(), incoming.clone());
            }
        }
    }
}
