// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::domain::{DomainRef, DomainRegistry};
use crate::effect::Effect;
use crate::logic::{CustomOp, Evaluator};
use crate::ops::arrays::remove_occurrences;
use crate::ops::strings::concat_values;
use crate::ops::OPERATORS;
use crate::schema::{normalize_ids, Block, ContainerBlock, QuizSchema, UnitBehavior};
use crate::state::{Computed, NodeState, SessionState, SessionStatus, Snapshot, Validation};
use crate::store::Store;
use crate::template::TemplateRegistry;
use crate::utils::unflatten_variables;
use crate::value::Value;
use crate::Rc;

use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Result};
use log::{error, warn};
use rand::seq::SliceRandom;
use rand::Rng;

/// Listener cascades past this depth are dropped with an error log. A
/// legitimate dependency chain never gets near it; hitting the bound means
/// the schema wired listeners into a cycle.
const MAX_CASCADE_DEPTH: u32 = 32;

/// One engine action. Consumers construct these and submit them through
/// `dispatch`; the engine also synthesizes them from effect descriptors.
#[derive(Debug, Clone)]
pub enum Action {
    SetValue {
        id: Rc<str>,
        value: Value,
    },
    SetNodeProperty {
        id: Rc<str>,
        property: Rc<str>,
        value: Value,
    },
    SetVariable {
        name: Rc<str>,
        value: Value,
    },
    Navigate {
        target: Rc<str>,
    },
}

/// Construction-time collaborators: domain definitions, template
/// definitions and style properties, each an id-keyed object.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    pub domains: Option<Value>,
    pub templates: Option<Value>,
    pub styles: Option<Value>,
    /// Overrides the generated session id.
    pub session_id: Option<Rc<str>>,
}

// Flattened interaction unit, kept for the listener scan and validation.
#[derive(Debug, Clone)]
struct UnitInfo {
    id: Rc<str>,
    domain: Value,
    behavior: UnitBehavior,
}

// Hidden/disabled expressions resolved per node at hydration.
#[derive(Debug, Clone, Default)]
struct NodeRules {
    hidden: Option<Value>,
    disabled: Option<Value>,
}

/// The form/quiz session engine.
///
/// Owns the compiled schema and the session state and is the sole writer of
/// that state. Construction expands templates, normalizes ids, hydrates the
/// node map and runs the first derived-state pass; afterwards every
/// mutation flows through [`Engine::dispatch`].
pub struct Engine {
    schema: QuizSchema,
    styles: Value,
    evaluator: Evaluator,
    domains: DomainRegistry,
    units: Vec<UnitInfo>,
    rules: BTreeMap<Rc<str>, NodeRules>,
    store: Rc<Store>,
}

impl Engine {
    pub fn new(schema: Value, options: EngineOptions) -> Result<Engine> {
        let mut templates = TemplateRegistry::new();
        if let Some(definitions) = &options.templates {
            templates.register_all(definitions);
        }
        let mut raw = templates.compile(&schema).map_err(|e| anyhow!("{e}"))?;
        normalize_ids(&mut raw);
        let schema = QuizSchema::from_value(&raw)?;

        let mut domains = DomainRegistry::new();
        if let Some(definitions) = &options.domains {
            domains.register(definitions).map_err(|e| anyhow!("{e}"))?;
        }

        let Some(first_page) = schema.pages.first().map(|p| p.id.clone()) else {
            bail!("schema has no pages");
        };

        let mut hydration = Hydration::default();
        for page in &schema.pages {
            for block in &page.blocks {
                hydration.add_block(block, None);
            }
        }

        let session_id = options
            .session_id
            .clone()
            .unwrap_or_else(generate_session_id);
        let state = SessionState {
            session_id,
            schema_id: schema.id.clone(),
            status: SessionStatus::Active,
            current_step_id: first_page.clone(),
            history: vec![first_page],
            variables: BTreeMap::new(),
            nodes: hydration.nodes,
        };

        let engine = Engine {
            schema,
            styles: options.styles.unwrap_or(Value::Null),
            evaluator: Evaluator::new(),
            domains,
            units: hydration.units,
            rules: hydration.rules,
            store: Rc::new(Store::new(state)),
        };
        engine.recompute_derived_state();
        Ok(engine)
    }

    /// The observable state container. The handle can be held by consumers
    /// for subscribe/get_state; mutation still goes through the engine.
    pub fn store(&self) -> Rc<Store> {
        self.store.clone()
    }

    pub fn schema(&self) -> &QuizSchema {
        &self.schema
    }

    pub fn schema_block(&self, id: &str) -> Option<&Block> {
        self.schema.block(id)
    }

    /// Style properties registered under `id`, or undefined.
    pub fn style(&self, id: &str) -> &Value {
        &self.styles[id]
    }

    pub fn domains(&self) -> &DomainRegistry {
        &self.domains
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Registers a host operator on this session's evaluator.
    pub fn add_operator(&mut self, name: &str, op: CustomOp) -> Result<()> {
        self.evaluator.add_operator(name, op)
    }

    /// Persistence view: navigation position, globals and per-node values.
    pub fn snapshot(&self) -> Snapshot {
        let state = self.store.get_state();
        Snapshot {
            current_step_id: state.current_step_id.clone(),
            variables: state.variables.clone(),
            values: state
                .nodes
                .iter()
                .map(|(id, node)| (id.clone(), node.value.clone()))
                .collect(),
        }
    }

    /// Applies one action to the session. Unknown ids and disallowed
    /// properties degrade to logged no-ops; nothing here panics or fails.
    pub fn dispatch(&self, action: Action) {
        self.dispatch_inner(action, 0);
    }

    fn dispatch_inner(&self, action: Action, depth: u32) {
        if depth > MAX_CASCADE_DEPTH {
            error!("listener cascade exceeded {MAX_CASCADE_DEPTH} levels; dropping further effects");
            return;
        }
        match action {
            Action::SetValue { id, value } => self.set_value(&id, value, depth),
            Action::SetNodeProperty {
                id,
                property,
                value,
            } => {
                self.set_node_property(&id, &property, value);
                self.recompute_derived_state();
            }
            Action::SetVariable { name, value } => {
                self.set_variable(&name, value);
                self.recompute_derived_state();
            }
            Action::Navigate { target } => {
                self.navigate(&target);
                self.recompute_derived_state();
            }
        }
    }

    fn set_value(&self, id: &str, value: Value, depth: u32) {
        {
            let mut state = (*self.store.get_state()).clone();
            let Some(node) = state.node_mut(id) else {
                warn!("set_value: unknown node `{id}`");
                return;
            };
            node.value = value.clone();
            node.touched = true;
            node.validation = self.validate_node(id, &value);

            // committed before listeners run so their reads observe it
            self.store.set_state(state);
        }

        let trigger = format!("{id}.value");
        let cascaded = self.process_listeners(&trigger, &value, depth);
        if !cascaded {
            self.recompute_derived_state();
        }
    }

    fn set_node_property(&self, id: &str, property: &str, value: Value) {
        let mut state = (*self.store.get_state()).clone();
        let Some(node) = state.node_mut(id) else {
            warn!("set_node_property: unknown node `{id}`");
            return;
        };
        // allow-listed writes; anything else is ignored
        match property {
            "required" => node.computed.required = value.is_truthy(),
            "visited" => node.visited = value.is_truthy(),
            _ => return,
        }
        self.store.set_state(state);
    }

    fn set_variable(&self, name: &str, value: Value) {
        let mut state = (*self.store.get_state()).clone();
        state.variables.insert(name.into(), value);
        self.store.set_state(state);
    }

    /// No target validation and no completeness guard here; the consuming
    /// layer decides when navigation is legal.
    fn navigate(&self, target: &str) {
        let mut state = (*self.store.get_state()).clone();
        state.current_step_id = target.into();
        state.history.push(target.into());
        self.store.set_state(state);
    }

    /// Value legality for unit-backed nodes is exactly domain membership.
    fn validate_node(&self, id: &str, value: &Value) -> Validation {
        let Some(unit) = self.units.iter().find(|u| u.id.as_ref() == id) else {
            return Validation::default();
        };
        match DomainRef::from_value(&unit.domain) {
            Some(domain) => {
                if self.domains.validate_ref(value, &domain, &self.evaluator) {
                    Validation::default()
                } else {
                    Validation::invalid("Invalid Format")
                }
            }
            None => Validation::default(),
        }
    }

    /// Evaluates every unit listener registered for `trigger` and turns
    /// descriptor results into dispatched actions. Returns whether any
    /// dispatch happened. The scan is linear over units, which is fine at
    /// the schema sizes this engine serves.
    fn process_listeners(&self, trigger: &str, new_value: &Value, depth: u32) -> bool {
        let context = self.build_context(Some((trigger, new_value)), None);

        let mut effects: Vec<(Rc<str>, Effect)> = vec![];
        for unit in &self.units {
            let Some(logic) = unit.behavior.listeners.get(trigger) else {
                continue;
            };
            let result = self.evaluator.evaluate(logic, &context);
            for effect in Effect::collect(&result) {
                effects.push((unit.id.clone(), effect));
            }
        }

        let mut dispatched = false;
        for (owner, effect) in effects {
            dispatched |= self.handle_effect(&effect, &owner, depth);
        }
        dispatched
    }

    /// Public entry for UI-triggered imperative logic, e.g. a trigger
    /// block's click handler. The acting node's local value is injected as
    /// `value`; resulting descriptors resolve against that node.
    pub fn execute_logic_action(&self, logic: &Value, context_id: &str) {
        // raw navigation shorthand, outside the descriptor protocol
        if let Ok(fields) = logic.as_object() {
            if fields.len() == 1 {
                if let Some(Value::String(target)) = fields.get("navigate") {
                    self.dispatch(Action::Navigate {
                        target: target.clone(),
                    });
                    return;
                }
            }
        }

        let local = self.local_value(context_id);
        let context = self.build_context(None, Some(&local));
        let result = self.evaluator.evaluate(logic, &context);
        for effect in Effect::collect(&result) {
            self.handle_effect(&effect, context_id, 0);
        }
    }

    /// Translates one effect into a dispatched action. `origin` is the
    /// node whose logic produced the effect; bare property targets
    /// address it.
    fn handle_effect(&self, effect: &Effect, origin: &str, depth: u32) -> bool {
        match effect {
            Effect::Set { target, value } => {
                let action = self.resolve_set(target, value.clone(), origin);
                self.dispatch_inner(action, depth + 1);
                true
            }
            Effect::Compound {
                operator,
                target,
                amount,
            } => {
                let base = self.resolve_base(target, origin);
                let Some(next) = apply_compound(operator, &base, amount) else {
                    return false;
                };
                let action = self.resolve_set(target, next, origin);
                self.dispatch_inner(action, depth + 1);
                true
            }
            Effect::Navigate { target } => {
                self.dispatch_inner(
                    Action::Navigate {
                        target: target.clone(),
                    },
                    depth + 1,
                );
                true
            }
        }
    }

    fn resolve_set(&self, target: &str, value: Value, origin: &str) -> Action {
        if let Some(name) = target.strip_prefix("quiz.") {
            return Action::SetVariable {
                name: name.into(),
                value,
            };
        }
        match target.split_once('.') {
            None if target == "value" => Action::SetValue {
                id: origin.into(),
                value,
            },
            None => Action::SetNodeProperty {
                id: origin.into(),
                property: target.into(),
                value,
            },
            Some((id, "value")) => Action::SetValue {
                id: id.into(),
                value,
            },
            Some((id, property)) => Action::SetNodeProperty {
                id: id.into(),
                property: property.into(),
                value,
            },
        }
    }

    /// Current value behind a compound target: the origin's own value for
    /// the bare `value` shortcut, otherwise a context lookup.
    fn resolve_base(&self, target: &str, origin: &str) -> Value {
        if target == "value" {
            let state = self.store.get_state();
            return state
                .node(origin)
                .map(|n| n.value.clone())
                .unwrap_or(Value::Undefined);
        }
        let context = self.build_context(None, None);
        self.evaluator.evaluate(&var_rule(target), &context)
    }

    /// Evaluation context: globals unflattened at the root and repeated
    /// under the `quiz` alias, one entry per node carrying value and
    /// computed flags, then any ad hoc bindings.
    fn build_context(&self, trigger: Option<(&str, &Value)>, local_value: Option<&Value>) -> Value {
        let state = self.store.get_state();
        let globals = unflatten_variables(&state.variables);
        let mut context = globals.clone();

        if let Ok(root) = context.as_object_mut() {
            root.insert("quiz".into(), globals);
            for (id, node) in state.nodes.iter() {
                let mut entry: BTreeMap<Rc<str>, Value> = BTreeMap::new();
                entry.insert("value".into(), node.value.clone());
                entry.insert("hidden".into(), Value::from(node.computed.hidden));
                entry.insert("disabled".into(), Value::from(node.computed.disabled));
                entry.insert("required".into(), Value::from(node.computed.required));
                root.insert(id.clone(), Value::from(entry));
            }
            if let Some(value) = local_value {
                root.insert("value".into(), value.clone());
            }
        }

        if let Some((trigger, value)) = trigger {
            let segments: Vec<&str> = trigger.split('.').collect();
            if let Ok(slot) = context.make_or_get_value_mut(&segments) {
                *slot = value.clone();
            }
        }
        context
    }

    // The logical value a node's expressions read: scoped visual blocks
    // substitute their owning unit's value.
    fn local_value(&self, id: &str) -> Value {
        let state = self.store.get_state();
        let Some(node) = state.node(id) else {
            return Value::Undefined;
        };
        match &node.scope_id {
            Some(scope) => state
                .node(scope)
                .map(|owner| owner.value.clone())
                .unwrap_or(Value::Undefined),
            None => node.value.clone(),
        }
    }

    /// Re-derives hidden/disabled for every node carrying rules, writing
    /// back only what changed, batched into one commit.
    fn recompute_derived_state(&self) {
        let state = self.store.get_state();
        let base_context = self.build_context(None, None);

        let mut changes: Vec<(Rc<str>, Computed)> = vec![];
        for (id, node) in state.nodes.iter() {
            let Some(rules) = self.rules.get(id) else {
                continue;
            };
            if rules.hidden.is_none() && rules.disabled.is_none() {
                continue;
            }

            let local = match &node.scope_id {
                Some(scope) => state
                    .node(scope)
                    .map(|owner| owner.value.clone())
                    .unwrap_or(Value::Undefined),
                None => node.value.clone(),
            };
            let mut context = base_context.clone();
            if let Ok(root) = context.as_object_mut() {
                root.insert("value".into(), local);
            }

            let mut computed = node.computed;
            if let Some(rule) = &rules.hidden {
                computed.hidden = self.evaluator.evaluate(rule, &context).is_truthy();
            }
            if let Some(rule) = &rules.disabled {
                computed.disabled = self.evaluator.evaluate(rule, &context).is_truthy();
            }
            if computed != node.computed {
                changes.push((id.clone(), computed));
            }
        }

        if changes.is_empty() {
            return;
        }
        let mut next = (*state).clone();
        for (id, computed) in changes {
            if let Some(node) = next.node_mut(&id) {
                node.computed = computed;
            }
        }
        self.store.set_state(next);
    }
}

// Builds the node map and the per-node lookup tables in one walk over the
// typed tree. Duplicate ids warn and keep the first occurrence.
#[derive(Default)]
struct Hydration {
    nodes: BTreeMap<Rc<str>, NodeState>,
    units: Vec<UnitInfo>,
    rules: BTreeMap<Rc<str>, NodeRules>,
}

impl Hydration {
    fn add_block(&mut self, block: &Block, scope: Option<&Rc<str>>) {
        if self.nodes.contains_key(block.id()) {
            warn!("duplicate node id `{}`; keeping the first", block.id());
            return;
        }
        let id: Rc<str> = Rc::from(block.id());

        let mut node = NodeState::new(id.clone());
        node.scope_id = scope.cloned();

        match block {
            Block::Container(container) => {
                node.children_ids = Some(child_order(container));
                self.add_state_logic(&id, block);
                self.nodes.insert(id, node);
                for child in &container.children {
                    self.add_block(child, scope);
                }
            }
            Block::Interaction(unit) => {
                node.value = unit.state.initial_value.clone();
                node.computed.required = unit.state.required;
                self.units.push(UnitInfo {
                    id: id.clone(),
                    domain: unit.domain_id.clone(),
                    behavior: unit.behavior.clone(),
                });
                self.rules.insert(
                    id.clone(),
                    NodeRules {
                        hidden: unit.behavior.hidden.clone(),
                        disabled: unit.behavior.disabled.clone(),
                    },
                );
                self.nodes.insert(id.clone(), node);
                self.add_block(&unit.view, Some(&id));
            }
            _ => {
                self.add_state_logic(&id, block);
                self.nodes.insert(id, node);
            }
        }
    }

    fn add_state_logic(&mut self, id: &Rc<str>, block: &Block) {
        if let Some(logic) = block.state_logic() {
            self.rules.insert(
                id.clone(),
                NodeRules {
                    hidden: logic.hidden.clone(),
                    disabled: logic.disabled.clone(),
                },
            );
        }
    }
}

// Child ordering for a container, with shuffle/pick-n applied once here.
// The result is fixed for the session.
fn child_order(container: &ContainerBlock) -> Vec<Rc<str>> {
    let mut ids: Vec<Rc<str>> = container
        .children
        .iter()
        .map(|child| Rc::from(child.id()))
        .collect();

    if let Some(behavior) = &container.behavior {
        let mut rng = rand::thread_rng();
        if let Some(k) = behavior.pick_n {
            let k = k.min(ids.len());
            let mut keep = rand::seq::index::sample(&mut rng, ids.len(), k).into_vec();
            keep.sort_unstable();
            let picked = keep.into_iter().map(|i| ids[i].clone()).collect();
            ids = picked;
        }
        if behavior.shuffle_children {
            ids.shuffle(&mut rng);
        }
    }
    ids
}

/// Combines a slot's current value with `amount`. A nullish base takes the
/// operator's identity (0 for `+`, `-`, `%`; 1 for `*`, `/`; empty for
/// `cat`) so compound updates work on untouched slots.
fn apply_compound(operator: &str, base: &Value, amount: &Value) -> Option<Value> {
    match operator {
        "+" | "-" | "*" | "/" | "%" => {
            let base = if base.is_nullish() {
                numeric_identity(operator)
            } else {
                base.clone()
            };
            let f = OPERATORS.get(operator)?;
            match f(&[base, amount.clone()]) {
                Ok(v) => Some(v),
                Err(err) => {
                    warn!("compound `{operator}` failed: {err}");
                    None
                }
            }
        }
        "cat" => {
            let amount_is_array = amount.as_array().is_ok();
            let base = if base.is_nullish() {
                if amount_is_array {
                    Value::new_array()
                } else {
                    Value::from("")
                }
            } else if base.as_array().is_err() && amount_is_array {
                // scalar base joins an array amount as its head
                Value::from(vec![base.clone()])
            } else {
                base.clone()
            };
            Some(concat_values(&[base, amount.clone()]))
        }
        "uncat" => {
            let base = if base.is_nullish() {
                Value::new_array()
            } else {
                base.clone()
            };
            Some(remove_occurrences(&base, amount))
        }
        _ => {
            warn!("unknown compound operator `{operator}`");
            None
        }
    }
}

fn numeric_identity(operator: &str) -> Value {
    match operator {
        "*" | "/" => Value::from(1),
        _ => Value::from(0),
    }
}

fn var_rule(path: &str) -> Value {
    let mut m: BTreeMap<Rc<str>, Value> = BTreeMap::new();
    m.insert("var".into(), Value::from(path));
    Value::from(m)
}

fn generate_session_id() -> Rc<str> {
    let mut rng = rand::thread_rng();
    let n: u64 = rng.gen();
    format!("session-{n:016x}").into()
}
