// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Typed schema model.
//!
//! The authored document is a tree of pages holding blocks. Visual blocks
//! carry presentation and an optional `state_logic`; interaction units carry
//! the logic surface (domain, state, behavior) and wrap exactly one visual
//! `view`. Blocks are discriminated by their `kind` tag.
//!
//! Parsing happens after template expansion and id normalization, so every
//! block is guaranteed an id by the time the typed tree exists.

use crate::value::Value;
use crate::Rc;

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSchema {
    #[serde(default)]
    pub id: Option<Rc<str>>,

    /// Authoring metadata, opaque to the engine.
    #[serde(default)]
    pub meta: Value,

    /// Presentation configuration, opaque to the engine.
    #[serde(default)]
    pub config: Value,

    #[serde(default)]
    pub pages: Vec<PageNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageNode {
    pub id: Rc<str>,

    #[serde(default)]
    pub title: Option<Rc<str>>,

    #[serde(default)]
    pub blocks: Vec<Block>,
}

/// One schema block. The set of kinds is closed; every capability is an
/// exhaustive match over this enum.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Container(ContainerBlock),
    Text(TextBlock),
    Divider(DividerBlock),
    Image(ImageBlock),
    Input(InputBlock),
    Trigger(TriggerBlock),
    Toggle(ToggleBlock),
    Slider(SliderBlock),
    Select(SelectBlock),
    Interaction(InteractionUnit),
}

/// Hidden/disabled expressions a visual block carries on its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateLogic {
    #[serde(default)]
    pub hidden: Option<Value>,

    #[serde(default)]
    pub disabled: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerBlock {
    pub id: Rc<str>,

    #[serde(default)]
    pub children: Vec<Block>,

    #[serde(default)]
    pub behavior: Option<ContainerBehavior>,

    #[serde(default)]
    pub style: Option<Rc<str>>,

    #[serde(default)]
    pub state_logic: Option<StateLogic>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerBehavior {
    /// Randomize the order of the children once at hydration.
    #[serde(default)]
    pub shuffle_children: bool,

    /// Keep only a random subset of this size, chosen once at hydration.
    #[serde(default)]
    pub pick_n: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBlock {
    pub id: Rc<str>,

    #[serde(default)]
    pub text: Option<Rc<str>>,

    #[serde(default)]
    pub style: Option<Rc<str>>,

    #[serde(default)]
    pub state_logic: Option<StateLogic>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DividerBlock {
    pub id: Rc<str>,

    #[serde(default)]
    pub style: Option<Rc<str>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageBlock {
    pub id: Rc<str>,

    #[serde(default)]
    pub src: Option<Rc<str>>,

    #[serde(default)]
    pub alt: Option<Rc<str>>,

    #[serde(default)]
    pub style: Option<Rc<str>>,

    #[serde(default)]
    pub state_logic: Option<StateLogic>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputBlock {
    pub id: Rc<str>,

    #[serde(default)]
    pub placeholder: Option<Rc<str>>,

    #[serde(default)]
    pub input_type: Option<Rc<str>>,

    #[serde(default)]
    pub style: Option<Rc<str>>,

    #[serde(default)]
    pub state_logic: Option<StateLogic>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerBlock {
    pub id: Rc<str>,

    #[serde(default)]
    pub label: Option<Rc<str>>,

    /// Imperative logic run through `execute_logic_action` by the UI.
    #[serde(default)]
    pub on_click: Option<Value>,

    #[serde(default)]
    pub style: Option<Rc<str>>,

    #[serde(default)]
    pub state_logic: Option<StateLogic>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleBlock {
    pub id: Rc<str>,

    #[serde(default)]
    pub label: Option<Rc<str>>,

    #[serde(default)]
    pub style: Option<Rc<str>>,

    #[serde(default)]
    pub state_logic: Option<StateLogic>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliderBlock {
    pub id: Rc<str>,

    #[serde(default)]
    pub min: Option<f64>,

    #[serde(default)]
    pub max: Option<f64>,

    #[serde(default)]
    pub step: Option<f64>,

    #[serde(default)]
    pub style: Option<Rc<str>>,

    #[serde(default)]
    pub state_logic: Option<StateLogic>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectBlock {
    pub id: Rc<str>,

    #[serde(default)]
    pub options: Value,

    #[serde(default)]
    pub style: Option<Rc<str>>,

    #[serde(default)]
    pub state_logic: Option<StateLogic>,
}

/// The logic-bearing wrapper: owns a value constrained by `domain_id`,
/// declarative initial state and behavior, and exactly one visual view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionUnit {
    pub id: Rc<str>,

    /// Domain id string, or a literal array used as an inline domain.
    #[serde(default)]
    pub domain_id: Value,

    #[serde(default)]
    pub state: UnitState,

    #[serde(default)]
    pub behavior: UnitBehavior,

    pub view: Box<Block>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitState {
    #[serde(default)]
    pub initial_value: Value,

    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitBehavior {
    #[serde(default)]
    pub hidden: Option<Value>,

    #[serde(default)]
    pub disabled: Option<Value>,

    /// Trigger key (`"<id>.value"`) to listener logic.
    #[serde(default)]
    pub listeners: BTreeMap<Rc<str>, Value>,

    /// Declared extension point; not yet invoked by validation.
    #[serde(default)]
    pub validators: Vec<Value>,
}

impl QuizSchema {
    pub fn from_value(schema: &Value) -> Result<QuizSchema> {
        let raw = serde_json::to_value(schema)?;
        Ok(serde_json::from_value(raw)?)
    }

    /// Looks up a block anywhere in the tree by id.
    pub fn block(&self, id: &str) -> Option<&Block> {
        self.pages.iter().find_map(|p| find_block(&p.blocks, id))
    }

    pub fn page(&self, id: &str) -> Option<&PageNode> {
        self.pages.iter().find(|p| p.id.as_ref() == id)
    }
}

impl Block {
    /// Stable identifier; normalization guarantees presence.
    pub fn id(&self) -> &str {
        match self {
            Block::Container(b) => &b.id,
            Block::Text(b) => &b.id,
            Block::Divider(b) => &b.id,
            Block::Image(b) => &b.id,
            Block::Input(b) => &b.id,
            Block::Trigger(b) => &b.id,
            Block::Toggle(b) => &b.id,
            Block::Slider(b) => &b.id,
            Block::Select(b) => &b.id,
            Block::Interaction(b) => &b.id,
        }
    }

    /// The block's own hidden/disabled expressions, when it carries any.
    pub fn state_logic(&self) -> Option<&StateLogic> {
        match self {
            Block::Container(b) => b.state_logic.as_ref(),
            Block::Text(b) => b.state_logic.as_ref(),
            Block::Image(b) => b.state_logic.as_ref(),
            Block::Input(b) => b.state_logic.as_ref(),
            Block::Trigger(b) => b.state_logic.as_ref(),
            Block::Toggle(b) => b.state_logic.as_ref(),
            Block::Slider(b) => b.state_logic.as_ref(),
            Block::Select(b) => b.state_logic.as_ref(),
            Block::Divider(_) | Block::Interaction(_) => None,
        }
    }
}

fn find_block<'a>(blocks: &'a [Block], id: &str) -> Option<&'a Block> {
    blocks.iter().find_map(|b| find_in(b, id))
}

fn find_in<'a>(block: &'a Block, id: &str) -> Option<&'a Block> {
    if block.id() == id {
        return Some(block);
    }
    match block {
        Block::Container(c) => c.children.iter().find_map(|b| find_in(b, id)),
        Block::Interaction(u) => find_in(&u.view, id),
        _ => None,
    }
}

/// Assigns synthetic ids to pages and blocks missing one. Runs on the raw
/// tree before the typed parse so hydration can key every node.
pub fn normalize_ids(schema: &mut Value) {
    let mut counter = 0usize;
    let Ok(root) = schema.as_object_mut() else {
        return;
    };
    let Some(pages) = root.get_mut("pages") else {
        return;
    };
    let Ok(pages) = pages.as_array_mut() else {
        return;
    };
    for (index, page) in pages.iter_mut().enumerate() {
        if let Ok(fields) = page.as_object_mut() {
            if !matches!(fields.get("id"), Some(Value::String(_))) {
                fields.insert("id".into(), Value::from(format!("page-{}", index + 1)));
            }
            if let Some(blocks) = fields.get_mut("blocks") {
                normalize_blocks(blocks, &mut counter);
            }
        }
    }
}

fn normalize_blocks(blocks: &mut Value, counter: &mut usize) {
    let Ok(items) = blocks.as_array_mut() else {
        return;
    };
    for block in items.iter_mut() {
        normalize_block(block, counter);
    }
}

fn normalize_block(block: &mut Value, counter: &mut usize) {
    let Ok(fields) = block.as_object_mut() else {
        return;
    };
    if !matches!(fields.get("id"), Some(Value::String(_))) {
        *counter += 1;
        fields.insert("id".into(), Value::from(format!("block-{counter}")));
    }
    if let Some(children) = fields.get_mut("children") {
        normalize_blocks(children, counter);
    }
    if let Some(view) = fields.get_mut("view") {
        normalize_block(view, counter);
    }
}
