// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod domain;
mod effect;
mod engine;
mod logic;
mod number;
mod ops;
mod schema;
mod state;
mod store;
mod template;
mod utils;
mod value;

pub use std::rc::Rc;

pub use domain::{
    ConstructDef, DerivedDef, DomainDef, DomainError, DomainRef, DomainRegistry, Primitive,
    SourceDef, Transform,
};
pub use effect::{Effect, Pointer};
pub use engine::{Action, Engine, EngineOptions};
pub use logic::{CustomOp, Evaluator};
pub use number::Number;
pub use schema::{
    Block, ContainerBehavior, ContainerBlock, DividerBlock, ImageBlock, InputBlock,
    InteractionUnit, PageNode, QuizSchema, SelectBlock, SliderBlock, StateLogic, TextBlock,
    ToggleBlock, TriggerBlock, UnitBehavior, UnitState,
};
pub use state::{Computed, NodeState, SessionState, SessionStatus, Snapshot, Validation};
pub use store::Store;
pub use template::{TemplateError, TemplateRegistry};
pub use value::Value;
