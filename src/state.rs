// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Runtime session state.
//!
//! One `NodeState` exists per schema block; the `SessionState` aggregate is
//! what consumers observe through the store. All structures serialize in
//! camelCase so snapshots read naturally on the consuming side.

use crate::value::Value;
use crate::Rc;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    /// Reserved for completion/abort flows.
    Terminal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub session_id: Rc<str>,

    #[serde(default)]
    pub schema_id: Option<Rc<str>>,

    pub status: SessionStatus,

    /// Id of the page the session is on.
    pub current_step_id: Rc<str>,

    /// Navigation trail, most recent last.
    #[serde(default)]
    pub history: Vec<Rc<str>>,

    /// Flat global variables; dotted names nest only at evaluation time.
    #[serde(default)]
    pub variables: BTreeMap<Rc<str>, Value>,

    #[serde(default)]
    pub nodes: BTreeMap<Rc<str>, NodeState>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeState {
    pub id: Rc<str>,

    /// The interaction unit this node reads its logical value from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_id: Option<Rc<str>>,

    #[serde(default)]
    pub value: Value,

    #[serde(default)]
    pub visited: bool,

    #[serde(default)]
    pub touched: bool,

    #[serde(default)]
    pub validation: Validation,

    #[serde(default)]
    pub computed: Computed,

    /// Child ordering for containers, fixed after hydration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children_ids: Option<Vec<Rc<str>>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    pub is_valid: bool,

    #[serde(default)]
    pub errors: Vec<Rc<str>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Computed {
    #[serde(default)]
    pub hidden: bool,

    #[serde(default)]
    pub disabled: bool,

    #[serde(default)]
    pub required: bool,
}

/// Persistence view of a live session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub current_step_id: Rc<str>,
    pub variables: BTreeMap<Rc<str>, Value>,
    pub values: BTreeMap<Rc<str>, Value>,
}

impl Default for Validation {
    fn default() -> Self {
        Validation {
            is_valid: true,
            errors: vec![],
        }
    }
}

impl Validation {
    pub fn invalid(error: &str) -> Validation {
        Validation {
            is_valid: false,
            errors: vec![error.into()],
        }
    }
}

impl NodeState {
    pub fn new(id: Rc<str>) -> NodeState {
        NodeState {
            id,
            scope_id: None,
            value: Value::Null,
            visited: false,
            touched: false,
            validation: Validation::default(),
            computed: Computed::default(),
            children_ids: None,
        }
    }
}

impl SessionState {
    pub fn node(&self, id: &str) -> Option<&NodeState> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut NodeState> {
        self.nodes.get_mut(id)
    }

    pub fn variable(&self, name: &str) -> &Value {
        self.variables.get(name).unwrap_or(&Value::Undefined)
    }
}
