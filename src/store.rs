// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Observable state container.
//!
//! The current `SessionState` sits behind an `Rc` and is replaced wholesale
//! on every commit; subscribers are notified after each replacement.
//! Consumers treat snapshots as read-only and route all mutation through
//! the engine's dispatch.

use crate::state::SessionState;
use crate::Rc;

use std::cell::{Cell, RefCell};

type Subscriber = Rc<dyn Fn(&SessionState)>;

pub struct Store {
    state: RefCell<Rc<SessionState>>,
    subscribers: RefCell<Vec<(usize, Subscriber)>>,
    next_token: Cell<usize>,
}

impl Store {
    pub fn new(initial: SessionState) -> Store {
        Store {
            state: RefCell::new(Rc::new(initial)),
            subscribers: RefCell::new(Vec::new()),
            next_token: Cell::new(0),
        }
    }

    /// Current snapshot. The handle stays valid across later commits.
    pub fn get_state(&self) -> Rc<SessionState> {
        self.state.borrow().clone()
    }

    /// Replaces the state and notifies every subscriber.
    pub fn set_state(&self, next: SessionState) {
        let snapshot = Rc::new(next);
        *self.state.borrow_mut() = snapshot.clone();

        // the list is copied out first so callbacks may subscribe
        let subscribers: Vec<Subscriber> = self
            .subscribers
            .borrow()
            .iter()
            .map(|(_, f)| f.clone())
            .collect();
        for subscriber in subscribers {
            subscriber(&snapshot);
        }
    }

    /// Registers a change callback; the returned token unsubscribes.
    pub fn subscribe(&self, subscriber: impl Fn(&SessionState) + 'static) -> usize {
        let token = self.next_token.get();
        self.next_token.set(token + 1);
        self.subscribers
            .borrow_mut()
            .push((token, Rc::new(subscriber)));
        token
    }

    pub fn unsubscribe(&self, token: usize) {
        self.subscribers.borrow_mut().retain(|(t, _)| *t != token);
    }
}
