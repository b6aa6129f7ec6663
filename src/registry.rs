// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The composed handler/transition index: a flat lookup built once per
//! composition from an ordered chain of
//! [`BehaviorUnit`](crate::handler::BehaviorUnit)s.

use std::collections::{HashMap, HashSet};

use crate::error::HsmError;
use crate::handler::{BehaviorUnitRef, HandlerKind};
use crate::state::{candidate_handlers, candidate_transitions, StateName};

/// A handler or transition resolved to the unit that declared it.
#[derive(Clone)]
pub enum Resolved {
    Found { unit: BehaviorUnitRef, key: String },
    /// No declared handler matched, but the caller allowed that.
    Null,
}

impl Resolved {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolved::Found { .. })
    }

    pub fn origin_unit(&self) -> Option<&str> {
        match self {
            Resolved::Found { unit, .. } => Some(unit.name()),
            Resolved::Null => None,
        }
    }
}

/// A flat, built-once index over a composed chain of behavior units.
///
/// Built by walking the chain front-to-back and overwriting each key's
/// entry as it is seen again, so the most recently composed unit wins
/// ties, which is equivalent to — and cheaper than — walking the chain
/// backwards at lookup time.
pub struct HandlerRegistry {
    handlers: HashMap<String, BehaviorUnitRef>,
    transitions: HashMap<String, BehaviorUnitRef>,
}

impl HandlerRegistry {
    /// Build an index from a composition chain, outermost (most recently
    /// composed) last.
    pub fn build(chain: &[BehaviorUnitRef]) -> Self {
        let mut handlers = HashMap::new();
        let mut transitions = HashMap::new();
        for unit in chain {
            for key in unit.handler_keys() {
                handlers.insert(key, unit.clone());
            }
            for key in unit.transition_keys() {
                transitions.insert(key, unit.clone());
            }
        }
        Self { handlers, transitions }
    }

    /// Resolve a `do`/`pre`/`post` handler for `state` by walking the
    /// candidate names from [`candidate_handlers`] in order. When
    /// `allow_missing` is false and nothing matches, returns
    /// [`HsmError::NoHandler`]; otherwise returns [`Resolved::Null`].
    pub fn find_handler(
        &self,
        state: &StateName,
        kind: HandlerKind,
        allow_missing: bool,
    ) -> Result<Resolved, HsmError> {
        for key in candidate_handlers(state, kind) {
            if let Some(unit) = self.handlers.get(&key) {
                return Ok(Resolved::Found { unit: unit.clone(), key });
            }
        }
        if allow_missing {
            Ok(Resolved::Null)
        } else {
            Err(HsmError::NoHandler { state: state.clone(), kind })
        }
    }

    /// Resolve a `transition__<from>__to__<to>` helper by walking the
    /// candidate names from [`candidate_transitions`] in order. Transition
    /// resolution never has a "null" mode: a transition request with no
    /// matching helper is always a fault.
    pub fn find_transition(
        &self,
        from_state: &StateName,
        to_state: &StateName,
    ) -> Result<Resolved, HsmError> {
        for key in candidate_transitions(from_state, to_state) {
            if let Some(unit) = self.transitions.get(&key) {
                return Ok(Resolved::Found { unit: unit.clone(), key });
            }
        }
        Err(HsmError::NoHandler { state: from_state.clone(), kind: HandlerKind::Do })
    }

    /// Every exact state name some unit in the chain declares a `do`
    /// handler for — i.e. `do__<STATE>` keys, excluding `__default`
    /// fallbacks. `Automaton::have_handler_for_state` relies on this for
    /// enumeration-free existence checks elsewhere.
    pub fn handled_states(&self) -> HashSet<StateName> {
        self.handlers
            .keys()
            .filter_map(|key| exact_do_state(key))
            .collect()
    }
}

fn exact_do_state(key: &str) -> Option<StateName> {
    let rest = key.strip_prefix("do__")?;
    if rest == "default" || rest.ends_with("__default") {
        return None;
    }
    StateName::parse(rest).ok()
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod registry_tests;
