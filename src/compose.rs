// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The behavior composer: assembles a flat [`HandlerRegistry`] from four
//! ordered slots — always-prepended, base, requested, always-appended —
//! and runs each newly-seen unit's one-time initializer.
//!
//! The chain is plain data: an explicit `Vec` per slot, flattened and
//! reindexed into a fresh [`HandlerRegistry`] on every `compose()` call
//! rather than mutated in place.

use std::collections::HashSet;

use crate::engine::Automaton;
use crate::error::HsmError;
use crate::handler::BehaviorUnitRef;
use crate::registry::HandlerRegistry;

/// The four composition slots and the initializer-once bookkeeping:
/// initializers run exactly once per automaton instance, in composition
/// order, even if a unit appears in more than one slot.
#[derive(Default)]
pub struct BehaviorComposer {
    prepended: Vec<BehaviorUnitRef>,
    base: Vec<BehaviorUnitRef>,
    requested: Vec<BehaviorUnitRef>,
    appended: Vec<BehaviorUnitRef>,
    initialized: HashSet<String>,
}

impl BehaviorComposer {
    /// Start a composer with a fixed base chain (the units an automaton is
    /// built with, analogous to a class's own `HandlerSet` bases before any
    /// `inherit()` call).
    pub fn new(base: Vec<BehaviorUnitRef>) -> Self {
        Self { base, ..Default::default() }
    }

    /// The full, ordered chain as of right now: prepended, base, requested,
    /// appended. Later entries win ties when [`HandlerRegistry::build`]
    /// indexes them.
    pub fn chain(&self) -> Vec<BehaviorUnitRef> {
        self.prepended
            .iter()
            .chain(self.base.iter())
            .chain(self.requested.iter())
            .chain(self.appended.iter())
            .cloned()
            .collect()
    }

    /// Replace the requested slot, run any not-yet-initialized unit's
    /// `initialize`, and rebuild the registry. Mirrors `HandlerSet.inherit`.
    pub fn compose(
        &mut self,
        requested: Vec<BehaviorUnitRef>,
        automaton: &mut Automaton,
    ) -> Result<HandlerRegistry, HsmError> {
        self.requested = requested;
        self.run_initializers(automaton)
    }

    /// Permanently add to the front of the chain, then recompose with an
    /// empty requested slot. Mirrors `Retargetable.alwaysInheritFirst`.
    pub fn always_prepend(
        &mut self,
        units: Vec<BehaviorUnitRef>,
        automaton: &mut Automaton,
    ) -> Result<HandlerRegistry, HsmError> {
        self.prepended.extend(units);
        self.compose(Vec::new(), automaton)
    }

    /// Permanently add to the back of the chain, then recompose with an
    /// empty requested slot. Mirrors `Retargetable.alwaysInherit`.
    pub fn always_append(
        &mut self,
        units: Vec<BehaviorUnitRef>,
        automaton: &mut Automaton,
    ) -> Result<HandlerRegistry, HsmError> {
        self.appended.extend(units);
        self.compose(Vec::new(), automaton)
    }

    fn run_initializers(&mut self, automaton: &mut Automaton) -> Result<HandlerRegistry, HsmError> {
        let chain = self.chain();
        for unit in &chain {
            if self.initialized.insert(unit.name().to_string()) {
                unit.initialize(automaton)?;
            }
        }
        Ok(HandlerRegistry::build(&chain))
    }
}

#[cfg(test)]
#[path = "compose_tests.rs"]
mod compose_tests;
