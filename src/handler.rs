// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Behavior units and the handler capability set.
//!
//! A [`BehaviorUnit`] is a value that advertises the full set of
//! `do__`/`pre__`/`post__`/`transition__…__to__…` keys it declares, and
//! can be asked to invoke any one of them by name. The "origin unit"
//! identity each handler needs is intrinsic — a unit always knows its own
//! name — rather than tracked separately per handler.

use std::fmt;
use std::sync::Arc;

use crate::engine::Automaton;
use crate::error::HsmError;
use crate::state::StateData;
use crate::state::StateName;

/// Which family of handler is being resolved: `do`, `pre`, or `post`.
///
/// Transition helpers are resolved separately (see
/// [`crate::state::name::candidate_transitions`]) and have no `HandlerKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Do,
    Pre,
    Post,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Do => "do",
            Self::Pre => "pre",
            Self::Post => "post",
        })
    }
}

/// The sum type a `do`/`pre`/`post` handler returns. Rust's type system
/// enforces the shape at the boundary, so the `BadReturn` fault in
/// [`HsmError`] is unreachable from native handlers — it is kept in the
/// error enum for any future bridge from a handler source that isn't
/// statically typed this way.
#[derive(Debug, Clone)]
pub enum ReturnValue {
    /// No state change.
    None,
    /// Install a new state with no payload.
    Name(StateName),
    /// Install a new state with an attached opaque payload.
    NameData(StateName, StateData),
}

/// Control-flow signal a `do`/`pre`/`post` handler may produce in place of
/// an ordinary [`ReturnValue`].
///
/// Transition helpers do not use this type: they install state purely
/// through side effects
/// ([`Automaton::set_state`]/[`Automaton::push`]), with their return
/// value passed through unchanged and no NonFatal/Finished protocol of
/// their own.
#[derive(Debug, Clone)]
pub enum ControlSignal {
    /// Handler completed normally.
    Return(ReturnValue),
    /// `NonFatal(error)`: divert to `<current>__UNKNOWN` and continue.
    NonFatal(String),
    /// `Finished { retval, new_state?, new_state_data? }`: terminate `run`.
    Finished(ExitSignal),
}

/// Payload of a `Finished` control signal.
#[derive(Debug, Clone)]
pub struct ExitSignal {
    pub retval: i32,
    pub new_state: Option<StateName>,
    pub new_state_data: Option<StateData>,
}

impl ExitSignal {
    pub fn new(retval: i32) -> Self {
        Self { retval, new_state: None, new_state_data: None }
    }

    pub fn with_state(mut self, state: StateName, data: Option<StateData>) -> Self {
        self.new_state = Some(state);
        self.new_state_data = data;
        self
    }
}

/// A positional argument passed to a transition helper via
/// `transition_to(target, exact, args...)`: a closed, typed set covering
/// what a transition helper actually needs rather than an open-ended
/// variadic.
#[derive(Debug, Clone)]
pub enum Arg {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Data(StateData),
}

/// A behavior unit contributing handlers and/or transition helpers to an
/// [`Automaton`]'s composed chain.
///
/// Object-safe for use as `Arc<dyn BehaviorUnit>`. Units are stateless with
/// respect to any one automaton instance — all per-instance state lives on
/// the [`Automaton`] itself, which is passed to every call.
pub trait BehaviorUnit: Send + Sync {
    /// Stable identity of this unit. Becomes the composition-chain identity
    /// and the "origin unit" config-key dimension.
    fn name(&self) -> &str;

    /// Every `do__`/`pre__`/`post__` key this unit declares, e.g.
    /// `"do__FOO__BAR"` or `"pre__FOO__default"`.
    fn handler_keys(&self) -> Vec<String>;

    /// Every `transition__<FROM>__to__<TO>` key this unit declares.
    fn transition_keys(&self) -> Vec<String>;

    /// Invoke the handler previously advertised via `handler_keys()`.
    fn invoke_handler(
        &self,
        key: &str,
        automaton: &mut Automaton,
    ) -> Result<ControlSignal, HsmError>;

    /// Invoke the transition helper previously advertised via
    /// `transition_keys()`. The handler is expected to install any new
    /// state itself (via [`Automaton::set_state`]/[`Automaton::push`]);
    /// the returned payload is passed back to the `transition_to` caller
    /// unchanged.
    fn invoke_transition(
        &self,
        key: &str,
        automaton: &mut Automaton,
        args: &[Arg],
    ) -> Result<Option<StateData>, HsmError>;

    /// Run once per automaton instance, in chain order.
    fn initialize(&self, _automaton: &mut Automaton) -> Result<(), HsmError> {
        Ok(())
    }
}

/// Type alias used throughout for a shared, reference-counted unit.
pub type BehaviorUnitRef = Arc<dyn BehaviorUnit>;

#[cfg(test)]
#[path = "handler_tests.rs"]
mod handler_tests;
