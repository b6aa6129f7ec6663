// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The HSM engine: the `Automaton` that owns state, the push/pop stack,
//! the composed registry, and the `run` loop.
//!
//! `run` drives a pre/do/post cycle per iteration and applies whatever
//! state change each handler requests; `transition_to` resolves and
//! invokes a transition helper and checks its landing state against the
//! caller's exactness requirement.

use std::collections::HashMap;
use std::mem;

use indexmap::IndexMap;
use tracing::{debug, error, warn};

use crate::compose::BehaviorComposer;
use crate::config::ConfigTree;
use crate::error::HsmError;
use crate::handler::{Arg, BehaviorUnitRef, ControlSignal, HandlerKind, ReturnValue};
use crate::registry::{HandlerRegistry, Resolved};
use crate::state::{StateData, StateName, StateStack, StateValue};
use crate::terminal::TerminalFacade;

/// The handler currently executing, tracked so the screen-imaging pipeline
/// can key its config lookups on `(origin_unit_name, current_state)`
/// without handlers having to pass that identity around explicitly. Set
/// and cleared around every `pre`/`do`/`post` dispatch, regardless of
/// which of the three is running.
#[derive(Clone)]
pub struct CurrentHandler {
    pub origin_unit: String,
    pub state: StateName,
}

enum StepResult {
    Unchanged,
    Changed,
    /// A `NonFatal` control signal was handled inline; the state has
    /// already been diverted to `<state>__UNKNOWN`.
    Diverted,
    Exit(i32),
}

enum IterationOutcome {
    Restart,
    Advance,
    Exit(i32),
}

/// A running hierarchical state machine instance.
///
/// Owns its state/stack, its composed handler registry, and its
/// collaborators (the terminal façade and config tree). Handlers receive
/// `&mut Automaton` on every call rather than holding a reference back to
/// it themselves — units are stateless with respect to any one instance.
pub struct Automaton {
    state: StateName,
    state_data: Option<StateData>,
    last_state: Option<StateValue>,
    stack: StateStack,
    current_handler: Option<CurrentHandler>,
    composer: BehaviorComposer,
    registry: HandlerRegistry,
    /// Per-origin-unit captured-data dictionaries, populated by the
    /// screen-imaging capture step and created lazily on first capture.
    captured: HashMap<String, IndexMap<String, String>>,
    pub terminal: Box<dyn TerminalFacade>,
    pub config: ConfigTree,
}

impl Automaton {
    /// Build an automaton in `INITIAL_STATE` with `base` as the unit
    /// chain's fixed base slot.
    pub fn new(
        base: Vec<BehaviorUnitRef>,
        terminal: Box<dyn TerminalFacade>,
        config: ConfigTree,
    ) -> Self {
        let registry = HandlerRegistry::build(&[]);
        Self {
            state: StateName::new_unchecked("INITIAL_STATE"),
            state_data: None,
            last_state: None,
            stack: StateStack::new(),
            current_handler: None,
            composer: BehaviorComposer::new(base),
            registry,
            captured: HashMap::new(),
            terminal,
            config,
        }
    }

    pub fn state(&self) -> &StateName {
        &self.state
    }

    pub fn state_data(&self) -> Option<&StateData> {
        self.state_data.as_ref()
    }

    pub fn last_state(&self) -> Option<&StateValue> {
        self.last_state.as_ref()
    }

    pub fn current_handler(&self) -> Option<&CurrentHandler> {
        self.current_handler.as_ref()
    }

    /// Recompose the handler chain with `requested` as the requested slot,
    /// running any not-yet-initialized unit's `initialize` in chain order.
    pub fn compose(&mut self, requested: Vec<BehaviorUnitRef>) -> Result<(), HsmError> {
        let mut composer = mem::take(&mut self.composer);
        let registry = composer.compose(requested, self)?;
        self.composer = composer;
        self.registry = registry;
        Ok(())
    }

    pub fn always_prepend(&mut self, units: Vec<BehaviorUnitRef>) -> Result<(), HsmError> {
        let mut composer = mem::take(&mut self.composer);
        let registry = composer.always_prepend(units, self)?;
        self.composer = composer;
        self.registry = registry;
        Ok(())
    }

    pub fn always_append(&mut self, units: Vec<BehaviorUnitRef>) -> Result<(), HsmError> {
        let mut composer = mem::take(&mut self.composer);
        let registry = composer.always_append(units, self)?;
        self.composer = composer;
        self.registry = registry;
        Ok(())
    }

    /// Install a new current state, remembering the previous one as
    /// `last_state`. Neither pushes nor pops the stack.
    pub fn set_state(&mut self, name: StateName, data: Option<StateData>) {
        debug!(from = %self.state, to = %name, "state change");
        self.last_state = Some(StateValue::new(self.state.clone(), self.state_data.take()));
        self.state = name;
        self.state_data = data;
    }

    /// Suspend the current state onto the stack and install a new one.
    pub fn push(&mut self, name: StateName, data: Option<StateData>) {
        self.stack.push(StateValue::new(self.state.clone(), self.state_data.take()));
        self.state = name;
        self.state_data = data;
    }

    /// Restore the most recently pushed state. Fails with
    /// [`HsmError::StackEmpty`] if nothing is on the stack.
    pub fn pop(&mut self) -> Result<(), HsmError> {
        let restored = self.stack.pop().ok_or(HsmError::StackEmpty)?;
        self.last_state = Some(StateValue::new(self.state.clone(), self.state_data.take()));
        self.state = restored.name;
        self.state_data = restored.data;
        Ok(())
    }

    pub fn peek(&self) -> Option<&StateName> {
        self.stack.peek().map(|v| &v.name)
    }

    pub fn reset_stack(&mut self) {
        self.stack.reset();
    }

    /// Query-only existence check for a `do` handler, without invoking it.
    /// `state` defaults to the current state when `None`.
    pub fn have_handler_for_state(&self, state: Option<&StateName>) -> Result<bool, HsmError> {
        let state = state.unwrap_or(&self.state);
        Ok(self.registry.find_handler(state, HandlerKind::Do, true)?.is_found())
    }

    /// The per-origin-unit captured-data dictionary, created empty on first
    /// access.
    pub fn captured_data_mut(&mut self, origin_unit: &str) -> &mut IndexMap<String, String> {
        self.captured.entry(origin_unit.to_string()).or_default()
    }

    pub fn captured_data(&self, origin_unit: &str) -> Option<&IndexMap<String, String>> {
        self.captured.get(origin_unit)
    }

    /// Request transition to `target`, resolving and invoking the matching
    /// `transition__…__to__…` helper.
    ///
    /// If `target` already equals the current state, this is a no-op
    /// returning `Ok(None)` — no helper is resolved or invoked.
    ///
    /// Post-conditions, checked after the helper returns:
    /// - the state must have changed at all ([`HsmError::TransitionInert`]);
    /// - if `exact`, the landed state must be `target` or a substate of it
    ///   ([`HsmError::TransitionMissedExact`]);
    /// - otherwise, the landed state must be a substate of `target`, or
    ///   a `do` handler must exist for wherever it landed
    ///   ([`HsmError::TransitionMissedWithNoHandler`]).
    pub fn transition_to(
        &mut self,
        target: StateName,
        exact: bool,
        args: &[Arg],
    ) -> Result<Option<StateData>, HsmError> {
        if target == self.state {
            return Ok(None);
        }
        let resolved = self.registry.find_transition(&self.state, &target)?;
        let Resolved::Found { unit, key } = resolved else {
            return Err(HsmError::NoHandler { state: self.state.clone(), kind: HandlerKind::Do });
        };
        let before = self.state.clone();
        let retval = unit.invoke_transition(&key, self, args)?;
        if self.state == before {
            return Err(HsmError::TransitionInert);
        }
        if exact {
            if !target.is_substate(&self.state) {
                return Err(HsmError::TransitionMissedExact {
                    target,
                    landed: self.state.clone(),
                });
            }
        } else if !(target.is_substate(&self.state) || self.have_handler_for_state(None)?) {
            return Err(HsmError::TransitionMissedWithNoHandler {
                target,
                landed: self.state.clone(),
            });
        }
        Ok(retval)
    }

    /// Request termination: the `Finished` signal, applying
    /// `new_state`/`new_state_data` if given before `run` returns `retval`.
    /// A handler calls this and propagates the
    /// `ControlSignal` it returns with `?`/an explicit `return`.
    pub fn finish(
        &mut self,
        retval: i32,
        new_state: Option<StateName>,
        new_state_data: Option<StateData>,
    ) -> ControlSignal {
        ControlSignal::Finished(crate::handler::ExitSignal {
            retval,
            new_state,
            new_state_data,
        })
    }

    /// Send `content` (if any) followed by `os.endline`, decoded as an
    /// escaped string (default `\r\n`).
    pub fn sendline(&mut self, content: Option<&str>) -> Result<(), HsmError> {
        if let Some(content) = content {
            self.terminal.send(content.as_bytes())?;
        }
        let endline = self.config.get_escaped(Some("os"), "endline", Some("\\r\\n"))?;
        self.terminal.send(&endline)
    }

    /// Send the byte sequence for `key`: a config override at
    /// `os.term_key_<key>` takes precedence over the built-in key table;
    /// fails [`HsmError::UnknownKey`] if neither is present.
    pub fn send_key(&mut self, key: &str) -> Result<(), HsmError> {
        let config_key = format!("term_key_{key}");
        let bytes = if self.config.exists(Some("os"), &config_key) {
            self.config.get_escaped(Some("os"), &config_key, None)?
        } else if let Some(default) = crate::terminal::keys::lookup(key) {
            self.config.get_escaped(
                Some("os"),
                &config_key,
                Some(std::str::from_utf8(default).unwrap_or_default()),
            )?
        } else {
            return Err(HsmError::UnknownKey { key: key.to_string() });
        };
        self.terminal.send(&bytes)
    }

    /// Apply one `ReturnValue` to the current state. Returns whether the
    /// state actually changed.
    fn handle_retval(&mut self, rv: ReturnValue) -> bool {
        match rv {
            ReturnValue::None => false,
            ReturnValue::Name(name) => {
                self.set_state(name, None);
                true
            }
            ReturnValue::NameData(name, data) => {
                self.set_state(name, Some(data));
                true
            }
        }
    }

    /// Run the engine's pre/do/post loop until a handler signals `Finished`
    /// or an unrecovered fault occurs.
    ///
    /// On fault, the stack is reset and the state forced to `INVALID`
    /// before the error is returned, so a caller that chooses to keep
    /// using the automaton after an `Err` sees
    /// it in a well-defined state rather than mid-iteration.
    pub fn run(&mut self) -> Result<i32, HsmError> {
        loop {
            match self.run_iteration() {
                Ok(IterationOutcome::Exit(code)) => return Ok(code),
                Ok(IterationOutcome::Restart) | Ok(IterationOutcome::Advance) => continue,
                Err(err) => {
                    error!(error = %err, state = %self.state, "unrecovered fault; resetting to INVALID");
                    self.reset_stack();
                    self.state = StateName::new_unchecked("INVALID");
                    self.state_data = None;
                    return Err(err);
                }
            }
        }
    }

    fn run_iteration(&mut self) -> Result<IterationOutcome, HsmError> {
        let current = self.state.clone();

        match self.dispatch(HandlerKind::Pre, &current, true)? {
            StepResult::Exit(code) => return Ok(IterationOutcome::Exit(code)),
            StepResult::Changed | StepResult::Diverted => return Ok(IterationOutcome::Restart),
            StepResult::Unchanged => {}
        }

        match self.dispatch(HandlerKind::Do, &current, false)? {
            StepResult::Exit(code) => return Ok(IterationOutcome::Exit(code)),
            StepResult::Diverted => return Ok(IterationOutcome::Restart),
            StepResult::Changed | StepResult::Unchanged => {}
        }

        // Post is keyed to `current` — the state in effect when the `do`
        // handler was selected — regardless of what `do` just did.
        match self.dispatch(HandlerKind::Post, &current, true)? {
            StepResult::Exit(code) => return Ok(IterationOutcome::Exit(code)),
            StepResult::Changed | StepResult::Unchanged | StepResult::Diverted => {}
        }

        Ok(IterationOutcome::Advance)
    }

    fn dispatch(
        &mut self,
        kind: HandlerKind,
        lookup_state: &StateName,
        allow_missing: bool,
    ) -> Result<StepResult, HsmError> {
        let resolved = self.registry.find_handler(lookup_state, kind, allow_missing)?;
        let signal = match &resolved {
            Resolved::Found { unit, key } => {
                self.current_handler = Some(CurrentHandler {
                    origin_unit: unit.name().to_string(),
                    state: lookup_state.clone(),
                });
                let result = unit.invoke_handler(key, self);
                self.current_handler = None;
                result?
            }
            Resolved::Null => ControlSignal::Return(ReturnValue::None),
        };
        match signal {
            ControlSignal::Return(rv) => {
                Ok(if self.handle_retval(rv) { StepResult::Changed } else { StepResult::Unchanged })
            }
            ControlSignal::NonFatal(message) => {
                warn!(error = %message, state = %self.state, kind = %kind, "non-fatal handler exception");
                let diverted = self.state.with_suffix("UNKNOWN")?;
                let data: StateData = std::sync::Arc::new(message);
                self.set_state(diverted, Some(data));
                Ok(StepResult::Diverted)
            }
            ControlSignal::Finished(exit) => {
                if let Some(new_state) = exit.new_state {
                    self.set_state(new_state, exit.new_state_data);
                }
                Ok(StepResult::Exit(exit.retval))
            }
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod engine_tests;
