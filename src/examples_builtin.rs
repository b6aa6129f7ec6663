// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A small example behavior unit demonstrating the basic connection
//! lifecycle of a screen-scraping instance: `INITIAL_STATE` →
//! `DISCONNECTED` → `CONNECTING`, plus `INVALID` fault recovery.
//!
//! Spawning the child process is not this unit's job:
//! [`crate::terminal::PtyTerminal`] owns the child for the lifetime of
//! the [`Automaton`](crate::engine::Automaton) and its `Drop` impl
//! already does the SIGTERM-then-waitpid dance (see
//! `terminal::pty::PtyChild`), so this unit only moves engine state —
//! spawning happens once, up front, when the terminal façade is
//! constructed.

use crate::engine::Automaton;
use crate::error::HsmError;
use crate::handler::{Arg, BehaviorUnit, BehaviorUnitRef, ControlSignal, ReturnValue};
use crate::state::{StateData, StateName};

struct BaseConnection;

impl BehaviorUnit for BaseConnection {
    fn name(&self) -> &str {
        "BaseConnection"
    }

    fn handler_keys(&self) -> Vec<String> {
        vec!["do__INITIAL_STATE".to_string(), "do__INVALID".to_string(), "do__DISCONNECTED".to_string()]
    }

    fn transition_keys(&self) -> Vec<String> {
        vec!["transition__default__to__DISCONNECTED".to_string()]
    }

    fn invoke_handler(&self, key: &str, automaton: &mut Automaton) -> Result<ControlSignal, HsmError> {
        match key {
            "do__INITIAL_STATE" => {
                Ok(ControlSignal::Return(ReturnValue::Name(StateName::parse("DISCONNECTED")?)))
            }
            "do__INVALID" => {
                automaton.transition_to(StateName::parse("DISCONNECTED")?, false, &[])?;
                Ok(ControlSignal::Return(ReturnValue::None))
            }
            "do__DISCONNECTED" => {
                Ok(ControlSignal::Return(ReturnValue::Name(StateName::parse("CONNECTING")?)))
            }
            other => Err(HsmError::Other { detail: format!("BaseConnection has no handler {other:?}") }),
        }
    }

    fn invoke_transition(
        &self,
        key: &str,
        automaton: &mut Automaton,
        _args: &[Arg],
    ) -> Result<Option<StateData>, HsmError> {
        match key {
            "transition__default__to__DISCONNECTED" => {
                automaton.reset_stack();
                automaton.set_state(StateName::parse("DISCONNECTED")?, None);
                Ok(None)
            }
            other => Err(HsmError::Other { detail: format!("BaseConnection has no transition {other:?}") }),
        }
    }
}

/// A [`BehaviorUnitRef`] for [`BaseConnection`], suitable as (part of) an
/// automaton's base chain.
pub fn base_connection_unit() -> BehaviorUnitRef {
    std::sync::Arc::new(BaseConnection)
}

#[cfg(test)]
#[path = "examples_builtin_tests.rs"]
mod examples_builtin_tests;
